use super::{Lower, range_of, strip_whitespace};
use crate::ast::*;
use crate::error::Result;
use jinspect_api::models::{
    ModuleInfo, Modifiers, PackageGrant, Provides, Requires, TypeKind, TypeRef,
};
use tree_sitter::Node;

pub(crate) fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

impl<'s> Lower<'s> {
    pub(crate) fn top_level_types(&self, root: Node) -> Result<Vec<TypeDecl>> {
        self.named(root)
            .into_iter()
            .filter(|n| is_type_declaration(n.kind()))
            .map(|n| self.type_decl(n))
            .collect()
    }

    pub(crate) fn module_decl(&self, root: Node) -> Result<Option<ModuleDecl>> {
        let Some(node) = self
            .named(root)
            .into_iter()
            .find(|n| n.kind() == "module_declaration")
        else {
            return Ok(None);
        };
        let mut info = ModuleInfo {
            name: self.dotted(self.required(node, "name")?),
            open: self.child_of_kind(node, "open").is_some(),
            ..Default::default()
        };
        let annotations = self
            .named(node)
            .into_iter()
            .filter(|n| matches!(n.kind(), "annotation" | "marker_annotation"))
            .map(|n| self.annotation(n))
            .collect::<Result<Vec<_>>>()?;

        for directive in self.named(self.required(node, "body")?) {
            match directive.kind() {
                "requires_module_directive" => {
                    let modifiers: Vec<&str> = self
                        .field(directive, "modifiers")
                        .into_iter()
                        .map(|m| self.text(m))
                        .collect();
                    info.requires.push(Requires {
                        module: self.dotted(self.required(directive, "module")?),
                        transitive: modifiers.contains(&"transitive"),
                        is_static: modifiers.contains(&"static"),
                    });
                }
                "exports_module_directive" | "opens_module_directive" => {
                    let grant = PackageGrant {
                        package: self.dotted(self.required(directive, "package")?),
                        to: self
                            .field(directive, "modules")
                            .into_iter()
                            .map(|m| self.dotted(m))
                            .collect(),
                    };
                    if directive.kind() == "exports_module_directive" {
                        info.exports.push(grant);
                    } else {
                        info.opens.push(grant);
                    }
                }
                "uses_module_directive" => {
                    info.uses.push(self.dotted(self.required(directive, "type")?));
                }
                "provides_module_directive" => {
                    // The first implementation carries no field name.
                    let mut names = self
                        .named(directive)
                        .into_iter()
                        .filter(|n| matches!(n.kind(), "identifier" | "scoped_identifier"))
                        .map(|n| self.dotted(n));
                    let Some(service) = names.next() else {
                        return Err(self.error_at(directive, "provided"));
                    };
                    info.provides.push(Provides {
                        service,
                        with: names.collect(),
                    });
                }
                _ => {}
            }
        }
        Ok(Some(ModuleDecl {
            info,
            annotations,
            range: range_of(node),
        }))
    }

    fn dotted(&self, node: Node) -> String {
        strip_whitespace(self.text(node))
    }

    pub(crate) fn type_decl(&self, node: Node) -> Result<TypeDecl> {
        let kind = match node.kind() {
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            "annotation_type_declaration" => TypeKind::Annotation,
            _ => TypeKind::Class,
        };
        let (modifiers, annotations) = self.modifiers(node)?;
        let name = self.text(self.required(node, "name")?).to_string();
        let type_params = self.type_parameters(node.child_by_field_name("type_parameters"));

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| self.named(s).into_iter().next())
            .map(|t| self.type_ref(t));
        let interfaces = match kind {
            TypeKind::Interface => self
                .child_of_kind(node, "extends_interfaces")
                .map(|e| self.type_list(e))
                .unwrap_or_default(),
            _ => node
                .child_by_field_name("interfaces")
                .map(|i| self.type_list(i))
                .unwrap_or_default(),
        };
        let permits = node
            .child_by_field_name("permits")
            .or_else(|| self.child_of_kind(node, "permits"))
            .map(|p| self.type_list(p))
            .unwrap_or_default();
        let record_components = match node.child_by_field_name("parameters") {
            Some(p) if kind == TypeKind::Record => self.formal_parameters(p)?,
            _ => vec![],
        };

        let body = self.required(node, "body")?;
        let (enum_constants, members) = if kind == TypeKind::Enum {
            self.enum_body(body)?
        } else {
            (vec![], self.members(body)?)
        };

        Ok(TypeDecl {
            kind,
            name,
            modifiers,
            annotations,
            type_params,
            superclass,
            interfaces,
            permits,
            record_components,
            enum_constants,
            members,
            range: range_of(node),
        })
    }

    /// Anonymous class body of an enum constant or instance creation.
    pub(crate) fn anonymous_body(&self, body: Node) -> Result<TypeDecl> {
        Ok(TypeDecl {
            kind: TypeKind::Class,
            name: String::new(),
            modifiers: Modifiers::empty(),
            annotations: vec![],
            type_params: vec![],
            superclass: None,
            interfaces: vec![],
            permits: vec![],
            record_components: vec![],
            enum_constants: vec![],
            members: self.members(body)?,
            range: range_of(body),
        })
    }

    fn enum_body(&self, body: Node) -> Result<(Vec<EnumConstant>, Vec<MemberDecl>)> {
        let mut constants = Vec::new();
        let mut members = Vec::new();
        for child in self.named(body) {
            match child.kind() {
                "enum_constant" => {
                    let (_, annotations) = self.modifiers(child)?;
                    let name = self.text(self.required(child, "name")?).to_string();
                    let arguments = match child.child_by_field_name("arguments") {
                        Some(args) => self.arguments(args)?,
                        None => vec![],
                    };
                    let body = match child.child_by_field_name("body") {
                        Some(b) => Some(Box::new(self.anonymous_body(b)?)),
                        None => None,
                    };
                    constants.push(EnumConstant {
                        name,
                        annotations,
                        arguments,
                        body,
                        range: range_of(child),
                    });
                }
                "enum_body_declarations" => members.extend(self.members(child)?),
                _ => {}
            }
        }
        Ok((constants, members))
    }

    pub(crate) fn members(&self, body: Node) -> Result<Vec<MemberDecl>> {
        let mut members = Vec::new();
        for child in self.named(body) {
            let member = match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    MemberDecl::Field(self.field_decl(child)?)
                }
                "method_declaration" => {
                    MemberDecl::Method(self.method_decl(child, MethodDeclKind::Method)?)
                }
                "constructor_declaration" => {
                    MemberDecl::Method(self.method_decl(child, MethodDeclKind::Constructor)?)
                }
                "compact_constructor_declaration" => MemberDecl::Method(
                    self.method_decl(child, MethodDeclKind::CompactConstructor)?,
                ),
                "annotation_type_element_declaration" => MemberDecl::Method(
                    self.method_decl(child, MethodDeclKind::AnnotationElement)?,
                ),
                "block" => MemberDecl::Initializer(Initializer {
                    is_static: false,
                    body: self.block(child)?,
                    range: range_of(child),
                }),
                "static_initializer" => {
                    let Some(block) = self.child_of_kind(child, "block") else {
                        continue;
                    };
                    MemberDecl::Initializer(Initializer {
                        is_static: true,
                        body: self.block(block)?,
                        range: range_of(child),
                    })
                }
                k if is_type_declaration(k) => MemberDecl::Type(self.type_decl(child)?),
                _ => continue,
            };
            members.push(member);
        }
        Ok(members)
    }

    fn field_decl(&self, node: Node) -> Result<FieldDecl> {
        let (modifiers, annotations) = self.modifiers(node)?;
        let ty = self.type_ref(self.required(node, "type")?);
        Ok(FieldDecl {
            modifiers,
            annotations,
            ty,
            declarators: self.declarators(node)?,
            range: range_of(node),
        })
    }

    pub(crate) fn declarators(&self, node: Node) -> Result<Vec<VarDeclarator>> {
        self.field(node, "declarator")
            .into_iter()
            .map(|d| {
                let name = self.text(self.required(d, "name")?).to_string();
                let dims = self.dims(d.child_by_field_name("dimensions"));
                let init = match d.child_by_field_name("value") {
                    Some(v) => Some(self.expr(v)?),
                    None => None,
                };
                Ok(VarDeclarator {
                    name,
                    dims,
                    init,
                    range: range_of(d),
                })
            })
            .collect()
    }

    fn method_decl(&self, node: Node, kind: MethodDeclKind) -> Result<MethodDecl> {
        let (modifiers, annotations) = self.modifiers(node)?;
        let name = self.text(self.required(node, "name")?).to_string();
        let type_params = self.type_parameters(node.child_by_field_name("type_parameters"));
        let return_type = match node.child_by_field_name("type") {
            Some(t) => self
                .type_ref(t)
                .array_of(self.dims(node.child_by_field_name("dimensions"))),
            None => TypeRef::Unknown,
        };
        let params = match node.child_by_field_name("parameters") {
            Some(p) => self.formal_parameters(p)?,
            None => vec![],
        };
        let throws = self
            .child_of_kind(node, "throws")
            .map(|t| self.type_list(t))
            .unwrap_or_default();
        let body = match node.child_by_field_name("body") {
            Some(b) => Some(self.block(b)?),
            None => None,
        };
        let default_value = match kind {
            MethodDeclKind::AnnotationElement => match node.child_by_field_name("value") {
                Some(v) => Some(self.element_value(v)?),
                None => None,
            },
            _ => None,
        };
        Ok(MethodDecl {
            kind,
            name,
            modifiers,
            annotations,
            type_params,
            return_type,
            params,
            throws,
            body,
            default_value,
            range: range_of(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::JavaParser;
    use crate::ast::*;
    use jinspect_api::models::{Modifiers, Provides, Requires, TypeKind, TypeRef};

    fn parse(src: &str) -> CompilationUnit {
        JavaParser::new().unwrap().parse("T.java", src).unwrap()
    }

    #[test]
    fn class_header_with_generics_and_supertypes() {
        let unit = parse(
            "public abstract class Box<T extends Comparable<T>> extends Base<T> implements java.io.Serializable, Cloneable {}",
        );
        let decl = &unit.types[0];
        assert_eq!(decl.kind, TypeKind::Class);
        assert!(decl.modifiers.contains(Modifiers::PUBLIC | Modifiers::ABSTRACT));
        assert_eq!(decl.type_params[0].name, "T");
        assert_eq!(
            decl.type_params[0].bounds,
            vec![TypeRef::Generic {
                base: Box::new(TypeRef::raw("Comparable")),
                args: vec![TypeRef::raw("T")],
            }]
        );
        assert_eq!(
            decl.superclass,
            Some(TypeRef::Generic {
                base: Box::new(TypeRef::raw("Base")),
                args: vec![TypeRef::raw("T")],
            })
        );
        assert_eq!(
            decl.interfaces,
            vec![TypeRef::raw("java.io.Serializable"), TypeRef::raw("Cloneable")]
        );
    }

    #[test]
    fn members_keep_declaration_order_and_shapes() {
        let unit = parse(
            r#"class A {
                private static final int X = 1, Y[] = {2};
                static { }
                { }
                A(int a) { this(); }
                A() { super(); }
                <R> R map(java.util.function.Function<? super String, ? extends R> f, String... rest) throws Exception { return null; }
                abstract void noBody();
                class Inner {}
            }"#,
        );
        let decl = &unit.types[0];
        let kinds: Vec<_> = decl
            .members
            .iter()
            .map(|m| match m {
                MemberDecl::Field(_) => "field",
                MemberDecl::Method(_) => "method",
                MemberDecl::Initializer(i) if i.is_static => "static-init",
                MemberDecl::Initializer(_) => "init",
                MemberDecl::Type(_) => "type",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["field", "static-init", "init", "method", "method", "method", "method", "type"]
        );

        let field = decl.fields().next().unwrap();
        assert_eq!(field.declarators.len(), 2);
        assert_eq!(field.declarators[1].dims, 1);

        let map = decl.methods().find(|m| m.name == "map").unwrap();
        assert_eq!(map.type_params[0].name, "R");
        assert!(map.is_varargs());
        assert_eq!(
            map.params[1].ty,
            TypeRef::Array {
                element: Box::new(TypeRef::raw("String")),
                dimensions: 1
            }
        );
        let TypeRef::Generic { args, .. } = &map.params[0].ty else {
            panic!("expected generic parameter type");
        };
        assert_eq!(
            args[0],
            TypeRef::Wildcard {
                bound: Some(Box::new(TypeRef::raw("String"))),
                is_upper_bound: false
            }
        );
        assert_eq!(map.throws, vec![TypeRef::raw("Exception")]);
        assert!(decl.methods().find(|m| m.name == "noBody").unwrap().body.is_none());

        let ctor = decl
            .methods()
            .find(|m| m.kind == MethodDeclKind::Constructor && m.params.len() == 1)
            .unwrap();
        let first = &ctor.body.as_ref().unwrap().stmts[0];
        assert!(matches!(
            first.kind,
            StmtKind::ConstructorCall { is_super: false, .. }
        ));
    }

    #[test]
    fn enums_records_interfaces_and_annotations() {
        let unit = parse(
            r#"
            enum Color implements Named { RED("r"), GREEN("g") { String code() { return "G"; } }; Color(String c) {} }
            record Point(int x, int y) implements Shape { Point { } static Point origin() { return new Point(0, 0); } }
            interface Shape extends Comparable<Shape>, Named { double area(); default int sides() { return 0; } }
            @interface Marker { String value() default "x"; int[] counts() default {1, 2}; }
            "#,
        );
        let color = &unit.types[0];
        assert_eq!(color.kind, TypeKind::Enum);
        assert_eq!(color.enum_constants.len(), 2);
        assert_eq!(color.enum_constants[0].arguments.len(), 1);
        assert!(color.enum_constants[1].body.is_some());
        assert_eq!(color.interfaces, vec![TypeRef::raw("Named")]);

        let point = &unit.types[1];
        assert_eq!(point.kind, TypeKind::Record);
        let names: Vec<_> = point.record_components.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(
            point.methods().next().unwrap().kind,
            MethodDeclKind::CompactConstructor
        );

        let shape = &unit.types[2];
        assert_eq!(shape.kind, TypeKind::Interface);
        assert_eq!(shape.interfaces.len(), 2);
        let sides = shape.methods().find(|m| m.name == "sides").unwrap();
        assert!(sides.modifiers.contains(Modifiers::DEFAULT));

        let marker = &unit.types[3];
        assert_eq!(marker.kind, TypeKind::Annotation);
        let value = marker.methods().next().unwrap();
        assert_eq!(value.kind, MethodDeclKind::AnnotationElement);
        assert!(value.default_value.is_some());
        let counts = marker.methods().nth(1).unwrap();
        assert!(matches!(counts.default_value, Some(ElementValue::Array(ref v)) if v.len() == 2));
    }

    #[test]
    fn annotations_on_declarations() {
        let unit = parse(
            r#"@Deprecated @SuppressWarnings("unchecked") @Range(min = 1, max = 2) class A { @Override public String toString() { return ""; } }"#,
        );
        let decl = &unit.types[0];
        let names: Vec<_> = decl.annotations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Deprecated", "SuppressWarnings", "Range"]);
        assert_eq!(decl.annotations[1].arguments[0].0, "value");
        assert_eq!(decl.annotations[2].arguments.len(), 2);
        let to_string = decl.methods().next().unwrap();
        assert_eq!(to_string.annotations[0].name, "Override");
        assert!(to_string.modifiers.contains(Modifiers::PUBLIC));
    }

    #[test]
    fn module_declarations_keep_every_directive() {
        let unit = parse(
            "import com.acme.spi.Codec; \
             @Deprecated open module com.acme.app { \
               requires java.base; \
               requires transitive static com.acme.core; \
               exports com.acme.api; \
               exports com.acme.spi to com.acme.plugins, com.acme.tests; \
               opens com.acme.model; \
               uses Codec; \
               provides com.acme.spi.Codec with com.acme.impl.JsonCodec, com.acme.impl.XmlCodec; \
             }",
        );
        assert!(unit.types.is_empty());
        assert_eq!(unit.imports.len(), 1);
        let module = unit.module.as_ref().unwrap();
        assert_eq!(module.annotations[0].name, "Deprecated");
        let info = &module.info;
        assert_eq!(info.name, "com.acme.app");
        assert!(info.open);
        assert_eq!(
            info.requires,
            vec![
                Requires {
                    module: "java.base".into(),
                    transitive: false,
                    is_static: false,
                },
                Requires {
                    module: "com.acme.core".into(),
                    transitive: true,
                    is_static: true,
                },
            ]
        );
        assert_eq!(info.exports[0].to, Vec::<String>::new());
        assert_eq!(info.exports[1].package, "com.acme.spi");
        assert_eq!(info.exports[1].to, vec!["com.acme.plugins", "com.acme.tests"]);
        assert_eq!(info.opens[0].package, "com.acme.model");
        assert_eq!(info.uses, vec!["Codec"]);
        assert_eq!(
            info.provides,
            vec![Provides {
                service: "com.acme.spi.Codec".into(),
                with: vec!["com.acme.impl.JsonCodec".into(), "com.acme.impl.XmlCodec".into()],
            }]
        );
    }

    #[test]
    fn ordinary_units_have_no_module() {
        let unit = parse("package p; class A {}");
        assert!(unit.module.is_none());
        let unit = parse("module m {}");
        assert_eq!(unit.module.unwrap().info.name, "m");
    }
}
