//! Source front: syntax-tree declarations to [`TypeInfo`].

use super::synthetic::{self, CONSTRUCTOR, INSTANCE_INIT, STATIC_INIT};
use crate::index::UnitContext;
use crate::model::{
    AnnotationUse, BodySource, DeclContext, FieldInfo, LocalTypeScope, MethodInfo, Nesting,
    Origin, ParamInfo, TypeInfo, TypeParamDecl,
};
use crate::program::{ANNOTATION, ENUM, OBJECT, RECORD};
use jinspect_api::models::{MethodKind, Modifiers, OriginKind, TypeId, TypeKind, TypeRef};
use jinspect_java::ast::{self, MemberDecl, MethodDeclKind, TypeDecl};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Everything needed to build one source-declared type.
pub(crate) struct SourceType<'a> {
    pub unit: &'a Arc<UnitContext>,
    pub decl: &'a TypeDecl,
    pub binary: String,
    pub canonical: String,
    pub nesting: Nesting,
    /// Declared directly in an interface body (implicitly `public static`).
    pub in_interface: bool,
    /// Supertype named by `new X() { .. }` or the enum of a constant body.
    pub anonymous_super: Option<TypeRef>,
    pub local: Option<Arc<LocalTypeScope>>,
}

pub(crate) fn annotations(list: &[ast::Annotation]) -> Vec<AnnotationUse> {
    list.iter()
        .map(|a| AnnotationUse {
            name: TypeRef::raw(&a.name),
        })
        .collect()
}

fn type_params(list: &[ast::TypeParam]) -> Vec<TypeParamDecl> {
    list.iter()
        .map(|p| TypeParamDecl {
            name: p.name.clone(),
            bounds: p.bounds.clone(),
        })
        .collect()
}

fn params(list: &[ast::Param]) -> Vec<ParamInfo> {
    list.iter().map(synthetic::component_param).collect()
}

pub(crate) fn build_type(id: TypeId, src: SourceType<'_>) -> TypeInfo {
    let SourceType {
        unit,
        decl,
        binary,
        canonical,
        nesting,
        in_interface,
        anonymous_super,
        local,
    } = src;
    let is_interface = decl.kind.is_interface_like();
    let nested = nesting != Nesting::TopLevel;
    let anonymous = matches!(nesting, Nesting::Anonymous { .. });

    let mut modifiers = decl.modifiers;
    match decl.kind {
        TypeKind::Interface | TypeKind::Annotation => {
            modifiers.insert(Modifiers::ABSTRACT);
            if nested {
                modifiers.insert(Modifiers::STATIC);
            }
        }
        TypeKind::Enum => {
            if nested {
                modifiers.insert(Modifiers::STATIC);
            }
            if decl.enum_constants.iter().all(|c| c.body.is_none()) {
                modifiers.insert(Modifiers::FINAL);
            }
        }
        TypeKind::Record => {
            modifiers.insert(Modifiers::FINAL);
            if nested {
                modifiers.insert(Modifiers::STATIC);
            }
        }
        TypeKind::Class => {}
    }
    if in_interface {
        modifiers.insert(Modifiers::PUBLIC | Modifiers::STATIC);
    }

    let superclass = match decl.kind {
        TypeKind::Class if anonymous => anonymous_super,
        TypeKind::Class => decl
            .superclass
            .clone()
            .or_else(|| (binary != OBJECT).then(|| TypeRef::id(OBJECT))),
        TypeKind::Enum => Some(TypeRef::Generic {
            base: Box::new(TypeRef::id(ENUM)),
            args: vec![TypeRef::id(&binary)],
        }),
        TypeKind::Record => Some(TypeRef::id(RECORD)),
        TypeKind::Interface | TypeKind::Annotation => None,
    };
    let mut interfaces = decl.interfaces.clone();
    if decl.kind == TypeKind::Annotation {
        interfaces.push(TypeRef::id(ANNOTATION));
    }

    let loc = |range| Some(unit.location(range));
    let mut fields = Vec::new();
    let mut methods = Vec::new();

    for constant in &decl.enum_constants {
        fields.push(FieldInfo {
            name: constant.name.clone(),
            modifiers: Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
            origin: OriginKind::Source,
            ty: TypeRef::id(&binary),
            annotations: annotations(&constant.annotations),
            constant: None,
            is_enum_constant: true,
            location: loc(constant.range),
            init: BodySource::Constant(Arc::new(constant.clone())),
            body: OnceCell::new(),
        });
    }
    for component in &decl.record_components {
        fields.push(synthetic::record_field(component, loc(component.range)));
    }

    let mut has_constructor = false;
    let mut has_canonical = false;
    for member in &decl.members {
        match member {
            MemberDecl::Field(f) => {
                let mut m = f.modifiers;
                if is_interface {
                    m.insert(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
                }
                for d in &f.declarators {
                    fields.push(FieldInfo {
                        name: d.name.clone(),
                        modifiers: m,
                        origin: OriginKind::Source,
                        ty: f.ty.clone().array_of(d.dims),
                        annotations: annotations(&f.annotations),
                        constant: None,
                        is_enum_constant: false,
                        location: loc(d.range),
                        init: match &d.init {
                            Some(e) => BodySource::Expr(Arc::new(e.clone())),
                            None => BodySource::None,
                        },
                        body: OnceCell::new(),
                    });
                }
            }
            MemberDecl::Method(md) => {
                let info = method(unit, decl, md, is_interface);
                if info.kind == MethodKind::Constructor {
                    has_constructor = true;
                    has_canonical |= md.kind == MethodDeclKind::CompactConstructor
                        || (decl.kind == TypeKind::Record
                            && md.params.len() == decl.record_components.len()
                            && md
                                .params
                                .iter()
                                .zip(&decl.record_components)
                                .all(|(a, b)| a.ty == b.ty));
                }
                methods.push(info);
            }
            MemberDecl::Initializer(init) => {
                let (name, m) = if init.is_static {
                    (STATIC_INIT, Modifiers::STATIC)
                } else {
                    (INSTANCE_INIT, Modifiers::empty())
                };
                methods.push(MethodInfo {
                    name: name.to_string(),
                    kind: MethodKind::Initializer,
                    modifiers: m,
                    origin: OriginKind::Source,
                    type_params: vec![],
                    params: vec![],
                    varargs: false,
                    return_type: TypeRef::raw("void"),
                    throws: vec![],
                    annotations: vec![],
                    descriptor: None,
                    location: loc(init.range),
                    source: BodySource::Block(Arc::new(init.body.clone())),
                    body: OnceCell::new(),
                });
            }
            MemberDecl::Type(_) => {}
        }
    }

    let decl_loc = loc(decl.range);
    match decl.kind {
        TypeKind::Enum => methods.extend(synthetic::enum_methods(&binary, decl_loc.clone())),
        TypeKind::Record => {
            for component in &decl.record_components {
                let declared = decl
                    .methods()
                    .any(|m| m.name == component.name && m.params.is_empty());
                if !declared {
                    methods.push(synthetic::record_accessor(component, loc(component.range)));
                }
            }
        }
        _ => {}
    }
    let needs_default = match decl.kind {
        TypeKind::Class => !anonymous && !has_constructor,
        TypeKind::Enum => !has_constructor,
        TypeKind::Record => !has_canonical,
        TypeKind::Interface | TypeKind::Annotation => false,
    };
    if needs_default {
        let access = synthetic::default_constructor_access(modifiers, decl.kind == TypeKind::Enum);
        let (params, varargs) = if decl.kind == TypeKind::Record {
            (
                params(&decl.record_components),
                decl.record_components.last().is_some_and(|p| p.varargs),
            )
        } else {
            (vec![], false)
        };
        methods.push(synthetic::constructor(access, params, varargs, decl_loc.clone()));
    }

    let package = unit.package.clone();
    TypeInfo {
        id,
        name: canonical,
        simple_name: decl.name.clone(),
        binary_name: binary,
        package,
        kind: decl.kind,
        modifiers,
        origin: Origin::Source {
            unit: Arc::clone(&unit.unit),
        },
        nesting,
        type_params: type_params(&decl.type_params),
        superclass,
        interfaces,
        permits: decl.permits.clone(),
        annotations: annotations(&decl.annotations),
        fields,
        methods,
        member_types: decl.member_types().map(|t| t.name.clone()).collect(),
        location: decl_loc,
        context: DeclContext::Source {
            unit: Arc::clone(unit),
            local,
        },
    }
}

fn method(unit: &UnitContext, owner: &TypeDecl, md: &ast::MethodDecl, in_interface: bool) -> MethodInfo {
    let mut modifiers = md.modifiers;
    let (name, kind, params, return_type) = match md.kind {
        MethodDeclKind::Method | MethodDeclKind::AnnotationElement => (
            md.name.clone(),
            MethodKind::Method,
            params(&md.params),
            md.return_type.clone(),
        ),
        MethodDeclKind::Constructor => (
            CONSTRUCTOR.to_string(),
            MethodKind::Constructor,
            params(&md.params),
            TypeRef::raw("void"),
        ),
        MethodDeclKind::CompactConstructor => (
            CONSTRUCTOR.to_string(),
            MethodKind::Constructor,
            params(&owner.record_components),
            TypeRef::raw("void"),
        ),
    };
    if in_interface {
        if !modifiers.contains(Modifiers::PRIVATE) {
            modifiers.insert(Modifiers::PUBLIC);
        }
        if md.body.is_none() && !modifiers.contains(Modifiers::STATIC) {
            modifiers.insert(Modifiers::ABSTRACT);
        }
    }
    let varargs = match md.kind {
        MethodDeclKind::CompactConstructor => owner.record_components.last().is_some_and(|p| p.varargs),
        _ => md.is_varargs(),
    };
    MethodInfo {
        name,
        kind,
        modifiers,
        origin: OriginKind::Source,
        type_params: type_params(&md.type_params),
        params,
        varargs,
        return_type,
        throws: md.throws.clone(),
        annotations: annotations(&md.annotations),
        descriptor: None,
        location: Some(unit.location(md.range)),
        source: match &md.body {
            Some(b) => BodySource::Block(Arc::new(b.clone())),
            None => BodySource::None,
        },
        body: OnceCell::new(),
    }
}
