use super::Lower;
use crate::ast::{Annotation, ElementValue, Param, TypeParam};
use crate::error::Result;
use jinspect_api::models::{Modifiers, TypeRef};
use tree_sitter::Node;

pub(crate) fn is_annotation(node: Node) -> bool {
    matches!(node.kind(), "annotation" | "marker_annotation")
}

impl<'s> Lower<'s> {
    pub(crate) fn type_ref(&self, node: Node) -> TypeRef {
        match node.kind() {
            "generic_type" => {
                let children = self.named(node);
                let base = children
                    .iter()
                    .find(|c| c.kind() != "type_arguments")
                    .map(|b| self.type_ref(*b))
                    .unwrap_or(TypeRef::Unknown);
                let args = children
                    .iter()
                    .find(|c| c.kind() == "type_arguments")
                    .map(|a| self.type_arguments(*a))
                    .unwrap_or_default();
                TypeRef::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .or_else(|| node.named_child(0))
                    .map(|e| self.type_ref(e))
                    .unwrap_or(TypeRef::Unknown);
                let dims = match node.child_by_field_name("dimensions") {
                    Some(d) => self.dims(Some(d)),
                    None => 1,
                };
                element.array_of(dims)
            }
            "wildcard" => {
                let mut bound = None;
                let mut is_upper = true;
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "super" => is_upper = false,
                        "extends" | "?" => {}
                        _ if child.is_named() && !is_annotation(child) && !child.is_extra() => {
                            bound = Some(Box::new(self.type_ref(child)));
                        }
                        _ => {}
                    }
                }
                TypeRef::Wildcard {
                    bound,
                    is_upper_bound: is_upper,
                }
            }
            "annotated_type" => self
                .named(node)
                .into_iter()
                .rfind(|c| !is_annotation(*c))
                .map(|t| self.type_ref(t))
                .unwrap_or(TypeRef::Unknown),
            "scoped_type_identifier" => {
                let name = self.scoped_name(node);
                if name.is_empty() {
                    TypeRef::Unknown
                } else {
                    TypeRef::Raw(name)
                }
            }
            _ => {
                // Primitive keywords, `type_identifier`, and plain or scoped
                // identifiers used in type position by patterns.
                let text: String = self
                    .text(node)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                if text.is_empty() {
                    TypeRef::Unknown
                } else {
                    TypeRef::Raw(text)
                }
            }
        }
    }

    /// Dotted name of a scoped type, dropping annotations and the type
    /// arguments of enclosing segments.
    fn scoped_name(&self, node: Node) -> String {
        let mut parts = Vec::new();
        for child in self.named(node) {
            match child.kind() {
                "scoped_type_identifier" => parts.push(self.scoped_name(child)),
                "generic_type" => {
                    if let Some(base) = child.named_child(0) {
                        if base.kind() == "scoped_type_identifier" {
                            parts.push(self.scoped_name(base));
                        } else {
                            parts.push(self.text(base).to_string());
                        }
                    }
                }
                "type_identifier" | "identifier" => parts.push(self.text(child).to_string()),
                _ => {}
            }
        }
        parts.join(".")
    }

    pub(crate) fn type_arguments(&self, node: Node) -> Vec<TypeRef> {
        self.named(node)
            .into_iter()
            .filter(|c| !is_annotation(*c))
            .map(|c| self.type_ref(c))
            .collect()
    }

    /// Type of a local, resource or enhanced-for variable; `None` for `var`.
    pub(crate) fn local_type(&self, node: Node) -> Option<TypeRef> {
        if node.kind() == "type_identifier" && self.text(node) == "var" {
            None
        } else {
            Some(self.type_ref(node))
        }
    }

    pub(crate) fn type_list(&self, node: Node) -> Vec<TypeRef> {
        let list = if node.kind() == "type_list" {
            Some(node)
        } else {
            self.child_of_kind(node, "type_list")
        };
        match list {
            Some(l) => self.named(l).into_iter().map(|t| self.type_ref(t)).collect(),
            None => self
                .named(node)
                .into_iter()
                .filter(|c| !is_annotation(*c))
                .map(|t| self.type_ref(t))
                .collect(),
        }
    }

    /// Number of `[]` pairs in a `dimensions` node.
    pub(crate) fn dims(&self, node: Option<Node>) -> usize {
        let Some(node) = node else {
            return 0;
        };
        let mut cursor = node.walk();
        node.children(&mut cursor).filter(|c| c.kind() == "[").count()
    }

    pub(crate) fn type_parameters(&self, node: Option<Node>) -> Vec<TypeParam> {
        let Some(node) = node else {
            return vec![];
        };
        self.named(node)
            .into_iter()
            .filter(|c| c.kind() == "type_parameter")
            .map(|tp| {
                let mut name = String::new();
                let mut bounds = Vec::new();
                let mut annotations = Vec::new();
                for child in self.named(tp) {
                    match child.kind() {
                        "type_identifier" | "identifier" => name = self.text(child).to_string(),
                        "type_bound" => {
                            bounds = self
                                .named(child)
                                .into_iter()
                                .map(|b| self.type_ref(b))
                                .collect()
                        }
                        _ if is_annotation(child) => {
                            if let Ok(a) = self.annotation(child) {
                                annotations.push(a);
                            }
                        }
                        _ => {}
                    }
                }
                TypeParam {
                    name,
                    bounds,
                    annotations,
                    range: super::range_of(tp),
                }
            })
            .collect()
    }

    /// Modifier keywords and annotations of a declaration.
    pub(crate) fn modifiers(&self, decl: Node) -> Result<(Modifiers, Vec<Annotation>)> {
        let mut modifiers = Modifiers::empty();
        let mut annotations = Vec::new();
        if let Some(mods) = self.child_of_kind(decl, "modifiers") {
            let mut cursor = mods.walk();
            for child in mods.children(&mut cursor) {
                if is_annotation(child) {
                    annotations.push(self.annotation(child)?);
                } else if let Some(m) = Modifiers::from_keyword(child.kind()) {
                    modifiers.insert(m);
                }
            }
        }
        Ok((modifiers, annotations))
    }

    pub(crate) fn annotation(&self, node: Node) -> Result<Annotation> {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).chars().filter(|c| !c.is_whitespace()).collect())
            .unwrap_or_default();
        let mut arguments = Vec::new();
        if let Some(args) = node.child_by_field_name("arguments") {
            for child in self.named(args) {
                if child.kind() == "element_value_pair" {
                    let key = child
                        .child_by_field_name("key")
                        .map(|k| self.text(k).to_string())
                        .unwrap_or_default();
                    let value = self.required(child, "value")?;
                    arguments.push((key, self.element_value(value)?));
                } else {
                    arguments.push(("value".to_string(), self.element_value(child)?));
                }
            }
        }
        Ok(Annotation {
            name,
            arguments,
            range: super::range_of(node),
        })
    }

    pub(crate) fn element_value(&self, node: Node) -> Result<ElementValue> {
        Ok(match node.kind() {
            "element_value_array_initializer" => ElementValue::Array(
                self.named(node)
                    .into_iter()
                    .map(|v| self.element_value(v))
                    .collect::<Result<_>>()?,
            ),
            "annotation" | "marker_annotation" => {
                ElementValue::Annotation(Box::new(self.annotation(node)?))
            }
            _ => ElementValue::Expr(self.expr(node)?),
        })
    }

    /// Parameters of a method, constructor, record header or lambda.
    pub(crate) fn formal_parameters(&self, params_node: Node) -> Result<Vec<Param>> {
        let mut result = Vec::new();
        for child in self.named(params_node) {
            match child.kind() {
                "formal_parameter" => {
                    let (modifiers, annotations) = self.modifiers(child)?;
                    let ty = child
                        .child_by_field_name("type")
                        .map(|t| self.type_ref(t))
                        .unwrap_or(TypeRef::Unknown);
                    let dims = self.dims(child.child_by_field_name("dimensions"));
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or("arg")
                        .to_string();
                    result.push(Param {
                        name,
                        modifiers,
                        annotations,
                        ty: ty.array_of(dims),
                        varargs: false,
                        range: super::range_of(child),
                    });
                }
                "spread_parameter" => {
                    let (modifiers, annotations) = self.modifiers(child)?;
                    let mut ty = TypeRef::Unknown;
                    let mut name = "arg".to_string();
                    for gc in self.named(child) {
                        match gc.kind() {
                            "variable_declarator" => {
                                if let Some(n) = gc.child_by_field_name("name") {
                                    name = self.text(n).to_string();
                                }
                            }
                            "modifiers" => {}
                            _ if is_annotation(gc) => {}
                            _ => ty = self.type_ref(gc).array_of(1),
                        }
                    }
                    result.push(Param {
                        name,
                        modifiers,
                        annotations,
                        ty,
                        varargs: true,
                        range: super::range_of(child),
                    });
                }
                _ => {}
            }
        }
        Ok(result)
    }
}
