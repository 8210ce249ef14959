//! Members the language implies but source code does not spell out.

use crate::model::{BodySource, FieldInfo, MethodInfo, ParamInfo};
use crate::program::STRING;
use jinspect_api::models::{MethodKind, Modifiers, OriginKind, SourceLocation, TypeRef};
use jinspect_java::ast::Param;
use once_cell::sync::OnceCell;

pub(crate) const CONSTRUCTOR: &str = "<init>";
pub(crate) const STATIC_INIT: &str = "<clinit>";
pub(crate) const INSTANCE_INIT: &str = "<instinit>";

pub(crate) fn method(
    name: &str,
    kind: MethodKind,
    modifiers: Modifiers,
    params: Vec<ParamInfo>,
    return_type: TypeRef,
    location: Option<SourceLocation>,
) -> MethodInfo {
    MethodInfo {
        name: name.to_string(),
        kind,
        modifiers,
        origin: OriginKind::Synthetic,
        type_params: vec![],
        params,
        varargs: false,
        return_type,
        throws: vec![],
        annotations: vec![],
        descriptor: None,
        location,
        source: BodySource::None,
        body: OnceCell::new(),
    }
}

pub(crate) fn param(name: &str, ty: TypeRef) -> ParamInfo {
    ParamInfo {
        name: name.to_string(),
        ty,
        modifiers: Modifiers::empty(),
        annotations: vec![],
    }
}

pub(crate) fn component_param(p: &Param) -> ParamInfo {
    ParamInfo {
        name: p.name.clone(),
        ty: p.ty.clone(),
        modifiers: p.modifiers,
        annotations: super::source::annotations(&p.annotations),
    }
}

/// `values()` and `valueOf(String)` of an enum.
pub(crate) fn enum_methods(binary: &str, location: Option<SourceLocation>) -> [MethodInfo; 2] {
    let this = TypeRef::id(binary);
    let public_static = Modifiers::PUBLIC | Modifiers::STATIC;
    [
        method(
            "values",
            MethodKind::Method,
            public_static,
            vec![],
            this.clone().array_of(1),
            location.clone(),
        ),
        method(
            "valueOf",
            MethodKind::Method,
            public_static,
            vec![param("name", TypeRef::id(STRING))],
            this,
            location,
        ),
    ]
}

pub(crate) fn record_field(p: &Param, location: Option<SourceLocation>) -> FieldInfo {
    FieldInfo {
        name: p.name.clone(),
        modifiers: Modifiers::PRIVATE | Modifiers::FINAL,
        origin: OriginKind::Synthetic,
        ty: p.ty.clone(),
        annotations: super::source::annotations(&p.annotations),
        constant: None,
        is_enum_constant: false,
        location,
        init: BodySource::None,
        body: OnceCell::new(),
    }
}

pub(crate) fn record_accessor(p: &Param, location: Option<SourceLocation>) -> MethodInfo {
    method(
        &p.name,
        MethodKind::Method,
        Modifiers::PUBLIC,
        vec![],
        p.ty.clone(),
        location,
    )
}

pub(crate) fn constructor(
    modifiers: Modifiers,
    params: Vec<ParamInfo>,
    varargs: bool,
    location: Option<SourceLocation>,
) -> MethodInfo {
    let mut m = method(
        CONSTRUCTOR,
        MethodKind::Constructor,
        modifiers,
        params,
        TypeRef::raw("void"),
        location,
    );
    m.varargs = varargs;
    m
}

/// Access of an implicit constructor follows the class; enum constructors are private.
pub(crate) fn default_constructor_access(class: Modifiers, is_enum: bool) -> Modifiers {
    if is_enum {
        return Modifiers::PRIVATE;
    }
    [Modifiers::PUBLIC, Modifiers::PROTECTED, Modifiers::PRIVATE]
        .into_iter()
        .find(|m| class.contains(*m))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_helpers_are_public_static() {
        let [values, value_of] = enum_methods("p.Color", None);
        assert_eq!(values.return_type.to_string(), "p.Color[]");
        assert_eq!(value_of.params[0].ty, TypeRef::id("java.lang.String"));
        assert!(values.modifiers.contains(Modifiers::PUBLIC | Modifiers::STATIC));
        assert_eq!(values.origin, OriginKind::Synthetic);
    }

    #[test]
    fn implicit_constructor_access() {
        assert_eq!(
            default_constructor_access(Modifiers::PUBLIC | Modifiers::FINAL, false),
            Modifiers::PUBLIC
        );
        assert_eq!(default_constructor_access(Modifiers::PUBLIC, true), Modifiers::PRIVATE);
        assert!(default_constructor_access(Modifiers::STATIC, false).is_empty());
    }
}
