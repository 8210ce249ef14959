//! Subtyping and method-invocation conversions.
//!
//! Unresolved types are compatible with everything so that one missing class
//! does not cascade into a wave of overload failures.

use super::generics::{Substitution, as_super, var_bounds};
use crate::program::{OBJECT, Program};
use jinspect_api::models::{JavaType, PrimitiveType};

pub(crate) fn is_subtype(program: &Program, s: &JavaType, t: &JavaType) -> bool {
    if s == t {
        return true;
    }
    match (s, t) {
        (JavaType::Unresolved(_), _) | (_, JavaType::Unresolved(_)) => true,
        (JavaType::Primitive(_), _) | (_, JavaType::Primitive(_)) => false,
        (JavaType::Void, _) | (_, JavaType::Void) => false,
        (JavaType::Null, _) => t.is_reference() || matches!(t, JavaType::Wildcard { .. }),
        (_, JavaType::Class { id, .. }) if program.is_named(*id, OBJECT) => s.is_reference(),
        (_, JavaType::Class { id, args }) => match as_super(program, s, *id) {
            Some(JavaType::Class { args: sargs, .. }) => {
                // Raw on either side is an unchecked conversion.
                sargs.is_empty()
                    || args.is_empty()
                    || (sargs.len() == args.len()
                        && args.iter().zip(&sargs).all(|(ta, sa)| contains(program, ta, sa)))
            }
            _ => false,
        },
        (JavaType::Array(se), JavaType::Array(te)) => match (&**se, &**te) {
            (JavaType::Primitive(a), JavaType::Primitive(b)) => a == b,
            (JavaType::Primitive(_), _) | (_, JavaType::Primitive(_)) => false,
            _ => is_subtype(program, se, te),
        },
        (JavaType::TypeVar(v), _) => var_bounds(program, v)
            .iter()
            .any(|b| is_subtype(program, b, t)),
        (JavaType::Wildcard { bound: Some(b), upper: true }, _) => is_subtype(program, b, t),
        _ => false,
    }
}

/// Type-argument containment: `? extends T` holds subtypes of `T`, `? super T`
/// supertypes, `?` anything.
pub(crate) fn contains(program: &Program, t: &JavaType, s: &JavaType) -> bool {
    match t {
        JavaType::Wildcard { bound: None, .. } => true,
        JavaType::Wildcard {
            bound: Some(b),
            upper: true,
        } => match s {
            JavaType::Wildcard {
                bound: Some(sb),
                upper: true,
            } => is_subtype(program, sb, b),
            JavaType::Wildcard { .. } => false,
            _ => is_subtype(program, s, b),
        },
        JavaType::Wildcard {
            bound: Some(b),
            upper: false,
        } => match s {
            JavaType::Wildcard {
                bound: Some(sb),
                upper: false,
            } => is_subtype(program, b, sb),
            JavaType::Wildcard { .. } => false,
            _ => is_subtype(program, b, s),
        },
        _ => t == s || s.is_unresolved() || t.is_unresolved(),
    }
}

pub(crate) fn boxed(program: &Program, p: PrimitiveType) -> JavaType {
    program.known(p.box_class())
}

pub(crate) fn unboxed(program: &Program, t: &JavaType) -> Option<PrimitiveType> {
    let id = t.class_id()?;
    let info = program.info(id)?;
    PrimitiveType::from_box_class(&info.binary_name)
}

/// Method-invocation compatibility. The strict phase allows identity,
/// primitive widening and reference widening; the loose phase adds boxing and
/// unboxing.
pub(crate) fn compatible(program: &Program, s: &JavaType, t: &JavaType, loose: bool) -> bool {
    if s.is_unresolved() || t.is_unresolved() {
        return true;
    }
    match (s, t) {
        (JavaType::Primitive(a), JavaType::Primitive(b)) => a.widens_to(*b),
        (JavaType::Primitive(a), _) => loose && is_subtype(program, &boxed(program, *a), t),
        (_, JavaType::Primitive(b)) => {
            loose && unboxed(program, s).is_some_and(|a| a.widens_to(*b))
        }
        _ => is_subtype(program, s, t),
    }
}

/// Binary numeric promotion.
pub(crate) fn promote(a: PrimitiveType, b: PrimitiveType) -> Option<PrimitiveType> {
    use PrimitiveType::*;
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    Some(if a == Double || b == Double {
        Double
    } else if a == Float || b == Float {
        Float
    } else if a == Long || b == Long {
        Long
    } else {
        Int
    })
}

/// Unary numeric promotion.
pub(crate) fn promote_unary(a: PrimitiveType) -> Option<PrimitiveType> {
    use PrimitiveType::*;
    match a {
        Byte | Short | Char | Int => Some(Int),
        Boolean => None,
        other => Some(other),
    }
}

/// A primitive view of `t`, unboxing wrapper classes.
pub(crate) fn numeric(program: &Program, t: &JavaType) -> Option<PrimitiveType> {
    t.primitive().or_else(|| unboxed(program, t))
}

/// Least upper bound, approximated: equal types, the wider primitive, the
/// nearest common superclass, or the first shared interface of the left side.
pub(crate) fn lub(program: &Program, a: &JavaType, b: &JavaType) -> JavaType {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (JavaType::Null, other) | (other, JavaType::Null) => {
            return match other {
                JavaType::Primitive(p) => boxed(program, *p),
                _ => other.clone(),
            };
        }
        (JavaType::Unresolved(_), _) => return a.clone(),
        (_, JavaType::Unresolved(_)) => return b.clone(),
        _ => {}
    }
    if let (Some(x), Some(y)) = (numeric(program, a), numeric(program, b)) {
        if let Some(p) = promote(x, y) {
            return JavaType::Primitive(p);
        }
    }
    let a = box_if_primitive(program, a);
    let b = box_if_primitive(program, b);
    if is_subtype(program, &a, &b) {
        return b;
    }
    if is_subtype(program, &b, &a) {
        return a;
    }
    // Walk the superclass chain of `a`.
    let mut current = a.clone();
    while let JavaType::Class { id, args } = &current {
        let header = program.header(*id);
        let Some(sup) = &header.superclass else {
            break;
        };
        let sup = Substitution::for_type(&header, args).apply(sup);
        if sup.class_id().is_none_or(|s| program.is_named(s, OBJECT)) {
            break;
        }
        if is_subtype(program, &b, &sup) {
            return sup;
        }
        current = sup;
    }
    if let Some(id) = a.class_id() {
        for iface in program.header(id).interfaces.iter() {
            if let Some(sup) = iface.class_id().and_then(|i| as_super(program, &a, i)) {
                if is_subtype(program, &b, &sup) {
                    return sup;
                }
            }
        }
    }
    program.object()
}

fn box_if_primitive(program: &Program, t: &JavaType) -> JavaType {
    match t {
        JavaType::Primitive(p) => boxed(program, *p),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn ty(program: &Program, name: &str, args: Vec<JavaType>) -> JavaType {
        JavaType::Class {
            id: program.materialize(name).unwrap(),
            args,
        }
    }

    #[test]
    fn generic_subtyping_respects_wildcards() {
        let program = testing::program(&[]);
        let string = ty(&program, "java.lang.String", vec![]);
        let number = ty(&program, "java.lang.Number", vec![]);
        let integer = ty(&program, "java.lang.Integer", vec![]);
        let list_of = |arg| ty(&program, "java.util.List", vec![arg]);
        let array_list = ty(&program, "java.util.ArrayList", vec![string.clone()]);

        assert!(is_subtype(&program, &array_list, &list_of(string.clone())));
        assert!(!is_subtype(&program, &array_list, &list_of(program.object())));
        let extends_number = JavaType::Wildcard {
            bound: Some(Box::new(number.clone())),
            upper: true,
        };
        assert!(is_subtype(&program, &list_of(integer.clone()), &list_of(extends_number.clone())));
        assert!(!is_subtype(&program, &list_of(string.clone()), &list_of(extends_number)));
        let super_integer = JavaType::Wildcard {
            bound: Some(Box::new(integer.clone())),
            upper: false,
        };
        assert!(is_subtype(&program, &list_of(number), &list_of(super_integer)));
        assert!(is_subtype(&program, &JavaType::Null, &string));
        assert!(is_subtype(&program, &JavaType::array(string, 1), &program.object()));
    }

    #[test]
    fn loose_phase_boxes_and_unboxes() {
        let program = testing::program(&[]);
        let int = JavaType::Primitive(PrimitiveType::Int);
        let long = JavaType::Primitive(PrimitiveType::Long);
        let integer = ty(&program, "java.lang.Integer", vec![]);
        assert!(compatible(&program, &int, &long, false));
        assert!(!compatible(&program, &int, &integer, false));
        assert!(compatible(&program, &int, &integer, true));
        assert!(compatible(&program, &int, &program.object(), true));
        assert!(compatible(&program, &integer, &long, true));
        assert!(!compatible(&program, &long, &int, true));
    }

    #[test]
    fn lub_finds_common_supertypes() {
        let program = testing::program(&[]);
        let integer = ty(&program, "java.lang.Integer", vec![]);
        let long = ty(&program, "java.lang.Long", vec![]);
        let state = ty(&program, "java.lang.IllegalStateException", vec![]);
        let io = ty(&program, "java.io.IOException", vec![]);
        assert_eq!(lub(&program, &state, &io), ty(&program, "java.lang.Exception", vec![]));
        assert_eq!(
            lub(&program, &integer, &long),
            JavaType::Primitive(PrimitiveType::Long)
        );
        assert_eq!(lub(&program, &JavaType::Null, &integer), integer);
    }
}
