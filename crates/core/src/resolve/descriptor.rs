//! JVM descriptors and generic signatures of resolved types.

use super::generics::erase;
use crate::model::{Header, MethodSig, TypeParamSig};
use crate::program::Program;
use jinspect_api::models::{JavaType, TypeId};

/// `p/Outer$Inner` for a materialized type.
pub(crate) fn internal_name(program: &Program, id: TypeId) -> String {
    program
        .slot(id)
        .map(|s| s.binary_name.replace('.', "/"))
        .unwrap_or_else(|| "java/lang/Object".to_string())
}

fn is_interface(program: &Program, ty: &JavaType) -> bool {
    ty.class_id()
        .and_then(|id| program.info(id))
        .is_some_and(|i| i.is_interface())
}

/// Erased field descriptor. Unresolved names keep their spelling so that the
/// descriptor still says what the source meant.
pub(crate) fn field_descriptor(program: &Program, ty: &JavaType) -> String {
    match erase(program, ty) {
        JavaType::Primitive(p) => p.descriptor().to_string(),
        JavaType::Void => "V".to_string(),
        JavaType::Class { id, .. } => format!("L{};", internal_name(program, id)),
        JavaType::Array(e) => format!("[{}", field_descriptor(program, &e)),
        JavaType::Unresolved(name) if !name.is_empty() => format!("L{};", name.replace('.', "/")),
        _ => "Ljava/lang/Object;".to_string(),
    }
}

pub(crate) fn method_descriptor(program: &Program, sig: &MethodSig) -> String {
    let params: String = sig.params.iter().map(|p| field_descriptor(program, p)).collect();
    format!("({params}){}", field_descriptor(program, &sig.return_type))
}

/// Generic signature of a type use.
pub(crate) fn type_signature(program: &Program, ty: &JavaType) -> String {
    match ty {
        JavaType::Class { id, args } if !args.is_empty() => {
            let args: String = args.iter().map(|a| type_signature(program, a)).collect();
            format!("L{}<{args}>;", internal_name(program, *id))
        }
        JavaType::TypeVar(v) => format!("T{};", v.name),
        JavaType::Wildcard { bound: None, .. } => "*".to_string(),
        JavaType::Wildcard {
            bound: Some(b),
            upper,
        } => format!("{}{}", if *upper { '+' } else { '-' }, type_signature(program, b)),
        JavaType::Array(e) => format!("[{}", type_signature(program, e)),
        other => field_descriptor(program, other),
    }
}

fn is_generic(ty: &JavaType) -> bool {
    match ty {
        JavaType::Class { args, .. } => !args.is_empty(),
        JavaType::TypeVar(_) | JavaType::Wildcard { .. } => true,
        JavaType::Array(e) => is_generic(e),
        _ => false,
    }
}

fn type_params_signature(program: &Program, params: &[TypeParamSig]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut out = String::from("<");
    for p in params {
        out.push_str(&p.var.name);
        for (i, b) in p.bounds.iter().enumerate() {
            // An interface first bound leaves the class bound empty: `T::Ljava/lang/Runnable;`.
            if i == 0 && is_interface(program, b) {
                out.push(':');
            }
            out.push(':');
            out.push_str(&type_signature(program, b));
        }
    }
    out.push('>');
    out
}

/// `Signature` attribute of a class, or `None` when nothing in its header is
/// generic.
pub(crate) fn class_signature(program: &Program, header: &Header) -> Option<String> {
    let generic = !header.type_params.is_empty()
        || header.superclass.iter().chain(&header.interfaces).any(is_generic);
    if !generic {
        return None;
    }
    let superclass = header
        .superclass
        .as_ref()
        .map(|s| type_signature(program, s))
        .unwrap_or_else(|| "Ljava/lang/Object;".to_string());
    let interfaces: String = header.interfaces.iter().map(|i| type_signature(program, i)).collect();
    Some(format!(
        "{}{superclass}{interfaces}",
        type_params_signature(program, &header.type_params)
    ))
}

/// `Signature` attribute of a method, or `None` when the erased descriptor
/// says everything.
pub(crate) fn method_signature(program: &Program, sig: &MethodSig) -> Option<String> {
    let generic = !sig.type_params.is_empty()
        || sig.params.iter().any(is_generic)
        || is_generic(&sig.return_type)
        || sig.throws.iter().any(is_generic);
    if !generic {
        return None;
    }
    let params: String = sig.params.iter().map(|p| type_signature(program, p)).collect();
    let throws: String = if sig.throws.iter().any(is_generic) {
        sig.throws
            .iter()
            .map(|t| format!("^{}", type_signature(program, t)))
            .collect()
    } else {
        String::new()
    };
    Some(format!(
        "{}({params}){}{throws}",
        type_params_signature(program, &sig.type_params),
        type_signature(program, &sig.return_type)
    ))
}

/// Field `Signature` attribute, if the field's type is generic.
pub(crate) fn field_signature(program: &Program, ty: &JavaType) -> Option<String> {
    is_generic(ty).then(|| type_signature(program, ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn method(program: &Program, class: &str, name: &str) -> MethodSig {
        let id = program.materialize(class).unwrap();
        let info = program.info(id).unwrap();
        let index = info.methods.iter().position(|m| m.name == name).unwrap();
        program.method_sig(info.method_ref(index)).unwrap()
    }

    #[test]
    fn source_methods_get_erased_descriptors_and_signatures() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.*; class A<T extends Runnable> { <E extends Comparable<E>> List<E> sort(E[] xs, int n, T t) { return null; } void plain(String s, long[] l) {} }",
        )]);
        let sort = method(&program, "p.A", "sort");
        assert_eq!(
            method_descriptor(&program, &sort),
            "([Ljava/lang/Comparable;ILjava/lang/Runnable;)Ljava/util/List;"
        );
        assert_eq!(
            method_signature(&program, &sort).as_deref(),
            Some("<E::Ljava/lang/Comparable<TE;>;>([TE;ITT;)Ljava/util/List<TE;>;")
        );
        let plain = method(&program, "p.A", "plain");
        assert_eq!(method_descriptor(&program, &plain), "(Ljava/lang/String;[J)V");
        assert_eq!(method_signature(&program, &plain), None);

        let a = program.materialize("p.A").unwrap();
        assert_eq!(
            class_signature(&program, &program.header(a)).as_deref(),
            Some("<T::Ljava/lang/Runnable;>Ljava/lang/Object;")
        );
    }
}
