//! Bytecode front: decoded class files to [`TypeInfo`].

use super::synthetic::{CONSTRUCTOR, STATIC_INIT};
use crate::index::BytecodeRecord;
use crate::model::{
    AnnotationUse, BodySource, DeclContext, FieldInfo, MethodInfo, Nesting, Origin, ParamInfo,
    TypeInfo, TypeParamDecl,
};
use crate::program::{OBJECT, Program, RECORD};
use jinspect_api::models::{
    MethodKind, Modifiers, ModuleInfo, OriginKind, PackageGrant, Provides, Requires, TypeId,
    TypeKind, TypeRef,
};
use jinspect_bytecode::{
    Annotations, ClassFile, ClassTypeSignature, FieldEntry, FieldType, MethodEntry,
    ModuleAttribute, ModulePackage, ReturnType,
    TypeArgument, TypeParameter, TypeSignature, access, parse_class_signature,
    parse_field_descriptor, parse_field_signature, parse_method_descriptor,
    parse_method_signature,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn binary_of(internal: &str) -> String {
    internal.replace('/', ".")
}

fn grants(packages: &[ModulePackage]) -> Vec<PackageGrant> {
    packages
        .iter()
        .map(|p| PackageGrant {
            package: binary_of(&p.package),
            to: p.to.clone(),
        })
        .collect()
}

/// The `Module` attribute in the shape source declarations use.
pub(crate) fn module_info(m: &ModuleAttribute) -> ModuleInfo {
    ModuleInfo {
        name: m.name.clone(),
        open: m.is_open(),
        requires: m
            .requires
            .iter()
            .map(|r| Requires {
                module: r.module.clone(),
                transitive: r.flags & access::ACC_TRANSITIVE != 0,
                is_static: r.flags & access::ACC_STATIC_PHASE != 0,
            })
            .collect(),
        exports: grants(&m.exports),
        opens: grants(&m.opens),
        uses: m.uses.iter().map(|u| binary_of(u)).collect(),
        provides: m
            .provides
            .iter()
            .map(|p| Provides {
                service: binary_of(&p.service),
                with: p.with.iter().map(|w| binary_of(w)).collect(),
            })
            .collect(),
    }
}

pub(crate) fn field_type_ref(ft: &FieldType) -> TypeRef {
    match ft {
        FieldType::Base(b) => TypeRef::raw(b.keyword()),
        FieldType::Object(name) => TypeRef::id(binary_of(name)),
        FieldType::Array(component) => field_type_ref(component).array_of(1),
    }
}

pub(crate) fn signature_ref(sig: &TypeSignature) -> TypeRef {
    match sig {
        TypeSignature::Base(b) => TypeRef::raw(b.keyword()),
        TypeSignature::Class(c) => class_signature_ref(c),
        TypeSignature::TypeVariable(name) => TypeRef::Var(name.clone()),
        TypeSignature::Array(component) => signature_ref(component).array_of(1),
    }
}

fn class_signature_ref(c: &ClassTypeSignature) -> TypeRef {
    let base = TypeRef::id(binary_of(&c.internal_name));
    if c.type_arguments.is_empty() {
        return base;
    }
    let args = c
        .type_arguments
        .iter()
        .map(|a| match a {
            TypeArgument::Any => TypeRef::Wildcard {
                bound: None,
                is_upper_bound: true,
            },
            TypeArgument::Exact(t) => signature_ref(t),
            TypeArgument::Extends(t) => TypeRef::Wildcard {
                bound: Some(Box::new(signature_ref(t))),
                is_upper_bound: true,
            },
            TypeArgument::Super(t) => TypeRef::Wildcard {
                bound: Some(Box::new(signature_ref(t))),
                is_upper_bound: false,
            },
        })
        .collect();
    TypeRef::Generic {
        base: Box::new(base),
        args,
    }
}

fn type_params(list: &[TypeParameter]) -> Vec<TypeParamDecl> {
    list.iter()
        .map(|p| TypeParamDecl {
            name: p.name.clone(),
            bounds: p.bounds().map(signature_ref).collect(),
        })
        .collect()
}

fn annotations(list: &Annotations) -> Vec<AnnotationUse> {
    list.iter()
        .filter_map(|a| a.type_internal_name())
        .map(|name| AnnotationUse {
            name: TypeRef::id(binary_of(name)),
        })
        .collect()
}

const SHARED_FLAGS: [(u16, Modifiers); 5] = [
    (access::ACC_PUBLIC, Modifiers::PUBLIC),
    (access::ACC_PRIVATE, Modifiers::PRIVATE),
    (access::ACC_PROTECTED, Modifiers::PROTECTED),
    (access::ACC_STATIC, Modifiers::STATIC),
    (access::ACC_FINAL, Modifiers::FINAL),
];

fn flags(bits: u16, extra: &[(u16, Modifiers)]) -> Modifiers {
    SHARED_FLAGS
        .iter()
        .chain(extra)
        .filter(|(flag, _)| bits & flag != 0)
        .fold(Modifiers::empty(), |acc, (_, m)| acc | *m)
}

fn class_kind(class: &ClassFile) -> TypeKind {
    let bits = class.access_flags;
    if bits & access::ACC_ANNOTATION != 0 {
        TypeKind::Annotation
    } else if bits & access::ACC_INTERFACE != 0 {
        TypeKind::Interface
    } else if bits & access::ACC_ENUM != 0 {
        TypeKind::Enum
    } else if class.super_class.as_deref() == Some("java/lang/Record")
        || class.attributes.record_components.is_some()
    {
        TypeKind::Record
    } else {
        TypeKind::Class
    }
}

/// Names, nesting and modifiers contributed by the `InnerClasses` entry for
/// the class itself. The outer class must be a `$`-prefix of the binary name.
fn nesting(program: &Program, class: &ClassFile, binary: &str) -> (Nesting, String, String, u16) {
    let top_level = || {
        let simple = binary.rsplit('.').next().unwrap_or(binary).to_string();
        (Nesting::TopLevel, binary.to_string(), simple, class.access_flags)
    };
    let Some(own) = class.own_inner_class_entry() else {
        return top_level();
    };
    let declared_outer = own.outer_class.as_deref().or_else(|| {
        class
            .attributes
            .enclosing_method
            .as_ref()
            .map(|e| e.class.as_str())
    });
    let Some(outer_binary) = declared_outer.map(binary_of) else {
        return top_level();
    };
    if !binary.starts_with(&format!("{outer_binary}$")) {
        return top_level();
    }
    let Some(outer) = program.materialize(&outer_binary) else {
        return top_level();
    };
    let outer_name = program
        .info(outer)
        .map(|i| i.name.clone())
        .unwrap_or_else(|| outer_binary.clone());
    let bits = own.access_flags;
    match (&own.outer_class, &own.inner_name) {
        (Some(_), Some(name)) => (
            Nesting::Member { outer },
            format!("{outer_name}.{name}"),
            name.clone(),
            bits,
        ),
        (None, Some(name)) => (Nesting::Local { outer }, binary.to_string(), name.clone(), bits),
        (_, None) => (Nesting::Anonymous { outer }, binary.to_string(), String::new(), bits),
    }
}

pub(crate) fn build_type(program: &Program, id: TypeId, class: ClassFile, record: &BytecodeRecord) -> TypeInfo {
    let binary = class.binary_name();
    let kind = class_kind(&class);
    let (nesting, name, simple_name, access_bits) = nesting(program, &class, &binary);
    let mut modifiers = flags(access_bits, &[(access::ACC_ABSTRACT, Modifiers::ABSTRACT)]);
    if kind.is_interface_like() {
        modifiers.insert(Modifiers::ABSTRACT);
    }

    let signature = class
        .attributes
        .signature
        .as_deref()
        .and_then(|s| match parse_class_signature(s) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(class = %binary, error = %e, "ignoring malformed class signature");
                None
            }
        });
    let (type_params, mut superclass, interfaces) = match &signature {
        Some(sig) => (
            type_params(&sig.type_parameters),
            Some(class_signature_ref(&sig.superclass)),
            sig.interfaces.iter().map(class_signature_ref).collect(),
        ),
        None => (
            vec![],
            class.super_class.as_deref().map(|s| TypeRef::id(binary_of(s))),
            class
                .interfaces
                .iter()
                .map(|i| TypeRef::id(binary_of(i)))
                .collect(),
        ),
    };
    if kind.is_interface_like() || binary == OBJECT {
        superclass = None;
    }

    let is_inner_member = matches!(nesting, Nesting::Member { .. })
        && !modifiers.contains(Modifiers::STATIC)
        && !kind.is_interface_like();
    let fields = class
        .fields
        .iter()
        .filter(|f| f.access_flags & access::ACC_SYNTHETIC == 0)
        .map(|f| field(&binary, f))
        .collect();
    let methods = class
        .methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.access_flags & (access::ACC_SYNTHETIC | access::ACC_BRIDGE) == 0)
        .map(|(i, m)| method(&binary, &class, kind, is_inner_member, i, m))
        .collect();
    let member_types = class
        .attributes
        .inner_classes
        .iter()
        .filter(|ic| ic.outer_class.as_deref() == Some(class.this_class.as_str()))
        .filter_map(|ic| ic.inner_name.clone())
        .collect();
    let package = binary
        .rsplit_once('.')
        .map(|(p, _)| p.to_string())
        .unwrap_or_default();

    TypeInfo {
        id,
        name,
        binary_name: binary.clone(),
        simple_name,
        package,
        kind,
        modifiers,
        origin: Origin::Bytecode {
            class: binary,
            entry: record.entry.name(),
        },
        nesting,
        type_params,
        superclass,
        interfaces,
        permits: class
            .attributes
            .permitted_subclasses
            .iter()
            .map(|p| TypeRef::id(binary_of(p)))
            .collect(),
        annotations: annotations(&class.attributes.annotations),
        fields,
        methods,
        member_types,
        location: None,
        context: DeclContext::Bytecode {
            class: Arc::new(class),
        },
    }
}

fn field(owner: &str, f: &FieldEntry) -> FieldInfo {
    let from_signature = f.signature.as_deref().and_then(|s| match parse_field_signature(s) {
        Ok(sig) => Some(signature_ref(&sig)),
        Err(e) => {
            warn!(class = %owner, field = %f.name, error = %e, "ignoring malformed field signature");
            None
        }
    });
    let ty = from_signature
        .or_else(|| parse_field_descriptor(&f.descriptor).ok().map(|t| field_type_ref(&t)))
        .unwrap_or(TypeRef::Unknown);
    FieldInfo {
        name: f.name.clone(),
        modifiers: flags(
            f.access_flags,
            &[
                (access::ACC_VOLATILE, Modifiers::VOLATILE),
                (access::ACC_TRANSIENT, Modifiers::TRANSIENT),
            ],
        ),
        origin: OriginKind::Bytecode,
        ty,
        annotations: annotations(&f.annotations),
        constant: f.constant_value.clone(),
        is_enum_constant: f.access_flags & access::ACC_ENUM != 0,
        location: None,
        init: BodySource::None,
        body: OnceCell::new(),
    }
}

fn exceptions(m: &MethodEntry) -> Vec<TypeRef> {
    m.exceptions.iter().map(|e| TypeRef::id(binary_of(e))).collect()
}

fn method(
    owner: &str,
    class: &ClassFile,
    kind: TypeKind,
    is_inner_member: bool,
    index: usize,
    m: &MethodEntry,
) -> MethodInfo {
    let method_kind = match m.name.as_str() {
        CONSTRUCTOR => MethodKind::Constructor,
        STATIC_INIT => MethodKind::Initializer,
        _ => MethodKind::Method,
    };
    let descriptor = parse_method_descriptor(&m.descriptor).ok();
    let signature = m.signature.as_deref().and_then(|s| match parse_method_signature(s) {
        Ok(sig) => Some(sig),
        Err(e) => {
            warn!(class = %owner, method = %m.name, error = %e, "ignoring malformed method signature");
            None
        }
    });

    let descriptor_params: Vec<TypeRef> = descriptor
        .as_ref()
        .map(|d| d.params.iter().map(field_type_ref).collect())
        .unwrap_or_default();
    let (param_types, type_params, return_type, throws) = match &signature {
        Some(sig) => (
            sig.parameters.iter().map(signature_ref).collect::<Vec<_>>(),
            type_params(&sig.type_parameters),
            sig.return_type
                .as_ref()
                .map(signature_ref)
                .unwrap_or_else(|| TypeRef::raw("void")),
            // javac writes `^` throws only when a thrown type is generic.
            if sig.throws.is_empty() {
                exceptions(m)
            } else {
                sig.throws.iter().map(signature_ref).collect()
            },
        ),
        None => {
            let return_type = match descriptor.as_ref().map(|d| &d.return_type) {
                Some(ReturnType::Type(t)) => field_type_ref(t),
                Some(ReturnType::Void) => TypeRef::raw("void"),
                None => TypeRef::Unknown,
            };
            (
                descriptor_params.clone(),
                vec![],
                return_type,
                exceptions(m),
            )
        }
    };

    // Implicit leading constructor parameters: the outer instance of an inner
    // class, the name and ordinal of an enum constant.
    let mut skip = descriptor_params.len().saturating_sub(param_types.len());
    let mut param_types = param_types;
    if method_kind == MethodKind::Constructor && signature.is_none() {
        let outer = class
            .own_inner_class_entry()
            .and_then(|ic| ic.outer_class.as_deref())
            .map(binary_of);
        if is_inner_member && param_types.first() == outer.map(TypeRef::Id).as_ref() {
            skip = 1;
        } else if kind == TypeKind::Enum
            && param_types.len() >= 2
            && param_types[0] == TypeRef::id("java.lang.String")
            && param_types[1] == TypeRef::raw("int")
        {
            skip = 2;
        }
        param_types.drain(..skip.min(param_types.len()));
    }

    let params = param_types
        .into_iter()
        .enumerate()
        .map(|(i, ty)| {
            let name = m
                .parameters
                .get(i + skip)
                .and_then(|p| p.name.clone())
                .unwrap_or_else(|| format!("arg{i}"));
            ParamInfo {
                name,
                ty,
                modifiers: Modifiers::empty(),
                annotations: vec![],
            }
        })
        .collect();

    let mut modifiers = flags(
        m.access_flags,
        &[
            (access::ACC_SYNCHRONIZED, Modifiers::SYNCHRONIZED),
            (access::ACC_NATIVE, Modifiers::NATIVE),
            (access::ACC_ABSTRACT, Modifiers::ABSTRACT),
            (access::ACC_STRICT, Modifiers::STRICTFP),
        ],
    );
    if kind.is_interface_like()
        && method_kind == MethodKind::Method
        && !modifiers.contains(Modifiers::ABSTRACT)
        && !modifiers.contains(Modifiers::STATIC)
        && !modifiers.contains(Modifiers::PRIVATE)
    {
        modifiers.insert(Modifiers::DEFAULT);
    }

    MethodInfo {
        name: m.name.clone(),
        kind: method_kind,
        modifiers,
        origin: OriginKind::Bytecode,
        type_params,
        params,
        varargs: m.access_flags & access::ACC_VARARGS != 0,
        return_type,
        throws,
        annotations: annotations(&m.annotations),
        descriptor: Some(m.descriptor.clone()),
        location: None,
        source: if m.code.is_some() {
            BodySource::Code(index)
        } else {
            BodySource::None
        },
        body: OnceCell::new(),
    }
}
