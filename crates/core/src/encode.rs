//! Re-encoding of resolved declarations as class files.
//!
//! Only the declaration shape is written: access flags, supertypes, generic
//! signatures, member descriptors, thrown types, constant values and
//! annotation types. Method bodies and initializer blocks are left out, so
//! the output decodes back to the same shape but is not loadable by a JVM.

use crate::error::{CoreError, Result};
use crate::inspect::CodeModel;
use crate::model::{MethodInfo, TypeInfo};
use crate::program::Program;
use crate::resolve::descriptor::{
    class_signature, field_descriptor, field_signature, internal_name, method_descriptor,
    method_signature,
};
use jinspect_api::models::{JavaType, MethodKind, Modifiers, TypeId, TypeKind};
use jinspect_bytecode::access::*;
use jinspect_bytecode::{Annotation, ClassFileBuilder, FieldEntry, InnerClassInfo, MethodEntry};
use tracing::debug;

const MEMBER_FLAGS: [(Modifiers, u16); 5] = [
    (Modifiers::PUBLIC, ACC_PUBLIC),
    (Modifiers::PRIVATE, ACC_PRIVATE),
    (Modifiers::PROTECTED, ACC_PROTECTED),
    (Modifiers::STATIC, ACC_STATIC),
    (Modifiers::FINAL, ACC_FINAL),
];

fn access_bits(modifiers: Modifiers, extra: &[(Modifiers, u16)]) -> u16 {
    MEMBER_FLAGS
        .iter()
        .chain(extra)
        .filter(|(m, _)| modifiers.contains(*m))
        .fold(0, |acc, (_, bit)| acc | bit)
}

fn class_bits(info: &TypeInfo) -> u16 {
    let mut bits = access_bits(info.modifiers, &[(Modifiers::ABSTRACT, ACC_ABSTRACT)]);
    // Private, protected and static only exist on the InnerClasses entry.
    bits &= !(ACC_PRIVATE | ACC_PROTECTED | ACC_STATIC);
    match info.kind {
        TypeKind::Interface => bits | ACC_INTERFACE | ACC_ABSTRACT,
        TypeKind::Annotation => bits | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
        TypeKind::Enum => bits | ACC_SUPER | ACC_ENUM,
        TypeKind::Class | TypeKind::Record => bits | ACC_SUPER,
    }
}

fn method_bits(method: &MethodInfo) -> u16 {
    let mut bits = access_bits(
        method.modifiers,
        &[
            (Modifiers::ABSTRACT, ACC_ABSTRACT),
            (Modifiers::SYNCHRONIZED, ACC_SYNCHRONIZED),
            (Modifiers::NATIVE, ACC_NATIVE),
            (Modifiers::STRICTFP, ACC_STRICT),
        ],
    );
    if method.varargs {
        bits |= ACC_VARARGS;
    }
    bits
}

fn annotations(program: &Program, types: &[JavaType]) -> Vec<Annotation> {
    types
        .iter()
        .filter(|t| t.class_id().is_some())
        .map(|t| Annotation {
            type_descriptor: field_descriptor(program, t),
            elements: vec![],
        })
        .collect()
}

fn class_name(program: &Program, ty: &JavaType) -> Option<String> {
    ty.class_id().map(|id| internal_name(program, id))
}

pub(crate) fn encode(program: &Program, id: TypeId) -> Result<Vec<u8>> {
    let info = program
        .info(id)
        .ok_or_else(|| CoreError::UnknownType(id.to_string()))?;
    let header = program.header(id);
    let members = program.members(id);
    let this_class = internal_name(program, id);

    let superclass = if info.is_interface() {
        Some("java/lang/Object".to_string())
    } else {
        header.superclass.as_ref().and_then(|s| class_name(program, s))
    };
    let mut builder = ClassFileBuilder::new(&this_class)
        .access(class_bits(&info))
        .super_class(superclass.as_deref());
    for i in &header.interfaces {
        if let Some(name) = class_name(program, i) {
            builder = builder.interface(&name);
        }
    }
    if let Some(signature) = class_signature(program, &header) {
        builder = builder.signature(&signature);
    }
    if let Some(unit) = info.unit() {
        let file = unit.rsplit('/').next().unwrap_or(unit);
        builder = builder.source_file(file);
    }
    for annotation in annotations(program, &header.annotations) {
        builder = builder.annotation(annotation, true);
    }
    if let Some(outer) = info.nesting.outer() {
        if !info.simple_name.is_empty() && matches!(info.nesting, crate::model::Nesting::Member { .. }) {
            builder = builder.inner_class(InnerClassInfo {
                inner_class: this_class.clone(),
                outer_class: Some(internal_name(program, outer)),
                inner_name: Some(info.simple_name.clone()),
                access_flags: access_bits(info.modifiers, &[(Modifiers::ABSTRACT, ACC_ABSTRACT)])
                    | (class_bits(&info) & (ACC_INTERFACE | ACC_ANNOTATION | ACC_ENUM)),
            });
        }
    }

    for (field, sig) in info.fields.iter().zip(&members.fields) {
        let mut bits = access_bits(
            field.modifiers,
            &[
                (Modifiers::VOLATILE, ACC_VOLATILE),
                (Modifiers::TRANSIENT, ACC_TRANSIENT),
            ],
        );
        if field.is_enum_constant {
            bits |= ACC_ENUM;
        }
        let mut entry = FieldEntry::new(bits, &field.name, &field_descriptor(program, &sig.ty));
        if let Some(signature) = field_signature(program, &sig.ty) {
            entry = entry.with_signature(&signature);
        }
        entry.constant_value = field.constant.clone();
        entry.annotations.visible = annotations(program, &sig.annotations);
        builder = builder.field(entry);
    }

    for (method, sig) in info.methods.iter().zip(&members.methods) {
        if method.kind == MethodKind::Initializer {
            continue;
        }
        let descriptor = method
            .descriptor
            .clone()
            .unwrap_or_else(|| method_descriptor(program, sig));
        let mut entry = MethodEntry::new(method_bits(method), &method.name, &descriptor);
        if let Some(signature) = method_signature(program, sig) {
            entry = entry.with_signature(&signature);
        }
        entry.exceptions = sig.throws.iter().filter_map(|t| class_name(program, t)).collect();
        entry.annotations.visible = annotations(program, &sig.annotations);
        builder = builder.method(entry);
    }

    let bytes = builder.build();
    debug!(class = %info.name, size = bytes.len(), "encoded declaration");
    Ok(bytes)
}

impl CodeModel {
    /// Class-file bytes carrying the resolved declaration shape of `id`.
    pub fn encode_type(&self, id: TypeId) -> Result<Vec<u8>> {
        encode(self.program(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::ClasspathEntry;
    use crate::config::SessionConfig;
    use crate::testing;
    use jinspect_api::CodeInspector;
    use jinspect_bytecode::ClassFile;
    use std::sync::Arc;

    const SHAPE: &str = "package p; import java.util.List; \
        public abstract class Shape<T extends Comparable<T>> implements Comparable<Shape<T>>, java.io.Serializable { \
          public static final int SIDES = 4; protected transient List<T> tags; \
          public abstract double area(); \
          public static <E extends Comparable<E>> E max(List<E> xs) throws java.io.IOException { return null; } \
          protected void tag(String... names) {} \
          static { } }";

    #[test]
    fn encoded_declarations_decode_to_the_same_shape() {
        let program = Arc::new(testing::program(&[("p/Shape.java", SHAPE)]));
        let id = program.materialize("p.Shape").unwrap();
        let model = CodeModel::new(Arc::clone(&program), vec![id]);
        let bytes = model.encode_type(id).unwrap();

        let class = ClassFile::decode(&bytes).unwrap();
        assert_eq!(class.this_class, "p/Shape");
        assert_eq!(class.attributes.source_file.as_deref(), Some("Shape.java"));
        assert!(class.find_method("<clinit>", "()V").is_none());
        let max = class
            .find_method("max", "(Ljava/util/List;)Ljava/lang/Comparable;")
            .unwrap();
        assert_eq!(max.exceptions, vec!["java/io/IOException".to_string()]);

        let reread = Program::new(SessionConfig::default());
        reread
            .index
            .register_bytecode_source(0, Arc::new(ClasspathEntry::memory("jdk", testing::mini_jdk())));
        reread
            .index
            .register_bytecode_source(1, Arc::new(ClasspathEntry::memory("encoded", [("p/Shape", bytes)])));
        let reread_id = reread.materialize("p.Shape").unwrap();
        let reread = CodeModel::new(Arc::new(reread), vec![reread_id]);

        let before = model.type_summary(id).unwrap();
        let after = reread.type_summary(reread_id).unwrap();
        assert_eq!(after.fqn, before.fqn);
        assert_eq!(after.kind, before.kind);
        assert_eq!(after.modifiers, before.modifiers);
        assert_eq!(after.type_parameters, before.type_parameters);
        assert_eq!(after.superclass, before.superclass);
        assert_eq!(after.interfaces, before.interfaces);
        let shape = |s: &jinspect_api::TypeSummary| {
            let fields: Vec<_> = s.fields.iter().map(|f| (f.name.clone(), f.ty.clone(), f.modifiers.clone())).collect();
            let methods: Vec<_> = s
                .methods
                .iter()
                .filter(|m| m.kind != MethodKind::Initializer)
                .map(|m| (m.signature.clone(), m.modifiers.clone()))
                .collect();
            (fields, methods)
        };
        assert_eq!(shape(&after), shape(&before));
    }
}
