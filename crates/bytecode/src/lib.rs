//! Java class-file decoding.
//!
//! [`ClassFile::decode`] parses a complete class file into owned data: the
//! validated constant pool, member tables and the attributes used for
//! modelling. Method bodies stay as raw `Code` bytes until [`decode_code`]
//! is called on them.

pub mod annotation;
pub mod classfile;
pub mod code;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
mod reader;
pub mod signature;
pub mod writer;

pub use annotation::{Annotation, ConstValue, ElementValue};
pub use classfile::{
    Annotations, ClassAttributes, ClassFile, ConstantValue, DecodeOptions, EnclosingMethod,
    FieldEntry, InnerClassInfo, MethodEntry, MethodParameter, ModuleAttribute, ModulePackage,
    ModuleProvides, ModuleRequires, RawAttribute, RecordComponent, access,
};
pub use code::{Code, ExceptionHandler, Instruction, Operand, decode_code, opcodes};
pub use constant_pool::{Constant, ConstantPool, LoadableConstant, MemberRef, MemberRefKind};
pub use descriptor::{
    BaseType, FieldType, MethodDescriptor, ReturnType, parse_field_descriptor,
    parse_method_descriptor,
};
pub use error::{DecodeError, Result};
pub use signature::{
    ClassSignature, ClassTypeSignature, MethodSignature, TypeArgument, TypeParameter,
    TypeSignature, parse_class_signature, parse_field_signature, parse_method_signature,
};
pub use writer::{ClassFileBuilder, PoolBuilder, code_attribute};
