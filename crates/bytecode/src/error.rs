use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("invalid class file magic: 0x{0:08x}")]
    BadMagic(u32),
    #[error("unsupported bytecode version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("truncated class file: {structure} at offset {offset} needs {needed} more byte(s)")]
    Truncated {
        structure: &'static str,
        offset: usize,
        needed: usize,
    },
    #[error("{count} trailing byte(s) after {structure}")]
    TrailingBytes { structure: &'static str, count: usize },
    #[error("invalid constant pool index #{0}")]
    BadConstantIndex(u16),
    #[error("invalid constant pool tag {tag} at #{index}")]
    BadConstantTag { index: u16, tag: u8 },
    #[error("constant pool entry #{index} is {found}, expected {expected}")]
    ConstantKindMismatch {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed constant pool entry #{index}: {reason}")]
    MalformedConstant { index: u16, reason: String },
    #[error("malformed modified UTF-8 in constant #{0}")]
    BadModifiedUtf8(u16),
    #[error("invalid descriptor `{0}`")]
    InvalidDescriptor(String),
    #[error("invalid signature `{0}`")]
    InvalidSignature(String),
    #[error("malformed {attribute} attribute: {reason}")]
    MalformedAttribute {
        attribute: &'static str,
        reason: String,
    },
    #[error("invalid instruction at offset {offset}: {reason}")]
    InvalidCode { offset: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
