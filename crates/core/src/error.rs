use jinspect_bytecode::DecodeError;
use jinspect_java::{ParserError, SyntaxError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    #[error("parser setup failed: {0}")]
    Parser(#[from] ParserError),
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("class {class} not found in {entry}")]
    ClassNotFound { class: String, entry: String },
    #[error("type {0} is not declared by any source unit or classpath entry")]
    UnknownType(String),
    /// A class that failed to decode earlier; the stored reason is reported again.
    #[error("class {class} is undecodable: {reason}")]
    Undecodable { class: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A broken internal guarantee; indicates a defect rather than bad input.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
