use std::sync::Arc;
use thiserror::Error;

/// Failure to turn a compilation unit into a syntax tree.
///
/// Positions are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{unit}:{line}:{column}: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub unit: Arc<str>,
    pub line: usize,
    pub column: usize,
    pub expected: String,
    pub found: String,
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("failed to load the Java grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("invalid query: {0}")]
    Query(#[from] tree_sitter::QueryError),
    #[error("query has no capture @{0}")]
    MissingCapture(&'static str),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
