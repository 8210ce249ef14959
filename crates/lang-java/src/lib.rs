//! Java source front.
//!
//! [`JavaParser`] turns one compilation unit into the owned tree of
//! [`ast`]. Parsing is purely syntactic: names stay as written and are bound
//! later by the resolver.

pub mod ast;
pub mod error;
mod parser;

pub use error::{ParserError, Result, SyntaxError};
pub use parser::JavaParser;
