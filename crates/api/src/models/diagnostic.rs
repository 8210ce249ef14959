use super::symbol::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnresolvedType,
    UnresolvedSymbol,
    UnresolvedMethod,
    NoApplicableMethod,
    AmbiguousMethod,
    MissingSupertype,
    CyclicInheritance,
    DuplicateDeclaration,
    DecodeFailure,
    SyntaxError,
    ClasspathError,
}

impl DiagnosticKind {
    /// Input errors affect a whole class, unit or classpath entry rather than a
    /// single reference.
    pub fn is_input_error(self) -> bool {
        matches!(
            self,
            DiagnosticKind::DecodeFailure
                | DiagnosticKind::SyntaxError
                | DiagnosticKind::ClasspathError
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The name that failed to resolve, or the input that failed to load.
    pub subject: String,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Ordering key: located diagnostics first, by unit and position.
    pub fn sort_key(&self) -> (bool, Option<&SourceLocation>, DiagnosticKind, &str, &str) {
        (
            self.location.is_none(),
            self.location.as_ref(),
            self.kind,
            self.subject.as_str(),
            self.message.as_str(),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {:?}: {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}
