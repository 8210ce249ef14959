use dashmap::DashSet;
use jinspect_api::models::{Diagnostic, DiagnosticKind, SourceLocation};
use tracing::debug;

/// Session-wide, deduplicating diagnostic sink.
///
/// Lazily resolved nodes may report the same problem more than once (two
/// threads racing on a cell, repeated lookups of a missing name); identical
/// diagnostics collapse to one.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: DashSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        if self.items.insert(diagnostic.clone()) {
            debug!(kind = ?diagnostic.kind, subject = %diagnostic.subject, "{}", diagnostic.message);
        }
    }

    pub fn emit(
        &self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) {
        self.report(Diagnostic::new(kind, subject, message).at(location));
    }

    /// Snapshot sorted by location.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut all: Vec<Diagnostic> = self.items.iter().map(|d| d.clone()).collect();
        all.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        all
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinspect_api::models::Range;
    use std::sync::Arc;

    #[test]
    fn duplicates_collapse_and_located_entries_sort_first() {
        let sink = Diagnostics::new();
        let loc = |line| Some(SourceLocation::new(Arc::from("A.java"), Range::new(line, 0, line, 1)));
        sink.emit(DiagnosticKind::ClasspathError, "lib.jar", "unreadable", None);
        sink.emit(DiagnosticKind::UnresolvedType, "Foo", "cannot find Foo", loc(7));
        sink.emit(DiagnosticKind::UnresolvedType, "Bar", "cannot find Bar", loc(2));
        sink.emit(DiagnosticKind::UnresolvedType, "Foo", "cannot find Foo", loc(7));
        let subjects: Vec<_> = sink.sorted().into_iter().map(|d| d.subject).collect();
        assert_eq!(subjects, vec!["Bar", "Foo", "lib.jar"]);
    }
}
