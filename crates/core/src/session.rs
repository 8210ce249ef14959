//! One analysis session: inputs in, resolved [`CodeModel`] out.
//!
//! Registration calls may come from several threads. Classpath positions and
//! source sequence numbers are handed out in call order, and the index ranks
//! records by them, so the outcome does not depend on which worker finishes
//! first.

use crate::classpath::ClasspathEntry;
use crate::config::SessionConfig;
use crate::error::{CoreError, Result};
use crate::index::{RegistrationReport, UnitContext};
use crate::inspect::CodeModel;
use crate::model::{Body, BodyOwner, Origin};
use crate::program::Program;
use crate::resolve::hierarchy::link_all;
use ignore::WalkBuilder;
use jinspect_api::models::{Diagnostic, DiagnosticKind, MethodRef, Range, SourceLocation, TypeId};
use jinspect_java::{JavaParser, SyntaxError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

pub struct Session {
    program: Arc<Program>,
    parser: JavaParser,
    pool: rayon::ThreadPool,
    next_entry: AtomicUsize,
    next_unit: AtomicUsize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("jinspect-{i}"))
            .build()?;
        Ok(Self {
            program: Arc::new(Program::new(config)),
            parser: JavaParser::new()?,
            pool,
            next_entry: AtomicUsize::new(0),
            next_unit: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.program.config
    }

    /// Appends one entry to the classpath. An unreadable entry is reported as
    /// a diagnostic and contributes nothing.
    pub fn add_classpath_entry(&self, entry: ClasspathEntry) -> RegistrationReport {
        let position = self.next_entry.fetch_add(1, Ordering::SeqCst);
        self.register_entry(position, entry)
    }

    /// Appends entries in order; they are scanned in parallel.
    pub fn add_classpath(&self, entries: impl IntoIterator<Item = ClasspathEntry>) -> Vec<RegistrationReport> {
        let positioned: Vec<(usize, ClasspathEntry)> = entries
            .into_iter()
            .map(|e| (self.next_entry.fetch_add(1, Ordering::SeqCst), e))
            .collect();
        self.pool.install(|| {
            positioned
                .into_par_iter()
                .map(|(position, entry)| self.register_entry(position, entry))
                .collect()
        })
    }

    fn register_entry(&self, position: usize, entry: ClasspathEntry) -> RegistrationReport {
        let report = self.program.index.register_bytecode_source(position, Arc::new(entry));
        for error in &report.errors {
            self.program.diagnostics.emit(
                DiagnosticKind::ClasspathError,
                report.entry.clone(),
                format!("cannot read classpath entry {}: {error}", report.entry),
                None,
            );
        }
        report
    }

    /// Parses and registers one compilation unit. Returns the binary names it
    /// declares; a syntax error is also recorded as a diagnostic.
    pub fn add_source(&self, unit: impl Into<Arc<str>>, text: &str) -> Result<Vec<String>> {
        let seq = self.next_unit.fetch_add(1, Ordering::SeqCst);
        self.register_unit(seq, unit.into(), text)
    }

    /// Registers many units in parallel. Units that fail to parse are
    /// reported and skipped.
    pub fn add_sources<U: Into<Arc<str>>>(&self, units: impl IntoIterator<Item = (U, String)>) -> Vec<String> {
        let sequenced: Vec<(usize, Arc<str>, String)> = units
            .into_iter()
            .map(|(u, text)| (self.next_unit.fetch_add(1, Ordering::SeqCst), u.into(), text))
            .collect();
        let mut names: Vec<String> = self.pool.install(|| {
            sequenced
                .into_par_iter()
                .flat_map_iter(|(seq, unit, text)| self.register_unit(seq, unit, &text).unwrap_or_default())
                .collect()
        });
        names.sort();
        names
    }

    /// Registers every `*.java` file under `root`, honoring ignore files.
    pub fn add_source_dir(&self, root: &Path) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source root {} is not a directory", root.display()),
            )));
        }
        let mut paths: Vec<PathBuf> = WalkBuilder::new(root)
            .build()
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                (path.is_file() && path.extension().is_some_and(|e| e == "java")).then(|| path.to_path_buf())
            })
            .collect();
        paths.sort();
        debug!(root = %root.display(), files = paths.len(), "collected source files");

        let units: Vec<(String, String)> = paths
            .iter()
            .filter_map(|path| match std::fs::read_to_string(path) {
                Ok(text) => Some((path.display().to_string(), text)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable source file");
                    self.program.diagnostics.emit(
                        DiagnosticKind::SyntaxError,
                        path.display().to_string(),
                        format!("cannot read {}: {e}", path.display()),
                        None,
                    );
                    None
                }
            })
            .collect();
        Ok(self.add_sources(units))
    }

    fn register_unit(&self, seq: usize, unit: Arc<str>, text: &str) -> Result<Vec<String>> {
        match self.parser.parse(Arc::clone(&unit), text) {
            Ok(ast) => {
                let context = Arc::new(UnitContext::new(ast, seq));
                Ok(self.program.index.register_source(context, &self.program.diagnostics))
            }
            Err(e) => {
                warn!(unit = %unit, error = %e, "syntax error");
                self.report_syntax_error(&e);
                Err(CoreError::Syntax(e))
            }
        }
    }

    fn report_syntax_error(&self, e: &SyntaxError) {
        let line = e.line.saturating_sub(1);
        let column = e.column.saturating_sub(1);
        let at = SourceLocation::new(Arc::clone(&e.unit), Range::new(line, column, line, column));
        self.program.diagnostics.emit(
            DiagnosticKind::SyntaxError,
            e.unit.to_string(),
            format!("expected {}, found {}", e.expected, e.found),
            Some(at),
        );
    }

    /// The `TypeInfo` for a name, built on first request.
    pub fn materialize(&self, name: &str) -> Result<TypeId> {
        self.program.try_materialize(name)
    }

    /// The body of a method, decoding bytecode if the method came from a
    /// class file.
    pub fn materialize_body(&self, method: MethodRef) -> Option<Arc<Body>> {
        self.program.body(BodyOwner::Method(method))
    }

    /// Resolves every source-declared type and hands out the read-only model.
    ///
    /// Hierarchy linking runs first over the whole reachable graph; members
    /// and bodies are then resolved per type in parallel. Running it again
    /// only picks up types registered since.
    pub fn resolve(&self) -> CodeModel {
        let program = &self.program;
        let roots: Vec<TypeId> = self.pool.install(|| {
            program
                .index
                .source_names()
                .par_iter()
                .filter_map(|name| match program.try_materialize(name) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(name = %name, error = %e, "cannot build source type");
                        None
                    }
                })
                .collect()
        });
        info!(types = roots.len(), "resolving");

        let order = link_all(program, roots.iter().copied());
        debug!(linked = order.len(), "hierarchy linked");

        self.pool.install(|| {
            order.par_iter().for_each(|id| {
                program.members(*id);
            });
            let owners: Vec<BodyOwner> = roots.iter().flat_map(|id| program.body_owners(*id)).collect();
            owners.par_iter().for_each(|owner| {
                program.body(*owner);
            });
            if program.config.decode_bytecode_bodies {
                let decoded: Vec<BodyOwner> = program
                    .arena
                    .built()
                    .iter()
                    .filter(|info| matches!(info.origin, Origin::Bytecode { .. }))
                    .flat_map(|info| program.body_owners(info.id))
                    .collect();
                debug!(bodies = decoded.len(), "decoding bytecode bodies");
                decoded.par_iter().for_each(|owner| {
                    program.body(*owner);
                });
            }
        });

        info!(
            types = roots.len(),
            built = program.arena.len(),
            diagnostics = program.diagnostics.len(),
            "resolution complete"
        );
        CodeModel::new(Arc::clone(&self.program), roots)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.program.diagnostics.sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn session() -> Session {
        let session = Session::new(SessionConfig::default()).unwrap();
        session.add_classpath_entry(ClasspathEntry::memory("jdk", testing::mini_jdk()));
        session
    }

    #[test]
    fn syntax_errors_are_reported_and_other_units_continue() {
        let s = session();
        let names = s.add_sources([
            ("p/Bad.java", "package p; class Bad { void f( }".to_string()),
            ("p/Good.java", "package p; class Good { int f() { return 1; } }".to_string()),
        ]);
        assert_eq!(names, vec!["p.Good".to_string()]);
        let model = s.resolve();
        assert!(model.find_type("p.Good").is_some());
        let diagnostics = model.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::SyntaxError);
        assert_eq!(diagnostics[0].subject, "p/Bad.java");
    }

    #[test]
    fn unreadable_classpath_entries_become_diagnostics() {
        let s = session();
        let dir = tempfile::tempdir().unwrap();
        let report = s.add_classpath_entry(ClasspathEntry::from_path(dir.path().join("missing.jar")));
        assert_eq!(report.registered, 0);
        assert_eq!(report.errors.len(), 1);
        let diagnostics = s.diagnostics();
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ClasspathError);
    }

    #[test]
    fn bytecode_bodies_are_decoded_on_request_only() {
        let s = session();
        s.add_classpath_entry(ClasspathEntry::memory("lib", [testing::class_with_code()]));
        s.add_source("p/Use.java", "package p; class Use { void go() { lib.Calls.run(); } }").unwrap();
        let model = s.resolve();
        assert!(s.diagnostics().is_empty());

        let calls = s.materialize("lib.Calls").unwrap();
        let run = model.type_view(calls).unwrap().methods()[0].id();
        let body = s.materialize_body(run).unwrap();
        assert!(body.as_bytecode().is_some());
        assert_eq!(s.diagnostics().len(), 1);
    }
}
