//! Declaration index: which raw record defines each type name.
//!
//! Records are keyed by binary name (`p.Outer$Inner`). A source record always
//! wins over bytecode; among bytecode candidates the lowest classpath position
//! wins. Both rules depend only on the inputs, never on registration order, so
//! concurrent registration is deterministic. Module declarations are ranked
//! the same way, keyed by module name.

use crate::builder::bytecode::module_info;
use crate::classpath::{ClasspathEntry, MODULE_INFO, binary_name_of};
use crate::diagnostics::Diagnostics;
use dashmap::{DashMap, DashSet};
use jinspect_api::models::{DiagnosticKind, ModuleInfo, Range, SourceLocation};
use jinspect_bytecode::ClassFile;
use jinspect_java::ast::{CompilationUnit, Import, MemberDecl, TypeDecl};
use lasso::{Spur, ThreadedRodeo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A parsed compilation unit shared by every type it declares.
#[derive(Debug)]
pub struct UnitContext {
    pub unit: Arc<str>,
    /// Empty for the default package.
    pub package: String,
    pub imports: Vec<Import>,
    /// Position in source registration order; lower wins on duplicates.
    pub seq: usize,
    pub ast: CompilationUnit,
    /// Binary names of local and anonymous classes, keyed by declaration range.
    pub(crate) local_names: HashMap<Range, String>,
}

impl UnitContext {
    pub(crate) fn new(ast: CompilationUnit, seq: usize) -> Self {
        let local_names = crate::builder::locals::assign_local_names(&ast);
        Self {
            unit: Arc::clone(&ast.unit),
            package: ast.package.clone().unwrap_or_default(),
            imports: ast.imports.clone(),
            seq,
            ast,
            local_names,
        }
    }

    /// Follows a path of indices: into `ast.types` first, then into `members`.
    pub fn decl(&self, path: &[usize]) -> Option<&TypeDecl> {
        let (first, rest) = path.split_first()?;
        let mut decl = self.ast.types.get(*first)?;
        for i in rest {
            decl = match decl.members.get(*i)? {
                MemberDecl::Type(t) => t,
                _ => return None,
            };
        }
        Some(decl)
    }

    pub fn location(&self, range: Range) -> SourceLocation {
        SourceLocation::new(Arc::clone(&self.unit), range)
    }

    pub fn qualify(&self, name: &str) -> String {
        if self.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.package, name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub unit: Arc<UnitContext>,
    pub path: Arc<[usize]>,
}

impl SourceRecord {
    pub fn decl(&self) -> Option<&TypeDecl> {
        self.unit.decl(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct BytecodeRecord {
    /// Classpath position; lower wins.
    pub position: usize,
    pub entry: Arc<ClasspathEntry>,
    /// Internal path inside the entry (`p/Outer$Inner.class`).
    pub class_path: String,
}

#[derive(Debug, Clone)]
pub enum Record {
    Source(SourceRecord),
    Bytecode(BytecodeRecord),
}

/// Where a module declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    Source { unit: Arc<str>, seq: usize, range: Range },
    Bytecode { entry: String, position: usize },
}

impl ModuleOrigin {
    /// Sources first by sequence, then classpath entries by position.
    fn rank(&self) -> (u8, usize) {
        match self {
            ModuleOrigin::Source { seq, .. } => (0, *seq),
            ModuleOrigin::Bytecode { position, .. } => (1, *position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub info: ModuleInfo,
    pub origin: ModuleOrigin,
}

#[derive(Debug, Default)]
struct IndexEntry {
    source: Option<SourceRecord>,
    /// Sorted by classpath position.
    bytecode: Vec<BytecodeRecord>,
}

impl IndexEntry {
    fn authoritative(&self) -> Option<Record> {
        if let Some(s) = &self.source {
            return Some(Record::Source(s.clone()));
        }
        self.bytecode.first().cloned().map(Record::Bytecode)
    }
}

/// Outcome of registering one classpath entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub entry: String,
    pub position: usize,
    pub registered: usize,
    /// Names from this entry already defined by a source unit or by an entry
    /// at a lower position. Only records present at registration time count;
    /// [`DeclarationIndex::shadowed`] is the settled view.
    pub shadowed: Vec<String>,
    /// Names this entry took over from an already registered entry at a
    /// higher position.
    pub displaced: Vec<String>,
    /// Name of the module the entry declares in its `module-info.class`.
    pub module: Option<String>,
    pub errors: Vec<String>,
}

/// A non-authoritative record and what it lost to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Shadowed {
    pub name: String,
    pub entry: String,
    /// Unit or classpath entry holding the winning record.
    pub winner: String,
}

#[derive(Debug, Default)]
pub struct DeclarationIndex {
    names: ThreadedRodeo,
    entries: DashMap<Spur, IndexEntry>,
    packages: DashSet<String>,
    failures: DashMap<Spur, String>,
    /// Candidates per module name, best first.
    modules: DashMap<String, Vec<ModuleRecord>>,
}

impl DeclarationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every type declared in `unit`, member types included.
    /// Returns the binary names it registered.
    pub fn register_source(&self, unit: Arc<UnitContext>, diagnostics: &Diagnostics) -> Vec<String> {
        self.add_package(&unit.package);
        if let Some(module) = &unit.ast.module {
            self.insert_module(
                ModuleRecord {
                    info: module.info.clone(),
                    origin: ModuleOrigin::Source {
                        unit: Arc::clone(&unit.unit),
                        seq: unit.seq,
                        range: module.range,
                    },
                },
                Some(diagnostics),
            );
        }
        let mut registered = Vec::new();
        let mut path = Vec::new();
        for (i, decl) in unit.ast.types.iter().enumerate() {
            path.push(i);
            let binary = unit.qualify(&decl.name);
            self.register_decl(&unit, decl, &mut path, binary, diagnostics, &mut registered);
            path.pop();
        }
        debug!(unit = %unit.unit, types = registered.len(), "registered compilation unit");
        registered
    }

    fn register_decl(
        &self,
        unit: &Arc<UnitContext>,
        decl: &TypeDecl,
        path: &mut Vec<usize>,
        binary: String,
        diagnostics: &Diagnostics,
        registered: &mut Vec<String>,
    ) {
        let record = SourceRecord {
            unit: Arc::clone(unit),
            path: Arc::from(path.as_slice()),
        };
        self.insert_source(&binary, record, decl.range, diagnostics);
        for (i, member) in decl.members.iter().enumerate() {
            if let MemberDecl::Type(nested) = member {
                path.push(i);
                let nested_binary = format!("{binary}${}", nested.name);
                self.register_decl(unit, nested, path, nested_binary, diagnostics, registered);
                path.pop();
            }
        }
        registered.push(binary);
    }

    fn insert_source(&self, binary: &str, record: SourceRecord, range: Range, diagnostics: &Diagnostics) {
        let key = self.names.get_or_intern(binary);
        let mut entry = self.entries.entry(key).or_default();
        let existing_seq = entry.source.as_ref().map(|s| s.unit.seq);
        let loser = match existing_seq {
            None => {
                entry.source = Some(record);
                return;
            }
            Some(seq) if seq <= record.unit.seq => record.unit.location(range),
            Some(_) => {
                let previous = entry.source.replace(record);
                previous
                    .as_ref()
                    .and_then(|p| p.decl().map(|d| p.unit.location(d.range)))
                    .unwrap_or_else(|| SourceLocation::new(Arc::from("<unknown>"), Range::default()))
            }
        };
        drop(entry);
        diagnostics.emit(
            DiagnosticKind::DuplicateDeclaration,
            binary,
            format!("duplicate declaration of {binary}"),
            Some(loser),
        );
    }

    /// Registers every class file of `entry` by path, without decoding.
    pub fn register_bytecode_source(&self, position: usize, entry: Arc<ClasspathEntry>) -> RegistrationReport {
        let mut report = RegistrationReport {
            entry: entry.name(),
            position,
            ..Default::default()
        };
        let paths = match entry.class_paths() {
            Ok(p) => p,
            Err(e) => {
                warn!(entry = %report.entry, error = %e, "unreadable classpath entry");
                report.errors.push(e.to_string());
                return report;
            }
        };
        for class_path in paths {
            let binary = binary_name_of(&class_path);
            if let Some((pkg, _)) = binary.rsplit_once('.') {
                self.add_package(pkg);
            }
            let key = self.names.get_or_intern(&binary);
            let mut slot = self.entries.entry(key).or_default();
            let at = slot.bytecode.partition_point(|c| c.position < position);
            if slot.source.is_some() || at > 0 {
                report.shadowed.push(binary.clone());
            } else if !slot.bytecode.is_empty() {
                report.displaced.push(binary.clone());
            }
            slot.bytecode.insert(
                at,
                BytecodeRecord {
                    position,
                    entry: Arc::clone(&entry),
                    class_path,
                },
            );
            report.registered += 1;
        }
        self.register_module_descriptor(position, &entry, &mut report);
        debug!(
            entry = %report.entry,
            registered = report.registered,
            shadowed = report.shadowed.len(),
            "registered classpath entry"
        );
        report
    }

    /// Module descriptors are decoded eagerly; an entry holds at most one.
    fn register_module_descriptor(&self, position: usize, entry: &ClasspathEntry, report: &mut RegistrationReport) {
        let bytes = match entry.module_descriptor() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(e) => {
                report.errors.push(format!("{MODULE_INFO}: {e}"));
                return;
            }
        };
        let module = match ClassFile::decode(&bytes) {
            Ok(class) => class.attributes.module,
            Err(e) => {
                warn!(entry = %report.entry, error = %e, "undecodable module descriptor");
                report.errors.push(format!("{MODULE_INFO}: {e}"));
                return;
            }
        };
        let Some(module) = module else {
            report.errors.push(format!("{MODULE_INFO} has no Module attribute"));
            return;
        };
        debug!(entry = %report.entry, module = %module.name, "registered module descriptor");
        report.module = Some(module.name.clone());
        self.insert_module(
            ModuleRecord {
                info: module_info(&module),
                origin: ModuleOrigin::Bytecode {
                    entry: report.entry.clone(),
                    position,
                },
            },
            None,
        );
    }

    /// Two source units declaring one module is a duplicate, reported at the
    /// unit registered later in sequence.
    fn insert_module(&self, record: ModuleRecord, diagnostics: Option<&Diagnostics>) {
        let name = record.info.name.clone();
        let mut candidates = self.modules.entry(name.clone()).or_default();
        let rival = candidates
            .iter()
            .find(|c| matches!(c.origin, ModuleOrigin::Source { .. }))
            .cloned();
        let at = candidates.partition_point(|c| c.origin.rank() <= record.origin.rank());
        candidates.insert(at, record.clone());
        drop(candidates);

        let (Some(rival), Some(diagnostics)) = (rival, diagnostics) else {
            return;
        };
        let loser = if rival.origin.rank() <= record.origin.rank() { &record } else { &rival };
        if let ModuleOrigin::Source { unit, range, .. } = &loser.origin {
            diagnostics.emit(
                DiagnosticKind::DuplicateDeclaration,
                name.clone(),
                format!("duplicate declaration of module {name}"),
                Some(SourceLocation::new(Arc::clone(unit), *range)),
            );
        }
    }

    /// The winning declaration of every module, sorted by name.
    pub fn modules(&self) -> Vec<ModuleRecord> {
        let mut out: Vec<ModuleRecord> = self
            .modules
            .iter()
            .filter_map(|e| e.value().first().cloned())
            .collect();
        out.sort_by(|a, b| a.info.name.cmp(&b.info.name));
        out
    }

    pub fn module(&self, name: &str) -> Option<ModuleRecord> {
        self.modules.get(name)?.first().cloned()
    }

    fn add_package(&self, package: &str) {
        let mut current = package;
        while !current.is_empty() && self.packages.insert(current.to_string()) {
            match current.rsplit_once('.') {
                Some((parent, _)) => current = parent,
                None => break,
            }
        }
    }

    /// The authoritative record for an exact binary name.
    pub fn get(&self, binary: &str) -> Option<Record> {
        let key = self.names.get(binary)?;
        self.entries.get(&key)?.authoritative()
    }

    /// Looks up a canonical or binary name, returning the binary name found.
    ///
    /// `p.Outer.Inner` is tried as written, then as `p.Outer$Inner`, then as
    /// `p$Outer$Inner`, turning dots into `$` from the right.
    pub fn lookup(&self, name: &str) -> Option<(String, Record)> {
        let mut candidate = name.to_string();
        loop {
            if let Some(record) = self.get(&candidate) {
                return Some((candidate, record));
            }
            let dot = candidate.rfind('.')?;
            candidate.replace_range(dot..dot + 1, "$");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn mark_undecodable(&self, binary: &str, error: String) {
        let key = self.names.get_or_intern(binary);
        self.failures.entry(key).or_insert(error);
    }

    pub fn failure(&self, binary: &str) -> Option<String> {
        let key = self.names.get(binary)?;
        self.failures.get(&key).map(|e| e.clone())
    }

    /// Binary names of every source-defined type, sorted.
    pub fn source_names(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.source.is_some())
            .map(|e| self.names.resolve(e.key()).to_string())
            .collect();
        out.sort();
        out
    }

    /// Every registered binary name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .iter()
            .map(|e| self.names.resolve(e.key()).to_string())
            .collect();
        out.sort();
        out
    }

    /// Every non-authoritative bytecode record, sorted by name then entry.
    pub fn shadowed(&self) -> Vec<Shadowed> {
        let mut out = Vec::new();
        for e in self.entries.iter() {
            let name = self.names.resolve(e.key());
            let (winner, losers) = match &e.source {
                Some(s) => (s.unit.unit.to_string(), &e.bytecode[..]),
                None => match e.bytecode.split_first() {
                    Some((first, rest)) => (first.entry.name(), rest),
                    None => continue,
                },
            };
            for loser in losers {
                out.push(Shadowed {
                    name: name.to_string(),
                    entry: loser.entry.name(),
                    winner: winner.clone(),
                });
            }
        }
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinspect_java::JavaParser;

    fn unit(path: &str, src: &str, seq: usize) -> Arc<UnitContext> {
        let parser = JavaParser::new().unwrap();
        Arc::new(UnitContext::new(parser.parse(path, src).unwrap(), seq))
    }

    fn memory(name: &str, classes: &[&str]) -> Arc<ClasspathEntry> {
        Arc::new(ClasspathEntry::memory(
            name,
            classes.iter().map(|c| (c.to_string(), vec![0xCA, 0xFE])),
        ))
    }

    #[test]
    fn nested_sources_are_found_by_canonical_and_binary_name() {
        let index = DeclarationIndex::new();
        let diags = Diagnostics::new();
        let names = index.register_source(
            unit("p/Outer.java", "package p; class Outer { static class Inner {} }", 0),
            &diags,
        );
        assert_eq!(names, vec!["p.Outer$Inner", "p.Outer"]);
        let (binary, record) = index.lookup("p.Outer.Inner").unwrap();
        assert_eq!(binary, "p.Outer$Inner");
        match record {
            Record::Source(s) => assert_eq!(s.decl().unwrap().name, "Inner"),
            Record::Bytecode(_) => panic!("expected a source record"),
        }
        assert!(index.lookup("p.Outer$Inner").is_some());
        assert!(index.is_package("p"));
        assert!(diags.is_empty());
    }

    #[test]
    fn source_wins_regardless_of_order() {
        let index = DeclarationIndex::new();
        let diags = Diagnostics::new();
        let report = index.register_bytecode_source(0, memory("lib.jar", &["com/foo/Bar"]));
        assert!(report.shadowed.is_empty());
        index.register_source(unit("Bar.java", "package com.foo; class Bar {}", 0), &diags);
        assert!(matches!(index.get("com.foo.Bar"), Some(Record::Source(_))));
        let shadowed = index.shadowed();
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].entry, "lib.jar");
        assert_eq!(shadowed[0].winner, "Bar.java");
        assert!(index.is_package("com"));
    }

    #[test]
    fn lowest_classpath_position_wins() {
        let index = DeclarationIndex::new();
        let second = index.register_bytecode_source(1, memory("b.jar", &["com/foo/Bar"]));
        let first = index.register_bytecode_source(0, memory("a.jar", &["com/foo/Bar"]));
        assert_eq!(second.shadowed, Vec::<String>::new());
        assert_eq!(first.shadowed, Vec::<String>::new());
        assert_eq!(first.displaced, vec!["com.foo.Bar".to_string()]);
        let third = index.register_bytecode_source(2, memory("c.jar", &["com/foo/Bar"]));
        assert_eq!(third.shadowed, vec!["com.foo.Bar".to_string()]);
        assert!(third.displaced.is_empty());
        match index.get("com.foo.Bar") {
            Some(Record::Bytecode(b)) => assert_eq!(b.entry.name(), "a.jar"),
            other => panic!("unexpected {other:?}"),
        }
        let losers: Vec<String> = index.shadowed().into_iter().map(|s| s.entry).collect();
        assert_eq!(losers, vec!["b.jar", "c.jar"]);
    }

    #[test]
    fn duplicate_sources_keep_the_earlier_unit() {
        let index = DeclarationIndex::new();
        let diags = Diagnostics::new();
        index.register_source(unit("B.java", "package p; class A { int b; }", 1), &diags);
        index.register_source(unit("A.java", "package p; class A { int a; }", 0), &diags);
        match index.get("p.A") {
            Some(Record::Source(s)) => assert_eq!(&*s.unit.unit, "A.java"),
            other => panic!("unexpected {other:?}"),
        }
        let reported = diags.sorted();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].kind, DiagnosticKind::DuplicateDeclaration);
        assert_eq!(reported[0].location.as_ref().map(|l| &*l.unit), Some("B.java"));
    }

    #[test]
    fn undecodable_names_are_remembered() {
        let index = DeclarationIndex::new();
        index.register_bytecode_source(0, memory("lib", &["p/Broken"]));
        assert!(index.failure("p.Broken").is_none());
        index.mark_undecodable("p.Broken", "truncated".into());
        index.mark_undecodable("p.Broken", "second".into());
        assert_eq!(index.failure("p.Broken").as_deref(), Some("truncated"));
    }
}
