//! Unified model builder.
//!
//! [`Program::materialize`] turns the authoritative index record for a name
//! into a [`TypeInfo`] at most once per session. Member signatures are built
//! eagerly; supertypes stay [`TypeRef`](jinspect_api::models::TypeRef)
//! placeholders until the resolver links them, and bodies are built on
//! request.

pub(crate) mod body;
pub(crate) mod bytecode;
pub(crate) mod locals;
pub(crate) mod source;
pub(crate) mod synthetic;

use crate::error::{CoreError, Result};
use crate::index::{Record, SourceRecord};
use crate::model::{Nesting, TypeInfo};
use crate::program::Program;
use jinspect_api::models::{DiagnosticKind, TypeId, TypeKind};
use jinspect_bytecode::{ClassFile, DecodeOptions};
use source::SourceType;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

thread_local! {
    /// Binary names whose `TypeInfo` this thread is building right now.
    static BUILDING: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

struct BuildingGuard(String);

impl BuildingGuard {
    fn enter(name: &str) -> Option<Self> {
        BUILDING
            .with(|b| b.borrow_mut().insert(name.to_string()))
            .then(|| BuildingGuard(name.to_string()))
    }
}

impl Drop for BuildingGuard {
    fn drop(&mut self) {
        BUILDING.with(|b| {
            b.borrow_mut().remove(&self.0);
        });
    }
}

impl Program {
    /// The `TypeInfo` id for a canonical or binary name, built on first use.
    /// `None` when the name is unknown or its record cannot be built.
    pub fn materialize(&self, name: &str) -> Option<TypeId> {
        self.try_materialize(name).ok()
    }

    pub fn try_materialize(&self, name: &str) -> Result<TypeId> {
        if let Some(id) = self.arena.id_of(name) {
            if self.arena.info(id).is_some() {
                return Ok(id);
            }
        }
        let (binary, record) = self
            .index
            .lookup(name)
            .ok_or_else(|| CoreError::UnknownType(name.to_string()))?;
        if let Some(reason) = self.index.failure(&binary) {
            return Err(CoreError::Undecodable {
                class: binary,
                reason,
            });
        }
        let slot = self.arena.reserve(&binary);
        if slot.info.get().is_some() {
            return Ok(slot.id);
        }
        // Re-entrant request for a type this thread is already building: hand
        // out the in-progress slot.
        let Some(_guard) = BuildingGuard::enter(&binary) else {
            return Ok(slot.id);
        };
        let built = slot
            .info
            .get_or_try_init(|| self.build(slot.id, &binary, record).map(Arc::new));
        match built {
            Ok(_) => Ok(slot.id),
            Err(e) => {
                let kind = match &e {
                    CoreError::Decode(_) => DiagnosticKind::DecodeFailure,
                    _ => DiagnosticKind::ClasspathError,
                };
                warn!(class = %binary, error = %e, "type could not be built");
                self.index.mark_undecodable(&binary, e.to_string());
                self.diagnostics.emit(kind, &binary, e.to_string(), None);
                Err(e)
            }
        }
    }

    fn build(&self, id: TypeId, binary: &str, record: Record) -> Result<TypeInfo> {
        match record {
            Record::Source(src) => self.build_source(id, binary, &src),
            Record::Bytecode(rec) => {
                let bytes = rec.entry.read(&rec.class_path)?;
                let options = DecodeOptions {
                    max_major_version: self.config.max_major_version,
                };
                let class = ClassFile::decode_with(&bytes, &options)?;
                if class.binary_name() != binary {
                    return Err(CoreError::InvariantViolation(format!(
                        "{} declares {}",
                        rec.class_path,
                        class.binary_name()
                    )));
                }
                debug!(class = %binary, entry = %rec.entry.name(), "materialized from bytecode");
                Ok(bytecode::build_type(self, id, class, &rec))
            }
        }
    }

    fn build_source(&self, id: TypeId, binary: &str, src: &SourceRecord) -> Result<TypeInfo> {
        let missing = || CoreError::InvariantViolation(format!("no declaration for {binary}"));
        let decl = src.decl().ok_or_else(missing)?;
        let unit = &src.unit;

        // Canonical name and enclosing declaration come from the index path.
        let mut names = Vec::with_capacity(src.path.len());
        let mut parent_kind = None;
        for depth in 1..=src.path.len() {
            let d = unit.decl(&src.path[..depth]).ok_or_else(missing)?;
            if depth < src.path.len() {
                parent_kind = Some(d.kind);
            }
            names.push(d.name.as_str());
        }
        let canonical = unit.qualify(&names.join("."));
        let nesting = match binary.rsplit_once('$') {
            Some((outer, _)) if src.path.len() > 1 => match self.materialize(outer) {
                Some(outer) => Nesting::Member { outer },
                None => Nesting::TopLevel,
            },
            _ => Nesting::TopLevel,
        };
        debug!(class = %binary, unit = %unit.unit, "materialized from source");
        Ok(source::build_type(
            id,
            SourceType {
                unit,
                decl,
                binary: binary.to_string(),
                canonical,
                nesting,
                in_interface: parent_kind.is_some_and(TypeKind::is_interface_like),
                anonymous_super: None,
                local: None,
            },
        ))
    }

    /// Builds a local or anonymous class into its reserved slot.
    pub(crate) fn insert_local(&self, binary: &str, build: impl FnOnce(TypeId) -> TypeInfo) -> TypeId {
        let slot = self.arena.reserve(binary);
        slot.info.get_or_init(|| Arc::new(build(slot.id)));
        slot.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::ClasspathEntry;
    use crate::index::UnitContext;
    use jinspect_java::JavaParser;

    fn program_with(sources: &[(&str, &str)]) -> Program {
        let program = Program::new(Default::default());
        let parser = JavaParser::new().unwrap();
        for (seq, (path, text)) in sources.iter().enumerate() {
            let unit = Arc::new(UnitContext::new(parser.parse(*path, text).unwrap(), seq));
            program.index.register_source(unit, &program.diagnostics);
        }
        program
    }

    #[test]
    fn member_types_know_their_outer() {
        let program = program_with(&[(
            "p/Outer.java",
            "package p; interface Outer { class Inner {} }",
        )]);
        let inner = program.materialize("p.Outer.Inner").unwrap();
        let info = program.info(inner).unwrap();
        assert_eq!(info.name, "p.Outer.Inner");
        assert_eq!(info.binary_name, "p.Outer$Inner");
        let outer = program.materialize("p.Outer").unwrap();
        assert_eq!(info.nesting, Nesting::Member { outer });
        assert!(info.modifiers.contains(jinspect_api::models::Modifiers::STATIC));
        assert_eq!(program.materialize("p.Outer$Inner"), Some(inner));
    }

    #[test]
    fn concurrent_materialize_builds_once() {
        let program = program_with(&[("Foo.java", "package com.example; class Foo { int x; }")]);
        let infos: Vec<Arc<TypeInfo>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    s.spawn(|| {
                        let id = program.materialize("com.example.Foo").unwrap();
                        program.info(id).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(infos.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(program.arena.len(), 1);
    }

    #[test]
    fn undecodable_class_is_reported_once_and_remembered() {
        let program = Program::new(Default::default());
        let entry = ClasspathEntry::memory("broken.jar", [("p/Bad", vec![0xCA, 0xFE, 0xBA])]);
        program.index.register_bytecode_source(0, Arc::new(entry));
        let first = program.try_materialize("p.Bad").unwrap_err();
        assert!(matches!(first, CoreError::Decode(_)));
        assert!(first.to_string().contains("truncated"));
        let second = program.try_materialize("p.Bad").unwrap_err();
        assert!(matches!(second, CoreError::Undecodable { .. }));
        let diags = program.diagnostics.sorted();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::DecodeFailure);
    }

    #[test]
    fn unknown_names_are_not_reserved() {
        let program = Program::new(Default::default());
        assert!(matches!(
            program.try_materialize("no.Such"),
            Err(CoreError::UnknownType(_))
        ));
        assert!(program.arena.is_empty());
    }
}
