use crate::config::SessionConfig;
use crate::diagnostics::Diagnostics;
use crate::index::DeclarationIndex;
use crate::model::{FieldInfo, MethodInfo, TypeArena, TypeInfo, TypeSlot};
use jinspect_api::models::{FieldRef, JavaType, LocalId, MethodRef, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) const OBJECT: &str = "java.lang.Object";
pub(crate) const STRING: &str = "java.lang.String";
pub(crate) const ENUM: &str = "java.lang.Enum";
pub(crate) const RECORD: &str = "java.lang.Record";
pub(crate) const ANNOTATION: &str = "java.lang.annotation.Annotation";
pub(crate) const CLASS: &str = "java.lang.Class";
pub(crate) const THROWABLE: &str = "java.lang.Throwable";
pub(crate) const ITERABLE: &str = "java.lang.Iterable";
pub(crate) const CLONEABLE: &str = "java.lang.Cloneable";
pub(crate) const SERIALIZABLE: &str = "java.io.Serializable";

/// State shared by the builder, the resolver and the read-only model.
///
/// One per session; nothing here is global.
#[derive(Debug)]
pub(crate) struct Program {
    pub config: SessionConfig,
    pub index: DeclarationIndex,
    pub arena: TypeArena,
    pub diagnostics: Diagnostics,
    next_local: AtomicU32,
}

impl Program {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            index: DeclarationIndex::new(),
            arena: TypeArena::new(),
            diagnostics: Diagnostics::new(),
            next_local: AtomicU32::new(0),
        }
    }

    pub fn next_local(&self) -> LocalId {
        LocalId(self.next_local.fetch_add(1, Ordering::Relaxed))
    }

    pub fn slot(&self, id: TypeId) -> Option<Arc<TypeSlot>> {
        self.arena.slot(id)
    }

    pub fn info(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        self.arena.info(id)
    }

    pub fn with_method<R>(&self, m: MethodRef, f: impl FnOnce(&TypeInfo, &MethodInfo) -> R) -> Option<R> {
        let info = self.info(m.owner)?;
        let method = info.method(m.index)?;
        Some(f(&info, method))
    }

    pub fn with_field<R>(&self, r: FieldRef, f: impl FnOnce(&TypeInfo, &FieldInfo) -> R) -> Option<R> {
        let info = self.info(r.owner)?;
        let field = info.field(r.index)?;
        Some(f(&info, field))
    }

    pub fn method_name(&self, m: MethodRef) -> String {
        self.with_method(m, |t, m| format!("{}.{}", t.name, m.name))
            .unwrap_or_else(|| format!("{}#{}", m.owner, m.index))
    }

    /// Class type of a well-known name, or `Unresolved` when the classpath
    /// lacks it.
    pub fn known(&self, name: &str) -> JavaType {
        match self.materialize(name) {
            Some(id) => JavaType::class(id),
            None => JavaType::Unresolved(name.to_string()),
        }
    }

    pub fn known_id(&self, name: &str) -> Option<TypeId> {
        self.materialize(name)
    }

    pub fn object(&self) -> JavaType {
        self.known(OBJECT)
    }

    pub fn is_named(&self, id: TypeId, name: &str) -> bool {
        self.arena
            .slot(id)
            .is_some_and(|s| s.binary_name == name)
    }
}
