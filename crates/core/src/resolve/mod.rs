//! Symbol and type resolver.
//!
//! Resolution is demand-driven and cached per arena slot, in dependency
//! order: declared supertypes, then the linked [`Header`](crate::model::Header)
//! (cycles cut), then [`Members`](crate::model::Members) (own signatures and
//! the flattened inherited view), then bodies. Each cell is filled at most
//! once; a computation that needs a cell it is itself producing sees an empty
//! stand-in instead of recursing.

pub(crate) mod bytecode;
pub(crate) mod descriptor;
pub(crate) mod expr;
pub mod generics;
pub(crate) mod hierarchy;
pub(crate) mod members;
pub(crate) mod names;
pub(crate) mod overload;
pub(crate) mod subtyping;

use crate::builder::body as lowering;
use crate::model::{Body, BodyOwner, BodySource, DeclContext, TypeInfo};
use crate::program::Program;
use jinspect_api::models::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

pub use generics::Substitution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Stage {
    Declared,
    Header,
    Members,
}

thread_local! {
    static IN_PROGRESS: RefCell<HashSet<(Stage, TypeId)>> = RefCell::new(HashSet::new());
}

/// Marks a cell as being computed on this thread.
pub(crate) struct StageGuard(Stage, TypeId);

impl StageGuard {
    /// `None` when this thread is already computing the cell. The guard is
    /// only built on success; dropping it clears the mark.
    pub(crate) fn enter(stage: Stage, id: TypeId) -> Option<Self> {
        IN_PROGRESS
            .with(|s| s.borrow_mut().insert((stage, id)))
            .then(|| StageGuard(stage, id))
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        IN_PROGRESS.with(|s| {
            s.borrow_mut().remove(&(self.0, self.1));
        });
    }
}

impl Program {
    /// The resolved body of a member, built on first request.
    ///
    /// Members of local and anonymous classes get their bodies from the body
    /// that declares the class. Bytecode bodies are decoded here too.
    pub(crate) fn body(&self, owner: BodyOwner) -> Option<Arc<Body>> {
        let info = self.info(owner.owner_type())?;
        let cell = match owner {
            BodyOwner::Method(m) => &info.method(m.index)?.body,
            BodyOwner::Field(f) => &info.field(f.index)?.body,
        };
        if let Some(body) = cell.get() {
            return Some(Arc::clone(body));
        }
        if let DeclContext::Source {
            local: Some(scope), ..
        } = &info.context
        {
            if let Some(declaring) = scope.owner {
                self.body(declaring);
            }
            return cell.get().cloned();
        }
        cell.get_or_try_init(|| self.build_body(&info, owner).map(Arc::new).ok_or(()))
            .ok()
            .cloned()
    }

    fn build_body(&self, info: &TypeInfo, owner: BodyOwner) -> Option<Body> {
        match &info.context {
            DeclContext::Source { .. } => {
                let lowered = lowering::lower(self, info, owner)?;
                Some(Body::Source(expr::resolve_body(self, info, owner, lowered)))
            }
            DeclContext::Bytecode { class } => {
                let BodyOwner::Method(m) = owner else {
                    return None;
                };
                let BodySource::Code(index) = info.method(m.index)?.source else {
                    return None;
                };
                bytecode::bind_body(self, info, class, index).map(Body::Bytecode)
            }
        }
    }

    /// Every member of `id` that can carry a body.
    pub(crate) fn body_owners(&self, id: TypeId) -> Vec<BodyOwner> {
        let Some(info) = self.info(id) else {
            return vec![];
        };
        let methods = info
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.has_body())
            .map(|(i, _)| BodyOwner::Method(info.method_ref(i)));
        let fields = info
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !matches!(f.init, BodySource::None))
            .map(|(i, _)| BodyOwner::Field(info.field_ref(i)));
        methods.chain(fields).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_refused_reentry_keeps_the_outer_mark() {
        let id = TypeId(7);
        let outer = StageGuard::enter(Stage::Header, id).unwrap();
        assert!(StageGuard::enter(Stage::Header, id).is_none());
        assert!(StageGuard::enter(Stage::Header, id).is_none());
        let other = StageGuard::enter(Stage::Members, id).unwrap();
        drop(other);
        drop(outer);
        assert!(StageGuard::enter(Stage::Header, id).is_some());
    }
}
