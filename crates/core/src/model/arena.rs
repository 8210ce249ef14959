use super::{Header, Members, TypeInfo};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jinspect_api::models::{JavaType, TypeId};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// One arena cell per binary name.
///
/// The slot exists before its [`TypeInfo`] does, so references to a type can
/// be taken while it is still being built. Every derived cell is filled at
/// most once.
#[derive(Debug)]
pub struct TypeSlot {
    pub id: TypeId,
    pub binary_name: String,
    pub(crate) info: OnceCell<Arc<TypeInfo>>,
    /// Declared direct supertypes, resolved but not yet checked for cycles.
    pub(crate) declared: OnceCell<Arc<Vec<JavaType>>>,
    pub(crate) header: OnceCell<Arc<Header>>,
    pub(crate) members: OnceCell<Arc<Members>>,
}

impl TypeSlot {
    fn new(id: TypeId, binary_name: String) -> Self {
        Self {
            id,
            binary_name,
            info: OnceCell::new(),
            declared: OnceCell::new(),
            header: OnceCell::new(),
            members: OnceCell::new(),
        }
    }

    pub fn info(&self) -> Option<&Arc<TypeInfo>> {
        self.info.get()
    }
}

#[derive(Debug, Default)]
pub struct TypeArena {
    by_name: DashMap<String, TypeId>,
    slots: DashMap<TypeId, Arc<TypeSlot>>,
    next: AtomicU32,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `binary_name`, reserving an empty one on first use.
    pub fn reserve(&self, binary_name: &str) -> Arc<TypeSlot> {
        if let Some(id) = self.by_name.get(binary_name).map(|r| *r) {
            if let Some(slot) = self.slot(id) {
                return slot;
            }
        }
        let id = match self.by_name.entry(binary_name.to_string()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let id = TypeId(self.next.fetch_add(1, Ordering::Relaxed));
                self.slots
                    .insert(id, Arc::new(TypeSlot::new(id, binary_name.to_string())));
                e.insert(id);
                id
            }
        };
        // The slot is inserted before the name is published, so it exists here.
        self.slots
            .get(&id)
            .map(|s| Arc::clone(&s))
            .unwrap_or_else(|| Arc::new(TypeSlot::new(id, binary_name.to_string())))
    }

    pub fn slot(&self, id: TypeId) -> Option<Arc<TypeSlot>> {
        self.slots.get(&id).map(|s| Arc::clone(&s))
    }

    pub fn id_of(&self, binary_name: &str) -> Option<TypeId> {
        self.by_name.get(binary_name).map(|r| *r)
    }

    pub fn info(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        self.slot(id).and_then(|s| s.info.get().cloned())
    }

    /// Every slot whose `TypeInfo` has been built, ordered by id.
    pub fn built(&self) -> Vec<Arc<TypeInfo>> {
        let mut out: Vec<Arc<TypeInfo>> = self
            .slots
            .iter()
            .filter_map(|s| s.info.get().cloned())
            .collect();
        out.sort_by_key(|t| t.id);
        out
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reserve_is_idempotent() {
        let arena = TypeArena::new();
        let a = arena.reserve("p.A");
        let b = arena.reserve("p.B");
        assert_ne!(a.id, b.id);
        assert!(Arc::ptr_eq(&a, &arena.reserve("p.A")));
        assert_eq!(arena.id_of("p.B"), Some(b.id));
        assert!(a.info().is_none());
    }

    #[test]
    fn concurrent_reservations_share_one_slot() {
        let arena = TypeArena::new();
        let ids: HashSet<TypeId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| arena.reserve("com.example.Foo").id))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(ids.len(), 1);
        assert_eq!(arena.len(), 1);
    }
}
