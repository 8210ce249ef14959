//! Member signatures and the flattened inherited view.

use super::generics::{self, erase_with};
use super::names::{TypeScope, method_vars};
use super::{Stage, StageGuard};
use crate::model::{FieldSig, Members, MethodSig, TypeInfo, TypeParamSig};
use crate::program::{OBJECT, Program};
use jinspect_api::models::{
    FieldRef, JavaType, MethodKind, MethodRef, Modifiers, TypeId, TypeParamOwner, TypeVar,
};
use std::collections::HashSet;
use std::sync::Arc;

impl Program {
    /// Resolved own members plus the inherited view.
    pub(crate) fn members(&self, id: TypeId) -> Arc<Members> {
        let Some(slot) = self.slot(id) else {
            return Arc::default();
        };
        if let Some(members) = slot.members.get() {
            return Arc::clone(members);
        }
        let Some(info) = slot.info.get() else {
            return Arc::default();
        };
        let Some(_guard) = StageGuard::enter(Stage::Members, id) else {
            // Asked for while flattening itself: own signatures only.
            return Arc::new(own_members(self, info));
        };
        let computed = Arc::new(flatten(self, info, own_members(self, info)));
        Arc::clone(slot.members.get_or_init(|| computed))
    }

    pub(crate) fn method_sig(&self, m: MethodRef) -> Option<MethodSig> {
        self.members(m.owner).methods.get(m.index as usize).cloned()
    }

    pub(crate) fn field_sig(&self, f: FieldRef) -> Option<FieldSig> {
        self.members(f.owner).fields.get(f.index as usize).cloned()
    }
}

fn own_members(program: &Program, info: &TypeInfo) -> Members {
    let type_scope = TypeScope::for_type(program, info);
    let methods = info
        .methods
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mref = info.method_ref(i);
            let mut scope = type_scope.clone();
            scope.push_vars(method_vars(mref, m));
            let at = m.location.as_ref().or(info.location.as_ref());
            let type_params = m
                .type_params
                .iter()
                .enumerate()
                .map(|(k, p)| {
                    let bounds: Vec<JavaType> = p.bounds.iter().map(|b| scope.resolve(b, at)).collect();
                    TypeParamSig {
                        var: TypeVar {
                            owner: TypeParamOwner::Method(mref),
                            index: k as u16,
                            name: p.name.clone(),
                        },
                        bounds: if bounds.is_empty() {
                            vec![program.object()]
                        } else {
                            bounds
                        },
                    }
                })
                .collect();
            MethodSig {
                method: mref,
                type_params,
                params: m.params.iter().map(|p| scope.resolve(&p.ty, at)).collect(),
                return_type: scope.resolve(&m.return_type, at),
                throws: m.throws.iter().map(|t| scope.resolve(t, at)).collect(),
                annotations: m.annotations.iter().map(|a| scope.resolve(&a.name, at)).collect(),
                varargs: m.varargs,
                is_static: m.is_static(),
            }
        })
        .collect();
    let fields = info
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let at = f.location.as_ref().or(info.location.as_ref());
            FieldSig {
                field: info.field_ref(i),
                ty: type_scope.resolve(&f.ty, at),
                annotations: f.annotations.iter().map(|a| type_scope.resolve(&a.name, at)).collect(),
                is_static: f.modifiers.contains(Modifiers::STATIC),
            }
        })
        .collect();
    Members {
        methods,
        fields,
        all_methods: (0..info.methods.len()).map(|i| info.method_ref(i)).collect(),
        all_fields: (0..info.fields.len()).map(|i| info.field_ref(i)).collect(),
        overrides: vec![],
    }
}

type Key = (String, Vec<JavaType>);

/// Name plus erased parameter types: two methods with equal keys override
/// one another.
fn key(program: &Program, name: &str, params: &[JavaType], own: &[MethodSig]) -> Key {
    let local = |v: &TypeVar| match v.owner {
        TypeParamOwner::Method(m) => own
            .iter()
            .find(|s| s.method == m)
            .and_then(|s| s.type_params.get(v.index as usize))
            .map(|p| p.bounds.clone()),
        TypeParamOwner::Type(_) => None,
    };
    (
        name.to_string(),
        params.iter().map(|p| erase_with(program, p, &local)).collect(),
    )
}

fn inheritable(program: &Program, m: MethodRef) -> bool {
    program
        .with_method(m, |owner, mi| {
            mi.kind == MethodKind::Method
                && !mi.modifiers.contains(Modifiers::PRIVATE)
                && !(owner.is_interface() && mi.is_static())
        })
        .unwrap_or(false)
}

fn flatten(program: &Program, info: &TypeInfo, mut members: Members) -> Members {
    let header = program.header(info.id);
    let own: Vec<(u32, Key)> = members
        .methods
        .iter()
        .filter(|s| {
            info.method(s.method.index)
                .is_some_and(|m| m.kind == MethodKind::Method)
        })
        .map(|s| {
            let name = info
                .method(s.method.index)
                .map(|m| m.name.as_str())
                .unwrap_or_default();
            (s.method.index, key(program, name, &s.params, &members.methods))
        })
        .collect();
    let mut seen: HashSet<Key> = own.iter().map(|(_, k)| k.clone()).collect();
    let mut field_names: HashSet<String> = info.fields.iter().map(|f| f.name.clone()).collect();

    for sup in header.supertypes() {
        let Some(sid) = sup.class_id() else {
            continue;
        };
        let inherited = program.members(sid);
        for &m in &inherited.all_methods {
            if !inheritable(program, m) {
                continue;
            }
            let Some(sig) = program.method_sig(m) else {
                continue;
            };
            let seen_as = generics::view(program, sup, m.owner).method(program, &sig);
            let Some(name) = program.with_method(m, |_, mi| mi.name.clone()) else {
                continue;
            };
            let k = key(program, &name, &seen_as.params, &[]);
            if let Some((index, _)) = own.iter().find(|(_, ok)| *ok == k) {
                if !members.overrides.contains(&(*index, m)) {
                    members.overrides.push((*index, m));
                }
            } else if seen.insert(k) {
                members.all_methods.push(m);
            }
        }
        for &f in &inherited.all_fields {
            let visible = program
                .with_field(f, |_, fi| {
                    (!fi.modifiers.contains(Modifiers::PRIVATE)).then(|| fi.name.clone())
                })
                .flatten();
            if let Some(name) = visible {
                if field_names.insert(name) {
                    members.all_fields.push(f);
                }
            }
        }
    }
    members
}

/// Every method named `name` a receiver of type `id` can call, most derived
/// first. Interfaces also see `Object`'s public methods.
pub(crate) fn methods_named(program: &Program, id: TypeId, name: &str) -> Vec<MethodRef> {
    let mut out: Vec<MethodRef> = program
        .members(id)
        .all_methods
        .iter()
        .copied()
        .filter(|m| program.with_method(*m, |_, mi| mi.name == name).unwrap_or(false))
        .collect();
    let interface = program.info(id).is_some_and(|i| i.is_interface());
    if interface {
        if let Some(object) = program.known_id(OBJECT) {
            let object_members = program.members(object);
            out.extend(object_members.all_methods.iter().copied().filter(|m| {
                program
                    .with_method(*m, |_, mi| {
                        mi.name == name
                            && mi.kind == MethodKind::Method
                            && mi.modifiers.contains(Modifiers::PUBLIC)
                    })
                    .unwrap_or(false)
            }));
        }
    }
    out
}

/// Constructors declared by `id`.
pub(crate) fn constructors(program: &Program, id: TypeId) -> Vec<MethodRef> {
    program
        .info(id)
        .map(|info| {
            info.methods
                .iter()
                .enumerate()
                .filter(|(_, m)| m.kind == MethodKind::Constructor)
                .map(|(i, _)| info.method_ref(i))
                .collect()
        })
        .unwrap_or_default()
}

/// The field named `name` visible through `id`: own first, then inherited.
pub(crate) fn find_field(program: &Program, id: TypeId, name: &str) -> Option<FieldRef> {
    program
        .members(id)
        .all_fields
        .iter()
        .copied()
        .find(|f| program.with_field(*f, |_, fi| fi.name == name).unwrap_or(false))
}

/// A member type named `name` declared in or inherited by `id`.
pub(crate) fn member_type(program: &Program, id: TypeId, name: &str) -> Option<TypeId> {
    member_type_in(program, id, name, &mut HashSet::new())
}

fn member_type_in(program: &Program, id: TypeId, name: &str, seen: &mut HashSet<TypeId>) -> Option<TypeId> {
    if !seen.insert(id) {
        return None;
    }
    let info = program.info(id)?;
    if info.member_types.iter().any(|m| m == name) {
        if let Some(found) = program.materialize(&format!("{}${name}", info.binary_name)) {
            return Some(found);
        }
    }
    program
        .declared_supertypes(id)
        .iter()
        .filter_map(JavaType::class_id)
        .find_map(|sup| member_type_in(program, sup, name, seen))
}

/// The single abstract method of a functional interface type, viewed through
/// that type's arguments.
pub(crate) fn functional_method(program: &Program, ty: &JavaType) -> Option<MethodSig> {
    let id = ty.class_id()?;
    let info = program.info(id)?;
    if !info.is_interface() {
        return None;
    }
    let object = program.known_id(OBJECT);
    let mut found: Option<(Key, MethodSig)> = None;
    for &m in &program.members(id).all_methods {
        let Some((name, is_abstract)) = program.with_method(m, |_, mi| (mi.name.clone(), mi.is_abstract())) else {
            continue;
        };
        if !is_abstract {
            continue;
        }
        let Some(sig) = program.method_sig(m) else {
            continue;
        };
        let k = key(program, &name, &sig.params, &[]);
        // Abstract redeclarations of Object's public methods do not count.
        let from_object = object.is_some_and(|o| {
            methods_named(program, o, &name)
                .iter()
                .filter_map(|om| program.method_sig(*om))
                .any(|os| key(program, &name, &os.params, &[]) == k)
        });
        if from_object {
            continue;
        }
        match &found {
            Some((fk, _)) if *fk == k => {}
            Some(_) => return None,
            None => {
                let seen_as = generics::view(program, ty, m.owner).method(program, &sig);
                found = Some((k, seen_as));
            }
        }
    }
    found.map(|(_, sig)| sig)
}

/// Applies the receiver's view to a member's signature.
pub(crate) fn method_as_seen(program: &Program, receiver: &JavaType, m: MethodRef) -> Option<MethodSig> {
    let sig = program.method_sig(m)?;
    if sig.is_static {
        return Some(sig);
    }
    Some(generics::view(program, receiver, m.owner).method(program, &sig))
}

pub(crate) fn field_as_seen(program: &Program, receiver: &JavaType, f: FieldRef) -> Option<JavaType> {
    let sig = program.field_sig(f)?;
    if sig.is_static {
        return Some(sig.ty);
    }
    Some(generics::view(program, receiver, f.owner).apply(program, &sig.ty))
}
