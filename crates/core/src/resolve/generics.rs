//! Type-variable substitution, supertype views, erasure and inference.

use super::subtyping;
use crate::model::{Header, MethodSig, TypeParamSig};
use crate::program::{CLONEABLE, OBJECT, Program, SERIALIZABLE};
use jinspect_api::models::{JavaType, TypeId, TypeParamOwner, TypeVar};
use std::collections::HashSet;

/// A mapping from type variables to types.
///
/// Applying the same substitution to the same type always yields an equal
/// type, so parameterized types compare structurally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: Vec<(TypeVar, JavaType)>,
    /// Variables not bound here erase instead of staying free (raw receivers).
    erase_rest: bool,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the type parameters of `header` to `args`. With no arguments the
    /// parameters are left free; with a different count they are ignored.
    pub fn for_type(header: &Header, args: &[JavaType]) -> Self {
        let mut s = Self::new();
        if header.type_params.len() == args.len() {
            for (p, a) in header.type_params.iter().zip(args) {
                s.bind(p.var.clone(), a.clone());
            }
        }
        s
    }

    pub fn bind(&mut self, var: TypeVar, ty: JavaType) {
        match self.bindings.iter_mut().find(|(v, _)| *v == var) {
            Some(slot) => slot.1 = ty,
            None => self.bindings.push((var, ty)),
        }
    }

    pub fn get(&self, var: &TypeVar) -> Option<&JavaType> {
        self.bindings.iter().find(|(v, _)| v == var).map(|(_, t)| t)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && !self.erase_rest
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&TypeVar, &JavaType)> {
        self.bindings.iter().map(|(v, t)| (v, t))
    }

    pub fn apply(&self, ty: &JavaType) -> JavaType {
        match ty {
            JavaType::TypeVar(v) => match self.get(v) {
                Some(t) => t.clone(),
                None => ty.clone(),
            },
            JavaType::Class { id, args } => JavaType::Class {
                id: *id,
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            JavaType::Array(e) => JavaType::Array(Box::new(self.apply(e))),
            JavaType::Wildcard { bound, upper } => JavaType::Wildcard {
                bound: bound.as_ref().map(|b| Box::new(self.apply(b))),
                upper: *upper,
            },
            _ => ty.clone(),
        }
    }
}

/// How members of a generic type appear through a particular receiver type.
#[derive(Debug, Clone)]
pub(crate) enum View {
    Subst(Substitution),
    /// Raw receiver: member signatures erase.
    Raw,
}

impl View {
    pub fn apply(&self, program: &Program, ty: &JavaType) -> JavaType {
        match self {
            View::Subst(s) => s.apply(ty),
            View::Raw => erase(program, ty),
        }
    }

    pub fn method(&self, program: &Program, sig: &MethodSig) -> MethodSig {
        // A raw view leaves a generic method's own variables generic.
        if let View::Raw = self {
            return MethodSig {
                params: sig.params.iter().map(|p| erase_class_vars(program, p)).collect(),
                return_type: erase_class_vars(program, &sig.return_type),
                throws: sig.throws.iter().map(|t| erase_class_vars(program, t)).collect(),
                ..sig.clone()
            };
        }
        MethodSig {
            params: sig.params.iter().map(|p| self.apply(program, p)).collect(),
            return_type: self.apply(program, &sig.return_type),
            throws: sig.throws.iter().map(|t| self.apply(program, t)).collect(),
            type_params: sig
                .type_params
                .iter()
                .map(|p| TypeParamSig {
                    var: p.var.clone(),
                    bounds: p.bounds.iter().map(|b| self.apply(program, b)).collect(),
                })
                .collect(),
            ..sig.clone()
        }
    }
}

fn erase_class_vars(program: &Program, ty: &JavaType) -> JavaType {
    match ty {
        JavaType::TypeVar(v) if matches!(v.owner, TypeParamOwner::Type(_)) => erase(program, ty),
        JavaType::Class { id, .. } => JavaType::class(*id),
        JavaType::Array(e) => JavaType::Array(Box::new(erase_class_vars(program, e))),
        _ => ty.clone(),
    }
}

/// Replaces wildcard arguments with a usable bound for member access.
fn capture(program: &Program, header: &Header, args: &[JavaType]) -> Vec<JavaType> {
    args.iter()
        .enumerate()
        .map(|(i, a)| match a {
            JavaType::Wildcard {
                bound: Some(b),
                ..
            } => (**b).clone(),
            JavaType::Wildcard { bound: None, .. } => header
                .type_params
                .get(i)
                .and_then(|p| p.bounds.first())
                .map(|b| erase(program, b))
                .unwrap_or_else(|| program.object()),
            other => other.clone(),
        })
        .collect()
}

/// The view of members declared in `owner` as seen through `receiver`.
pub(crate) fn view(program: &Program, receiver: &JavaType, owner: TypeId) -> View {
    let header = program.header(owner);
    if header.type_params.is_empty() {
        return View::Subst(Substitution::new());
    }
    match as_super(program, receiver, owner) {
        Some(JavaType::Class { args, .. }) if args.is_empty() => View::Raw,
        Some(JavaType::Class { args, .. }) => {
            View::Subst(Substitution::for_type(&header, &capture(program, &header, &args)))
        }
        _ => View::Subst(Substitution::new()),
    }
}

/// `ty` viewed as its supertype `target`, with type arguments carried along.
/// A raw type yields a raw supertype.
pub(crate) fn as_super(program: &Program, ty: &JavaType, target: TypeId) -> Option<JavaType> {
    as_super_in(program, ty, target, &mut HashSet::new())
}

fn as_super_in(
    program: &Program,
    ty: &JavaType,
    target: TypeId,
    seen: &mut HashSet<TypeId>,
) -> Option<JavaType> {
    match ty {
        JavaType::Class { id, args } => {
            if *id == target {
                return Some(ty.clone());
            }
            if !seen.insert(*id) {
                return None;
            }
            let header = program.header(*id);
            let raw = args.is_empty() && !header.type_params.is_empty();
            let subst = Substitution::for_type(&header, args);
            header.supertypes().find_map(|sup| {
                let sup = if raw {
                    JavaType::class(sup.class_id()?)
                } else {
                    subst.apply(sup)
                };
                as_super_in(program, &sup, target, seen)
            })
        }
        JavaType::TypeVar(v) => var_bounds(program, v)
            .iter()
            .find_map(|b| as_super_in(program, b, target, seen)),
        JavaType::Wildcard {
            bound: Some(b),
            upper: true,
        } => as_super_in(program, b, target, seen),
        JavaType::Array(_) => {
            let hit = [OBJECT, CLONEABLE, SERIALIZABLE]
                .iter()
                .any(|n| program.is_named(target, n));
            hit.then(|| JavaType::class(target))
        }
        _ => None,
    }
}

/// Declared bounds of a type variable, `[Object]` when unknown.
pub(crate) fn var_bounds(program: &Program, var: &TypeVar) -> Vec<JavaType> {
    let bounds = match var.owner {
        TypeParamOwner::Type(t) => program
            .header(t)
            .type_params
            .get(var.index as usize)
            .map(|p| p.bounds.clone()),
        TypeParamOwner::Method(m) => program
            .members(m.owner)
            .methods
            .get(m.index as usize)
            .and_then(|sig| sig.type_params.get(var.index as usize))
            .map(|p| p.bounds.clone()),
    };
    bounds
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| vec![program.object()])
}

pub(crate) fn erase(program: &Program, ty: &JavaType) -> JavaType {
    erase_with(program, ty, &|_| None)
}

/// Erasure with a hook for variables whose bounds are not stored yet.
pub(crate) fn erase_with(
    program: &Program,
    ty: &JavaType,
    local: &dyn Fn(&TypeVar) -> Option<Vec<JavaType>>,
) -> JavaType {
    erase_in(program, ty, local, &mut Vec::new())
}

fn erase_in(
    program: &Program,
    ty: &JavaType,
    local: &dyn Fn(&TypeVar) -> Option<Vec<JavaType>>,
    visiting: &mut Vec<TypeVar>,
) -> JavaType {
    match ty {
        JavaType::Class { id, .. } => JavaType::class(*id),
        JavaType::Array(e) => JavaType::Array(Box::new(erase_in(program, e, local, visiting))),
        JavaType::TypeVar(v) => {
            if visiting.contains(v) {
                return program.object();
            }
            let bounds = local(v).unwrap_or_else(|| var_bounds(program, v));
            visiting.push(v.clone());
            let erased = bounds
                .first()
                .map(|b| erase_in(program, b, local, visiting))
                .unwrap_or_else(|| program.object());
            visiting.pop();
            erased
        }
        JavaType::Wildcard {
            bound: Some(b),
            upper: true,
        } => erase_in(program, b, local, visiting),
        JavaType::Wildcard { .. } => program.object(),
        _ => ty.clone(),
    }
}

/// Infers a generic method's type arguments from actual argument types and,
/// for variables the arguments leave open, from the assignment target.
/// Variables nothing constrains take the erasure of their first bound.
pub(crate) fn infer(
    program: &Program,
    type_params: &[TypeParamSig],
    params: &[JavaType],
    args: &[Option<JavaType>],
    result: Option<(&JavaType, &JavaType)>,
) -> Substitution {
    let vars: Vec<&TypeVar> = type_params.iter().map(|p| &p.var).collect();
    let mut out = Substitution::new();
    for (p, a) in params.iter().zip(args) {
        if let Some(a) = a {
            unify(program, p, a, &vars, &mut out);
        }
    }
    if let Some((ret, target)) = result {
        let mut from_target = Substitution::new();
        unify(program, ret, target, &vars, &mut from_target);
        for (v, t) in from_target.bindings {
            if out.get(&v).is_none() && !matches!(t, JavaType::Wildcard { .. }) {
                out.bind(v, t);
            }
        }
    }
    for p in type_params {
        if out.get(&p.var).is_none() {
            let bound = p
                .bounds
                .first()
                .map(|b| erase(program, &out.apply(b)))
                .unwrap_or_else(|| program.object());
            out.bind(p.var.clone(), bound);
        }
    }
    out
}

/// Type arguments for `new C<>()` assigned to `target`.
pub(crate) fn diamond(program: &Program, id: TypeId, target: Option<&JavaType>) -> Vec<JavaType> {
    let header = program.header(id);
    let this = header.this_type(id);
    let seen = target.and_then(|t| {
        let sup = as_super(program, &this, t.class_id()?)?;
        Some((sup, t.clone()))
    });
    let subst = match &seen {
        Some((sup, t)) => infer(
            program,
            &header.type_params,
            std::slice::from_ref(sup),
            &[Some(t.clone())],
            None,
        ),
        None => infer(program, &header.type_params, &[], &[], None),
    };
    header
        .type_params
        .iter()
        .map(|p| subst.apply(&JavaType::TypeVar(p.var.clone())))
        .collect()
}

fn unify(program: &Program, param: &JavaType, arg: &JavaType, vars: &[&TypeVar], out: &mut Substitution) {
    match param {
        JavaType::TypeVar(v) if vars.contains(&v) => {
            let arg = match arg {
                JavaType::Null | JavaType::Unresolved(_) | JavaType::Void => return,
                JavaType::Primitive(p) => program.known(p.box_class()),
                JavaType::Wildcard { bound: Some(b), .. } => (**b).clone(),
                JavaType::Wildcard { bound: None, .. } => return,
                other => other.clone(),
            };
            match out.get(v) {
                None => out.bind(v.clone(), arg),
                // Widen to the more general of two candidates.
                Some(prev) if subtyping::is_subtype(program, prev, &arg) => out.bind(v.clone(), arg),
                Some(_) => {}
            }
        }
        JavaType::Class { id, args: pargs } if !pargs.is_empty() => {
            let arg = match arg {
                JavaType::Primitive(p) => program.known(p.box_class()),
                other => other.clone(),
            };
            if let Some(JavaType::Class { args: aargs, .. }) = as_super(program, &arg, *id) {
                if aargs.len() == pargs.len() {
                    for (p, a) in pargs.iter().zip(&aargs) {
                        unify(program, p, a, vars, out);
                    }
                }
            }
        }
        JavaType::Array(pe) => {
            if let JavaType::Array(ae) = arg {
                unify(program, pe, ae, vars, out);
            }
        }
        JavaType::Wildcard { bound: Some(b), .. } => {
            let a = match arg {
                JavaType::Wildcard { bound: Some(ab), .. } => ab.as_ref(),
                other => other,
            };
            unify(program, b, a, vars, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn class(program: &Program, name: &str, args: Vec<JavaType>) -> JavaType {
        JavaType::Class {
            id: program.materialize(name).unwrap(),
            args,
        }
    }

    #[test]
    fn as_super_carries_arguments_through_the_hierarchy() {
        let program = testing::program(&[]);
        let string = class(&program, "java.lang.String", vec![]);
        let list = class(&program, "java.util.ArrayList", vec![string.clone()]);
        let iterable = program.materialize("java.lang.Iterable").unwrap();
        assert_eq!(
            as_super(&program, &list, iterable),
            Some(JavaType::Class {
                id: iterable,
                args: vec![string.clone()]
            })
        );
        let raw = class(&program, "java.util.ArrayList", vec![]);
        assert_eq!(as_super(&program, &raw, iterable), Some(JavaType::class(iterable)));
        let comparable = program.materialize("java.lang.Comparable").unwrap();
        assert_eq!(
            as_super(&program, &string, comparable),
            Some(JavaType::Class {
                id: comparable,
                args: vec![string]
            })
        );
    }

    #[test]
    fn identical_substitutions_give_equal_types() {
        let program = testing::program(&[]);
        let list_id = program.materialize("java.util.List").unwrap();
        let header = program.header(list_id);
        let string = class(&program, "java.lang.String", vec![]);
        let a = Substitution::for_type(&header, &[string.clone()]);
        let b = Substitution::for_type(&header, &[string]);
        let this = header.this_type(list_id);
        assert_eq!(a.apply(&this), b.apply(&this));
        assert_eq!(a, b);
    }

    #[test]
    fn erasure_uses_first_bound() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A<T extends Comparable<T>, U> {}",
        )]);
        let a = program.materialize("p.A").unwrap();
        let header = program.header(a);
        let t = JavaType::TypeVar(header.type_params[0].var.clone());
        let u = JavaType::TypeVar(header.type_params[1].var.clone());
        assert_eq!(erase(&program, &t), class(&program, "java.lang.Comparable", vec![]));
        assert_eq!(erase(&program, &u), program.object());
        assert_eq!(
            erase(&program, &JavaType::array(t, 2)),
            JavaType::array(class(&program, "java.lang.Comparable", vec![]), 2)
        );
    }

    #[test]
    fn inference_binds_from_arguments_then_target() {
        let program = testing::program(&[]);
        let list = program.materialize("java.util.List").unwrap();
        let members = program.members(list);
        let of = members
            .methods
            .iter()
            .find(|m| program.with_method(m.method, |_, mi| mi.name == "of").unwrap_or(false))
            .unwrap()
            .clone();
        let string = class(&program, "java.lang.String", vec![]);
        let s = infer(
            &program,
            &of.type_params,
            &[JavaType::array(JavaType::TypeVar(of.type_params[0].var.clone()), 1)],
            &[Some(JavaType::array(string.clone(), 1))],
            None,
        );
        assert_eq!(s.apply(&of.return_type), class(&program, "java.util.List", vec![string.clone()]));

        let target = class(&program, "java.util.List", vec![string.clone()]);
        let s = infer(&program, &of.type_params, &[], &[], Some((&of.return_type, &target)));
        assert_eq!(s.apply(&of.return_type), target);

        let s = infer(&program, &of.type_params, &[], &[], None);
        assert_eq!(s.apply(&of.return_type), class(&program, "java.util.List", vec![program.object()]));
    }
}
