//! Overload resolution.
//!
//! Candidates are tried in three phases: strict (no boxing, no varargs),
//! loose (boxing and unboxing), then variable arity. The first phase with an
//! applicable candidate wins, and the most specific candidate of that phase is
//! selected.

use super::generics::{self, Substitution};
use super::members::{functional_method, method_as_seen};
use super::subtyping::{compatible, is_subtype};
use crate::model::MethodSig;
use crate::program::Program;
use jinspect_api::models::{JavaType, MethodRef};

/// An argument as overload resolution sees it.
#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Typed(JavaType),
    /// A lambda with this many parameters, or a method reference (`None`).
    /// Its type depends on the parameter it is passed to.
    Functional(Option<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Strict,
    Loose,
    Varargs,
}

#[derive(Debug, Clone)]
pub(crate) struct Applicable {
    pub method: MethodRef,
    /// Signature as seen through the receiver, generic methods instantiated.
    pub sig: MethodSig,
    /// One parameter type per argument, variable arity expanded.
    pub expanded: Vec<JavaType>,
}

#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Found(Applicable),
    NotApplicable,
    Ambiguous(Vec<MethodRef>),
}

pub(crate) struct Call<'a> {
    pub receiver: Option<&'a JavaType>,
    pub args: &'a [Arg],
    pub type_args: &'a [JavaType],
    /// Assignment target, used to infer type arguments the call's own
    /// arguments leave open.
    pub target: Option<&'a JavaType>,
}

pub(crate) fn select(program: &Program, candidates: &[MethodRef], call: &Call<'_>) -> Outcome {
    let sigs: Vec<(MethodRef, MethodSig)> = candidates
        .iter()
        .filter_map(|m| {
            let sig = match call.receiver {
                Some(r) => method_as_seen(program, r, *m),
                None => program.method_sig(*m),
            }?;
            Some((*m, sig))
        })
        .collect();
    for phase in [Phase::Strict, Phase::Loose, Phase::Varargs] {
        let applicable: Vec<Applicable> = sigs
            .iter()
            .filter_map(|(m, sig)| applicable(program, *m, sig, call, phase))
            .collect();
        if !applicable.is_empty() {
            return most_specific(program, applicable);
        }
    }
    Outcome::NotApplicable
}

fn expand(params: &[JavaType], n: usize, varargs: bool) -> Option<Vec<JavaType>> {
    if !varargs {
        return (params.len() == n).then(|| params.to_vec());
    }
    let (last, fixed) = params.split_last()?;
    if n < fixed.len() {
        return None;
    }
    let element = last.component()?.clone();
    let mut out = fixed.to_vec();
    out.resize(n, element);
    Some(out)
}

fn instantiate(sig: &MethodSig, subst: &Substitution) -> MethodSig {
    MethodSig {
        params: sig.params.iter().map(|p| subst.apply(p)).collect(),
        return_type: subst.apply(&sig.return_type),
        throws: sig.throws.iter().map(|t| subst.apply(t)).collect(),
        ..sig.clone()
    }
}

fn applicable(program: &Program, m: MethodRef, sig: &MethodSig, call: &Call<'_>, phase: Phase) -> Option<Applicable> {
    let varargs = phase == Phase::Varargs;
    if varargs && !sig.varargs {
        return None;
    }
    let n = call.args.len();
    let raw_expanded = expand(&sig.params, n, varargs)?;
    let sig = if sig.type_params.is_empty() {
        sig.clone()
    } else {
        let subst = if call.type_args.len() == sig.type_params.len() {
            let mut s = Substitution::new();
            for (p, a) in sig.type_params.iter().zip(call.type_args) {
                s.bind(p.var.clone(), a.clone());
            }
            s
        } else {
            let typed: Vec<Option<JavaType>> = call
                .args
                .iter()
                .map(|a| match a {
                    Arg::Typed(t) => Some(t.clone()),
                    Arg::Functional(_) => None,
                })
                .collect();
            generics::infer(
                program,
                &sig.type_params,
                &raw_expanded,
                &typed,
                call.target.map(|t| (&sig.return_type, t)),
            )
        };
        instantiate(sig, &subst)
    };
    let expanded = expand(&sig.params, n, varargs)?;
    let fits = call.args.iter().zip(&expanded).all(|(arg, param)| match arg {
        Arg::Typed(t) => compatible(program, t, param, phase != Phase::Strict),
        Arg::Functional(arity) => functional_fits(program, param, *arity),
    });
    fits.then_some(Applicable {
        method: m,
        sig,
        expanded,
    })
}

fn functional_fits(program: &Program, param: &JavaType, arity: Option<usize>) -> bool {
    if param.is_unresolved() {
        return true;
    }
    match functional_method(program, param) {
        Some(sam) => arity.is_none_or(|k| sam.params.len() == k),
        None => false,
    }
}

fn more_specific_param(program: &Program, a: &JavaType, b: &JavaType) -> bool {
    match (a, b) {
        (JavaType::Primitive(x), JavaType::Primitive(y)) => x.widens_to(*y),
        _ => a == b || is_subtype(program, a, b),
    }
}

fn more_specific(program: &Program, a: &Applicable, b: &Applicable) -> bool {
    a.expanded
        .iter()
        .zip(&b.expanded)
        .all(|(x, y)| more_specific_param(program, x, y))
}

fn most_specific(program: &Program, applicable: Vec<Applicable>) -> Outcome {
    if applicable.len() == 1 {
        return applicable.into_iter().next().map_or(Outcome::NotApplicable, Outcome::Found);
    }
    let maximal: Vec<&Applicable> = applicable
        .iter()
        .filter(|a| applicable.iter().all(|b| more_specific(program, a, b)))
        .collect();
    if maximal.is_empty() {
        return Outcome::Ambiguous(applicable.iter().map(|a| a.method).collect());
    }
    // Equally specific: a concrete method beats abstract ones, otherwise the
    // most derived declaration (listed first) wins.
    let concrete = maximal.iter().find(|a| {
        program
            .with_method(a.method, |_, mi| !mi.is_abstract())
            .unwrap_or(false)
    });
    let chosen = concrete.or(maximal.first()).map(|a| (*a).clone());
    chosen.map_or(Outcome::NotApplicable, Outcome::Found)
}
