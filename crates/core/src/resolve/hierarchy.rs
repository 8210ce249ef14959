//! Supertype linking and cycle detection.

use super::names::TypeScope;
use super::{Stage, StageGuard};
use crate::model::{Header, TypeInfo, TypeParamSig};
use crate::program::{OBJECT, Program};
use jinspect_api::models::{DiagnosticKind, JavaType, TypeId, TypeParamOwner, TypeVar};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

impl Program {
    /// Direct supertypes as written, superclass first, resolved but not yet
    /// checked for cycles.
    pub(crate) fn declared_supertypes(&self, id: TypeId) -> Arc<Vec<JavaType>> {
        let Some(slot) = self.slot(id) else {
            return Arc::default();
        };
        if let Some(declared) = slot.declared.get() {
            return Arc::clone(declared);
        }
        let Some(_guard) = StageGuard::enter(Stage::Declared, id) else {
            return Arc::default();
        };
        let Some(info) = slot.info.get() else {
            return Arc::default();
        };
        let computed = Arc::new(declared_of(self, info));
        Arc::clone(slot.declared.get_or_init(|| computed))
    }

    /// The linked header: resolved type parameters and supertypes with
    /// cyclic edges removed.
    pub(crate) fn header(&self, id: TypeId) -> Arc<Header> {
        self.header_with(id, |sup| self.reaches(sup, id))
    }

    fn header_with(&self, id: TypeId, is_cyclic: impl Fn(TypeId) -> bool) -> Arc<Header> {
        let Some(slot) = self.slot(id) else {
            return Arc::default();
        };
        if let Some(header) = slot.header.get() {
            return Arc::clone(header);
        }
        let Some(_guard) = StageGuard::enter(Stage::Header, id) else {
            return Arc::default();
        };
        let Some(info) = slot.info.get() else {
            return Arc::default();
        };
        let declared = self.declared_supertypes(id);
        let computed = Arc::new(header_of(self, info, &declared, is_cyclic));
        Arc::clone(slot.header.get_or_init(|| computed))
    }

    /// Whether `target` is reachable from `from` over declared supertype edges.
    pub(crate) fn reaches(&self, from: TypeId, target: TypeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.declared_supertypes(id).iter().filter_map(JavaType::class_id));
            }
        }
        false
    }
}

fn declared_of(program: &Program, info: &TypeInfo) -> Vec<JavaType> {
    let scope = TypeScope::for_type(program, info);
    let at = info.location.as_ref();
    let mut out = Vec::with_capacity(1 + info.interfaces.len());
    if let Some(sc) = &info.superclass {
        let ty = scope.resolve_as(sc, at, DiagnosticKind::MissingSupertype);
        // `new Runnable() {}` extends Object and implements Runnable.
        let interface = ty
            .class_id()
            .and_then(|c| program.info(c))
            .is_some_and(|c| c.is_interface());
        if info.is_anonymous() && interface {
            out.push(program.object());
        }
        out.push(ty);
    }
    out.extend(
        info.interfaces
            .iter()
            .map(|i| scope.resolve_as(i, at, DiagnosticKind::MissingSupertype)),
    );
    out
}

fn header_of(
    program: &Program,
    info: &TypeInfo,
    declared: &[JavaType],
    is_cyclic: impl Fn(TypeId) -> bool,
) -> Header {
    let scope = TypeScope::for_type(program, info);
    let at = info.location.as_ref();

    let mut linked = Vec::with_capacity(declared.len());
    for ty in declared {
        match ty.class_id() {
            Some(sup) if is_cyclic(sup) => {
                let name = program
                    .info(sup)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                warn!(class = %info.name, supertype = %name, "dropping cyclic supertype edge");
                program.diagnostics.emit(
                    DiagnosticKind::CyclicInheritance,
                    &info.name,
                    format!("cyclic inheritance involving {name}"),
                    at.cloned(),
                );
                linked.push(None);
            }
            _ => linked.push(Some(ty.clone())),
        }
    }
    let mut linked = linked.into_iter();
    let superclass = if info.superclass.is_some() && !info.is_interface() {
        linked.next().flatten()
    } else {
        None
    };
    let interfaces = linked.flatten().collect();

    let type_params = info
        .type_params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let bounds: Vec<JavaType> = p.bounds.iter().map(|b| scope.resolve(b, at)).collect();
            TypeParamSig {
                var: TypeVar {
                    owner: TypeParamOwner::Type(info.id),
                    index: i as u16,
                    name: p.name.clone(),
                },
                bounds: if bounds.is_empty() {
                    vec![program.known(OBJECT)]
                } else {
                    bounds
                },
            }
        })
        .collect();
    let annotations = info
        .annotations
        .iter()
        .map(|a| scope.resolve(&a.name, at))
        .collect();

    Header {
        type_params,
        superclass,
        interfaces,
        annotations,
    }
}

/// Links every type reachable from `roots` in one pass and returns them
/// supertypes first.
///
/// Cycles are found as strongly connected components of the declared
/// supertype graph; every edge inside a component is cut, the same edges the
/// lazy path in [`Program::header`] cuts.
pub(crate) fn link_all(program: &Program, roots: impl IntoIterator<Item = TypeId>) -> Vec<TypeId> {
    let mut graph = DiGraph::<TypeId, ()>::new();
    let mut nodes: HashMap<TypeId, NodeIndex> = HashMap::new();
    let mut node = |graph: &mut DiGraph<TypeId, ()>, id: TypeId| {
        *nodes.entry(id).or_insert_with(|| graph.add_node(id))
    };
    let mut seen = HashSet::new();
    let mut queue: VecDeque<TypeId> = roots.into_iter().collect();
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let from = node(&mut graph, id);
        for sup in program
            .declared_supertypes(id)
            .iter()
            .filter_map(JavaType::class_id)
        {
            let to = node(&mut graph, sup);
            graph.update_edge(from, to, ());
            queue.push_back(sup);
        }
    }

    let sccs = tarjan_scc(&graph);
    let mut component = vec![0usize; graph.node_count()];
    for (i, scc) in sccs.iter().enumerate() {
        for n in scc {
            component[n.index()] = i;
        }
    }
    for n in graph.node_indices() {
        let cyclic: HashSet<TypeId> = graph
            .neighbors(n)
            .filter(|m| component[m.index()] == component[n.index()])
            .map(|m| graph[m])
            .collect();
        program.header_with(graph[n], |sup| cyclic.contains(&sup));
    }

    graph.retain_edges(|g, e| {
        g.edge_endpoints(e)
            .is_some_and(|(a, b)| component[a.index()] != component[b.index()])
    });
    let order = match toposort(&graph, None) {
        Ok(order) => order.into_iter().rev().map(|n| graph[n]).collect(),
        // tarjan_scc already lists components supertypes first.
        Err(_) => sccs.iter().flatten().map(|n| graph[*n]).collect(),
    };
    debug!(types = graph.node_count(), cycles = sccs.iter().filter(|c| c.len() > 1).count(), "linked hierarchy");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn names(program: &Program, tys: impl IntoIterator<Item = JavaType>) -> Vec<String> {
        tys.into_iter()
            .filter_map(|t| t.class_id())
            .filter_map(|id| program.info(id))
            .map(|i| i.name.clone())
            .collect()
    }

    #[test]
    fn supertypes_resolve_in_declaration_scope() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.List; abstract class A<T extends Comparable<T>> implements List<T> {}",
        )]);
        let a = program.materialize("p.A").unwrap();
        let header = program.header(a);
        assert_eq!(names(&program, header.superclass.clone()), vec!["java.lang.Object"]);
        let list = program.materialize("java.util.List").unwrap();
        let t = header.type_params[0].var.clone();
        assert_eq!(
            header.interfaces,
            vec![JavaType::Class {
                id: list,
                args: vec![JavaType::TypeVar(t.clone())]
            }]
        );
        let comparable = program.materialize("java.lang.Comparable").unwrap();
        assert_eq!(
            header.type_params[0].bounds,
            vec![JavaType::Class {
                id: comparable,
                args: vec![JavaType::TypeVar(t)]
            }]
        );
    }

    #[test]
    fn cycles_are_cut_and_reported_the_same_way_lazily_and_in_batch() {
        let src = "package p; class A extends B {} class B extends C {} class C extends A {} class D extends A {}";
        let lazy = testing::program(&[("p/A.java", src)]);
        let batch = testing::program(&[("p/A.java", src)]);
        let ids = |p: &Program| ["p.A", "p.B", "p.C", "p.D"].map(|n| p.materialize(n).unwrap());

        let lazy_ids = ids(&lazy);
        let lazy_headers: Vec<_> = lazy_ids.iter().map(|id| lazy.header(*id)).collect();
        let batch_ids = ids(&batch);
        let order = link_all(&batch, batch_ids);
        let batch_headers: Vec<_> = batch_ids.iter().map(|id| batch.header(*id)).collect();

        for h in lazy_headers.iter().take(3).chain(batch_headers.iter().take(3)) {
            assert!(h.superclass.is_none());
        }
        assert!(lazy_headers[3].superclass.is_some());
        assert!(batch_headers[3].superclass.is_some());
        let cyclic = |p: &Program| {
            p.diagnostics
                .sorted()
                .iter()
                .filter(|d| d.kind == DiagnosticKind::CyclicInheritance)
                .count()
        };
        assert_eq!(cyclic(&lazy), 3);
        assert_eq!(cyclic(&batch), 3);

        let pos = |id: TypeId| order.iter().position(|o| *o == id).unwrap();
        assert!(pos(batch_ids[0]) < pos(batch_ids[3]));
    }

    #[test]
    fn missing_supertype_is_reported_but_type_still_links() {
        let program = testing::program(&[("p/A.java", "package p; class A extends Gone implements Runnable {}")]);
        let a = program.materialize("p.A").unwrap();
        let header = program.header(a);
        assert!(matches!(header.superclass, Some(JavaType::Unresolved(ref n)) if n == "Gone"));
        assert_eq!(names(&program, header.interfaces.clone()), vec!["java.lang.Runnable"]);
        let diags = program.diagnostics.sorted();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MissingSupertype);
    }

    #[test]
    fn anonymous_interface_implementation_extends_object() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A { Runnable r = new Runnable() { public void run() {} }; }",
        )]);
        let a = program.materialize("p.A").unwrap();
        let info = program.info(a).unwrap();
        program.body(crate::model::BodyOwner::Field(info.field_ref(0)));
        let anon = program.materialize("p.A$1").unwrap();
        let header = program.header(anon);
        assert_eq!(names(&program, header.superclass.clone()), vec!["java.lang.Object"]);
        assert_eq!(names(&program, header.interfaces.clone()), vec!["java.lang.Runnable"]);
    }
}
