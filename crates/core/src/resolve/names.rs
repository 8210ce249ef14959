//! Type-name scopes.
//!
//! Simple names are looked up in this order: type variables (innermost
//! first), local classes, member types of the current and enclosing types
//! (inherited ones included), single-type imports, the compilation unit's
//! package, on-demand imports, then implicit imports.

use super::members;
use crate::index::UnitContext;
use crate::model::{DeclContext, MethodInfo, Nesting, TypeInfo};
use crate::program::Program;
use jinspect_api::models::{
    DiagnosticKind, JavaType, MethodRef, PrimitiveType, SourceLocation, TypeId, TypeParamOwner,
    TypeRef, TypeVar,
};
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct TypeScope<'p> {
    program: &'p Program,
    /// Innermost first.
    vars: Vec<TypeVar>,
    /// Innermost last.
    local_types: Vec<(String, TypeId)>,
    class: Option<TypeId>,
    unit: Option<Arc<UnitContext>>,
}

fn vars_of(owner: TypeParamOwner, names: impl Iterator<Item = String>) -> impl Iterator<Item = TypeVar> {
    names.enumerate().map(move |(i, name)| TypeVar {
        owner,
        index: i as u16,
        name,
    })
}

impl<'p> TypeScope<'p> {
    pub fn empty(program: &'p Program) -> Self {
        Self {
            program,
            vars: vec![],
            local_types: vec![],
            class: None,
            unit: None,
        }
    }

    /// Names visible in the header and member signatures of `info`.
    pub fn for_type(program: &'p Program, info: &TypeInfo) -> Self {
        let mut scope = Self::empty(program);
        scope.class = Some(info.id);
        if let DeclContext::Source { unit, local } = &info.context {
            scope.unit = Some(Arc::clone(unit));
            if let Some(local) = local {
                scope.local_types = local.local_types.clone();
            }
        }
        scope.push_enclosing_vars(info);
        let mut outer = info.nesting.outer();
        while let Some(id) = outer {
            let Some(o) = program.info(id) else {
                break;
            };
            scope.push_enclosing_vars(&o);
            outer = o.nesting.outer();
        }
        scope
    }

    /// Names visible in the signature and body of a method.
    pub fn for_method(program: &'p Program, info: &TypeInfo, method: MethodRef) -> Self {
        let mut scope = Self::for_type(program, info);
        if let Some(m) = info.method(method.index) {
            let own: Vec<TypeVar> = method_vars(method, m).collect();
            scope.vars.splice(0..0, own);
        }
        scope
    }

    fn push_enclosing_vars(&mut self, info: &TypeInfo) {
        let names = info.type_params.iter().map(|p| p.name.clone());
        self.vars.extend(vars_of(TypeParamOwner::Type(info.id), names));
        // A local class also sees the type variables of the method declaring it.
        if matches!(info.nesting, Nesting::Local { .. } | Nesting::Anonymous { .. }) {
            if let DeclContext::Source {
                local: Some(local), ..
            } = &info.context
            {
                if let Some(m) = local.method {
                    let vars = self
                        .program
                        .with_method(m, |_, mi| method_vars(m, mi).collect::<Vec<_>>())
                        .unwrap_or_default();
                    self.vars.extend(vars);
                }
            }
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn class(&self) -> Option<TypeId> {
        self.class
    }

    pub fn unit(&self) -> Option<&Arc<UnitContext>> {
        self.unit.as_ref()
    }

    pub fn push_vars(&mut self, vars: impl IntoIterator<Item = TypeVar>) {
        let vars: Vec<TypeVar> = vars.into_iter().collect();
        self.vars.splice(0..0, vars);
    }

    pub fn push_local_type(&mut self, name: &str, id: TypeId) {
        self.local_types.push((name.to_string(), id));
    }

    pub fn local_type_depth(&self) -> usize {
        self.local_types.len()
    }

    pub fn truncate_local_types(&mut self, depth: usize) {
        self.local_types.truncate(depth);
    }

    pub fn var(&self, name: &str) -> Option<&TypeVar> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Resolves a type reference, reporting unresolvable names as
    /// `UnresolvedType`.
    pub fn resolve(&self, r: &TypeRef, at: Option<&SourceLocation>) -> JavaType {
        self.resolve_as(r, at, DiagnosticKind::UnresolvedType)
    }

    /// Like [`resolve`](Self::resolve) with the diagnostic kind chosen by the caller.
    pub fn resolve_as(&self, r: &TypeRef, at: Option<&SourceLocation>, kind: DiagnosticKind) -> JavaType {
        match r {
            TypeRef::Raw(name) => match self.lookup(name) {
                Some(t) => t,
                None => self.unresolved(name, at, kind),
            },
            TypeRef::Id(binary) => match self.program.materialize(binary) {
                Some(id) => JavaType::class(id),
                None => self.unresolved(binary, at, kind),
            },
            TypeRef::Var(name) => match self.var(name) {
                Some(v) => JavaType::TypeVar(v.clone()),
                None => self.unresolved(name, at, kind),
            },
            TypeRef::Generic { base, args } => match self.resolve_as(base, at, kind) {
                JavaType::Class { id, .. } => JavaType::Class {
                    id,
                    args: args.iter().map(|a| self.resolve_as(a, at, kind)).collect(),
                },
                other => other,
            },
            TypeRef::Array {
                element,
                dimensions,
            } => JavaType::array(self.resolve_as(element, at, kind), *dimensions),
            TypeRef::Wildcard {
                bound,
                is_upper_bound,
            } => JavaType::Wildcard {
                bound: bound
                    .as_ref()
                    .map(|b| Box::new(self.resolve_as(b, at, kind))),
                upper: *is_upper_bound,
            },
            TypeRef::Unknown => self.unresolved("<unknown>", at, kind),
        }
    }

    fn unresolved(&self, name: &str, at: Option<&SourceLocation>, kind: DiagnosticKind) -> JavaType {
        let message = match kind {
            DiagnosticKind::MissingSupertype => format!("supertype {name} not found"),
            _ => format!("cannot find type {name}"),
        };
        self.program
            .diagnostics
            .emit(kind, name, message, at.cloned());
        JavaType::Unresolved(name.to_string())
    }

    /// A type name as written in source: keyword, type variable, simple or
    /// qualified class name. Reports nothing.
    pub fn lookup(&self, name: &str) -> Option<JavaType> {
        if name == "void" {
            return Some(JavaType::Void);
        }
        if let Some(p) = PrimitiveType::from_keyword(name) {
            return Some(JavaType::Primitive(p));
        }
        if let Some(v) = self.var(name) {
            return Some(JavaType::TypeVar(v.clone()));
        }
        let id = if name.contains('.') {
            self.lookup_qualified(name)
        } else {
            self.lookup_type(name)
        };
        id.map(JavaType::class)
    }

    /// Package-qualified first, then outer-qualified (`Map.Entry`).
    fn lookup_qualified(&self, name: &str) -> Option<TypeId> {
        if let Some(id) = self.program.materialize(name) {
            return Some(id);
        }
        let (first, rest) = name.split_once('.')?;
        let mut id = self.lookup_type(first)?;
        for segment in rest.split('.') {
            id = members::member_type(self.program, id, segment)?;
        }
        Some(id)
    }

    /// A simple class name.
    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        if let Some((_, id)) = self.local_types.iter().rev().find(|(n, _)| n == name) {
            return Some(*id);
        }
        let mut current = self.class;
        while let Some(c) = current {
            if let Some(id) = members::member_type(self.program, c, name) {
                return Some(id);
            }
            let info = self.program.info(c)?;
            if info.simple_name == name {
                return Some(c);
            }
            current = info.nesting.outer();
        }
        if let Some(unit) = &self.unit {
            let single = unit
                .imports
                .iter()
                .filter(|i| !i.on_demand && i.name.rsplit('.').next() == Some(name));
            for import in single {
                if let Some(id) = self.program.materialize(&import.name) {
                    return Some(id);
                }
            }
            if let Some(id) = self.program.materialize(&unit.qualify(name)) {
                return Some(id);
            }
            for import in unit.imports.iter().filter(|i| i.on_demand) {
                if let Some(id) = self.program.materialize(&format!("{}.{name}", import.name)) {
                    return Some(id);
                }
            }
        }
        self.program
            .config
            .implicit_imports
            .iter()
            .find_map(|p| self.program.materialize(&format!("{p}.{name}")))
    }
}

/// A type as Java source would spell it, with canonical class names.
pub(crate) fn display(program: &Program, ty: &JavaType) -> String {
    match ty {
        JavaType::Primitive(p) => p.keyword().to_string(),
        JavaType::Void => "void".to_string(),
        JavaType::Class { id, args } => {
            let name = program
                .info(*id)
                .map(|i| i.name.clone())
                .or_else(|| program.slot(*id).map(|s| s.binary_name.clone()))
                .unwrap_or_else(|| id.to_string());
            if args.is_empty() {
                name
            } else {
                let args: Vec<String> = args.iter().map(|a| display(program, a)).collect();
                format!("{name}<{}>", args.join(", "))
            }
        }
        JavaType::Wildcard { bound: None, .. } => "?".to_string(),
        JavaType::Wildcard {
            bound: Some(b),
            upper,
        } => {
            let keyword = if *upper { "extends" } else { "super" };
            format!("? {keyword} {}", display(program, b))
        }
        JavaType::TypeVar(v) => v.name.clone(),
        JavaType::Array(e) => format!("{}[]", display(program, e)),
        JavaType::Null => "null".to_string(),
        JavaType::Unresolved(n) if n.is_empty() => "<unresolved>".to_string(),
        JavaType::Unresolved(n) => n.clone(),
    }
}

pub(crate) fn method_vars(m: MethodRef, info: &MethodInfo) -> impl Iterator<Item = TypeVar> + '_ {
    vars_of(
        TypeParamOwner::Method(m),
        info.type_params.iter().map(|p| p.name.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn lookup_follows_scope_order() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.*; class A<T> { class Inner {} }",
        )]);
        let a = program.materialize("p.A").unwrap();
        let scope = TypeScope::for_type(&program, &program.info(a).unwrap());
        assert!(matches!(scope.lookup("T"), Some(JavaType::TypeVar(v)) if v.owner == TypeParamOwner::Type(a)));
        assert_eq!(scope.lookup("Inner"), program.materialize("p.A$Inner").map(JavaType::class));
        assert_eq!(scope.lookup("List"), program.materialize("java.util.List").map(JavaType::class));
        assert_eq!(scope.lookup("String"), program.materialize("java.lang.String").map(JavaType::class));
        assert_eq!(scope.lookup("int"), Some(JavaType::Primitive(PrimitiveType::Int)));
        assert_eq!(scope.lookup("Map.Entry"), program.materialize("java.util.Map$Entry").map(JavaType::class));
        assert_eq!(scope.lookup("Missing"), None);
    }

    #[test]
    fn single_type_import_beats_same_package() {
        let program = testing::program(&[
            ("p/List.java", "package p; class List {}"),
            ("p/B.java", "package p; import java.util.List; class B {}"),
            ("p/C.java", "package p; import java.util.*; class C {}"),
        ]);
        let scope_of = |name: &str| {
            let id = program.materialize(name).unwrap();
            TypeScope::for_type(&program, &program.info(id).unwrap())
        };
        assert_eq!(scope_of("p.B").lookup_type("List"), program.materialize("java.util.List"));
        assert_eq!(scope_of("p.C").lookup_type("List"), program.materialize("p.List"));
    }

    #[test]
    fn unresolved_names_are_reported_and_marked() {
        let program = testing::program(&[]);
        let scope = TypeScope::empty(&program);
        let ty = scope.resolve(
            &TypeRef::Generic {
                base: Box::new(TypeRef::raw("java.util.List")),
                args: vec![TypeRef::raw("Nope")],
            },
            None,
        );
        assert!(ty.is_unresolved());
        assert_eq!(ty.class_id(), program.materialize("java.util.List"));
        let diags = program.diagnostics.sorted();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedType);
        assert_eq!(diags[0].subject, "Nope");
    }
}
