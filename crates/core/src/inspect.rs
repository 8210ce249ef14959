//! Inspection API: read-only views over a resolved program.
//!
//! A [`CodeModel`] is handed out by [`Session::resolve`](crate::Session::resolve)
//! once the root types are linked and their members and bodies resolved.
//! Views borrow the model and return owned or `Arc`-shared data; nothing
//! reachable from here can mutate the graph.

use crate::index::{ModuleRecord, Shadowed};
use crate::model::{Body, BodyOwner, FieldInfo, FieldSig, Header, MethodInfo, MethodSig, TypeInfo, TypeParamSig};
use crate::program::Program;
use crate::resolve::generics::as_super;
use crate::resolve::members::methods_named;
use crate::resolve::names::display;
use crate::resolve::overload::{self, Arg, Call, Outcome};
use crate::resolve::subtyping::is_subtype;
use jinspect_api::inspect::{CodeInspector, FieldSummary, MethodSummary, TypeSummary};
use jinspect_api::models::{
    Diagnostic, FieldRef, JavaType, MethodKind, MethodRef, Modifiers, OriginKind, TypeId, TypeKind,
};
use jinspect_api::{ApiError, ApiResult};
use jinspect_bytecode::ConstantValue;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// The resolved model of one session.
#[derive(Debug, Clone)]
pub struct CodeModel {
    program: Arc<Program>,
    /// Resolved root types, sorted by name.
    types: Arc<Vec<TypeId>>,
}

impl CodeModel {
    /// Wraps `types` without resolving them. Views still resolve headers,
    /// members and bodies on first access, but diagnostics only cover what
    /// has been touched; [`Session::resolve`](crate::Session::resolve) runs
    /// the eager pass before calling this.
    pub(crate) fn new(program: Arc<Program>, mut types: Vec<TypeId>) -> Self {
        types.sort_by_cached_key(|id| program.info(*id).map(|i| i.name.clone()).unwrap_or_default());
        types.dedup();
        Self {
            program,
            types: Arc::new(types),
        }
    }

    /// Every root type, sorted by name.
    pub fn types(&self) -> impl Iterator<Item = TypeView<'_>> {
        self.types.iter().filter_map(|id| self.type_view(*id))
    }

    /// Looks a type up by canonical or binary name. Library types outside the
    /// roots are built and resolved on first request.
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.program.materialize(name)
    }

    pub fn type_view(&self, id: TypeId) -> Option<TypeView<'_>> {
        let info = self.program.info(id)?;
        Some(TypeView { model: self, info })
    }

    pub fn type_named(&self, name: &str) -> Option<TypeView<'_>> {
        self.find_type(name).and_then(|id| self.type_view(id))
    }

    pub fn method(&self, m: MethodRef) -> Option<MethodView<'_>> {
        let info = self.program.info(m.owner)?;
        info.method(m.index)?;
        let sig = self.program.method_sig(m)?;
        Some(MethodView {
            model: self,
            info,
            method: m,
            sig,
        })
    }

    pub fn field(&self, f: FieldRef) -> Option<FieldView<'_>> {
        let info = self.program.info(f.owner)?;
        info.field(f.index)?;
        let sig = self.program.field_sig(f)?;
        Some(FieldView {
            model: self,
            info,
            field: f,
            sig,
        })
    }

    /// Direct supertypes, superclass first, with type arguments.
    pub fn supertypes(&self, id: TypeId) -> Vec<JavaType> {
        self.program.header(id).supertypes().cloned().collect()
    }

    /// Every proper supertype, nearest first.
    pub fn all_supertypes(&self, id: TypeId) -> Vec<TypeId> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        let mut out = vec![];
        while let Some(next) = queue.pop_front() {
            for sup in self.program.header(next).supertypes().filter_map(JavaType::class_id) {
                if seen.insert(sup) {
                    out.push(sup);
                    queue.push_back(sup);
                }
            }
        }
        out
    }

    /// Root types that extend or implement `id`, directly or not.
    pub fn subtypes(&self, id: TypeId) -> Vec<TypeId> {
        self.types
            .iter()
            .copied()
            .filter(|t| *t != id && self.all_supertypes(*t).contains(&id))
            .collect()
    }

    /// `ty` viewed as its supertype `target`, type arguments substituted.
    pub fn as_super(&self, ty: &JavaType, target: TypeId) -> Option<JavaType> {
        as_super(&self.program, ty, target)
    }

    pub fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool {
        is_subtype(&self.program, sub, sup)
    }

    /// The method a call `name(args)` through a receiver of static type `id`
    /// selects, by the same overload rules the resolver applies to source calls.
    pub fn effective_method(&self, id: TypeId, name: &str, args: &[JavaType]) -> ApiResult<MethodRef> {
        let info = self
            .program
            .info(id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let candidates = methods_named(&self.program, id, name);
        if candidates.is_empty() {
            return Err(ApiError::NotFound(format!("{}.{name}", info.name)));
        }
        let receiver = self.program.header(id).this_type(id);
        let args: Vec<Arg> = args.iter().cloned().map(Arg::Typed).collect();
        let call = Call {
            receiver: Some(&receiver),
            args: &args,
            type_args: &[],
            target: None,
        };
        match overload::select(&self.program, &candidates, &call) {
            Outcome::Found(applicable) => Ok(applicable.method),
            Outcome::NotApplicable => Err(ApiError::NotApplicable(format!(
                "{}.{name}({})",
                info.name,
                self.render_list(call_types(&args))
            ))),
            Outcome::Ambiguous(ms) => Err(ApiError::Ambiguous {
                name: format!("{}.{name}", info.name),
                candidates: ms.iter().map(|m| self.program.method_name(*m)).collect(),
            }),
        }
    }

    /// Methods named `name` declared by any root type.
    pub fn find_methods(&self, name: &str) -> Vec<MethodRef> {
        self.types()
            .flat_map(|t| {
                t.info
                    .methods
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.name == name)
                    .map(|(i, _)| t.info.method_ref(i))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn render_type(&self, ty: &JavaType) -> String {
        display(&self.program, ty)
    }

    fn render_list<'t>(&self, types: impl Iterator<Item = &'t JavaType>) -> String {
        types.map(|t| self.render_type(t)).collect::<Vec<_>>().join(", ")
    }

    /// Resolved body of a member; bytecode bodies are decoded here.
    pub fn body(&self, owner: BodyOwner) -> Option<Arc<Body>> {
        self.program.body(owner)
    }

    /// Every diagnostic of the session, sorted by location.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.program.diagnostics.sorted()
    }

    /// Classpath records that lost to a source unit or an earlier entry.
    pub fn shadowed(&self) -> Vec<Shadowed> {
        self.program.index.shadowed()
    }

    /// Declared modules, one per name, sorted. A `module-info.java` wins over
    /// a classpath descriptor of the same name.
    pub fn modules(&self) -> Vec<ModuleRecord> {
        self.program.index.modules()
    }

    pub fn module(&self, name: &str) -> Option<ModuleRecord> {
        self.program.index.module(name)
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }
}

fn call_types(args: &[Arg]) -> impl Iterator<Item = &JavaType> {
    args.iter().filter_map(|a| match a {
        Arg::Typed(t) => Some(t),
        Arg::Functional(_) => None,
    })
}

impl CodeInspector for CodeModel {
    fn find_type(&self, fqn: &str) -> Option<TypeId> {
        CodeModel::find_type(self, fqn)
    }

    fn type_names(&self) -> Vec<String> {
        self.types().map(|t| t.name().to_string()).collect()
    }

    fn type_summary(&self, id: TypeId) -> ApiResult<TypeSummary> {
        self.type_view(id)
            .map(|t| t.summary())
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn render_type(&self, ty: &JavaType) -> String {
        CodeModel::render_type(self, ty)
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        CodeModel::diagnostics(self)
    }
}

fn render_type_params(model: &CodeModel, params: &[TypeParamSig]) -> Vec<String> {
    params
        .iter()
        .map(|p| {
            let bounds: Vec<String> = p
                .bounds
                .iter()
                .filter(|b| b.class_id().is_none_or(|id| !model.program.is_named(id, crate::program::OBJECT)))
                .map(|b| model.render_type(b))
                .collect();
            if bounds.is_empty() {
                p.var.name.clone()
            } else {
                format!("{} extends {}", p.var.name, bounds.join(" & "))
            }
        })
        .collect()
}

fn keywords(modifiers: Modifiers) -> Vec<String> {
    modifiers.keywords().into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone)]
pub struct TypeView<'m> {
    model: &'m CodeModel,
    info: Arc<TypeInfo>,
}

impl<'m> TypeView<'m> {
    pub fn id(&self) -> TypeId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn binary_name(&self) -> &str {
        &self.info.binary_name
    }

    pub fn kind(&self) -> TypeKind {
        self.info.kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.info.modifiers
    }

    pub fn origin(&self) -> OriginKind {
        self.info.origin.kind()
    }

    /// The declaration as the front produced it.
    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn header(&self) -> Arc<Header> {
        self.model.program.header(self.info.id)
    }

    pub fn superclass(&self) -> Option<JavaType> {
        self.header().superclass.clone()
    }

    pub fn interfaces(&self) -> Vec<JavaType> {
        self.header().interfaces.clone()
    }

    pub fn outer(&self) -> Option<TypeView<'m>> {
        self.info.nesting.outer().and_then(|id| self.model.type_view(id))
    }

    pub fn methods(&self) -> Vec<MethodView<'m>> {
        (0..self.info.methods.len())
            .filter_map(|i| self.model.method(self.info.method_ref(i)))
            .collect()
    }

    pub fn fields(&self) -> Vec<FieldView<'m>> {
        (0..self.info.fields.len())
            .filter_map(|i| self.model.field(self.info.field_ref(i)))
            .collect()
    }

    /// Own and inherited methods, overridden ones left out.
    pub fn all_methods(&self) -> Vec<MethodView<'m>> {
        let members = self.model.program.members(self.info.id);
        members.all_methods.iter().filter_map(|m| self.model.method(*m)).collect()
    }

    pub fn all_fields(&self) -> Vec<FieldView<'m>> {
        let members = self.model.program.members(self.info.id);
        members.all_fields.iter().filter_map(|f| self.model.field(*f)).collect()
    }

    pub fn member_types(&self) -> Vec<TypeView<'m>> {
        self.info
            .member_types
            .iter()
            .filter_map(|simple| self.model.type_named(&format!("{}${simple}", self.info.binary_name)))
            .collect()
    }

    pub fn summary(&self) -> TypeSummary {
        let header = self.header();
        TypeSummary {
            fqn: self.info.name.clone(),
            kind: self.info.kind,
            origin: self.origin(),
            modifiers: keywords(self.info.modifiers),
            type_parameters: render_type_params(self.model, &header.type_params),
            superclass: header.superclass.as_ref().map(|s| self.model.render_type(s)),
            interfaces: header.interfaces.iter().map(|i| self.model.render_type(i)).collect(),
            fields: self.fields().iter().map(FieldView::summary).collect(),
            methods: self.methods().iter().map(MethodView::summary).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodView<'m> {
    model: &'m CodeModel,
    info: Arc<TypeInfo>,
    method: MethodRef,
    sig: MethodSig,
}

impl<'m> MethodView<'m> {
    pub fn id(&self) -> MethodRef {
        self.method
    }

    fn decl(&self) -> &MethodInfo {
        &self.info.methods[self.method.index as usize]
    }

    pub fn name(&self) -> &str {
        &self.decl().name
    }

    pub fn kind(&self) -> MethodKind {
        self.decl().kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.decl().modifiers
    }

    pub fn origin(&self) -> OriginKind {
        self.decl().origin
    }

    pub fn info(&self) -> &MethodInfo {
        self.decl()
    }

    pub fn declaring_type(&self) -> TypeView<'m> {
        TypeView {
            model: self.model,
            info: Arc::clone(&self.info),
        }
    }

    /// Resolved signature, in the declaring type's own type variables.
    pub fn sig(&self) -> &MethodSig {
        &self.sig
    }

    pub fn params(&self) -> &[JavaType] {
        &self.sig.params
    }

    pub fn return_type(&self) -> &JavaType {
        &self.sig.return_type
    }

    /// Methods of supertypes this one overrides.
    pub fn overrides(&self) -> Vec<MethodRef> {
        self.model
            .program
            .members(self.method.owner)
            .overridden_by(self.method.index)
            .collect()
    }

    /// Erased JVM descriptor.
    pub fn descriptor(&self) -> String {
        self.decl()
            .descriptor
            .clone()
            .unwrap_or_else(|| crate::resolve::descriptor::method_descriptor(&self.model.program, &self.sig))
    }

    /// Whether a body can be requested; abstract and native methods have none.
    pub fn has_body(&self) -> bool {
        self.decl().has_body()
    }

    /// Resolved statements for source methods, bound instructions for
    /// bytecode methods.
    pub fn body(&self) -> Option<Arc<Body>> {
        self.model.body(BodyOwner::Method(self.method))
    }

    /// `<T> T get(int)`; constructors use the simple type name.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        let type_params = render_type_params(self.model, &self.sig.type_params);
        if !type_params.is_empty() {
            out.push_str(&format!("<{}> ", type_params.join(", ")));
        }
        let decl = self.decl();
        match decl.kind {
            MethodKind::Constructor => out.push_str(&self.info.simple_name),
            MethodKind::Initializer => {
                out.push_str(if decl.is_static() { "static {}" } else { "{}" });
                return out;
            }
            MethodKind::Method => {
                out.push_str(&self.model.render_type(&self.sig.return_type));
                out.push(' ');
                out.push_str(&decl.name);
            }
        }
        let mut params: Vec<String> = self.sig.params.iter().map(|p| self.model.render_type(p)).collect();
        if self.sig.varargs {
            if let Some(last) = params.last_mut() {
                if let Some(element) = last.strip_suffix("[]") {
                    *last = format!("{element}...");
                }
            }
        }
        out.push('(');
        out.push_str(&params.join(", "));
        out.push(')');
        if !self.sig.throws.is_empty() {
            out.push_str(" throws ");
            out.push_str(&self.model.render_list(self.sig.throws.iter()));
        }
        out
    }

    pub fn summary(&self) -> MethodSummary {
        MethodSummary {
            name: self.name().to_string(),
            kind: self.kind(),
            modifiers: keywords(self.modifiers()),
            signature: self.signature(),
            origin: self.origin(),
            has_body: self.has_body(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldView<'m> {
    model: &'m CodeModel,
    info: Arc<TypeInfo>,
    field: FieldRef,
    sig: FieldSig,
}

impl<'m> FieldView<'m> {
    pub fn id(&self) -> FieldRef {
        self.field
    }

    fn decl(&self) -> &FieldInfo {
        &self.info.fields[self.field.index as usize]
    }

    pub fn name(&self) -> &str {
        &self.decl().name
    }

    pub fn modifiers(&self) -> Modifiers {
        self.decl().modifiers
    }

    pub fn origin(&self) -> OriginKind {
        self.decl().origin
    }

    pub fn info(&self) -> &FieldInfo {
        self.decl()
    }

    pub fn declaring_type(&self) -> TypeView<'m> {
        TypeView {
            model: self.model,
            info: Arc::clone(&self.info),
        }
    }

    pub fn ty(&self) -> &JavaType {
        &self.sig.ty
    }

    pub fn constant(&self) -> Option<&ConstantValue> {
        self.decl().constant.as_ref()
    }

    pub fn is_enum_constant(&self) -> bool {
        self.decl().is_enum_constant
    }

    /// Resolved initializer, or the creation of an enum constant.
    pub fn initializer(&self) -> Option<Arc<Body>> {
        self.model.body(BodyOwner::Field(self.field))
    }

    pub fn summary(&self) -> FieldSummary {
        FieldSummary {
            name: self.name().to_string(),
            modifiers: keywords(self.modifiers()),
            ty: self.model.render_type(&self.sig.ty),
            origin: self.origin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::body::{ExprKind, StmtKind, Symbol};
    use crate::testing;

    fn model(sources: &[(&str, &str)], roots: &[&str]) -> CodeModel {
        let program = Arc::new(testing::program(sources));
        let ids = roots.iter().map(|n| program.materialize(n).unwrap()).collect();
        CodeModel::new(program, ids)
    }

    #[test]
    fn unvisited_bodies_report_nothing_until_read() {
        let model = model(&[("p/L.java", "package p; class L { int f() { return missing; } }")], &["p.L"]);
        assert!(model.diagnostics().is_empty());
        let l = model.type_named("p.L").unwrap();
        let f = l.methods().into_iter().find(|m| m.name() == "f").unwrap();
        assert!(f.body().is_some());
        let kinds: Vec<_> = model.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![jinspect_api::models::DiagnosticKind::UnresolvedSymbol]);
    }

    const HIERARCHY: &str = "package p; \
        class C { String f(Object o) { return \"c\"; } } \
        class B extends C { String f(Object o) { return \"b\"; } } \
        class A extends B { String f(Object o) { return \"a\"; } String f(String s) { return s; } }";

    #[test]
    fn effective_method_prefers_the_nearest_override() {
        let m = model(&[("p/A.java", HIERARCHY)], &["p.A", "p.B", "p.C"]);
        let a = m.find_type("p.A").unwrap();
        let b = m.find_type("p.B").unwrap();
        let object = m.program().object();
        let string = m.program().known("java.lang.String");

        let chosen = m.effective_method(a, "f", &[object.clone()]).unwrap();
        assert_eq!(chosen.owner, a);
        let chosen = m.effective_method(b, "f", &[object.clone()]).unwrap();
        assert_eq!(chosen.owner, b);
        let chosen = m.effective_method(a, "f", &[string]).unwrap();
        assert_eq!(m.method(chosen).unwrap().signature(), "java.lang.String f(java.lang.String)");

        assert!(matches!(m.effective_method(a, "g", &[]), Err(ApiError::NotFound(_))));
        assert!(matches!(
            m.effective_method(a, "f", &[object.clone(), object]),
            Err(ApiError::NotApplicable(_))
        ));
    }

    #[test]
    fn subtypes_and_overrides_follow_the_hierarchy() {
        let m = model(&[("p/A.java", HIERARCHY)], &["p.A", "p.B", "p.C"]);
        let a = m.find_type("p.A").unwrap();
        let c = m.find_type("p.C").unwrap();
        let mut subs = m.subtypes(c);
        subs.sort();
        assert_eq!(subs.len(), 2);
        assert!(subs.contains(&a));
        assert_eq!(m.all_supertypes(a).len(), 3);

        let view = m.type_view(a).unwrap();
        let f = view.methods().into_iter().find(|mv| mv.params() == [m.program().object()]).unwrap();
        let overridden = f.overrides();
        assert_eq!(overridden.len(), 1);
        assert_eq!(overridden[0].owner, m.find_type("p.B").unwrap());
        assert_eq!(m.find_methods("f").len(), 4);
    }

    #[test]
    fn summaries_render_generic_signatures() {
        let m = model(
            &[(
                "p/Box.java",
                "package p; import java.util.List; public class Box<T extends Comparable<T>> implements Comparable<Box<T>> { \
                 public static final int SIZE = 3; private List<T> items; \
                 public Box(T first) {} \
                 public <R> R map(java.util.function.Function<? super T, ? extends R> fn, String... tags) { return null; } \
                 public int compareTo(Box<T> o) { return 0; } }",
            )],
            &["p.Box"],
        );
        let summary = m.type_summary(m.find_type("p.Box").unwrap()).unwrap();
        assert_eq!(summary.fqn, "p.Box");
        assert_eq!(summary.type_parameters, vec!["T extends java.lang.Comparable<T>"]);
        assert_eq!(summary.superclass.as_deref(), Some("java.lang.Object"));
        assert_eq!(summary.interfaces, vec!["java.lang.Comparable<p.Box<T>>"]);
        assert_eq!(summary.fields[0].ty, "int");
        assert_eq!(summary.fields[1].ty, "java.util.List<T>");
        let signatures: Vec<&str> = summary.methods.iter().map(|m| m.signature.as_str()).collect();
        assert!(signatures.contains(&"Box(T)"));
        assert!(signatures.contains(&"<R> R map(java.util.function.Function<? super T, ? extends R>, java.lang.String...)"));
        assert!(signatures.contains(&"int compareTo(p.Box<T>)"));
        assert_eq!(m.type_names(), vec!["p.Box".to_string()]);
    }

    #[test]
    fn method_bodies_expose_bound_calls() {
        let m = model(
            &[("p/U.java", "package p; class U { int twice(int x) { return add(x, x); } int add(int a, int b) { return a + b; } }")],
            &["p.U"],
        );
        let u = m.type_named("p.U").unwrap();
        let twice = u.methods().into_iter().find(|mv| mv.name() == "twice").unwrap();
        let body = twice.body().unwrap();
        let source = body.as_source().unwrap();
        let StmtKind::Return(Some(call)) = &source.stmts[0].kind else {
            panic!("expected a return, got {:?}", source.stmts[0].kind);
        };
        let ExprKind::Call { method: Symbol::Method(target), .. } = &call.kind else {
            panic!("expected a bound call, got {:?}", call.kind);
        };
        assert_eq!(m.method(*target).unwrap().name(), "add");
        assert_eq!(m.render_type(&call.ty), "int");
        assert!(m.diagnostics().is_empty());
    }
}
