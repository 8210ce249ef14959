//! Typing of source bodies.
//!
//! Walks a lowered body once, top to bottom, binding every pending name and
//! filling each expression's type. Poly expressions (lambdas, method
//! references, diamonds, generic calls) take their target type from the
//! context the walk passes down. Bodies of local and anonymous classes are
//! resolved when the walk reaches their declaration, so they see the types
//! of the locals they capture.

use super::generics::{self, as_super, var_bounds};
use super::members::{
    constructors, field_as_seen, find_field, functional_method, member_type, methods_named,
};
use super::names::{TypeScope, display};
use super::overload::{self, Arg, Call, Outcome};
use super::subtyping::{boxed, lub, numeric, promote, promote_unary};
use crate::builder::body::{Lowered, NestedBodies};
use crate::model::body::{
    BinaryOp, Case, CaseLabel, Catch, Expr, ExprKind, LambdaBody, Literal, MethodRefTarget,
    Pattern, Resource, SourceBody, Stmt, StmtKind, Switch, Symbol, UnaryOp,
};
use crate::model::{Body, BodyOwner, Nesting, TypeInfo};
use crate::program::{CLASS, ITERABLE, OBJECT, Program, STRING, THROWABLE};
use jinspect_api::models::{
    DiagnosticKind, JavaType, LocalId, MethodRef, Modifiers, PrimitiveType, Range, SourceLocation,
    TypeId, TypeKind, TypeRef,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

const INT: JavaType = JavaType::Primitive(PrimitiveType::Int);
const BOOLEAN: JavaType = JavaType::Primitive(PrimitiveType::Boolean);

pub(crate) fn resolve_body(program: &Program, info: &TypeInfo, owner: BodyOwner, lowered: Lowered) -> SourceBody {
    let Lowered { mut body, nested } = lowered;
    let nested = RefCell::new(nested);
    let mut resolver = BodyResolver::new(program, info, owner, &nested, HashMap::new());
    resolver.run(owner, &mut body);
    // Classes inside code the walk could not type still get their bodies.
    let leftover: Vec<TypeId> = nested.borrow().keys().copied().collect();
    for id in leftover {
        resolver.resolve_local_class(id);
    }
    trace!(owner = ?owner, locals = body.locals.len(), "resolved body");
    body
}

fn unresolved(name: &str) -> JavaType {
    JavaType::Unresolved(name.to_string())
}

fn is_functional(e: &Expr) -> bool {
    matches!(e.kind, ExprKind::Lambda { .. } | ExprKind::MethodRef { .. })
}

struct BodyResolver<'a> {
    program: &'a Program,
    nested: &'a RefCell<NestedBodies>,
    class: TypeId,
    this_type: JavaType,
    scope: TypeScope<'a>,
    /// Types of locals, captured ones included.
    locals: HashMap<LocalId, JavaType>,
    decls: HashMap<LocalId, (Option<TypeRef>, Range)>,
    /// Expected return type of the innermost method or lambda body.
    returns: Vec<Option<JavaType>>,
    /// Target and collected `yield` types of enclosing switch expressions.
    yields: Vec<(Option<JavaType>, Vec<JavaType>)>,
}

impl<'a> BodyResolver<'a> {
    fn new(
        program: &'a Program,
        info: &TypeInfo,
        owner: BodyOwner,
        nested: &'a RefCell<NestedBodies>,
        captured: HashMap<LocalId, JavaType>,
    ) -> Self {
        let scope = match owner {
            BodyOwner::Method(m) => TypeScope::for_method(program, info, m),
            BodyOwner::Field(_) => TypeScope::for_type(program, info),
        };
        Self {
            program,
            nested,
            class: info.id,
            this_type: program.header(info.id).this_type(info.id),
            scope,
            locals: captured,
            decls: HashMap::new(),
            returns: Vec::new(),
            yields: Vec::new(),
        }
    }

    fn run(&mut self, owner: BodyOwner, body: &mut SourceBody) {
        for l in &body.locals {
            self.decls.insert(l.id, (l.declared.clone(), l.range));
        }
        match owner {
            BodyOwner::Method(m) => {
                let sig = self.program.method_sig(m);
                if let Some(sig) = &sig {
                    for (id, ty) in body.params.iter().zip(&sig.params) {
                        self.locals.insert(*id, ty.clone());
                    }
                }
                self.returns.push(sig.map(|s| s.return_type));
                self.stmts(&mut body.stmts);
                self.returns.pop();
            }
            BodyOwner::Field(f) => {
                let ty = self.program.field_sig(f).map(|s| s.ty);
                for s in &mut body.stmts {
                    match &mut s.kind {
                        StmtKind::Expr(e) => {
                            self.expr(e, ty.as_ref());
                        }
                        _ => self.stmt(s),
                    }
                }
            }
        }
        for l in &mut body.locals {
            l.ty = match self.locals.get(&l.id) {
                Some(t) => t.clone(),
                None => self.declared_type(l.id).unwrap_or_else(|| unresolved(&l.name)),
            };
        }
    }

    fn loc(&self, range: Range) -> Option<SourceLocation> {
        self.scope.unit().map(|u| u.location(range))
    }

    fn report(&self, kind: DiagnosticKind, subject: &str, message: String, range: Range) {
        self.program
            .diagnostics
            .emit(kind, subject, message, self.loc(range));
    }

    fn resolve_type(&self, r: &TypeRef, range: Range) -> JavaType {
        self.scope.resolve(r, self.loc(range).as_ref())
    }

    fn declared_type(&self, id: LocalId) -> Option<JavaType> {
        let (declared, range) = self.decls.get(&id)?;
        Some(self.resolve_type(declared.as_ref()?, *range))
    }

    fn object_id(&self) -> Option<TypeId> {
        self.program.known_id(OBJECT)
    }

    /// The class whose members a value of type `ty` exposes.
    fn receiver_class(&self, ty: &JavaType) -> Option<TypeId> {
        match ty {
            JavaType::Class { id, .. } => Some(*id),
            JavaType::TypeVar(v) => var_bounds(self.program, v)
                .first()
                .and_then(|b| self.receiver_class(b)),
            JavaType::Wildcard {
                bound: Some(b),
                upper: true,
            } => self.receiver_class(b),
            JavaType::Wildcard { .. } | JavaType::Array(_) => self.object_id(),
            _ => None,
        }
    }

    /// The current class, then each enclosing class outward.
    fn enclosing(&self) -> Vec<TypeId> {
        let mut out = vec![];
        let mut current = Some(self.class);
        while let Some(c) = current {
            out.push(c);
            current = self.program.info(c).and_then(|i| i.nesting.outer());
        }
        out
    }

    fn this_of(&self, id: TypeId) -> JavaType {
        self.program.header(id).this_type(id)
    }

    /// Types named by static imports that could supply `name`.
    fn static_import_owners(&self, name: &str) -> Vec<TypeId> {
        let Some(unit) = self.scope.unit() else {
            return vec![];
        };
        let single = unit.imports.iter().filter(|i| i.is_static && !i.on_demand).filter_map(|i| {
            let (owner, member) = i.name.rsplit_once('.')?;
            (member == name).then(|| self.program.materialize(owner)).flatten()
        });
        let on_demand = unit
            .imports
            .iter()
            .filter(|i| i.is_static && i.on_demand)
            .filter_map(|i| self.program.materialize(&i.name));
        single.chain(on_demand).collect()
    }

    fn is_static_method(&self, m: MethodRef) -> bool {
        self.program
            .with_method(m, |_, mi| mi.is_static())
            .unwrap_or(false)
    }

    // Statements

    fn stmts(&mut self, stmts: &mut [Stmt]) {
        let depth = self.scope.local_type_depth();
        for s in stmts.iter_mut() {
            self.stmt(s);
        }
        self.scope.truncate_local_types(depth);
    }

    fn stmt(&mut self, s: &mut Stmt) {
        let range = s.range;
        match &mut s.kind {
            StmtKind::Empty | StmtKind::Break(_) | StmtKind::Continue(_) => {}
            StmtKind::Block(stmts) => self.stmts(stmts),
            StmtKind::LocalVar(decls) => {
                for (id, init) in decls.iter_mut() {
                    self.local_var(*id, init.as_mut());
                }
            }
            StmtKind::LocalClass(id) => {
                let id = *id;
                if let Some(info) = self.program.info(id) {
                    self.scope.push_local_type(&info.simple_name, id);
                }
                self.resolve_local_class(id);
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) => {
                self.expr(e, None);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.condition(cond);
                self.stmt(then_branch);
                if let Some(e) = else_branch {
                    self.stmt(e);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.condition(cond);
                self.stmt(body);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                for s in init.iter_mut() {
                    self.stmt(s);
                }
                if let Some(c) = cond {
                    self.condition(c);
                }
                for u in update.iter_mut() {
                    self.expr(u, None);
                }
                self.stmt(body);
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let iterated = self.expr(iterable, None);
                let ty = match self.declared_type(*var) {
                    Some(t) => t,
                    None => self.element_type(&iterated),
                };
                self.locals.insert(*var, ty);
                self.stmt(body);
            }
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    let target = self.returns.last().cloned().flatten().filter(|t| *t != JavaType::Void);
                    self.expr(e, target.as_ref());
                }
            }
            StmtKind::Yield(e) => {
                let target = self.yields.last().and_then(|(t, _)| t.clone());
                let ty = self.expr(e, target.as_ref());
                if let Some((_, types)) = self.yields.last_mut() {
                    types.push(ty);
                }
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                for r in resources.iter_mut() {
                    match r {
                        Resource::Decl { local, init } => self.local_var(*local, Some(init)),
                        Resource::Expr(e) => {
                            self.expr(e, None);
                        }
                    }
                }
                self.stmts(body);
                for c in catches.iter_mut() {
                    self.catch(c);
                }
                if let Some(f) = finally {
                    self.stmts(f);
                }
            }
            StmtKind::Switch(sw) => {
                self.switch(sw, None, false);
            }
            StmtKind::Synchronized { lock, body } => {
                self.expr(lock, None);
                self.stmts(body);
            }
            StmtKind::Labeled { body, .. } => self.stmt(body),
            StmtKind::Assert { cond, message } => {
                self.condition(cond);
                if let Some(m) = message {
                    self.expr(m, None);
                }
            }
            StmtKind::ConstructorCall {
                is_super,
                qualifier,
                type_args,
                args,
                constructor,
            } => {
                if let Some(q) = qualifier {
                    self.expr(q, None);
                }
                let owner = if *is_super {
                    self.program
                        .header(self.class)
                        .superclass
                        .clone()
                        .unwrap_or_else(|| self.program.object())
                } else {
                    self.this_type.clone()
                };
                let type_args: Vec<JavaType> = type_args.iter().map(|t| self.resolve_type(t, range)).collect();
                let keyword = if *is_super { "super" } else { "this" };
                let (symbol, _) = self.construct(&owner, None, keyword, &type_args, args, range, None);
                *constructor = symbol;
            }
        }
    }

    fn local_var(&mut self, id: LocalId, init: Option<&mut Expr>) {
        let ty = match (self.declared_type(id), init) {
            (Some(t), Some(e)) => {
                self.expr(e, Some(&t));
                t
            }
            (Some(t), None) => t,
            (None, Some(e)) => self.expr(e, None),
            (None, None) => unresolved(""),
        };
        self.locals.insert(id, ty);
    }

    fn catch(&mut self, c: &mut Catch) {
        c.types = c.declared.iter().map(|t| self.resolve_type(t, c.range)).collect();
        let ty = c
            .types
            .iter()
            .cloned()
            .reduce(|a, b| lub(self.program, &a, &b))
            .unwrap_or_else(|| self.program.known(THROWABLE));
        self.locals.insert(c.param, ty);
        self.stmts(&mut c.body);
    }

    fn condition(&mut self, e: &mut Expr) {
        self.expr(e, Some(&BOOLEAN));
    }

    /// Element type of an enhanced `for` over `iterated`.
    fn element_type(&self, iterated: &JavaType) -> JavaType {
        if let Some(c) = iterated.component() {
            return c.clone();
        }
        if iterated.is_unresolved() {
            return iterated.clone();
        }
        let seen = self
            .program
            .known_id(ITERABLE)
            .and_then(|it| as_super(self.program, iterated, it));
        match seen {
            Some(JavaType::Class { args, .. }) => match args.first() {
                Some(JavaType::Wildcard {
                    bound: Some(b),
                    upper: true,
                }) => (**b).clone(),
                Some(JavaType::Wildcard { .. }) | None => self.program.object(),
                Some(a) => a.clone(),
            },
            _ => self.program.object(),
        }
    }

    /// Resolves a switch statement or expression; returns the expression's type.
    fn switch(&mut self, sw: &mut Switch, target: Option<&JavaType>, is_expr: bool) -> JavaType {
        let selector = self.expr(&mut sw.selector, None);
        let enum_type = self.receiver_class(&selector).filter(|id| {
            self.program
                .info(*id)
                .is_some_and(|i| i.kind == TypeKind::Enum)
        });
        if is_expr {
            self.yields.push((target.cloned(), vec![]));
        }
        let arrow_values = is_expr && sw.arrow;
        let depth = self.scope.local_type_depth();
        for case in sw.cases.iter_mut() {
            self.case(case, &selector, enum_type, target, arrow_values);
        }
        self.scope.truncate_local_types(depth);
        if !is_expr {
            return JavaType::Void;
        }
        let (_, types) = self.yields.pop().unwrap_or_default();
        match target {
            Some(t) => t.clone(),
            None => types
                .into_iter()
                .reduce(|a, b| lub(self.program, &a, &b))
                .unwrap_or_else(|| unresolved("switch")),
        }
    }

    fn case(
        &mut self,
        case: &mut Case,
        selector: &JavaType,
        enum_type: Option<TypeId>,
        target: Option<&JavaType>,
        arrow_value: bool,
    ) {
        for label in case.labels.iter_mut() {
            match label {
                CaseLabel::Default => {}
                CaseLabel::Expr(e) => {
                    let constant = match (&e.kind, enum_type) {
                        (ExprKind::Name { name, .. }, Some(id)) => find_field(self.program, id, name),
                        _ => None,
                    };
                    match constant {
                        Some(f) => {
                            if let ExprKind::Name { symbol, .. } = &mut e.kind {
                                *symbol = Symbol::Field(f);
                            }
                            e.ty = selector.clone();
                        }
                        None => {
                            self.expr(e, Some(selector));
                        }
                    }
                }
                CaseLabel::Pattern(p) => self.pattern(p, selector),
            }
        }
        if let Some(g) = &mut case.guard {
            self.condition(g);
        }
        // `case X -> value;` yields its expression.
        if arrow_value {
            if let [Stmt {
                kind: StmtKind::Expr(e),
                ..
            }] = case.body.as_mut_slice()
            {
                let ty = self.expr(e, target);
                if let Some((_, types)) = self.yields.last_mut() {
                    types.push(ty);
                }
                return;
            }
        }
        self.stmts(&mut case.body);
    }

    fn pattern(&mut self, pattern: &mut Pattern, matched: &JavaType) {
        match pattern {
            Pattern::Type {
                declared,
                ty,
                binding,
                range,
            } => {
                let t = match declared {
                    TypeRef::Raw(n) if n == "var" => matched.clone(),
                    _ => self.resolve_type(declared, *range),
                };
                if let Some(b) = binding {
                    self.locals.insert(*b, t.clone());
                }
                *ty = t;
            }
            Pattern::Record {
                declared,
                ty,
                components,
                range,
            } => {
                let mut t = self.resolve_type(declared, *range);
                // `case Box(var x)` against `Box<String>` infers `Box<String>`.
                if let JavaType::Class { id, args } = &mut t {
                    if args.is_empty() && !self.program.header(*id).type_params.is_empty() {
                        *args = generics::diamond(self.program, *id, Some(matched));
                    }
                }
                let fields = self.record_components(&t);
                for (i, c) in components.iter_mut().enumerate() {
                    let m = fields.get(i).cloned().unwrap_or_else(|| unresolved(""));
                    self.pattern(c, &m);
                }
                *ty = t;
            }
        }
    }

    fn record_components(&self, record: &JavaType) -> Vec<JavaType> {
        let Some(info) = record.class_id().and_then(|id| self.program.info(id)) else {
            return vec![];
        };
        info.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.modifiers.contains(Modifiers::STATIC))
            .filter_map(|(i, _)| field_as_seen(self.program, record, info.field_ref(i)))
            .collect()
    }

    // Expressions

    /// Types `e` against an optional target and stores the result on the node.
    fn expr(&mut self, e: &mut Expr, target: Option<&JavaType>) -> JavaType {
        let range = e.range;
        let ty = match &mut e.kind {
            ExprKind::Literal(l) => self.literal(l),
            ExprKind::Name { name, symbol } => match symbol {
                Symbol::Local(id) => {
                    let id = *id;
                    match self.locals.get(&id) {
                        Some(t) => t.clone(),
                        None => self.declared_type(id).unwrap_or_else(|| unresolved(name)),
                    }
                }
                _ => {
                    let (s, t) = self.name(name, range);
                    *symbol = s;
                    t
                }
            },
            ExprKind::FieldAccess {
                target: receiver,
                name,
                symbol,
            } => {
                let (s, t) = self.field_access(receiver, name, range);
                *symbol = s;
                t
            }
            ExprKind::Call {
                target: receiver,
                name,
                type_args,
                args,
                method,
            } => {
                let type_args: Vec<JavaType> = type_args.iter().map(|t| self.resolve_type(t, range)).collect();
                let (s, t) = self.call(receiver.as_deref_mut(), name, &type_args, args, target, range);
                *method = s;
                t
            }
            ExprKind::New {
                outer,
                declared,
                type_args,
                args,
                constructor,
                anonymous,
            } => {
                let ty = self.instance_type(outer.as_deref_mut(), declared, target, range);
                let type_args: Vec<JavaType> = type_args.iter().map(|t| self.resolve_type(t, range)).collect();
                let (s, _) = self.construct(&ty, *anonymous, "new", &type_args, args, range, target);
                *constructor = s;
                if let Some(anon) = anonymous {
                    self.resolve_local_class(*anon);
                }
                ty
            }
            ExprKind::NewArray {
                element,
                dims,
                extra_dims,
                init,
            } => {
                for d in dims.iter_mut() {
                    self.expr(d, Some(&INT));
                }
                let element = self.resolve_type(element, range);
                let ty = JavaType::array(element, dims.len() + *extra_dims);
                if let Some(items) = init {
                    let component = ty.component().cloned();
                    for i in items.iter_mut() {
                        self.expr(i, component.as_ref());
                    }
                }
                ty
            }
            ExprKind::ArrayInit(items) => {
                let component = target.and_then(|t| t.component()).cloned();
                for i in items.iter_mut() {
                    self.expr(i, component.as_ref());
                }
                target.cloned().unwrap_or_else(|| unresolved("{...}"))
            }
            ExprKind::ArrayAccess { array, index } => {
                let a = self.expr(array, None);
                self.expr(index, Some(&INT));
                match a.component() {
                    Some(c) => c.clone(),
                    None => unresolved(""),
                }
            }
            ExprKind::Assign { op, target: lhs, value } => {
                let t = self.expr(lhs, None);
                match op.0 {
                    None => self.expr(value, Some(&t)),
                    Some(_) => self.expr(value, None),
                };
                t
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.expr(lhs, None);
                let r = self.expr(rhs, None);
                self.binary(*op, &l, &r)
            }
            ExprKind::Unary { op, operand } => {
                let t = self.expr(operand, None);
                match op {
                    UnaryOp::Not => BOOLEAN,
                    _ if op.is_update() => t,
                    _ => numeric(self.program, &t)
                        .and_then(promote_unary)
                        .map(JavaType::Primitive)
                        .unwrap_or_else(|| unresolved("")),
                }
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.condition(cond);
                let a = self.expr(then_expr, target);
                let b = self.expr(else_expr, target);
                match target {
                    Some(t) if is_functional(then_expr) || is_functional(else_expr) => t.clone(),
                    _ => lub(self.program, &a, &b),
                }
            }
            ExprKind::Cast {
                declared,
                extra_bounds,
                expr,
            } => {
                let t = self.resolve_type(declared, range);
                for b in extra_bounds.iter() {
                    self.resolve_type(b, range);
                }
                self.expr(expr, Some(&t));
                t
            }
            ExprKind::InstanceOf { expr, pattern } => {
                let matched = self.expr(expr, None);
                self.pattern(pattern, &matched);
                BOOLEAN
            }
            ExprKind::Lambda { params, body, sam } => {
                let (s, t) = self.lambda(params, body, target);
                *sam = s;
                t
            }
            ExprKind::MethodRef {
                target: receiver,
                name,
                method,
            } => {
                *method = self.method_ref(receiver, name, target, range);
                target.cloned().unwrap_or_else(|| unresolved("::"))
            }
            ExprKind::This { qualifier } => match qualifier {
                None => self.this_type.clone(),
                Some(q) => match self.scope.lookup_type(q) {
                    Some(id) => self.this_of(id),
                    None => self.resolve_type(&TypeRef::raw(q.as_str()), range),
                },
            },
            ExprKind::Super { qualifier } => self.super_type(qualifier.as_deref(), range),
            ExprKind::ClassLiteral(t) => {
                let t = self.resolve_type(t, range);
                let arg = match t {
                    JavaType::Primitive(p) => boxed(self.program, p),
                    JavaType::Void => self.program.known("java.lang.Void"),
                    other => generics::erase(self.program, &other),
                };
                match self.program.known_id(CLASS) {
                    Some(id) => JavaType::Class { id, args: vec![arg] },
                    None => unresolved(CLASS),
                }
            }
            ExprKind::Switch(sw) => self.switch(sw, target, true),
            ExprKind::Unsupported(text) => unresolved(text),
        };
        e.ty = ty.clone();
        ty
    }

    fn literal(&self, l: &Literal) -> JavaType {
        let p = match l {
            Literal::Int(_) => PrimitiveType::Int,
            Literal::Long(_) => PrimitiveType::Long,
            Literal::Float(_) => PrimitiveType::Float,
            Literal::Double(_) => PrimitiveType::Double,
            Literal::Bool(_) => PrimitiveType::Boolean,
            Literal::Char(_) => PrimitiveType::Char,
            Literal::String(_) => return self.program.known(STRING),
            Literal::Null => return JavaType::Null,
        };
        JavaType::Primitive(p)
    }

    fn binary(&self, op: BinaryOp, l: &JavaType, r: &JavaType) -> JavaType {
        use BinaryOp::*;
        let is_string = |t: &JavaType| t.class_id().is_some_and(|id| self.program.is_named(id, STRING));
        match op {
            And | Or => BOOLEAN,
            _ if op.is_comparison() => BOOLEAN,
            Add if is_string(l) || is_string(r) => self.program.known(STRING),
            _ if l.is_unresolved() || r.is_unresolved() => unresolved(""),
            _ if op.is_shift() => numeric(self.program, l)
                .and_then(promote_unary)
                .map(JavaType::Primitive)
                .unwrap_or_else(|| unresolved("")),
            BitAnd | BitOr | BitXor
                if numeric(self.program, l) == Some(PrimitiveType::Boolean)
                    && numeric(self.program, r) == Some(PrimitiveType::Boolean) =>
            {
                BOOLEAN
            }
            _ => match (numeric(self.program, l), numeric(self.program, r)) {
                (Some(a), Some(b)) => promote(a, b).map(JavaType::Primitive).unwrap_or_else(|| unresolved("")),
                _ => unresolved(""),
            },
        }
    }

    /// A simple name that lowering did not bind to a local.
    fn name(&self, name: &str, range: Range) -> (Symbol, JavaType) {
        for c in self.enclosing() {
            if let Some(f) = find_field(self.program, c, name) {
                let ty = field_as_seen(self.program, &self.this_of(c), f).unwrap_or_else(|| unresolved(name));
                return (Symbol::Field(f), ty);
            }
        }
        for owner in self.static_import_owners(name) {
            if let Some(f) = find_field(self.program, owner, name) {
                let ty = self.program.field_sig(f).map(|s| s.ty).unwrap_or_else(|| unresolved(name));
                return (Symbol::Field(f), ty);
            }
        }
        if let Some(id) = self.scope.lookup_type(name) {
            return (Symbol::Type(id), JavaType::class(id));
        }
        if self.program.index.is_package(name) {
            return (Symbol::Package(name.to_string()), JavaType::Void);
        }
        self.report(
            DiagnosticKind::UnresolvedSymbol,
            name,
            format!("cannot find symbol {name}"),
            range,
        );
        (Symbol::Unresolved(name.to_string()), unresolved(name))
    }

    fn field_access(&mut self, receiver: &mut Expr, name: &str, range: Range) -> (Symbol, JavaType) {
        let recv = self.expr(receiver, None);
        match receiver.symbol() {
            Some(Symbol::Package(pkg)) => {
                let full = format!("{pkg}.{name}");
                if let Some(id) = self.program.materialize(&full) {
                    return (Symbol::Type(id), JavaType::class(id));
                }
                if self.program.index.is_package(&full) {
                    return (Symbol::Package(full), JavaType::Void);
                }
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    &full,
                    format!("cannot find symbol {full}"),
                    range,
                );
                return (Symbol::Unresolved(full.clone()), JavaType::Unresolved(full));
            }
            Some(Symbol::Type(id)) => {
                let id = *id;
                if let Some(f) = find_field(self.program, id, name) {
                    let ty = self.program.field_sig(f).map(|s| s.ty).unwrap_or_else(|| unresolved(name));
                    return (Symbol::Field(f), ty);
                }
                if let Some(t) = member_type(self.program, id, name) {
                    return (Symbol::Type(t), JavaType::class(t));
                }
                let owner = display(self.program, &recv);
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    name,
                    format!("cannot find symbol {name} in {owner}"),
                    range,
                );
                return (Symbol::Unresolved(name.to_string()), unresolved(name));
            }
            _ => {}
        }
        if recv.is_unresolved() {
            return (Symbol::Unresolved(name.to_string()), unresolved(name));
        }
        if let JavaType::Array(_) = recv {
            if name == "length" {
                return (Symbol::ArrayLength, INT);
            }
        }
        let found = self
            .receiver_class(&recv)
            .and_then(|id| find_field(self.program, id, name));
        match found {
            Some(f) => {
                let ty = field_as_seen(self.program, &recv, f).unwrap_or_else(|| unresolved(name));
                (Symbol::Field(f), ty)
            }
            None => {
                let owner = display(self.program, &recv);
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    name,
                    format!("cannot find symbol {name} in {owner}"),
                    range,
                );
                (Symbol::Unresolved(name.to_string()), unresolved(name))
            }
        }
    }

    /// Types the non-functional arguments; lambdas and method references
    /// wait for the parameter type overload resolution picks.
    fn pre_args(&mut self, args: &mut [Expr]) -> Vec<Arg> {
        args.iter_mut()
            .map(|a| match &a.kind {
                ExprKind::Lambda { params, .. } => Arg::Functional(Some(params.len())),
                ExprKind::MethodRef { .. } => Arg::Functional(None),
                _ => Arg::Typed(self.expr(a, None)),
            })
            .collect()
    }

    fn functional_args(&mut self, args: &mut [Expr], params: &[JavaType]) {
        for (i, a) in args.iter_mut().enumerate() {
            if is_functional(a) {
                self.expr(a, params.get(i));
            }
        }
    }

    fn describe_args(&self, args: &[Arg]) -> String {
        let parts: Vec<String> = args
            .iter()
            .map(|a| match a {
                Arg::Typed(t) => display(self.program, t),
                Arg::Functional(_) => "<functional>".to_string(),
            })
            .collect();
        parts.join(", ")
    }

    /// Runs overload selection and reports failures. `subject` names the
    /// method in diagnostics.
    #[allow(clippy::too_many_arguments)]
    fn select(
        &mut self,
        subject: &str,
        candidates: &[MethodRef],
        receiver: Option<&JavaType>,
        type_args: &[JavaType],
        args: &mut [Expr],
        target: Option<&JavaType>,
        range: Range,
    ) -> (Symbol, JavaType) {
        let kinds = self.pre_args(args);
        let outcome = overload::select(
            self.program,
            candidates,
            &Call {
                receiver,
                args: &kinds,
                type_args,
                target,
            },
        );
        match outcome {
            Outcome::Found(chosen) => {
                self.functional_args(args, &chosen.expanded);
                (Symbol::Method(chosen.method), chosen.sig.return_type)
            }
            Outcome::NotApplicable => {
                self.functional_args(args, &[]);
                let described = self.describe_args(&kinds);
                self.report(
                    DiagnosticKind::NoApplicableMethod,
                    subject,
                    format!("no applicable overload of {subject} for ({described})"),
                    range,
                );
                (Symbol::Unresolved(subject.to_string()), unresolved(subject))
            }
            Outcome::Ambiguous(methods) => {
                self.functional_args(args, &[]);
                let names: Vec<String> = methods.iter().map(|m| self.program.method_name(*m)).collect();
                self.report(
                    DiagnosticKind::AmbiguousMethod,
                    subject,
                    format!("ambiguous call to {subject}: {}", names.join(", ")),
                    range,
                );
                (Symbol::Unresolved(subject.to_string()), unresolved(subject))
            }
        }
    }

    fn missing_method(&mut self, name: &str, args: &mut [Expr], report: bool, range: Range) -> (Symbol, JavaType) {
        self.pre_args(args);
        self.functional_args(args, &[]);
        if report {
            self.report(
                DiagnosticKind::UnresolvedMethod,
                name,
                format!("cannot find method {name}"),
                range,
            );
        }
        (Symbol::Unresolved(name.to_string()), unresolved(name))
    }

    fn call(
        &mut self,
        receiver: Option<&mut Expr>,
        name: &str,
        type_args: &[JavaType],
        args: &mut [Expr],
        target: Option<&JavaType>,
        range: Range,
    ) -> (Symbol, JavaType) {
        let Some(receiver) = receiver else {
            // The innermost enclosing class with a method of that name.
            for c in self.enclosing() {
                let found = methods_named(self.program, c, name);
                if !found.is_empty() {
                    let this = self.this_of(c);
                    return self.select(name, &found, Some(&this), type_args, args, target, range);
                }
            }
            let statics: Vec<MethodRef> = self
                .static_import_owners(name)
                .into_iter()
                .flat_map(|owner| methods_named(self.program, owner, name))
                .filter(|m| self.is_static_method(*m))
                .collect();
            if !statics.is_empty() {
                return self.select(name, &statics, None, type_args, args, target, range);
            }
            return self.missing_method(name, args, true, range);
        };
        let recv = self.expr(receiver, None);
        match receiver.symbol() {
            Some(Symbol::Type(id)) => {
                let id = *id;
                let found = methods_named(self.program, id, name);
                if found.is_empty() {
                    return self.missing_method(name, args, true, range);
                }
                return self.select(name, &found, None, type_args, args, target, range);
            }
            Some(Symbol::Package(_)) | Some(Symbol::Unresolved(_)) => {
                return self.missing_method(name, args, false, range);
            }
            _ => {}
        }
        if recv.is_unresolved() {
            return self.missing_method(name, args, false, range);
        }
        let found = self
            .receiver_class(&recv)
            .map(|id| methods_named(self.program, id, name))
            .unwrap_or_default();
        if found.is_empty() {
            let owner = display(self.program, &recv);
            let subject = format!("{owner}.{name}");
            return self.missing_method(&subject, args, true, range);
        }
        self.select(name, &found, Some(&recv), type_args, args, target, range)
    }

    /// The class type a `new` expression creates, diamond inferred from the
    /// target.
    fn instance_type(
        &mut self,
        outer: Option<&mut Expr>,
        declared: &TypeRef,
        target: Option<&JavaType>,
        range: Range,
    ) -> JavaType {
        let (base, args) = match declared {
            TypeRef::Generic { base, args } => (base.as_ref(), Some(args)),
            other => (other, None),
        };
        let mut ty = match outer {
            Some(o) => {
                // `outer.new Inner()` names a member of the outer value's class.
                let outer_ty = self.expr(o, None);
                let name = match base {
                    TypeRef::Raw(n) => n.clone(),
                    other => other.to_string(),
                };
                let found = self
                    .receiver_class(&outer_ty)
                    .and_then(|id| member_type(self.program, id, &name));
                match found {
                    Some(id) => JavaType::Class {
                        id,
                        args: args
                            .map(|a| a.iter().map(|t| self.resolve_type(t, range)).collect())
                            .unwrap_or_default(),
                    },
                    None if outer_ty.is_unresolved() => unresolved(&name),
                    None => self.resolve_type(base, range),
                }
            }
            None => self.resolve_type(declared, range),
        };
        let diamond = args.is_some_and(|a| a.is_empty());
        if diamond {
            if let JavaType::Class { id, args } = &mut ty {
                *args = generics::diamond(self.program, *id, target);
            }
        }
        ty
    }

    /// Selects a constructor of `ty`. Anonymous classes implementing an
    /// interface call `Object`'s.
    #[allow(clippy::too_many_arguments)]
    fn construct(
        &mut self,
        ty: &JavaType,
        anonymous: Option<TypeId>,
        keyword: &str,
        type_args: &[JavaType],
        args: &mut [Expr],
        range: Range,
        target: Option<&JavaType>,
    ) -> (Symbol, JavaType) {
        let Some(id) = ty.class_id() else {
            return self.missing_method(keyword, args, false, range);
        };
        let interface = self.program.info(id).is_some_and(|i| i.is_interface());
        let (owner, receiver) = match (anonymous, interface) {
            (Some(_), true) => match self.object_id() {
                Some(o) => (o, JavaType::class(o)),
                None => return self.missing_method(keyword, args, false, range),
            },
            _ => (id, ty.clone()),
        };
        let candidates = constructors(self.program, owner);
        let subject = self
            .program
            .info(owner)
            .map(|i| format!("{}.<init>", i.name))
            .unwrap_or_else(|| keyword.to_string());
        if candidates.is_empty() {
            return self.missing_method(&subject, args, true, range);
        }
        self.select(&subject, &candidates, Some(&receiver), type_args, args, target, range)
    }

    fn super_type(&self, qualifier: Option<&str>, range: Range) -> JavaType {
        let superclass_of = |id: TypeId| {
            self.program
                .header(id)
                .superclass
                .clone()
                .unwrap_or_else(|| self.program.object())
        };
        let Some(q) = qualifier else {
            return superclass_of(self.class);
        };
        let Some(id) = self.scope.lookup_type(q) else {
            return self.resolve_type(&TypeRef::raw(q), range);
        };
        // `Iface.super` names a direct superinterface, `Outer.super` the
        // superclass of an enclosing class.
        if self.program.info(id).is_some_and(|i| i.is_interface()) {
            let header = self.program.header(self.class);
            return header
                .interfaces
                .iter()
                .find(|i| i.class_id() == Some(id))
                .cloned()
                .unwrap_or_else(|| JavaType::class(id));
        }
        superclass_of(id)
    }

    fn lambda(&mut self, params: &[LocalId], body: &mut LambdaBody, target: Option<&JavaType>) -> (Symbol, JavaType) {
        let sam = target.and_then(|t| functional_method(self.program, t));
        for (i, id) in params.iter().enumerate() {
            let ty = match self.declared_type(*id) {
                Some(t) => t,
                None => sam
                    .as_ref()
                    .and_then(|s| s.params.get(i).cloned())
                    .unwrap_or_else(|| unresolved("")),
            };
            self.locals.insert(*id, ty);
        }
        let ret = sam.as_ref().map(|s| s.return_type.clone());
        match body {
            LambdaBody::Expr(e) => {
                let target = ret.filter(|r| *r != JavaType::Void);
                self.expr(e, target.as_ref());
            }
            LambdaBody::Block(stmts) => {
                self.returns.push(ret);
                self.stmts(stmts);
                self.returns.pop();
            }
        }
        let symbol = match &sam {
            Some(s) => Symbol::Method(s.method),
            None => Symbol::Unresolved("lambda".to_string()),
        };
        (symbol, target.cloned().unwrap_or_else(|| unresolved("lambda")))
    }

    fn ref_select(&self, candidates: &[MethodRef], recv: Option<&JavaType>, args: &[JavaType]) -> Outcome {
        let args: Vec<Arg> = args.iter().cloned().map(Arg::Typed).collect();
        overload::select(
            self.program,
            candidates,
            &Call {
                receiver: recv,
                args: &args,
                type_args: &[],
                target: None,
            },
        )
    }

    /// `Type::name`: a static method taking every functional parameter, or an
    /// instance method whose receiver is the first one.
    fn type_method_ref(&self, t: &JavaType, name: &str, params: Option<&[JavaType]>) -> (Vec<MethodRef>, Option<Outcome>) {
        let all = self
            .receiver_class(t)
            .map(|id| methods_named(self.program, id, name))
            .unwrap_or_default();
        let Some(params) = params else {
            return (all, None);
        };
        let (statics, instance): (Vec<MethodRef>, Vec<MethodRef>) =
            all.iter().partition(|m| self.is_static_method(**m));
        let outcome = match self.ref_select(&statics, None, params) {
            Outcome::Found(f) => Outcome::Found(f),
            first => match params.split_first() {
                Some((recv, rest)) if !instance.is_empty() => {
                    // The declared type is the receiver when the functional
                    // parameter is less precise (a raw or unresolved view).
                    let recv = if recv.is_unresolved() { t } else { recv };
                    match self.ref_select(&instance, Some(recv), rest) {
                        Outcome::Found(f) => Outcome::Found(f),
                        Outcome::NotApplicable => first,
                        other => other,
                    }
                }
                _ => first,
            },
        };
        (all, Some(outcome))
    }

    fn method_ref(
        &mut self,
        receiver: &mut MethodRefTarget,
        name: &str,
        target: Option<&JavaType>,
        range: Range,
    ) -> Symbol {
        let sam = target.and_then(|t| functional_method(self.program, t));
        let params: Option<&[JavaType]> = sam.as_ref().map(|s| s.params.as_slice());
        let (candidates, recv_ty, outcome) = match receiver {
            MethodRefTarget::Type { declared, ty } => {
                let t = self.resolve_type(declared, range);
                *ty = t.clone();
                if name == "new" {
                    let Some(id) = t.class_id() else {
                        // Array constructor references name no member.
                        return match t.component().and_then(JavaType::class_id) {
                            Some(e) => Symbol::Type(e),
                            None => Symbol::Unresolved(name.to_string()),
                        };
                    };
                    let ctors = constructors(self.program, id);
                    let outcome = params.map(|p| self.ref_select(&ctors, Some(&t), p));
                    (ctors, t, outcome)
                } else {
                    let (all, outcome) = self.type_method_ref(&t, name, params);
                    (all, t, outcome)
                }
            }
            MethodRefTarget::Expr(e) => {
                let t = self.expr(e, None);
                // `String::length` parses as a name; a name bound to a type
                // reads like `Type::name`.
                if matches!(e.symbol(), Some(Symbol::Type(_))) {
                    let (all, outcome) = self.type_method_ref(&t, name, params);
                    (all, t, outcome)
                } else {
                    let all = self
                        .receiver_class(&t)
                        .map(|id| methods_named(self.program, id, name))
                        .unwrap_or_default();
                    let outcome = params.map(|p| self.ref_select(&all, Some(&t), p));
                    (all, t, outcome)
                }
            }
            MethodRefTarget::Super => {
                let t = self.super_type(None, range);
                let all = self
                    .receiver_class(&t)
                    .map(|id| methods_named(self.program, id, name))
                    .unwrap_or_default();
                let outcome = params.map(|p| self.ref_select(&all, Some(&t), p));
                (all, t, outcome)
            }
        };
        if recv_ty.is_unresolved() {
            return Symbol::Unresolved(name.to_string());
        }
        let subject = format!("{}::{name}", display(self.program, &recv_ty));
        match outcome {
            Some(Outcome::Found(chosen)) => Symbol::Method(chosen.method),
            // Without a target the sole candidate is the only reading.
            None if candidates.len() == 1 => Symbol::Method(candidates[0]),
            None => Symbol::Unresolved(subject),
            Some(Outcome::Ambiguous(methods)) => {
                let names: Vec<String> = methods.iter().map(|m| self.program.method_name(*m)).collect();
                self.report(
                    DiagnosticKind::AmbiguousMethod,
                    &subject,
                    format!("ambiguous method reference {subject}: {}", names.join(", ")),
                    range,
                );
                Symbol::Unresolved(subject)
            }
            Some(Outcome::NotApplicable) => {
                let kind = if candidates.is_empty() {
                    DiagnosticKind::UnresolvedMethod
                } else {
                    DiagnosticKind::NoApplicableMethod
                };
                self.report(kind, &subject, format!("no method matches {subject}"), range);
                Symbol::Unresolved(subject)
            }
        }
    }

    /// Resolves the member bodies of a local or anonymous class, then those
    /// of its member classes, storing each in the member's body cell.
    fn resolve_local_class(&mut self, id: TypeId) {
        let entries = self.nested.borrow_mut().remove(&id);
        if let (Some(entries), Some(info)) = (entries, self.program.info(id)) {
            for (owner, mut body) in entries {
                let mut child = BodyResolver::new(self.program, &info, owner, self.nested, self.locals.clone());
                child.run(owner, &mut body);
                let cell = match owner {
                    BodyOwner::Method(m) => info.method(m.index).map(|m| &m.body),
                    BodyOwner::Field(f) => info.field(f.index).map(|f| &f.body),
                };
                if let Some(cell) = cell {
                    let _ = cell.set(Arc::new(Body::Source(body)));
                }
            }
        }
        let members: Vec<TypeId> = self
            .nested
            .borrow()
            .keys()
            .copied()
            .filter(|k| {
                self.program
                    .info(*k)
                    .is_some_and(|i| i.nesting == Nesting::Member { outer: id })
            })
            .collect();
        for m in members {
            self.resolve_local_class(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn body_of(program: &Program, class: &str, method: &str) -> Arc<Body> {
        let id = program.materialize(class).unwrap();
        let info = program.info(id).unwrap();
        let index = info.methods.iter().position(|m| m.name == method).unwrap();
        program.body(BodyOwner::Method(info.method_ref(index))).unwrap()
    }

    fn local_types(program: &Program, body: &SourceBody) -> Vec<(String, String)> {
        body.locals
            .iter()
            .map(|l| (l.name.clone(), display(program, &l.ty)))
            .collect()
    }

    fn calls(program: &Program, body: &SourceBody) -> Vec<(String, Option<String>)> {
        let mut out = vec![];
        body.walk_exprs(&mut |e| {
            if let ExprKind::Call { name, method, .. } = &e.kind {
                out.push((name.clone(), method.method().map(|m| program.method_name(m))));
            }
        });
        out
    }

    fn has_pending(body: &SourceBody) -> bool {
        let mut pending = false;
        body.walk_exprs(&mut |e| {
            if matches!(e.symbol(), Some(Symbol::Pending(_))) {
                pending = true;
            }
        });
        pending
    }

    #[test]
    fn locals_fields_and_operators_are_typed() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A { int f; String s; void m(int p) { int x = p + f; var y = s.length(); long z = x; var t = s + x; var b = x < z; } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        assert_eq!(
            local_types(&program, body),
            vec![
                ("p".to_string(), "int".to_string()),
                ("x".to_string(), "int".to_string()),
                ("y".to_string(), "int".to_string()),
                ("z".to_string(), "long".to_string()),
                ("t".to_string(), "java.lang.String".to_string()),
                ("b".to_string(), "boolean".to_string()),
            ]
        );
        assert!(!has_pending(body));
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn calls_bind_to_the_selected_overload() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A { void m() { print(\"a\"); print(1); System.out.println(2); } void print(Object o) {} void print(int i) {} }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        let found = calls(&program, body);
        assert_eq!(found[0].1.as_deref(), Some("p.A.print"));
        assert_eq!(found[1].1.as_deref(), Some("p.A.print"));
        assert_eq!(found[2].1.as_deref(), Some("java.io.PrintStream.println"));
        let mut chosen = vec![];
        body.walk_exprs(&mut |e| {
            if let ExprKind::Call { method: Symbol::Method(m), .. } = &e.kind {
                chosen.push(program.method_sig(*m).unwrap().params);
            }
        });
        assert_eq!(chosen[0], vec![program.object()]);
        assert_eq!(chosen[1], vec![INT]);
        assert_eq!(chosen[2], vec![INT]);
    }

    #[test]
    fn generic_receivers_substitute_member_types() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.*; class A { void m(List<String> xs, Map<String, Integer> counts) { var s = xs.get(0); for (String t : xs) {} for (var u : xs) {} var n = counts.get(s); var k = s.length(); } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let types = local_types(&program, body.as_source().unwrap());
        let of = |name: &str| types.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone()).unwrap();
        assert_eq!(of("s"), "java.lang.String");
        assert_eq!(of("u"), "java.lang.String");
        assert_eq!(of("n"), "java.lang.Integer");
        assert_eq!(of("k"), "int");
    }

    #[test]
    fn diamonds_and_generic_calls_use_the_target() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.*; class A { void m() { List<String> xs = new ArrayList<>(); List<Integer> ys = List.of(); var zs = List.of(\"a\", \"b\"); } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        let mut created = vec![];
        body.walk_exprs(&mut |e| {
            if matches!(e.kind, ExprKind::New { .. } | ExprKind::Call { .. }) {
                created.push(display(&program, &e.ty));
            }
        });
        assert_eq!(
            created,
            vec![
                "java.util.ArrayList<java.lang.String>",
                "java.util.List<java.lang.Integer>",
                "java.util.List<java.lang.String>",
            ]
        );
    }

    #[test]
    fn lambdas_take_parameter_types_from_the_functional_interface() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.function.*; class A { void m() { Function<String, Integer> f = s -> s.length(); Supplier<String> g = () -> \"x\"; Function<String, Integer> h = String::length; } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        let s = body.locals.iter().find(|l| l.name == "s").unwrap();
        assert_eq!(display(&program, &s.ty), "java.lang.String");
        assert_eq!(calls(&program, body)[0].1.as_deref(), Some("java.lang.String.length"));
        let mut sams = vec![];
        let mut refs = vec![];
        body.walk_exprs(&mut |e| match &e.kind {
            ExprKind::Lambda { sam, .. } => sams.push(sam.method().map(|m| program.method_name(m))),
            ExprKind::MethodRef { method, .. } => refs.push(method.method().map(|m| program.method_name(m))),
            _ => {}
        });
        assert_eq!(
            sams,
            vec![
                Some("java.util.function.Function.apply".to_string()),
                Some("java.util.function.Supplier.get".to_string()),
            ]
        );
        assert_eq!(refs, vec![Some("java.lang.String.length".to_string())]);
    }

    #[test]
    fn method_references_bind_static_unbound_and_bound_forms() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import java.util.function.*; class A { void m() { Function<Object, String> v = String::valueOf; Function<String, Integer> n = String::length; Supplier<Integer> b = \"x\"::length; } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        let mut refs = vec![];
        body.walk_exprs(&mut |e| {
            if let ExprKind::MethodRef { method, .. } = &e.kind {
                refs.push(method.method().map(|m| {
                    let static_ = program.with_method(m, |_, mi| mi.is_static()).unwrap();
                    (program.method_name(m), static_)
                }));
            }
        });
        assert_eq!(
            refs,
            vec![
                Some(("java.lang.String.valueOf".to_string(), true)),
                Some(("java.lang.String.length".to_string(), false)),
                Some(("java.lang.String.length".to_string(), false)),
            ]
        );
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_names_are_reported_once_without_cascading() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A { void m() { Missing x = null; x.foo(); x.bar = 1; undefined(1); gone.call(); } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let kinds: Vec<(DiagnosticKind, String)> = program
            .diagnostics
            .sorted()
            .into_iter()
            .map(|d| (d.kind, d.subject))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (DiagnosticKind::UnresolvedType, "Missing".to_string()),
                (DiagnosticKind::UnresolvedMethod, "undefined".to_string()),
                (DiagnosticKind::UnresolvedSymbol, "gone".to_string()),
            ]
        );
        assert!(!has_pending(body.as_source().unwrap()));
    }

    #[test]
    fn anonymous_class_bodies_see_captured_locals() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; class A { void m(String p) { Runnable r = new Runnable() { public void run() { p.length(); } }; } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let mut created = None;
        body.as_source().unwrap().walk_exprs(&mut |e| {
            if let ExprKind::New { constructor, anonymous, .. } = &e.kind {
                created = Some((constructor.method().map(|m| program.method_name(m)), *anonymous));
            }
        });
        let (constructor, anonymous) = created.unwrap();
        assert_eq!(constructor.as_deref(), Some("java.lang.Object.<init>"));
        let anon = program.info(anonymous.unwrap()).unwrap();
        let run = body_of(&program, &anon.binary_name, "run");
        let found = calls(&program, run.as_source().unwrap());
        assert_eq!(found[0].1.as_deref(), Some("java.lang.String.length"));
    }

    #[test]
    fn enum_switch_labels_bind_to_constants() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; enum Color { RED, GREEN } class A { int m(Color c) { return switch (c) { case RED -> 1; case GREEN -> { yield 2; } }; } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let mut labels = vec![];
        let mut switch_ty = None;
        body.as_source().unwrap().walk_exprs(&mut |e| match &e.kind {
            ExprKind::Name { name, symbol: Symbol::Field(_) } => labels.push(name.clone()),
            ExprKind::Switch(_) => switch_ty = Some(e.ty.clone()),
            _ => {}
        });
        assert_eq!(labels, vec!["RED", "GREEN"]);
        assert_eq!(switch_ty, Some(INT));
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn static_imports_supply_methods_and_patterns_bind() {
        let program = testing::program(&[(
            "p/A.java",
            "package p; import static java.lang.Math.max; class A { long m(Object o, long a) { if (o instanceof String s && s.isEmpty()) {} return max(a, 1); } }",
        )]);
        let body = body_of(&program, "p.A", "m");
        let body = body.as_source().unwrap();
        let s = body.locals.iter().find(|l| l.name == "s").unwrap();
        assert_eq!(display(&program, &s.ty), "java.lang.String");
        let mut max = None;
        body.walk_exprs(&mut |e| {
            if let ExprKind::Call { name, method: Symbol::Method(m), .. } = &e.kind {
                if name == "max" {
                    max = program.method_sig(*m);
                }
            }
        });
        let max = max.unwrap();
        assert_eq!(max.params, vec![JavaType::Primitive(PrimitiveType::Long); 2]);
    }
}
