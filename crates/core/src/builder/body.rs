//! Lowering of member bodies from syntax trees to model bodies.
//!
//! Locals are bound here by scope; every other name is left pending for the
//! resolver. Local and anonymous classes met along the way are built into the
//! arena, and their member bodies are lowered in the same pass so that they
//! see the locals they capture.

use super::source::{self, SourceType};
use super::synthetic::CONSTRUCTOR;
use crate::index::UnitContext;
use crate::model::body::{
    Case, CaseLabel, Catch, Expr, ExprKind, LambdaBody, LocalKind, LocalVar, MethodRefTarget,
    Pattern, Resource, SourceBody, Stmt, StmtKind, Switch, Symbol,
};
use crate::model::{BodyOwner, BodySource, DeclContext, LocalTypeScope, MethodInfo, Nesting, TypeInfo};
use crate::program::Program;
use jinspect_api::models::{JavaType, LocalId, MethodRef, Range, TypeId, TypeRef};
use jinspect_java::ast;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Bodies of members of local and anonymous classes, keyed by class.
pub(crate) type NestedBodies = HashMap<TypeId, Vec<(BodyOwner, SourceBody)>>;

pub(crate) struct Lowered {
    pub body: SourceBody,
    pub nested: NestedBodies,
}

enum Frame {
    Locals(HashMap<String, LocalId>),
    /// Field names of a local or anonymous class; they hide outer locals.
    Members(HashSet<String>),
}

/// Lowers the body of a member of a top-level or member type. Members of
/// local classes are lowered with the body that declares the class.
pub(crate) fn lower(program: &Program, info: &TypeInfo, owner: BodyOwner) -> Option<Lowered> {
    let DeclContext::Source { unit, local: None } = &info.context else {
        return None;
    };
    let mut lowerer = Lowerer {
        program,
        unit: Arc::clone(unit),
        this_type: info.id,
        method: None,
        owner,
        scopes: Vec::new(),
        locals: Vec::new(),
        local_types: Vec::new(),
        nested: HashMap::new(),
    };
    let body = match owner {
        BodyOwner::Method(m) => {
            let method = info.method(m.index)?;
            let BodySource::Block(block) = &method.source else {
                return None;
            };
            lowerer.method = Some(m);
            lowerer.method_body(method, block)
        }
        BodyOwner::Field(f) => {
            let field = info.field(f.index)?;
            lowerer.field_body(&info.binary_name, &field.init)?
        }
    };
    Some(Lowered {
        body,
        nested: lowerer.nested,
    })
}

struct Lowerer<'p> {
    program: &'p Program,
    unit: Arc<UnitContext>,
    /// Class whose member is being lowered.
    this_type: TypeId,
    method: Option<MethodRef>,
    owner: BodyOwner,
    scopes: Vec<Frame>,
    locals: Vec<LocalVar>,
    /// Local classes in scope, innermost last.
    local_types: Vec<(String, TypeId)>,
    nested: NestedBodies,
}

impl Lowerer<'_> {
    /// Runs `f` against an empty local table and returns the body it built.
    /// Outer scopes stay visible for captures.
    fn fresh_body(&mut self, f: impl FnOnce(&mut Self) -> (Vec<LocalId>, Vec<Stmt>)) -> SourceBody {
        let saved = std::mem::take(&mut self.locals);
        let types = self.local_types.len();
        let depth = self.scopes.len();
        self.scopes.push(Frame::Locals(HashMap::new()));
        let (params, stmts) = f(self);
        self.scopes.truncate(depth);
        self.local_types.truncate(types);
        let locals = std::mem::replace(&mut self.locals, saved);
        SourceBody {
            params,
            locals,
            stmts,
        }
    }

    fn method_body(&mut self, method: &MethodInfo, block: &ast::Block) -> SourceBody {
        let range = method.location.as_ref().map(|l| l.range).unwrap_or_default();
        self.fresh_body(|this| {
            let params = method
                .params
                .iter()
                .map(|p| this.declare(&p.name, LocalKind::Parameter, Some(p.ty.clone()), range))
                .collect();
            (params, this.stmts(&block.stmts))
        })
    }

    fn field_body(&mut self, binary: &str, init: &BodySource) -> Option<SourceBody> {
        match init {
            BodySource::Expr(e) => Some(self.fresh_body(|this| {
                let e = this.expr(e);
                (vec![], vec![expr_stmt(e)])
            })),
            BodySource::Constant(c) => Some(self.fresh_body(|this| {
                let e = this.enum_constant(binary, c);
                (vec![], vec![expr_stmt(e)])
            })),
            _ => None,
        }
    }

    /// An enum constant is lowered as the instance creation it stands for.
    fn enum_constant(&mut self, binary: &str, constant: &ast::EnumConstant) -> Expr {
        let args = self.exprs(&constant.arguments);
        let declared = TypeRef::id(binary);
        let anonymous = constant
            .body
            .as_deref()
            .map(|b| self.local_class(b, Some(declared.clone())));
        Expr::new(
            ExprKind::New {
                outer: None,
                declared,
                type_args: vec![],
                args,
                constructor: Symbol::Pending(CONSTRUCTOR.to_string()),
                anonymous,
            },
            constant.range,
        )
    }

    fn declare(&mut self, name: &str, kind: LocalKind, declared: Option<TypeRef>, range: Range) -> LocalId {
        let id = self.program.next_local();
        self.locals.push(LocalVar {
            id,
            name: name.to_string(),
            kind,
            declared,
            ty: JavaType::Unresolved(String::new()),
            range,
        });
        if !matches!(self.scopes.last(), Some(Frame::Locals(_))) {
            self.scopes.push(Frame::Locals(HashMap::new()));
        }
        if let Some(Frame::Locals(map)) = self.scopes.last_mut() {
            map.insert(name.to_string(), id);
        }
        id
    }

    fn lookup(&self, name: &str) -> Option<LocalId> {
        for frame in self.scopes.iter().rev() {
            match frame {
                Frame::Locals(map) => {
                    if let Some(id) = map.get(name) {
                        return Some(*id);
                    }
                }
                Frame::Members(fields) if fields.contains(name) => return None,
                Frame::Members(_) => {}
            }
        }
        None
    }

    /// Runs `f` in a nested scope; locals and local classes declared inside
    /// do not outlive it.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.scopes.len();
        let types = self.local_types.len();
        self.scopes.push(Frame::Locals(HashMap::new()));
        let out = f(self);
        self.scopes.truncate(depth);
        self.local_types.truncate(types);
        out
    }

    fn block(&mut self, stmts: &[ast::Stmt]) -> Vec<Stmt> {
        self.scoped(|this| this.stmts(stmts))
    }

    fn stmts(&mut self, stmts: &[ast::Stmt]) -> Vec<Stmt> {
        stmts.iter().map(|s| self.stmt(s)).collect()
    }

    /// A statement in a position where its declarations cannot escape
    /// (loop and branch bodies).
    fn sub_stmt(&mut self, stmt: &ast::Stmt) -> Box<Stmt> {
        Box::new(self.scoped(|this| this.stmt(stmt)))
    }

    fn stmt(&mut self, stmt: &ast::Stmt) -> Stmt {
        use ast::StmtKind as S;
        let kind = match &stmt.kind {
            S::Empty => StmtKind::Empty,
            S::Block(b) => StmtKind::Block(self.block(&b.stmts)),
            S::LocalVar(decl) => StmtKind::LocalVar(self.local_var(decl)),
            S::LocalClass(decl) => StmtKind::LocalClass(self.local_class(decl, None)),
            S::Expr(e) => StmtKind::Expr(self.expr(e)),
            S::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.expr(cond),
                then_branch: self.sub_stmt(then_branch),
                else_branch: else_branch.as_deref().map(|s| self.sub_stmt(s)),
            },
            S::While { cond, body } => StmtKind::While {
                cond: self.expr(cond),
                body: self.sub_stmt(body),
            },
            S::DoWhile { body, cond } => {
                let body = self.sub_stmt(body);
                StmtKind::DoWhile {
                    body,
                    cond: self.expr(cond),
                }
            }
            S::For {
                init,
                cond,
                update,
                body,
            } => self.scoped(|this| StmtKind::For {
                init: this.stmts(init),
                cond: cond.as_ref().map(|c| this.expr(c)),
                update: this.exprs(update),
                body: this.sub_stmt(body),
            }),
            S::ForEach {
                ty,
                name,
                iterable,
                body,
                ..
            } => {
                let iterable = self.expr(iterable);
                self.scoped(|this| {
                    let var = this.declare(name, LocalKind::ForEach, ty.clone(), stmt.range);
                    StmtKind::ForEach {
                        var,
                        iterable,
                        body: this.sub_stmt(body),
                    }
                })
            }
            S::Return(e) => StmtKind::Return(e.as_ref().map(|e| self.expr(e))),
            S::Throw(e) => StmtKind::Throw(self.expr(e)),
            S::Break(l) => StmtKind::Break(l.clone()),
            S::Continue(l) => StmtKind::Continue(l.clone()),
            S::Yield(e) => StmtKind::Yield(self.expr(e)),
            S::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                let (resources, body) = self.scoped(|this| {
                    let resources = resources.iter().map(|r| this.resource(r)).collect();
                    (resources, this.block(&body.stmts))
                });
                let catches = catches.iter().map(|c| self.catch(c)).collect();
                StmtKind::Try {
                    resources,
                    body,
                    catches,
                    finally: finally.as_ref().map(|f| self.block(&f.stmts)),
                }
            }
            S::Switch(sw) => StmtKind::Switch(Box::new(self.switch(sw))),
            S::Synchronized { lock, body } => StmtKind::Synchronized {
                lock: self.expr(lock),
                body: self.block(&body.stmts),
            },
            S::Labeled { label, body } => StmtKind::Labeled {
                label: label.clone(),
                body: self.sub_stmt(body),
            },
            S::Assert { cond, message } => StmtKind::Assert {
                cond: self.expr(cond),
                message: message.as_ref().map(|m| self.expr(m)),
            },
            S::ConstructorCall {
                is_super,
                qualifier,
                type_args,
                args,
            } => StmtKind::ConstructorCall {
                is_super: *is_super,
                qualifier: qualifier.as_ref().map(|q| self.expr(q)),
                type_args: type_args.clone(),
                args: self.exprs(args),
                constructor: Symbol::Pending(CONSTRUCTOR.to_string()),
            },
        };
        Stmt {
            kind,
            range: stmt.range,
        }
    }

    fn local_var(&mut self, decl: &ast::LocalVarDecl) -> Vec<(LocalId, Option<Expr>)> {
        decl.declarators
            .iter()
            .map(|d| {
                let init = d.init.as_ref().map(|e| self.expr(e));
                let declared = decl.ty.clone().map(|t| t.array_of(d.dims));
                (self.declare(&d.name, LocalKind::Local, declared, d.range), init)
            })
            .collect()
    }

    fn resource(&mut self, resource: &ast::Resource) -> Resource {
        match resource {
            ast::Resource::Decl {
                ty,
                name,
                init,
                range,
                ..
            } => {
                let init = self.expr(init);
                let local = self.declare(name, LocalKind::Resource, ty.clone(), *range);
                Resource::Decl { local, init }
            }
            ast::Resource::Expr(e) => Resource::Expr(self.expr(e)),
        }
    }

    fn catch(&mut self, clause: &ast::CatchClause) -> Catch {
        self.scoped(|this| {
            let declared = match clause.types.as_slice() {
                [single] => Some(single.clone()),
                _ => None,
            };
            let param = this.declare(&clause.name, LocalKind::CatchParameter, declared, clause.range);
            Catch {
                param,
                declared: clause.types.clone(),
                types: vec![],
                body: this.block(&clause.body.stmts),
                range: clause.range,
            }
        })
    }

    fn switch(&mut self, sw: &ast::SwitchBody) -> Switch {
        let selector = self.expr(&sw.selector);
        // Declarations in a colon-form case group stay visible to later groups.
        let cases = self.scoped(|this| {
            sw.cases
                .iter()
                .map(|case| {
                    let lower = |this: &mut Self| {
                        let labels = case.labels.iter().map(|l| this.case_label(l)).collect();
                        let guard = case.guard.as_ref().map(|g| this.expr(g));
                        Case {
                            labels,
                            guard,
                            body: this.stmts(&case.body),
                            range: case.range,
                        }
                    };
                    if sw.arrow {
                        this.scoped(lower)
                    } else {
                        lower(this)
                    }
                })
                .collect()
        });
        Switch {
            selector,
            arrow: sw.arrow,
            cases,
        }
    }

    fn case_label(&mut self, label: &ast::CaseLabel) -> CaseLabel {
        match label {
            ast::CaseLabel::Default => CaseLabel::Default,
            ast::CaseLabel::Expr(e) => CaseLabel::Expr(self.expr(e)),
            ast::CaseLabel::Pattern(p) => CaseLabel::Pattern(self.pattern(p)),
        }
    }

    /// Bindings go into the current scope, which makes them visible where
    /// flow scoping would (`if (!(o instanceof T t)) return; t.m();`).
    fn pattern(&mut self, pattern: &ast::Pattern) -> Pattern {
        match pattern {
            ast::Pattern::Type { ty, name, range } => Pattern::Type {
                declared: ty.clone(),
                ty: JavaType::Unresolved(String::new()),
                binding: name
                    .as_ref()
                    .map(|n| self.declare(n, LocalKind::Pattern, Some(ty.clone()), *range)),
                range: *range,
            },
            ast::Pattern::Record {
                ty,
                components,
                range,
            } => Pattern::Record {
                declared: ty.clone(),
                ty: JavaType::Unresolved(String::new()),
                components: components.iter().map(|c| self.pattern(c)).collect(),
                range: *range,
            },
        }
    }

    fn exprs(&mut self, exprs: &[ast::Expr]) -> Vec<Expr> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&mut self, e: &ast::Expr) -> Box<Expr> {
        Box::new(self.expr(e))
    }

    fn expr(&mut self, expr: &ast::Expr) -> Expr {
        use ast::ExprKind as E;
        let kind = match &expr.kind {
            E::Literal(l) => ExprKind::Literal(l.clone()),
            E::Name(name) => ExprKind::Name {
                name: name.clone(),
                symbol: match self.lookup(name) {
                    Some(id) => Symbol::Local(id),
                    None => Symbol::Pending(name.clone()),
                },
            },
            E::FieldAccess { target, name } => ExprKind::FieldAccess {
                target: self.boxed(target),
                name: name.clone(),
                symbol: Symbol::Pending(name.clone()),
            },
            E::MethodCall {
                target,
                type_args,
                name,
                args,
            } => ExprKind::Call {
                target: target.as_deref().map(|t| self.boxed(t)),
                name: name.clone(),
                type_args: type_args.clone(),
                args: self.exprs(args),
                method: Symbol::Pending(name.clone()),
            },
            E::New {
                outer,
                ty,
                type_args,
                args,
                body,
            } => {
                let outer = outer.as_deref().map(|o| self.boxed(o));
                let args = self.exprs(args);
                let anonymous = body.as_deref().map(|b| self.local_class(b, Some(ty.clone())));
                ExprKind::New {
                    outer,
                    declared: ty.clone(),
                    type_args: type_args.clone(),
                    args,
                    constructor: Symbol::Pending(CONSTRUCTOR.to_string()),
                    anonymous,
                }
            }
            E::NewArray {
                element,
                dims,
                extra_dims,
                init,
            } => ExprKind::NewArray {
                element: element.clone(),
                dims: self.exprs(dims),
                extra_dims: *extra_dims,
                init: init.as_ref().map(|i| self.exprs(i)),
            },
            E::ArrayInit(items) => ExprKind::ArrayInit(self.exprs(items)),
            E::ArrayAccess { array, index } => ExprKind::ArrayAccess {
                array: self.boxed(array),
                index: self.boxed(index),
            },
            E::Assign { op, target, value } => ExprKind::Assign {
                op: *op,
                target: self.boxed(target),
                value: self.boxed(value),
            },
            E::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: self.boxed(lhs),
                rhs: self.boxed(rhs),
            },
            E::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: self.boxed(operand),
            },
            E::Conditional {
                cond,
                then_expr,
                else_expr,
            } => ExprKind::Conditional {
                cond: self.boxed(cond),
                then_expr: self.boxed(then_expr),
                else_expr: self.boxed(else_expr),
            },
            E::Cast {
                ty,
                extra_bounds,
                expr,
            } => ExprKind::Cast {
                declared: ty.clone(),
                extra_bounds: extra_bounds.clone(),
                expr: self.boxed(expr),
            },
            E::InstanceOf { expr, pattern } => ExprKind::InstanceOf {
                expr: self.boxed(expr),
                pattern: self.pattern(pattern),
            },
            E::Lambda { params, body } => self.scoped(|this| {
                let params = params
                    .iter()
                    .map(|p| this.declare(&p.name, LocalKind::LambdaParameter, p.ty.clone(), p.range))
                    .collect();
                let body = match body {
                    ast::LambdaBody::Expr(e) => LambdaBody::Expr(this.boxed(e)),
                    ast::LambdaBody::Block(b) => LambdaBody::Block(this.block(&b.stmts)),
                };
                ExprKind::Lambda {
                    params,
                    body,
                    sam: Symbol::Pending(String::new()),
                }
            }),
            E::MethodRef { target, name, .. } => ExprKind::MethodRef {
                target: match target {
                    ast::MethodRefTarget::Expr(e) => MethodRefTarget::Expr(self.boxed(e)),
                    ast::MethodRefTarget::Type(t) => MethodRefTarget::Type {
                        declared: t.clone(),
                        ty: JavaType::Unresolved(String::new()),
                    },
                    ast::MethodRefTarget::Super { .. } => MethodRefTarget::Super,
                },
                name: name.clone(),
                method: Symbol::Pending(name.clone()),
            },
            E::This { qualifier } => ExprKind::This {
                qualifier: qualifier.clone(),
            },
            E::Super { qualifier } => ExprKind::Super {
                qualifier: qualifier.clone(),
            },
            E::ClassLiteral(t) => ExprKind::ClassLiteral(t.clone()),
            E::Switch(sw) => ExprKind::Switch(Box::new(self.switch(sw))),
            E::Parens(inner) => return self.expr(inner),
            E::Unsupported(text) => ExprKind::Unsupported(text.clone()),
        };
        Expr::new(kind, expr.range)
    }

    /// Builds a local class (`anonymous_super` is `None`) or an anonymous
    /// class into the arena, then lowers its member bodies.
    fn local_class(&mut self, decl: &ast::TypeDecl, anonymous_super: Option<TypeRef>) -> TypeId {
        let anonymous = anonymous_super.is_some();
        let binary = match self.unit.local_names.get(&decl.range) {
            Some(name) => name.clone(),
            None => {
                let outer = self
                    .program
                    .info(self.this_type)
                    .map(|i| i.binary_name.clone())
                    .unwrap_or_default();
                format!("{outer}$${}", self.program.next_local().0)
            }
        };
        // A local class can name itself from its own body.
        if !anonymous {
            let id = self.program.arena.reserve(&binary).id;
            self.local_types.push((decl.name.clone(), id));
        }
        let scope = Arc::new(LocalTypeScope {
            method: self.method,
            owner: Some(self.owner),
            local_types: self.local_types.clone(),
        });
        let nesting = if anonymous {
            Nesting::Anonymous {
                outer: self.this_type,
            }
        } else {
            Nesting::Local {
                outer: self.this_type,
            }
        };
        let unit = Arc::clone(&self.unit);
        let id = self.program.insert_local(&binary, |id| {
            source::build_type(
                id,
                SourceType {
                    unit: &unit,
                    decl,
                    binary: binary.clone(),
                    canonical: binary.clone(),
                    nesting,
                    in_interface: false,
                    anonymous_super,
                    local: Some(Arc::clone(&scope)),
                },
            )
        });
        self.member_classes(id, decl, &binary, &scope);
        self.class_bodies(id);
        id
    }

    fn member_classes(&mut self, outer: TypeId, decl: &ast::TypeDecl, binary: &str, scope: &Arc<LocalTypeScope>) {
        for member in decl.member_types() {
            let name = format!("{binary}${}", member.name);
            let unit = Arc::clone(&self.unit);
            let id = self.program.insert_local(&name, |id| {
                source::build_type(
                    id,
                    SourceType {
                        unit: &unit,
                        decl: member,
                        binary: name.clone(),
                        canonical: name.clone(),
                        nesting: Nesting::Member { outer },
                        in_interface: decl.kind.is_interface_like(),
                        anonymous_super: None,
                        local: Some(Arc::clone(scope)),
                    },
                )
            });
            self.member_classes(id, member, &name, scope);
            self.class_bodies(id);
        }
    }

    fn class_bodies(&mut self, id: TypeId) {
        let Some(info) = self.program.info(id) else {
            return;
        };
        let fields = info.fields.iter().map(|f| f.name.clone()).collect();
        let depth = self.scopes.len();
        self.scopes.push(Frame::Members(fields));
        let saved = (self.this_type, self.method);
        self.this_type = id;

        let mut lowered = Vec::new();
        for (i, m) in info.methods.iter().enumerate() {
            if let BodySource::Block(block) = &m.source {
                let mref = info.method_ref(i);
                self.method = Some(mref);
                lowered.push((BodyOwner::Method(mref), self.method_body(m, block)));
            }
        }
        self.method = None;
        for (i, f) in info.fields.iter().enumerate() {
            if let Some(body) = self.field_body(&info.binary_name, &f.init) {
                lowered.push((BodyOwner::Field(info.field_ref(i)), body));
            }
        }

        self.scopes.truncate(depth);
        (self.this_type, self.method) = saved;
        self.nested.entry(id).or_default().extend(lowered);
    }
}

fn expr_stmt(e: Expr) -> Stmt {
    Stmt {
        range: e.range,
        kind: StmtKind::Expr(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinspect_java::JavaParser;

    fn program_with(src: &str) -> Program {
        let program = Program::new(Default::default());
        let parsed = JavaParser::new().unwrap().parse("T.java", src).unwrap();
        program
            .index
            .register_source(Arc::new(UnitContext::new(parsed, 0)), &program.diagnostics);
        program
    }

    fn lower_method(program: &Program, class: &str, name: &str) -> Lowered {
        let id = program.materialize(class).unwrap();
        let info = program.info(id).unwrap();
        let index = info.methods.iter().position(|m| m.name == name).unwrap();
        lower(program, &info, BodyOwner::Method(info.method_ref(index))).unwrap()
    }

    fn names(body: &SourceBody) -> Vec<(String, Symbol)> {
        let mut out = Vec::new();
        body.walk_exprs(&mut |e| {
            if let ExprKind::Name { name, symbol } = &e.kind {
                out.push((name.clone(), symbol.clone()));
            }
        });
        out
    }

    #[test]
    fn locals_bind_by_scope() {
        let program = program_with(
            "class A { int x; void m(int p) { int y = p; { int x = 1; use(x); } use(x); for (int i = 0; i < y; i++) {} } }",
        );
        let lowered = lower_method(&program, "A", "m");
        let body = &lowered.body;
        assert_eq!(body.params.len(), 1);
        let kinds: Vec<_> = body.locals.iter().map(|l| (l.name.as_str(), l.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("p", LocalKind::Parameter),
                ("y", LocalKind::Local),
                ("x", LocalKind::Local),
                ("i", LocalKind::Local),
            ]
        );
        let syms = names(body);
        let xs: Vec<_> = syms.iter().filter(|(n, _)| n == "x").map(|(_, s)| s).collect();
        assert!(matches!(xs[0], Symbol::Local(_)));
        assert_eq!(xs[1], &Symbol::Pending("x".into()));
    }

    #[test]
    fn pattern_bindings_flow_into_following_statements() {
        let program = program_with(
            "class A { void m(Object o) { if (!(o instanceof String s)) return; s.length(); } }",
        );
        let lowered = lower_method(&program, "A", "m");
        let s = lowered.body.locals.iter().find(|l| l.name == "s").unwrap();
        assert_eq!(s.kind, LocalKind::Pattern);
        assert!(names(&lowered.body).contains(&("s".to_string(), Symbol::Local(s.id))));
    }

    #[test]
    fn anonymous_class_captures_locals_and_sees_own_fields() {
        let program = program_with(
            "package p; class Outer { void m(int n) { Runnable r = new Runnable() { int k; public void run() { use(n); use(k); } }; } }",
        );
        let lowered = lower_method(&program, "p.Outer", "m");
        let anon = program.arena.id_of("p.Outer$1").unwrap();
        let info = program.info(anon).unwrap();
        assert!(info.is_anonymous());
        assert_eq!(info.superclass, Some(TypeRef::raw("Runnable")));
        let nested = &lowered.nested[&anon];
        assert_eq!(nested.len(), 1);
        let run = &nested[0].1;
        assert!(run.locals.is_empty());
        let syms = names(run);
        let n = lowered.body.params[0];
        assert_eq!(syms[0], ("n".to_string(), Symbol::Local(n)));
        assert_eq!(syms[1], ("k".to_string(), Symbol::Pending("k".into())));
        // Lowering the owner body never touches the local class's own cells.
        assert!(info.methods.iter().all(|m| m.body.get().is_none()));
    }

    #[test]
    fn local_class_is_visible_to_later_statements_only_within_its_block() {
        let program = program_with("class A { void m() { { class Helper {} } class Helper { Helper self() { return this; } } } }");
        let lowered = lower_method(&program, "A", "m");
        assert!(program.arena.id_of("A$1Helper").is_some());
        let second = program.arena.id_of("A$2Helper").unwrap();
        let info = program.info(second).unwrap();
        assert_eq!(info.nesting, Nesting::Local { outer: program.arena.id_of("A").unwrap() });
        let DeclContext::Source { local: Some(scope), .. } = &info.context else {
            panic!("local class without a scope");
        };
        assert_eq!(scope.local_types, vec![("Helper".to_string(), second)]);
        assert_eq!(scope.owner, Some(BodyOwner::Method(MethodRef { owner: program.arena.id_of("A").unwrap(), index: 0 })));
        assert!(matches!(lowered.body.stmts[1].kind, StmtKind::LocalClass(id) if id == second));
    }

    #[test]
    fn enum_constants_lower_to_instance_creation() {
        let program = program_with("enum Op { PLUS(1) { int apply() { return 1; } }; Op(int x) {} }");
        let id = program.materialize("Op").unwrap();
        let info = program.info(id).unwrap();
        let lowered = lower(&program, &info, BodyOwner::Field(info.field_ref(0))).unwrap();
        let StmtKind::Expr(e) = &lowered.body.stmts[0].kind else {
            panic!("constant body is not an expression");
        };
        let ExprKind::New { declared, args, anonymous, .. } = &e.kind else {
            panic!("constant is not an instance creation");
        };
        assert_eq!(declared, &TypeRef::id("Op"));
        assert_eq!(args.len(), 1);
        assert_eq!(*anonymous, program.arena.id_of("Op$1"));
    }
}
