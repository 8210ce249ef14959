//! Statement and expression nodes of materialized bodies.
//!
//! The builder produces these with locals already bound and every other name
//! left as [`Symbol::Pending`]; the resolver then fills symbols and the `ty`
//! slot of each expression. A resolved body never contains `Pending`.

use jinspect_api::models::{FieldRef, JavaType, LocalId, MethodRef, Range, TypeId, TypeRef};
use jinspect_bytecode::{ExceptionHandler, Instruction};

pub use jinspect_java::ast::{AssignOp, BinaryOp, Literal, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Source(SourceBody),
    Bytecode(BytecodeBody),
}

impl Body {
    pub fn as_source(&self) -> Option<&SourceBody> {
        match self {
            Body::Source(b) => Some(b),
            Body::Bytecode(_) => None,
        }
    }

    pub fn as_bytecode(&self) -> Option<&BytecodeBody> {
        match self {
            Body::Bytecode(b) => Some(b),
            Body::Source(_) => None,
        }
    }
}

/// What a name denotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Not yet looked at by the resolver.
    Pending(String),
    Local(LocalId),
    Field(FieldRef),
    /// `length` of an array.
    ArrayLength,
    Method(MethodRef),
    Type(TypeId),
    Package(String),
    /// Lookup failed; a diagnostic was recorded.
    Unresolved(String),
}

impl Symbol {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Symbol::Pending(_) | Symbol::Unresolved(_))
    }

    pub fn method(&self) -> Option<MethodRef> {
        match self {
            Symbol::Method(m) => Some(*m),
            _ => None,
        }
    }

    pub fn field(&self) -> Option<FieldRef> {
        match self {
            Symbol::Field(f) => Some(*f),
            _ => None,
        }
    }

    pub fn local(&self) -> Option<LocalId> {
        match self {
            Symbol::Local(l) => Some(*l),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    Parameter,
    Local,
    Resource,
    CatchParameter,
    ForEach,
    Pattern,
    LambdaParameter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub id: LocalId,
    pub name: String,
    pub kind: LocalKind,
    /// `None` for `var`, inferred lambda parameters and patterns-by-position.
    pub declared: Option<TypeRef>,
    pub ty: JavaType,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceBody {
    pub params: Vec<LocalId>,
    /// Every variable declared in this body, lambda parameters and pattern
    /// bindings included, in declaration order.
    pub locals: Vec<LocalVar>,
    pub stmts: Vec<Stmt>,
}

impl SourceBody {
    pub fn local(&self, id: LocalId) -> Option<&LocalVar> {
        self.locals.iter().find(|l| l.id == id)
    }

    /// Depth-first walk over every expression, nested lambda bodies included.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        for s in &self.stmts {
            s.walk_exprs(f);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Block(Vec<Stmt>),
    LocalVar(Vec<(LocalId, Option<Expr>)>),
    /// The declared class lives in the arena; its bodies are resolved with this one.
    LocalClass(TypeId),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        var: LocalId,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break(Option<String>),
    Continue(Option<String>),
    Yield(Expr),
    Try {
        resources: Vec<Resource>,
        body: Vec<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Vec<Stmt>>,
    },
    Switch(Box<Switch>),
    Synchronized {
        lock: Expr,
        body: Vec<Stmt>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    ConstructorCall {
        is_super: bool,
        qualifier: Option<Expr>,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        constructor: Symbol,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Decl { local: LocalId, init: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub param: LocalId,
    pub declared: Vec<TypeRef>,
    /// One per alternative of a multi-catch.
    pub types: Vec<JavaType>,
    pub body: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub selector: Expr,
    pub arrow: bool,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub labels: Vec<CaseLabel>,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Default,
    Expr(Expr),
    Pattern(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Type {
        declared: TypeRef,
        ty: JavaType,
        binding: Option<LocalId>,
        range: Range,
    },
    Record {
        declared: TypeRef,
        ty: JavaType,
        components: Vec<Pattern>,
        range: Range,
    },
}

impl Pattern {
    pub fn ty(&self) -> &JavaType {
        match self {
            Pattern::Type { ty, .. } | Pattern::Record { ty, .. } => ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Inferred type; `Unresolved` until the resolver has visited the node.
    pub ty: JavaType,
    pub range: Range,
}

impl Expr {
    pub fn new(kind: ExprKind, range: Range) -> Self {
        Self {
            kind,
            ty: JavaType::Unresolved(String::new()),
            range,
        }
    }

    /// The symbol this expression denotes directly, if it is a name, field
    /// access, call or creation.
    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Name { symbol, .. } | ExprKind::FieldAccess { symbol, .. } => Some(symbol),
            ExprKind::Call { method, .. } => Some(method),
            ExprKind::New { constructor, .. } => Some(constructor),
            ExprKind::MethodRef { method, .. } => Some(method),
            _ => None,
        }
    }

    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        let mut each = |e: &'a Expr| e.walk_exprs(f);
        match &self.kind {
            ExprKind::FieldAccess { target, .. } => each(target),
            ExprKind::Call { target, args, .. } => {
                if let Some(t) = target {
                    each(t);
                }
                args.iter().for_each(each);
            }
            ExprKind::New { outer, args, .. } => {
                if let Some(o) = outer {
                    each(o);
                }
                args.iter().for_each(each);
            }
            ExprKind::NewArray { dims, init, .. } => {
                dims.iter().for_each(&mut each);
                if let Some(init) = init {
                    init.iter().for_each(each);
                }
            }
            ExprKind::ArrayInit(items) => items.iter().for_each(each),
            ExprKind::ArrayAccess { array, index } => {
                each(array);
                each(index);
            }
            ExprKind::Assign { target, value, .. } => {
                each(target);
                each(value);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                each(lhs);
                each(rhs);
            }
            ExprKind::Unary { operand, .. } => each(operand),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                each(cond);
                each(then_expr);
                each(else_expr);
            }
            ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => each(expr),
            ExprKind::Lambda { body, .. } => match body {
                LambdaBody::Expr(e) => each(e),
                LambdaBody::Block(stmts) => stmts.iter().for_each(|s| s.walk_exprs(f)),
            },
            ExprKind::MethodRef {
                target: MethodRefTarget::Expr(e),
                ..
            } => each(e),
            ExprKind::Switch(sw) => sw.walk_exprs(f),
            _ => {}
        }
    }
}

impl Switch {
    fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.selector.walk_exprs(f);
        for case in &self.cases {
            for label in &case.labels {
                if let CaseLabel::Expr(e) = label {
                    e.walk_exprs(f);
                }
            }
            if let Some(g) = &case.guard {
                g.walk_exprs(f);
            }
            for s in &case.body {
                s.walk_exprs(f);
            }
        }
    }
}

impl Stmt {
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match &self.kind {
            StmtKind::Empty
            | StmtKind::LocalClass(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_) => {}
            StmtKind::Block(stmts) => stmts.iter().for_each(|s| s.walk_exprs(f)),
            StmtKind::LocalVar(decls) => {
                for (_, init) in decls {
                    if let Some(e) = init {
                        e.walk_exprs(f);
                    }
                }
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) | StmtKind::Yield(e) => e.walk_exprs(f),
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    e.walk_exprs(f);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk_exprs(f);
                then_branch.walk_exprs(f);
                if let Some(e) = else_branch {
                    e.walk_exprs(f);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                cond.walk_exprs(f);
                body.walk_exprs(f);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                init.iter().for_each(|s| s.walk_exprs(f));
                if let Some(c) = cond {
                    c.walk_exprs(f);
                }
                update.iter().for_each(|e| e.walk_exprs(f));
                body.walk_exprs(f);
            }
            StmtKind::ForEach { iterable, body, .. } => {
                iterable.walk_exprs(f);
                body.walk_exprs(f);
            }
            StmtKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                for r in resources {
                    match r {
                        Resource::Decl { init, .. } => init.walk_exprs(f),
                        Resource::Expr(e) => e.walk_exprs(f),
                    }
                }
                body.iter().for_each(|s| s.walk_exprs(f));
                for c in catches {
                    c.body.iter().for_each(|s| s.walk_exprs(f));
                }
                if let Some(fin) = finally {
                    fin.iter().for_each(|s| s.walk_exprs(f));
                }
            }
            StmtKind::Switch(sw) => sw.walk_exprs(f),
            StmtKind::Synchronized { lock, body } => {
                lock.walk_exprs(f);
                body.iter().for_each(|s| s.walk_exprs(f));
            }
            StmtKind::Labeled { body, .. } => body.walk_exprs(f),
            StmtKind::Assert { cond, message } => {
                cond.walk_exprs(f);
                if let Some(m) = message {
                    m.walk_exprs(f);
                }
            }
            StmtKind::ConstructorCall {
                qualifier, args, ..
            } => {
                if let Some(q) = qualifier {
                    q.walk_exprs(f);
                }
                args.iter().for_each(|e| e.walk_exprs(f));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodRefTarget {
    Expr(Box<Expr>),
    Type { declared: TypeRef, ty: JavaType },
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A simple name: local, field, type or package.
    Name {
        name: String,
        symbol: Symbol,
    },
    FieldAccess {
        target: Box<Expr>,
        name: String,
        symbol: Symbol,
    },
    Call {
        target: Option<Box<Expr>>,
        name: String,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        method: Symbol,
    },
    New {
        outer: Option<Box<Expr>>,
        declared: TypeRef,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        constructor: Symbol,
        /// Anonymous class created by this expression.
        anonymous: Option<TypeId>,
    },
    NewArray {
        element: TypeRef,
        dims: Vec<Expr>,
        extra_dims: usize,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        declared: TypeRef,
        extra_bounds: Vec<TypeRef>,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        pattern: Pattern,
    },
    Lambda {
        params: Vec<LocalId>,
        body: LambdaBody,
        /// Single abstract method of the target functional interface.
        sam: Symbol,
    },
    MethodRef {
        target: MethodRefTarget,
        name: String,
        method: Symbol,
    },
    This {
        qualifier: Option<String>,
    },
    Super {
        qualifier: Option<String>,
    },
    ClassLiteral(TypeRef),
    Switch(Box<Switch>),
    Unsupported(String),
}

/// A decoded bytecode body with member operands bound to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeBody {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<BoundInstruction>,
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundInstruction {
    pub instruction: Instruction,
    /// Field, method or class operand bound to the model; `Unresolved` when the
    /// owner is missing from the classpath.
    pub symbol: Option<Symbol>,
}
