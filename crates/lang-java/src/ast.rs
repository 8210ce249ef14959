//! Owned raw syntax tree.
//!
//! Names are kept exactly as written; nothing here is resolved. Every
//! declaration, statement and expression carries the [`Range`] it was parsed
//! from so later passes can report locations.

use jinspect_api::models::{ModuleInfo, Modifiers, Range, TypeKind, TypeRef};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Logical identifier of the unit, usually its path.
    pub unit: Arc<str>,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
    /// Present only in `module-info.java`, which declares no types.
    pub module: Option<ModuleDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub info: ModuleInfo,
    pub annotations: Vec<Annotation>,
    pub range: Range,
}

impl CompilationUnit {
    /// Walks every type declared in the unit, nested member types included.
    /// Local and anonymous classes live inside bodies and are not visited.
    pub fn visit_types<'a>(&'a self, mut f: impl FnMut(&[&'a TypeDecl], &'a TypeDecl)) {
        fn walk<'a>(
            path: &mut Vec<&'a TypeDecl>,
            decl: &'a TypeDecl,
            f: &mut impl FnMut(&[&'a TypeDecl], &'a TypeDecl),
        ) {
            f(path, decl);
            path.push(decl);
            for nested in decl.member_types() {
                walk(path, nested, f);
            }
            path.pop();
        }
        let mut path = Vec::new();
        for decl in &self.types {
            walk(&mut path, decl, &mut f);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted name without the trailing `.*`.
    pub name: String,
    pub is_static: bool,
    pub on_demand: bool,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    /// `(name, value)` pairs; a single-element annotation uses `value`.
    pub arguments: Vec<(String, ElementValue)>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Expr(Expr),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
    pub annotations: Vec<Annotation>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    /// Simple name; empty for anonymous class bodies.
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<TypeParam>,
    /// `extends` of a class.
    pub superclass: Option<TypeRef>,
    /// `implements` of a class, enum or record; `extends` of an interface.
    pub interfaces: Vec<TypeRef>,
    pub permits: Vec<TypeRef>,
    pub record_components: Vec<Param>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<MemberDecl>,
    pub range: Range,
}

impl TypeDecl {
    pub fn member_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.members.iter().filter_map(|m| match m {
            MemberDecl::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            MemberDecl::Method(md) => Some(md),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            MemberDecl::Field(fd) => Some(fd),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub arguments: Vec<Expr>,
    /// Constant-specific class body.
    pub body: Option<Box<TypeDecl>>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberDecl {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(Initializer),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: String,
    /// Extra `[]` written after the name.
    pub dims: usize,
    pub init: Option<Expr>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodDeclKind {
    Method,
    Constructor,
    /// Record constructor without a parameter list.
    CompactConstructor,
    /// Element of an annotation type.
    AnnotationElement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub kind: MethodDeclKind,
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<TypeParam>,
    /// `void` is `TypeRef::Raw("void")`; constructors carry `Unknown`.
    pub return_type: TypeRef,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Option<Block>,
    pub default_value: Option<ElementValue>,
    pub range: Range,
}

impl MethodDecl {
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.varargs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    /// For varargs this is already the array type.
    pub ty: TypeRef,
    pub varargs: bool,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    /// `None` for `var`.
    pub ty: Option<TypeRef>,
    pub declarators: Vec<VarDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Empty,
    Block(Block),
    LocalVar(LocalVarDecl),
    LocalClass(Box<TypeDecl>),
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
        modifiers: Modifiers,
        /// `None` for `var`.
        ty: Option<TypeRef>,
        name: String,
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
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Switch(Box<SwitchBody>),
    Synchronized {
        lock: Expr,
        body: Block,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    /// `this(...)` or `super(...)` as the first constructor statement.
    ConstructorCall {
        is_super: bool,
        qualifier: Option<Expr>,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Decl {
        modifiers: Modifiers,
        /// `None` for `var`.
        ty: Option<TypeRef>,
        name: String,
        init: Expr,
        range: Range,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub modifiers: Modifiers,
    /// More than one for multi-catch.
    pub types: Vec<TypeRef>,
    pub name: String,
    pub body: Block,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBody {
    pub selector: Expr,
    /// `case X ->` form.
    pub arrow: bool,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub labels: Vec<CaseLabel>,
    pub guard: Option<Expr>,
    /// For the arrow form a single expression statement, throw or block.
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
    /// `Type name`; `instanceof Type` without a binding has no name.
    Type {
        ty: TypeRef,
        name: Option<String>,
        range: Range,
    },
    Record {
        ty: TypeRef,
        components: Vec<Pattern>,
        range: Range,
    },
}

impl Pattern {
    pub fn ty(&self) -> &TypeRef {
        match self {
            Pattern::Type { ty, .. } | Pattern::Record { ty, .. } => ty,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Pattern::Type { range, .. } | Pattern::Record { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// One UTF-16 code unit.
    Char(u16),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        use BinaryOp::*;
        Some(match token {
            "*" => Mul,
            "/" => Div,
            "%" => Rem,
            "+" => Add,
            "-" => Sub,
            "<<" => Shl,
            ">>" => Shr,
            ">>>" => UShr,
            "<" => Lt,
            ">" => Gt,
            "<=" => Le,
            ">=" => Ge,
            "==" => Eq,
            "!=" => Ne,
            "&" => BitAnd,
            "^" => BitXor,
            "|" => BitOr,
            "&&" => And,
            "||" => Or,
            _ => return None,
        })
    }

    pub fn token(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Rem => "%",
            Add => "+",
            Sub => "-",
            Shl => "<<",
            Shr => ">>",
            UShr => ">>>",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            BitAnd => "&",
            BitXor => "^",
            BitOr => "|",
            And => "&&",
            Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        use BinaryOp::*;
        matches!(self, Lt | Gt | Le | Ge | Eq | Ne)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn is_update(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

/// `=` is `Assign(None)`; compound forms carry their operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssignOp(pub Option<BinaryOp>);

impl AssignOp {
    pub fn from_token(token: &str) -> Option<Self> {
        if token == "=" {
            return Some(AssignOp(None));
        }
        let op = token.strip_suffix('=')?;
        BinaryOp::from_token(op)
            .filter(|b| !b.is_comparison() && !matches!(b, BinaryOp::And | BinaryOp::Or))
            .map(|b| AssignOp(Some(b)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub name: String,
    /// `None` for inferred parameters (and `var`).
    pub ty: Option<TypeRef>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodRefTarget {
    Expr(Box<Expr>),
    Type(TypeRef),
    Super { qualifier: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A simple identifier; may denote a local, a field, a type or a package.
    Name(String),
    FieldAccess {
        target: Box<Expr>,
        name: String,
    },
    MethodCall {
        target: Option<Box<Expr>>,
        type_args: Vec<TypeRef>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        outer: Option<Box<Expr>>,
        ty: TypeRef,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
        /// Anonymous class body.
        body: Option<Box<TypeDecl>>,
    },
    NewArray {
        element: TypeRef,
        dims: Vec<Expr>,
        /// Trailing `[]` without a length.
        extra_dims: usize,
        init: Option<Vec<Expr>>,
    },
    /// Nested `{...}` inside an array initializer.
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
        ty: TypeRef,
        /// Additional `& I` bounds of an intersection cast.
        extra_bounds: Vec<TypeRef>,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        pattern: Pattern,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
    },
    MethodRef {
        target: MethodRefTarget,
        type_args: Vec<TypeRef>,
        /// `new` for constructor references.
        name: String,
    },
    This {
        qualifier: Option<String>,
    },
    /// Only valid as the target of a field access or call.
    Super {
        qualifier: Option<String>,
    },
    ClassLiteral(TypeRef),
    Switch(Box<SwitchBody>),
    Parens(Box<Expr>),
    /// Grammar construct this front does not model (string templates).
    Unsupported(String),
}
