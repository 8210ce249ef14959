//! Canonical program model shared by both fronts.
//!
//! A [`TypeInfo`] holds the declaration shape exactly as a front described it:
//! every type mentioned in it is still a [`TypeRef`] placeholder. The resolver
//! turns those into [`JavaType`]s and stores them next to the declaration in
//! the type's arena slot ([`Header`], [`Members`]), so declarations themselves
//! never change after construction.

pub mod arena;
pub mod body;

use crate::index::UnitContext;
use jinspect_api::models::{
    FieldRef, JavaType, MethodKind, MethodRef, Modifiers, OriginKind, SourceLocation, TypeId,
    TypeKind, TypeRef, TypeVar,
};
use jinspect_bytecode::{ClassFile, ConstantValue};
use jinspect_java::ast;
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub use arena::{TypeArena, TypeSlot};
pub use body::Body;

/// Where a declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Source { unit: Arc<str> },
    Bytecode { class: String, entry: String },
    /// Generated by the builder: enum and record members, default constructors.
    Synthetic,
}

impl Origin {
    pub fn kind(&self) -> OriginKind {
        match self {
            Origin::Source { .. } => OriginKind::Source,
            Origin::Bytecode { .. } => OriginKind::Bytecode,
            Origin::Synthetic => OriginKind::Synthetic,
        }
    }
}

/// How a type is nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    TopLevel,
    Member { outer: TypeId },
    Local { outer: TypeId },
    Anonymous { outer: TypeId },
}

impl Nesting {
    pub fn outer(self) -> Option<TypeId> {
        match self {
            Nesting::TopLevel => None,
            Nesting::Member { outer } | Nesting::Local { outer } | Nesting::Anonymous { outer } => {
                Some(outer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

/// An annotation application; only the annotation type is bound.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUse {
    pub name: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationUse>,
}

/// Unbuilt body of a member.
#[derive(Debug, Clone)]
pub(crate) enum BodySource {
    None,
    Block(Arc<ast::Block>),
    /// Field initializer.
    Expr(Arc<ast::Expr>),
    /// Arguments and class body of an enum constant.
    Constant(Arc<ast::EnumConstant>),
    /// Index into the class file's method table; its `Code` stays raw until asked for.
    Code(usize),
}

#[derive(Debug)]
pub struct FieldInfo {
    pub name: String,
    pub modifiers: Modifiers,
    pub origin: OriginKind,
    pub ty: TypeRef,
    pub annotations: Vec<AnnotationUse>,
    pub constant: Option<ConstantValue>,
    pub is_enum_constant: bool,
    pub location: Option<SourceLocation>,
    pub(crate) init: BodySource,
    pub(crate) body: OnceCell<Arc<Body>>,
}

#[derive(Debug)]
pub struct MethodInfo {
    pub name: String,
    pub kind: MethodKind,
    pub modifiers: Modifiers,
    pub origin: OriginKind,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<ParamInfo>,
    pub varargs: bool,
    /// `void` is `TypeRef::Raw("void")`, as are constructors and initializers.
    pub return_type: TypeRef,
    pub throws: Vec<TypeRef>,
    pub annotations: Vec<AnnotationUse>,
    /// Erased JVM descriptor, known up front for bytecode members.
    pub descriptor: Option<String>,
    pub location: Option<SourceLocation>,
    pub(crate) source: BodySource,
    pub(crate) body: OnceCell<Arc<Body>>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.source, BodySource::None)
    }
}

/// Context a declaration's names are resolved in.
#[derive(Debug, Clone)]
pub(crate) enum DeclContext {
    Source {
        unit: Arc<UnitContext>,
        /// Present for local and anonymous classes.
        local: Option<Arc<LocalTypeScope>>,
    },
    Bytecode {
        class: Arc<ClassFile>,
    },
}

/// A member that can carry a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyOwner {
    Method(MethodRef),
    /// Field initializer or enum constant creation.
    Field(FieldRef),
}

impl BodyOwner {
    pub fn owner_type(self) -> TypeId {
        match self {
            BodyOwner::Method(m) => m.owner,
            BodyOwner::Field(f) => f.owner,
        }
    }
}

/// Names visible at the point a local or anonymous class is declared.
#[derive(Debug, Clone, Default)]
pub(crate) struct LocalTypeScope {
    /// Method whose body declares the class; its type parameters are in scope.
    pub method: Option<MethodRef>,
    /// Outermost member body the class was found in; building that body
    /// builds the class's member bodies too.
    pub owner: Option<BodyOwner>,
    /// Local classes in scope, innermost last.
    pub local_types: Vec<(String, TypeId)>,
}

#[derive(Debug)]
pub struct TypeInfo {
    pub id: TypeId,
    /// Canonical name (`p.Outer.Inner`); local and anonymous types use their binary name.
    pub name: String,
    /// Binary name with dots for packages and `$` for nesting (`p.Outer$Inner`).
    pub binary_name: String,
    /// Empty for anonymous classes.
    pub simple_name: String,
    pub package: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub origin: Origin,
    pub nesting: Nesting,
    pub type_params: Vec<TypeParamDecl>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub permits: Vec<TypeRef>,
    pub annotations: Vec<AnnotationUse>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    /// Simple names of member types.
    pub member_types: Vec<String>,
    pub location: Option<SourceLocation>,
    pub(crate) context: DeclContext,
}

impl TypeInfo {
    pub fn is_interface(&self) -> bool {
        self.kind.is_interface_like()
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.nesting, Nesting::Anonymous { .. })
    }

    pub fn method(&self, index: u32) -> Option<&MethodInfo> {
        self.methods.get(index as usize)
    }

    pub fn field(&self, index: u32) -> Option<&FieldInfo> {
        self.fields.get(index as usize)
    }

    pub fn method_ref(&self, index: usize) -> MethodRef {
        MethodRef {
            owner: self.id,
            index: index as u32,
        }
    }

    pub fn field_ref(&self, index: usize) -> FieldRef {
        FieldRef {
            owner: self.id,
            index: index as u32,
        }
    }

    pub fn unit(&self) -> Option<&Arc<str>> {
        match &self.origin {
            Origin::Source { unit } => Some(unit),
            _ => None,
        }
    }
}

/// A type parameter with resolved bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParamSig {
    pub var: TypeVar,
    /// Never empty: an unbounded parameter is bounded by `java.lang.Object`.
    pub bounds: Vec<JavaType>,
}

/// Resolved supertypes and type parameters of a type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub type_params: Vec<TypeParamSig>,
    pub superclass: Option<JavaType>,
    pub interfaces: Vec<JavaType>,
    pub annotations: Vec<JavaType>,
}

impl Header {
    /// Resolved direct supertypes, superclass first. Unresolved ones are skipped.
    pub fn supertypes(&self) -> impl Iterator<Item = &JavaType> {
        self.superclass
            .iter()
            .chain(self.interfaces.iter())
            .filter(|t| t.class_id().is_some())
    }

    /// The type as seen from inside its own body: `C<T1..Tn>`.
    pub fn this_type(&self, id: TypeId) -> JavaType {
        JavaType::Class {
            id,
            args: self
                .type_params
                .iter()
                .map(|p| JavaType::TypeVar(p.var.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub method: MethodRef,
    pub type_params: Vec<TypeParamSig>,
    pub params: Vec<JavaType>,
    pub return_type: JavaType,
    pub throws: Vec<JavaType>,
    pub annotations: Vec<JavaType>,
    pub varargs: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSig {
    pub field: FieldRef,
    pub ty: JavaType,
    pub annotations: Vec<JavaType>,
    pub is_static: bool,
}

/// Resolved member signatures plus the flattened inherited view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Members {
    /// Index-aligned with `TypeInfo::methods`.
    pub methods: Vec<MethodSig>,
    /// Index-aligned with `TypeInfo::fields`.
    pub fields: Vec<FieldSig>,
    /// Own methods, then inherited ones not overridden; superclass members
    /// precede interface members.
    pub all_methods: Vec<MethodRef>,
    /// Own fields, then inherited ones not hidden.
    pub all_fields: Vec<FieldRef>,
    /// `(own method index, overridden method)`.
    pub overrides: Vec<(u32, MethodRef)>,
}

impl Members {
    pub fn overridden_by(&self, index: u32) -> impl Iterator<Item = MethodRef> + '_ {
        self.overrides
            .iter()
            .filter(move |(i, _)| *i == index)
            .map(|(_, m)| *m)
    }
}
