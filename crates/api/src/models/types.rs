use super::symbol::{MethodRef, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A type as written by one of the fronts, before name resolution.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Default)]
#[serde(tag = "kind", content = "data")]
pub enum TypeRef {
    /// Name as it appears in source (e.g., "int", "List", "java.util.Map.Entry")
    Raw(String),

    /// Binary name taken from bytecode (e.g., "java.util.Map$Entry")
    Id(String),

    /// Type variable named by a generic signature
    Var(String),

    /// Generic instantiation (e.g., List<String>)
    Generic {
        base: Box<TypeRef>,
        args: Vec<TypeRef>,
    },

    /// Array type (e.g., String[])
    Array {
        element: Box<TypeRef>,
        dimensions: usize,
    },

    /// Wildcard type (e.g., ? extends Number)
    Wildcard {
        bound: Option<Box<TypeRef>>,
        is_upper_bound: bool, // true: extends, false: super
    },

    #[default]
    Unknown,
}

impl TypeRef {
    pub fn raw(s: impl Into<String>) -> Self {
        TypeRef::Raw(s.into())
    }

    pub fn id(s: impl Into<String>) -> Self {
        TypeRef::Id(s.into())
    }

    /// Wraps `self` into an array of `dimensions`, merging with an existing array.
    pub fn array_of(self, dimensions: usize) -> Self {
        if dimensions == 0 {
            return self;
        }
        match self {
            TypeRef::Array {
                element,
                dimensions: inner,
            } => TypeRef::Array {
                element,
                dimensions: inner + dimensions,
            },
            other => TypeRef::Array {
                element: Box::new(other),
                dimensions,
            },
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Raw(s) | TypeRef::Id(s) | TypeRef::Var(s) => write!(f, "{s}"),
            TypeRef::Generic { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            TypeRef::Array {
                element,
                dimensions,
            } => {
                write!(f, "{element}")?;
                for _ in 0..*dimensions {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            TypeRef::Wildcard {
                bound: None, ..
            } => write!(f, "?"),
            TypeRef::Wildcard {
                bound: Some(b),
                is_upper_bound,
            } => {
                let kw = if *is_upper_bound { "extends" } else { "super" };
                write!(f, "? {kw} {b}")
            }
            TypeRef::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "char" => PrimitiveType::Char,
            "short" => PrimitiveType::Short,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    /// Fully-qualified name of the wrapper class used for boxing.
    pub fn box_class(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn from_box_class(fqn: &str) -> Option<Self> {
        PrimitiveType::ALL.into_iter().find(|p| p.box_class() == fqn)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    /// Primitive widening conversion (JLS 5.1.2), identity included.
    pub fn widens_to(self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short => matches!(target, Int | Long | Float | Double),
            Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            _ => false,
        }
    }
}

/// Declaration site of a type variable.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeParamOwner {
    Type(TypeId),
    Method(MethodRef),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct TypeVar {
    pub owner: TypeParamOwner,
    pub index: u16,
    pub name: String,
}

/// Canonical, resolved type. Structural equality is the graph's identity rule
/// for parameterized types.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "data")]
pub enum JavaType {
    Primitive(PrimitiveType),
    Void,
    /// A class or interface, raw when `args` is empty.
    Class { id: TypeId, args: Vec<JavaType> },
    /// Only valid as a type argument.
    Wildcard {
        bound: Option<Box<JavaType>>,
        upper: bool,
    },
    TypeVar(TypeVar),
    Array(Box<JavaType>),
    /// Type of the `null` literal.
    Null,
    /// A reference that could not be resolved; a diagnostic was recorded for it.
    Unresolved(String),
}

impl JavaType {
    pub fn class(id: TypeId) -> Self {
        JavaType::Class { id, args: vec![] }
    }

    pub fn array(element: JavaType, dimensions: usize) -> Self {
        (0..dimensions).fold(element, |acc, _| JavaType::Array(Box::new(acc)))
    }

    pub fn class_id(&self) -> Option<TypeId> {
        match self {
            JavaType::Class { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            JavaType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&JavaType> {
        match self {
            JavaType::Array(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            JavaType::Class { .. } | JavaType::TypeVar(_) | JavaType::Array(_) | JavaType::Null
        )
    }

    pub fn is_unresolved(&self) -> bool {
        match self {
            JavaType::Unresolved(_) => true,
            JavaType::Class { args, .. } => args.iter().any(JavaType::is_unresolved),
            JavaType::Array(e) => e.is_unresolved(),
            JavaType::Wildcard { bound: Some(b), .. } => b.is_unresolved(),
            _ => false,
        }
    }
}
