use crate::error::ApiResult;
use crate::models::{Diagnostic, JavaType, MethodKind, OriginKind, TypeId, TypeKind};
use serde::{Deserialize, Serialize};

/// Owned description of a resolved type, suitable for printing or JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeSummary {
    pub fqn: String,
    pub kind: TypeKind,
    pub origin: OriginKind,
    pub modifiers: Vec<String>,
    pub type_parameters: Vec<String>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldSummary>,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub modifiers: Vec<String>,
    pub ty: String,
    pub origin: OriginKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodSummary {
    pub name: String,
    pub kind: MethodKind,
    pub modifiers: Vec<String>,
    /// Rendered signature, e.g. `<T> T get(int)`.
    pub signature: String,
    pub origin: OriginKind,
    pub has_body: bool,
}

/// Read-only query surface consumed by downstream analysis.
pub trait CodeInspector {
    /// By-name lookup; accepts canonical (`p.Outer.Inner`) and binary (`p.Outer$Inner`) names.
    fn find_type(&self, fqn: &str) -> Option<TypeId>;

    /// Names of every type resolved in this model, sorted.
    fn type_names(&self) -> Vec<String>;

    fn type_summary(&self, id: TypeId) -> ApiResult<TypeSummary>;

    fn render_type(&self, ty: &JavaType) -> String;

    /// Every unresolved or ambiguous reference and every rejected input, sorted by location.
    fn diagnostics(&self) -> Vec<Diagnostic>;
}
