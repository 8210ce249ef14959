pub mod error;
pub mod inspect;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use inspect::{CodeInspector, FieldSummary, MethodSummary, TypeSummary};
pub use models::*;
