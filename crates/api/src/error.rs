#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// No candidate of a call is applicable to the given argument types.
    #[error("No applicable method: {0}")]
    NotApplicable(String),
    #[error("Ambiguous method: {name} matches {}", candidates.join(", "))]
    Ambiguous { name: String, candidates: Vec<String> },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
