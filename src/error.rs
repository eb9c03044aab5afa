use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function names cannot be empty")]
    EmptyName,
    #[error("{name:?}: minimum arity {min} exceeds maximum arity {max}")]
    InvalidArity { name: String, min: usize, max: usize },
    #[error("failed to read the function catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}
