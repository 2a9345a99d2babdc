use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid image: {0}")]
    Decode(String),
    #[error("detection failed: {0}")]
    Detector(String),
    #[error("invalid request: {0}")]
    Validation(String),
}

impl DomainError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Decode(_) => "decode",
            DomainError::Detector(_) => "detector",
            DomainError::Validation(_) => "validation",
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
