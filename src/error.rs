use thiserror::Error;

#[derive(Debug, Error)]
pub enum FecError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input size")]
    InvalidInputSize,
}

pub type Result<T> = std::result::Result<T, FecError>;
