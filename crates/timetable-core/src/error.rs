use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid slot catalog: {0}")]
    InvalidCatalog(String),
}

impl CoreError {
    /// Short error code string for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::InvalidCatalog(_) => "INVALID_CATALOG",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
