use thiserror::Error;

#[derive(Error, Debug)]
pub enum LegisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LegisError {
    fn from(e: serde_json::Error) -> Self {
        LegisError::Serialize(e.to_string())
    }
}
