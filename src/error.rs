use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotaplanError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    #[error("Invalid constraint set: {0}")]
    InvalidConstraintSet(String),

    #[error("Rotation sequence is empty")]
    EmptySequence,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RotaplanError {
    /// True for errors caused by the caller's request rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RotaplanError::UnknownField(_)
                | RotaplanError::UnknownCrop(_)
                | RotaplanError::InvalidConstraintSet(_)
                | RotaplanError::EmptySequence
                | RotaplanError::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RotaplanError>;
