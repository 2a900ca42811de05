use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SprError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Input error in {path}: {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("Instrument error: {0}")]
    Instrument(String),

    #[error("Assembly error: {0}")]
    Assembly(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Random source error: {0}")]
    Random(#[from] getrandom::Error),
}

impl SprError {
    pub fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SprError::Input {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, SprError>;
