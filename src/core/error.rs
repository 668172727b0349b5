use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown technology: {0}")]
    UnknownTech(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
