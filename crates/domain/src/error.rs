/// Shared error type used across all pushwire crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("auth: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, Error>;
