//! Error type shared by every fallible constructor and entry point.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("invalid build volume: {0}")]
    InvalidBuildVolume(String),

    #[error("invalid search options: {0}")]
    InvalidSearch(String),

    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
}
