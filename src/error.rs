//! Error types for boardlink.

use thiserror::Error;

use crate::bindings::StoreError;
use crate::board::BoardApiError;
use crate::commands::RegistryError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Board API error: {0}")]
    BoardApi(#[from] BoardApiError),

    #[error("Command registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Telegram error: {0}")]
    Telegram(String),
}
