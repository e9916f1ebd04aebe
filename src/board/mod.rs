//! Remote board provider API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;

pub mod reference;
pub mod trello;

pub use reference::board_lookup_key;
pub use trello::TrelloClient;

/// Error body text the provider returns for an unknown or inaccessible board.
pub const INVALID_ID_SENTINEL: &str = "invalid id";

#[derive(Error, Debug)]
pub enum BoardApiError {
    /// The provider rejected the board reference.
    #[error("{0}")]
    InvalidId(String),

    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BoardApiError {
    /// Best available diagnostic text for user-facing messages.
    pub fn diagnostic(&self) -> String {
        match self {
            BoardApiError::InvalidId(text) => text.clone(),
            BoardApiError::Status { body, status } if body.trim().is_empty() => {
                format!("HTTP {}", status)
            }
            BoardApiError::Status { body, .. } => body.trim().to_string(),
            BoardApiError::Transport(msg) => msg.clone(),
            BoardApiError::Http(e) => e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardApiError>;

/// Static key/token pair used to authenticate against the provider.
#[derive(Clone)]
pub struct BoardCredentials {
    pub key: String,
    pub token: String,
}

impl std::fmt::Debug for BoardCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardCredentials")
            .field("key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A resolved board.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

/// Parameters for registering a webhook on a board.
#[derive(Clone, Debug)]
pub struct WebhookRequest {
    pub board_id: String,
    pub description: String,
    pub callback_url: String,
}

/// A webhook created on the provider.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Webhook {
    pub id: String,
}

/// The two provider operations board provisioning needs.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Look up a board by id, short link, or anything else the provider accepts.
    async fn get_board(&self, reference: &str) -> Result<Board>;

    /// Register a webhook for a board.
    async fn create_webhook(&self, request: &WebhookRequest) -> Result<Webhook>;
}

/// Build the board client described by the settings.
pub fn create_client(settings: &Settings) -> crate::error::Result<Arc<dyn BoardApi>> {
    let (key, token, _) = settings.board_api.require_credentials()?;
    let client = TrelloClient::with_base_url(
        settings.board_api.base_url.clone(),
        BoardCredentials { key, token },
        Duration::from_secs(settings.board_api.timeout_secs),
    )?;
    Ok(Arc::new(client))
}
