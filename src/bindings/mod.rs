//! Channel to board bindings.
//!
//! A binding links exactly one chat channel to exactly one board. Both sides
//! are unique across the store; the store enforces this on insert so that two
//! racing provisioning runs cannot both succeed.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod sqlite;

pub use sqlite::SqliteBindingStore;

use crate::config::Settings;

/// One active channel/board link.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelBoardBinding {
    pub channel_id: String,
    pub guild_id: String,
    pub board_id: String,
    pub webhook_id: String,
    /// Event types that are not forwarded to the channel.
    #[serde(default)]
    pub disabled_events: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl ChannelBoardBinding {
    /// A fresh binding with every event type enabled.
    pub fn new(
        channel_id: impl Into<String>,
        guild_id: impl Into<String>,
        board_id: impl Into<String>,
        webhook_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: guild_id.into(),
            board_id: board_id.into(),
            webhook_id: webhook_id.into(),
            disabled_events: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The channel or the board already has a binding.
    #[error("binding conflict: {0}")]
    Conflict(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent channel/board mapping.
///
/// Implementations must make `insert` atomic and reject-on-conflict for both
/// `channel_id` and `board_id`.
pub trait BindingStore: Send + Sync {
    fn find_by_channel(&self, channel_id: &str) -> Result<Option<ChannelBoardBinding>>;

    fn find_by_board(&self, board_id: &str) -> Result<Option<ChannelBoardBinding>>;

    fn insert(&self, binding: &ChannelBoardBinding) -> Result<()>;

    /// All bindings, oldest first.
    fn list(&self) -> Result<Vec<ChannelBoardBinding>>;
}

/// Open the binding store described by the settings.
pub fn open_store(settings: &Settings) -> crate::error::Result<Arc<dyn BindingStore>> {
    let path = settings.storage.resolve_database_path()?;
    Ok(Arc::new(SqliteBindingStore::open(&path)?))
}
