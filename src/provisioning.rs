//! Board provisioning: link a channel to a board through a provider webhook.
//!
//! The steps run strictly in order and any failure stops the run:
//!
//! 1. the channel must not be bound yet (no remote calls before this passes)
//! 2. the board reference is resolved on the provider
//! 3. the resolved board must not be bound to another channel
//! 4. a webhook is created on the provider
//! 5. the binding is inserted into the store
//!
//! Nothing is rolled back. A failure in step 5 leaves a webhook on the provider
//! with no binding; that is reported as [`ProvisionError::BindingPersist`] with
//! the orphaned webhook id so an operator can remove it.

use std::sync::Arc;

use thiserror::Error;

use crate::bindings::{BindingStore, ChannelBoardBinding, StoreError};
use crate::board::{board_lookup_key, Board, BoardApi, BoardApiError, Webhook, WebhookRequest};

pub const INVALID_BOARD_MESSAGE: &str = "An invalid board ID was provided. Please make sure you enter a valid board ID and that the bot is a member of your board.";

/// Why a board lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The provider does not know the reference, or the bot cannot see the board.
    InvalidReference,
    Transport,
}

/// Why a binding could not be saved after its webhook was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistFailure {
    /// Another run bound the channel or board first.
    Conflict,
    /// The store failed for another reason.
    InconsistentState,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("channel {channel_id} already has a board binding")]
    ChannelAlreadyBound { channel_id: String },

    #[error("board {board_id} is already bound to channel {channel_id}")]
    BoardAlreadyBound { board_id: String, channel_id: String },

    #[error("board lookup failed: {source}")]
    BoardResolution {
        kind: ResolutionFailure,
        source: BoardApiError,
    },

    #[error("webhook creation failed: {source}")]
    WebhookCreation { source: BoardApiError },

    #[error("webhook {webhook_id} was created but the binding was not saved: {source}")]
    BindingPersist {
        kind: PersistFailure,
        webhook_id: String,
        source: StoreError,
    },

    /// A binding lookup failed before any remote side effect happened.
    #[error("binding lookup failed: {0}")]
    Lookup(StoreError),
}

impl ProvisionError {
    /// Text shown to the user in the channel.
    pub fn user_message(&self) -> String {
        match self {
            ProvisionError::ChannelAlreadyBound { .. } => {
                "This channel already has events for a board.".to_string()
            }
            ProvisionError::BoardAlreadyBound { .. } => {
                "This board already has events in another channel.".to_string()
            }
            ProvisionError::BoardResolution {
                kind: ResolutionFailure::InvalidReference,
                ..
            } => INVALID_BOARD_MESSAGE.to_string(),
            ProvisionError::BoardResolution { source, .. }
            | ProvisionError::WebhookCreation { source } => {
                format!("An error occurred! {}", source.diagnostic())
            }
            ProvisionError::BindingPersist {
                webhook_id, kind, ..
            } => {
                let reason = match kind {
                    PersistFailure::Conflict => "another channel or board binding was created at the same time",
                    PersistFailure::InconsistentState => "the binding store failed",
                };
                format!(
                    "The board webhook `{}` was created but this channel could not be linked ({}). \
                     Ask an operator to remove that webhook before trying again.",
                    webhook_id, reason
                )
            }
            ProvisionError::Lookup(e) => format!("An error occurred! {}", e),
        }
    }

    /// True when a webhook exists on the provider without a matching binding.
    pub fn is_inconsistent_state(&self) -> bool {
        matches!(self, ProvisionError::BindingPersist { .. })
    }
}

/// Input for one provisioning run.
#[derive(Clone, Debug)]
pub struct ProvisionRequest {
    pub board_reference: String,
    /// Accepted for command compatibility; the provider does not need it.
    pub webhook_url_or_id: Option<String>,
    /// Accepted for command compatibility; the provider does not need it.
    pub webhook_token: Option<String>,
    pub channel_id: String,
    pub guild_id: String,
    pub guild_name: Option<String>,
}

/// A successful run.
#[derive(Clone, Debug)]
pub struct ProvisionedBoard {
    pub board: Board,
    pub binding: ChannelBoardBinding,
}

pub struct BoardProvisioner {
    api: Arc<dyn BoardApi>,
    store: Arc<dyn BindingStore>,
    callback_url: String,
}

impl BoardProvisioner {
    pub fn new(
        api: Arc<dyn BoardApi>,
        store: Arc<dyn BindingStore>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            callback_url: callback_url.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BindingStore> {
        &self.store
    }

    pub async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionedBoard, ProvisionError> {
        if request.webhook_url_or_id.is_some() || request.webhook_token.is_some() {
            tracing::debug!(
                channel = %request.channel_id,
                "Ignoring explicit webhook arguments; the provider registers its own webhook"
            );
        }

        self.ensure_channel_unbound(&request.channel_id)?;
        let board = self.resolve_board(&request.board_reference).await?;
        self.ensure_board_unbound(&board)?;
        let webhook = self.create_webhook(&board, request).await?;
        let binding = self.persist(request, &board, &webhook)?;

        tracing::info!(
            channel = %binding.channel_id,
            board = %binding.board_id,
            webhook = %binding.webhook_id,
            "Linked channel to board {}",
            board.name
        );
        Ok(ProvisionedBoard { board, binding })
    }

    fn ensure_channel_unbound(&self, channel_id: &str) -> Result<(), ProvisionError> {
        match self.store.find_by_channel(channel_id).map_err(ProvisionError::Lookup)? {
            Some(_) => Err(ProvisionError::ChannelAlreadyBound {
                channel_id: channel_id.to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn resolve_board(&self, reference: &str) -> Result<Board, ProvisionError> {
        let key = board_lookup_key(reference);
        self.api.get_board(&key).await.map_err(|source| {
            let kind = match source {
                BoardApiError::InvalidId(_) => ResolutionFailure::InvalidReference,
                _ => ResolutionFailure::Transport,
            };
            tracing::warn!("Board lookup for '{}' failed ({:?}): {}", key, kind, source);
            ProvisionError::BoardResolution { kind, source }
        })
    }

    fn ensure_board_unbound(&self, board: &Board) -> Result<(), ProvisionError> {
        match self.store.find_by_board(&board.id).map_err(ProvisionError::Lookup)? {
            Some(existing) => Err(ProvisionError::BoardAlreadyBound {
                board_id: board.id.clone(),
                channel_id: existing.channel_id,
            }),
            None => Ok(()),
        }
    }

    async fn create_webhook(
        &self,
        board: &Board,
        request: &ProvisionRequest,
    ) -> Result<Webhook, ProvisionError> {
        let request = WebhookRequest {
            board_id: board.id.clone(),
            description: webhook_description(request.guild_name.as_deref()),
            callback_url: self.callback_url.clone(),
        };
        let webhook = self.api.create_webhook(&request).await.map_err(|source| {
            tracing::warn!("Webhook creation for board {} failed: {}", board.id, source);
            ProvisionError::WebhookCreation { source }
        })?;
        tracing::debug!("Created webhook {} for board {}", webhook.id, board.id);
        Ok(webhook)
    }

    fn persist(
        &self,
        request: &ProvisionRequest,
        board: &Board,
        webhook: &Webhook,
    ) -> Result<ChannelBoardBinding, ProvisionError> {
        let binding = ChannelBoardBinding::new(
            request.channel_id.as_str(),
            request.guild_id.as_str(),
            board.id.as_str(),
            webhook.id.as_str(),
        );
        self.store.insert(&binding).map_err(|source| {
            let kind = match source {
                StoreError::Conflict(_) => PersistFailure::Conflict,
                StoreError::Backend(_) => PersistFailure::InconsistentState,
            };
            tracing::error!(
                webhook = %webhook.id,
                board = %board.id,
                channel = %request.channel_id,
                "Orphaned webhook: binding insert failed ({:?}): {}",
                kind,
                source
            );
            ProvisionError::BindingPersist {
                kind,
                webhook_id: webhook.id.clone(),
                source,
            }
        })?;
        Ok(binding)
    }
}

fn webhook_description(guild_name: Option<&str>) -> String {
    format!(
        "A webhook for board events in a chat server ({} guild)",
        guild_name.unwrap_or("Unknown")
    )
}
