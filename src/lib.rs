//! boardlink library root.

pub mod bindings;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod provisioning;
pub mod telegram;

pub use bindings::{BindingStore, ChannelBoardBinding, SqliteBindingStore};
pub use board::{BoardApi, TrelloClient};
pub use cli::Commands;
pub use commands::{CallerContext, CommandRegistry, DispatchOutcome, Dispatcher};
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use provisioning::{BoardProvisioner, ProvisionError, ProvisionRequest};
pub use telegram::run_telegram_daemon;
