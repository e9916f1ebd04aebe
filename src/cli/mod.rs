//! CLI commands for boardlink using clap.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::bindings::{open_store, ChannelBoardBinding};
use crate::commands::permission::CHANNEL_ADMIN;
use crate::commands::{build_dispatcher, CallerContext, DispatchOutcome, PermissionLevel};
use crate::config::{get_settings_path, load_settings, write_default_settings};

/// boardlink - link chat channels to project boards.
#[derive(Parser)]
#[command(name = "boardlink")]
#[command(version)]
#[command(about = "Link chat channels to project boards through provider webhooks", long_about = None)]
pub struct Commands {
    /// Settings file (defaults to ~/.boardlink/settings.json)
    #[arg(long, global = true, env = "BOARDLINK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Telegram bot
    Start,

    /// Write a default settings file
    Setup,

    /// Inspect channel/board bindings
    #[command(subcommand)]
    Bindings(BindingsCommand),

    /// Run one message through the command dispatcher and print the reply
    Send {
        /// Message text, including the command prefix
        message: String,

        /// Channel id the message is sent from
        #[arg(long, default_value = "cli")]
        channel: String,

        /// Guild id the message is sent from
        #[arg(long, default_value = "cli")]
        guild: String,

        /// Guild display name used in webhook descriptions
        #[arg(long)]
        guild_name: Option<String>,

        /// Permission level of the sender
        #[arg(long, default_value_t = CHANNEL_ADMIN)]
        level: PermissionLevel,
    },
}

#[derive(Subcommand)]
pub enum BindingsCommand {
    /// List every binding
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub async fn run(self) -> Result<()> {
        let config = self.config;
        match self.command {
            Command::Start => {
                let settings = load_settings(config.as_deref())?;
                crate::telegram::run_telegram_daemon(settings).await?;
            }
            Command::Setup => {
                let path = match config {
                    Some(p) => p,
                    None => get_settings_path()?,
                };
                if write_default_settings(&path)? {
                    println!("Wrote default settings to {}", path.display());
                    println!("Fill in telegram.bot_token and the board_api section, then run 'boardlink start'.");
                } else {
                    println!("Settings already exist at {}", path.display());
                }
            }
            Command::Bindings(BindingsCommand::List { json }) => {
                let settings = load_settings(config.as_deref())?;
                let bindings = open_store(&settings)?.list()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&bindings)?);
                } else {
                    print_bindings(&bindings);
                }
            }
            Command::Send {
                message,
                channel,
                guild,
                guild_name,
                level,
            } => {
                let settings = load_settings(config.as_deref())?;
                let dispatcher = build_dispatcher(&settings)?;
                let caller = CallerContext {
                    user_id: "cli".to_string(),
                    user_name: "cli".to_string(),
                    level,
                    channel_id: channel,
                    guild_id: guild,
                    guild_name,
                };
                let outcome = dispatcher.dispatch(&message, caller).await;
                match (&outcome, outcome.reply_text()) {
                    (_, Some(reply)) => println!("{}", reply),
                    (DispatchOutcome::UnknownCommand { word }, None) => {
                        println!("Unknown command '{}'", word)
                    }
                    (_, None) => println!(
                        "Not a command (expected prefix '{}')",
                        dispatcher.prefix()
                    ),
                }
                if matches!(outcome, DispatchOutcome::Failed { .. } | DispatchOutcome::Denied { .. }) {
                    anyhow::bail!("command did not succeed");
                }
            }
        }
        Ok(())
    }
}

fn print_bindings(bindings: &[ChannelBoardBinding]) {
    if bindings.is_empty() {
        println!("No bindings.");
        return;
    }
    println!(
        "{:<20} {:<20} {:<26} {:<26} {}",
        "CHANNEL", "GUILD", "BOARD", "WEBHOOK", "CREATED"
    );
    for b in bindings {
        println!(
            "{:<20} {:<20} {:<26} {:<26} {}",
            b.channel_id,
            b.guild_id,
            b.board_id,
            b.webhook_id,
            b.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_with_defaults() {
        let cli = Commands::try_parse_from(["boardlink", "send", "!init ttDOjGp5"]).unwrap();
        match cli.command {
            Command::Send {
                message,
                channel,
                level,
                guild_name,
                ..
            } => {
                assert_eq!(message, "!init ttDOjGp5");
                assert_eq!(channel, "cli");
                assert_eq!(level, CHANNEL_ADMIN);
                assert!(guild_name.is_none());
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn parses_global_config_and_bindings_list() {
        let cli = Commands::try_parse_from([
            "boardlink",
            "bindings",
            "list",
            "--json",
            "--config",
            "/tmp/settings.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/settings.json")));
        assert!(matches!(
            cli.command,
            Command::Bindings(BindingsCommand::List { json: true })
        ));
    }
}
