//! Built-in chat commands.

use std::sync::Arc;

use super::permission::{level_name, CHANNEL_ADMIN, EVERYONE};
use super::{
    CommandDescriptor, CommandError, CommandRegistry, CommandResult, Invocation, RegistryError,
};
use crate::bindings::BindingStore;
use crate::provisioning::{BoardProvisioner, ProvisionRequest};

/// Registry with every built-in command.
pub fn default_registry(
    provisioner: Arc<BoardProvisioner>,
) -> Result<CommandRegistry, RegistryError> {
    let store = provisioner.store().clone();
    let mut registry = CommandRegistry::new();
    registry.register(help_command())?;
    registry.register(test_command())?;
    registry.register(status_command(store))?;
    registry.register(init_command(provisioner))?;
    Ok(registry)
}

/// `init <boardReference> [webhookUrlOrId] [webhookToken]`
pub fn init_command(provisioner: Arc<BoardProvisioner>) -> CommandDescriptor {
    CommandDescriptor::new("init", move |inv, args| run_init(provisioner.clone(), inv, args))
        .aliases(&["initialize"])
        .level(CHANNEL_ADMIN)
        .summary("Initialize board events on the channel.")
        .usage("init <boardReference> [webhookUrlOrId] [webhookToken]")
        .examples(&[
            "init ttDOjGp5",
            "init 5803ba32d0514d27823abf3b",
            "init https://trello.com/b/ttDOjGp5",
            "init https://trello.com/b/ttDOjGp5/yappy-trello",
        ])
}

async fn run_init(
    provisioner: Arc<BoardProvisioner>,
    inv: Invocation,
    args: Vec<String>,
) -> CommandResult {
    let mut args = args.into_iter();
    let board_reference = args
        .next()
        .filter(|r| !r.trim().is_empty())
        .ok_or(CommandError::Usage)?;

    let request = ProvisionRequest {
        board_reference,
        webhook_url_or_id: args.next(),
        webhook_token: args.next(),
        channel_id: inv.caller.channel_id,
        guild_id: inv.caller.guild_id,
        guild_name: inv.caller.guild_name,
    };
    let linked = provisioner.provision(&request).await?;
    Ok(format!(
        "✅ Successfully initialized board events for \"{}\".",
        linked.board.name
    ))
}

/// Echo the message and its parsed arguments.
pub fn test_command() -> CommandDescriptor {
    CommandDescriptor::new("test", run_test)
        .summary("Show how a message is parsed.")
        .usage("test [...args]")
        .examples(&["test one two three", "test one \"two and two\" three"])
}

async fn run_test(inv: Invocation, args: Vec<String>) -> CommandResult {
    Ok(format!(
        "Content: `{}`\nArguments: `{}`",
        inv.content,
        args.join(", ")
    ))
}

/// Report the board bound to the current channel.
pub fn status_command(store: Arc<dyn BindingStore>) -> CommandDescriptor {
    CommandDescriptor::new("status", move |inv, _args| run_status(store.clone(), inv))
        .summary("Show the board linked to this channel.")
        .usage("status")
}

async fn run_status(store: Arc<dyn BindingStore>, inv: Invocation) -> CommandResult {
    let binding = store
        .find_by_channel(&inv.caller.channel_id)
        .map_err(|e| CommandError::Failed(e.to_string()))?;
    let Some(binding) = binding else {
        return Ok(format!(
            "This channel is not linked to a board. Use `{}init <board>` to link one.",
            inv.prefix
        ));
    };
    let disabled = if binding.disabled_events.is_empty() {
        "none".to_string()
    } else {
        binding
            .disabled_events
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    Ok(format!(
        "Linked board: {}\nWebhook: {}\nDisabled events: {}\nLinked at: {}",
        binding.board_id,
        binding.webhook_id,
        disabled,
        binding.created_at.format("%Y-%m-%d %H:%M UTC")
    ))
}

/// List commands, or show details for one.
pub fn help_command() -> CommandDescriptor {
    CommandDescriptor::new("help", run_help)
        .aliases(&["commands"])
        .summary("List commands or show help for one.")
        .usage("help [command]")
        .examples(&["help", "help init"])
}

async fn run_help(inv: Invocation, args: Vec<String>) -> CommandResult {
    let prefix = &inv.prefix;
    let Some(wanted) = args.first() else {
        let mut out = String::from("Commands:\n");
        for cmd in inv.registry.commands() {
            out.push_str(&format!("• {}{} - {}\n", prefix, cmd.name, cmd.help.summary));
        }
        out.push_str(&format!("\nUse {}help <command> for details.", prefix));
        return Ok(out);
    };

    let Some(cmd) = inv.registry.resolve(wanted) else {
        return Ok(format!(
            "Unknown command `{}`. Send {}help for available commands.",
            wanted, prefix
        ));
    };

    let mut out = format!("{}{}\n{}\n", prefix, cmd.help.usage, cmd.help.summary);
    if !cmd.aliases.is_empty() {
        out.push_str(&format!("Aliases: {}\n", cmd.aliases.join(", ")));
    }
    if cmd.required_level > EVERYONE {
        out.push_str(&format!("Requires: {}\n", level_name(cmd.required_level)));
    }
    if !cmd.help.examples.is_empty() {
        out.push_str("Examples:\n");
        for example in &cmd.help.examples {
            out.push_str(&format!("  {}{}\n", prefix, example));
        }
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::ChannelBoardBinding;
    use crate::commands::permission::{PermissionLevel, OWNER};
    use crate::commands::{CallerContext, DispatchOutcome, Dispatcher};
    use crate::provisioning::testing::{FakeBoardApi, LookupReply, RecordingStore};
    use crate::provisioning::INVALID_BOARD_MESSAGE;

    const BOARD_ID: &str = "5803ba32d0514d27823abf3b";

    fn caller(channel: &str, level: PermissionLevel) -> CallerContext {
        CallerContext {
            user_id: "42".to_string(),
            user_name: "Ada".to_string(),
            level,
            channel_id: channel.to_string(),
            guild_id: "g1".to_string(),
            guild_name: Some("Yappers".to_string()),
        }
    }

    fn setup(api: FakeBoardApi) -> (Dispatcher, Arc<FakeBoardApi>, Arc<RecordingStore>) {
        let api = Arc::new(api);
        let store = Arc::new(RecordingStore::new());
        let provisioner = Arc::new(BoardProvisioner::new(
            api.clone(),
            store.clone(),
            "https://bot.example/hooks",
        ));
        let registry = default_registry(provisioner).unwrap();
        (Dispatcher::new("!", Arc::new(registry)), api, store)
    }

    #[tokio::test]
    async fn init_links_board_end_to_end() {
        let (d, api, store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let out = d.dispatch("!init ttDOjGp5", caller("c1", CHANNEL_ADMIN)).await;
        let text = out.reply_text().unwrap();
        assert!(text.contains("Yappy Board"), "{}", text);

        let inserts = store.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].board_id, BOARD_ID);
        assert_eq!(inserts[0].webhook_id, "wh123");
        assert_eq!(inserts[0].channel_id, "c1");
        assert_eq!(api.lookups.lock().unwrap().as_slice(), ["ttDOjGp5"]);
    }

    #[tokio::test]
    async fn initialize_alias_and_invalid_id() {
        let (d, api, store) = setup(FakeBoardApi::new(LookupReply::InvalidId, Some("wh123")));

        let out = d.dispatch("!initialize bogus", caller("c1", OWNER)).await;
        assert_eq!(out.reply_text(), Some(format!("❌ {}", INVALID_BOARD_MESSAGE)));
        assert_eq!(api.webhook_count(), 0);
        assert_eq!(store.insert_count(), 0);
    }

    #[tokio::test]
    async fn init_requires_channel_admin() {
        let (d, api, _store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let out = d.dispatch("!init ttDOjGp5", caller("c1", EVERYONE)).await;
        assert!(matches!(out, DispatchOutcome::Denied { .. }));
        assert_eq!(api.lookup_count(), 0);
    }

    #[tokio::test]
    async fn init_without_board_shows_usage() {
        let (d, api, _store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let out = d.dispatch("!init", caller("c1", CHANNEL_ADMIN)).await;
        assert_eq!(
            out.reply_text().as_deref(),
            Some("❌ Usage: !init <boardReference> [webhookUrlOrId] [webhookToken]")
        );
        assert_eq!(api.lookup_count(), 0);
    }

    #[tokio::test]
    async fn second_init_in_channel_is_rejected_without_remote_calls() {
        let (d, api, _store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        d.dispatch("!init ttDOjGp5", caller("c1", CHANNEL_ADMIN)).await;
        let out = d.dispatch("!init otherBoard", caller("c1", CHANNEL_ADMIN)).await;

        assert_eq!(
            out.reply_text().as_deref(),
            Some("❌ This channel already has events for a board.")
        );
        assert_eq!(api.lookup_count(), 1);
        assert_eq!(api.webhook_count(), 1);
    }

    #[tokio::test]
    async fn status_reports_binding() {
        let (d, _api, store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let out = d.dispatch("!status", caller("c1", EVERYONE)).await;
        assert!(out.reply_text().unwrap().contains("not linked"));

        let mut binding = ChannelBoardBinding::new("c1", "g1", BOARD_ID, "wh9");
        binding.disabled_events.insert("updateCard".to_string());
        store.seed(binding);

        let text = d.dispatch("!status", caller("c1", EVERYONE)).await.reply_text().unwrap();
        assert!(text.contains(BOARD_ID));
        assert!(text.contains("wh9"));
        assert!(text.contains("updateCard"));
    }

    #[tokio::test]
    async fn test_command_echoes_content_and_arguments() {
        let (d, _api, _store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let text = d
            .dispatch(r#"!test one "two and two" three"#, caller("c1", EVERYONE))
            .await
            .reply_text()
            .unwrap();
        assert_eq!(
            text,
            "Content: `!test one \"two and two\" three`\nArguments: `one, two and two, three`"
        );
    }

    #[tokio::test]
    async fn help_lists_and_describes_commands() {
        let (d, _api, _store) = setup(FakeBoardApi::finding(BOARD_ID, "Yappy Board", "wh123"));

        let list = d.dispatch("!help", caller("c1", EVERYONE)).await.reply_text().unwrap();
        for name in ["!help", "!init", "!status", "!test"] {
            assert!(list.contains(name), "missing {} in {}", name, list);
        }

        let detail = d
            .dispatch("!commands initialize", caller("c1", EVERYONE))
            .await
            .reply_text()
            .unwrap();
        assert!(detail.starts_with("!init <boardReference>"));
        assert!(detail.contains("Aliases: initialize"));
        assert!(detail.contains("Requires: channel admin"));
        assert!(detail.contains("!init https://trello.com/b/ttDOjGp5/yappy-trello"));

        let unknown = d.dispatch("!help nope", caller("c1", EVERYONE)).await.reply_text().unwrap();
        assert!(unknown.starts_with("Unknown command `nope`"));
    }
}
