//! Turn raw chat text into a command handler call.

use std::sync::Arc;

use tracing::Instrument;

use super::permission::{authorize, level_name, Authorization, PermissionLevel};
use super::tokenizer::tokenize;
use super::{CallerContext, CommandDescriptor, CommandError, CommandRegistry, Invocation};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No prefix, or a bare prefix: not a command.
    Ignored,
    /// Prefixed, but no command has that name or alias. Nothing is sent back.
    UnknownCommand { word: String },
    Denied {
        command: String,
        required: PermissionLevel,
        actual: PermissionLevel,
    },
    Replied { command: String, text: String },
    Failed { command: String, text: String },
}

impl DispatchOutcome {
    /// Text to send back to the channel, if any.
    pub fn reply_text(&self) -> Option<String> {
        match self {
            DispatchOutcome::Ignored | DispatchOutcome::UnknownCommand { .. } => None,
            DispatchOutcome::Denied { command, required, .. } => Some(format!(
                "❌ You need {} permission to use `{}`.",
                level_name(*required),
                command
            )),
            DispatchOutcome::Replied { text, .. } => Some(text.clone()),
            DispatchOutcome::Failed { text, .. } => Some(format!("❌ {}", text)),
        }
    }
}

pub struct Dispatcher {
    prefix: String,
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Handle one message. Never fails: handler errors become `Failed`.
    pub async fn dispatch(&self, content: &str, caller: CallerContext) -> DispatchOutcome {
        let Some(rest) = content.strip_prefix(self.prefix.as_str()) else {
            return DispatchOutcome::Ignored;
        };

        let mut tokens = tokenize(rest).into_iter();
        let Some(word) = tokens.next() else {
            return DispatchOutcome::Ignored;
        };
        let args: Vec<String> = tokens.collect();

        let Some(command) = self.registry.resolve(&word) else {
            tracing::debug!(channel = %caller.channel_id, "Unknown command '{}'", word);
            return DispatchOutcome::UnknownCommand { word };
        };

        let span = tracing::info_span!(
            "dispatch",
            request_id = %ulid::Ulid::new(),
            command = %command.name,
            channel = %caller.channel_id,
            user = %caller.user_id,
        );
        self.run(command, content, caller, args)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        command: Arc<CommandDescriptor>,
        content: &str,
        caller: CallerContext,
        args: Vec<String>,
    ) -> DispatchOutcome {
        if authorize(caller.level, command.required_level) == Authorization::Deny {
            tracing::info!(
                "Permission denied: level {} < required {}",
                caller.level,
                command.required_level
            );
            return DispatchOutcome::Denied {
                command: command.name.clone(),
                required: command.required_level,
                actual: caller.level,
            };
        }

        let invocation = Invocation {
            caller,
            content: content.to_string(),
            prefix: self.prefix.clone(),
            registry: self.registry.clone(),
        };

        tracing::debug!("Running with {} argument(s)", args.len());
        // Run on its own task so a panicking handler is contained like an error.
        let handle = tokio::spawn((command.handler)(invocation, args).in_current_span());
        match handle.await {
            Ok(Ok(text)) => DispatchOutcome::Replied {
                command: command.name.clone(),
                text,
            },
            Ok(Err(err)) => {
                let text = self.failure_text(&command, &err);
                if matches!(&err, CommandError::Provision(p) if p.is_inconsistent_state()) {
                    tracing::error!("Command left inconsistent state: {}", err);
                } else {
                    tracing::warn!("Command failed: {}", err);
                }
                DispatchOutcome::Failed {
                    command: command.name.clone(),
                    text,
                }
            }
            Err(join_err) => {
                tracing::error!("Command handler aborted: {}", join_err);
                DispatchOutcome::Failed {
                    command: command.name.clone(),
                    text: "An error occurred! The command stopped unexpectedly.".to_string(),
                }
            }
        }
    }

    fn failure_text(&self, command: &CommandDescriptor, err: &CommandError) -> String {
        match err {
            CommandError::Usage => format!("Usage: {}{}", self.prefix, command.help.usage),
            CommandError::Provision(p) => p.user_message(),
            CommandError::Failed(msg) => format!("An error occurred! {}", msg),
        }
    }
}
