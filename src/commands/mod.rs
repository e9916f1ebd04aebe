//! Chat commands: descriptors, the registry, and dispatch.
//!
//! A command is plain data plus a handler closure. The registry maps command
//! names and aliases (case-insensitive) to descriptors, and the dispatcher
//! turns raw chat text into a handler call.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Settings;
use crate::provisioning::{BoardProvisioner, ProvisionError};

pub mod builtin;
pub mod dispatcher;
pub mod permission;
pub mod tokenizer;

pub use builtin::default_registry;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use permission::{authorize, Authorization, PermissionLevel};
pub use tokenizer::tokenize;

/// Who sent a message, and where.
#[derive(Clone, Debug)]
pub struct CallerContext {
    pub user_id: String,
    pub user_name: String,
    pub level: PermissionLevel,
    pub channel_id: String,
    pub guild_id: String,
    pub guild_name: Option<String>,
}

/// Everything a handler gets besides its argument tokens.
#[derive(Clone)]
pub struct Invocation {
    pub caller: CallerContext,
    /// The raw message text, prefix included.
    pub content: String,
    pub prefix: String,
    pub registry: Arc<CommandRegistry>,
}

#[derive(Error, Debug)]
pub enum CommandError {
    /// The arguments do not fit the command's usage line.
    #[error("invalid usage")]
    Usage,

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("{0}")]
    Failed(String),
}

pub type CommandResult = std::result::Result<String, CommandError>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = CommandResult> + Send>>;

pub type Handler = Arc<dyn Fn(Invocation, Vec<String>) -> HandlerFuture + Send + Sync>;

/// Display-only help text for a command.
#[derive(Clone, Debug, Default)]
pub struct CommandHelp {
    pub summary: String,
    pub usage: String,
    pub examples: Vec<String>,
}

/// A registered command.
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub required_level: PermissionLevel,
    pub help: CommandHelp,
    pub handler: Handler,
}

impl CommandDescriptor {
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(Invocation, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            required_level: permission::EVERYONE,
            help: CommandHelp {
                usage: name.to_string(),
                ..CommandHelp::default()
            },
            handler: Arc::new(move |inv: Invocation, args: Vec<String>| -> HandlerFuture {
                Box::pin(handler(inv, args))
            }),
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn level(mut self, level: PermissionLevel) -> Self {
        self.required_level = level;
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.help.summary = summary.to_string();
        self
    }

    pub fn usage(mut self, usage: &str) -> Self {
        self.help.usage = usage.to_string();
        self
    }

    pub fn examples(mut self, examples: &[&str]) -> Self {
        self.help.examples = examples.iter().map(|e| e.to_string()).collect();
        self
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("required_level", &self.required_level)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command name or alias '{0}' is already registered")]
    DuplicateCommand(String),
}

/// Name and alias lookup for commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<CommandDescriptor>>,
    aliases: HashMap<String, String>,
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_taken(&self, key: &str) -> bool {
        self.commands.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Add a command. Nothing is registered if the name or any alias clashes.
    pub fn register(&mut self, mut descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        let name = normalize(&descriptor.name);
        if name.is_empty() || self.is_taken(&name) {
            return Err(RegistryError::DuplicateCommand(name));
        }

        let mut aliases: Vec<String> = Vec::with_capacity(descriptor.aliases.len());
        for alias in descriptor.aliases.iter().map(|a| normalize(a)) {
            if alias.is_empty() || alias == name || aliases.contains(&alias) || self.is_taken(&alias) {
                return Err(RegistryError::DuplicateCommand(alias));
            }
            aliases.push(alias);
        }

        descriptor.name = name.clone();
        descriptor.aliases = aliases.clone();
        for alias in aliases {
            self.aliases.insert(alias, name.clone());
        }
        tracing::debug!("Registered command {}", name);
        self.commands.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Find a command by name, then by alias.
    pub fn resolve(&self, word: &str) -> Option<Arc<CommandDescriptor>> {
        let key = normalize(word);
        if let Some(cmd) = self.commands.get(&key) {
            return Some(cmd.clone());
        }
        self.aliases
            .get(&key)
            .and_then(|name| self.commands.get(name))
            .cloned()
    }

    /// Commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<CommandDescriptor>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Wire the board client, binding store and built-in commands from settings.
pub fn build_dispatcher(settings: &Settings) -> crate::error::Result<Dispatcher> {
    let (_, _, callback_url) = settings.board_api.require_credentials()?;
    let api = crate::board::create_client(settings)?;
    let store = crate::bindings::open_store(settings)?;
    let provisioner = Arc::new(BoardProvisioner::new(api, store, callback_url));
    let registry = default_registry(provisioner)?;
    tracing::info!(
        "Registered {} commands with prefix '{}'",
        registry.len(),
        settings.commands.prefix
    );
    Ok(Dispatcher::new(settings.commands.prefix.clone(), Arc::new(registry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, |_inv, _args| async { Ok::<_, CommandError>(String::new()) })
    }

    #[test]
    fn resolves_by_name_and_alias_ignoring_case() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("init").aliases(&["initialize"])).unwrap();

        assert_eq!(registry.resolve("init").unwrap().name, "init");
        assert_eq!(registry.resolve("INIT").unwrap().name, "init");
        assert_eq!(registry.resolve("Initialize").unwrap().name, "init");
        assert!(registry.resolve("deinit").is_none());
    }

    #[test]
    fn duplicate_alias_across_commands_fails() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("init").aliases(&["setup"])).unwrap();

        let err = registry.register(noop("bind").aliases(&["setup"])).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCommand("setup".to_string()));
        assert!(registry.resolve("bind").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn alias_may_not_shadow_a_name_or_vice_versa() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("init")).unwrap();
        registry.register(noop("help").aliases(&["h"])).unwrap();

        assert!(registry.register(noop("bind").aliases(&["init"])).is_err());
        assert!(registry.register(noop("h")).is_err());
        assert!(registry.register(noop("Init")).is_err());
        assert!(registry.register(noop("x").aliases(&["y", "y"])).is_err());
        assert!(registry.register(noop("z").aliases(&["z"])).is_err());
    }

    #[test]
    fn unregistered_name_is_not_found() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("init").is_none());
    }
}
