//! Command handler trait and name lookup

use super::Builtin;
use crate::node::Node;
use crate::template::{ArgPolicy, CommandError};
use crate::workflow::{ExecutionContext, Interpreter};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// What a handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Inline text
    Text(String),
    /// One block per line; the first merges into the current block
    Lines(Vec<String>),
    /// Prebuilt blocks. Only the first node's text and children merge into
    /// the current block; its heading, alignment, view and props are dropped
    /// (use the pending props channel for those). The rest become siblings.
    Nodes(Vec<Node>),
}

impl CommandOutput {
    /// Output that contributes no text
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Normalize to a node list
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            Self::Text(text) => vec![Node::text(text)],
            Self::Lines(lines) => lines.into_iter().map(Node::text).collect(),
            Self::Nodes(nodes) => nodes,
        }
    }
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for CommandOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A command body
///
/// Handlers get the live interpreter so they can read and write the run's
/// context, reach the store and host, or expand delayed arguments.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(
        &self,
        interp: &mut Interpreter,
        args: Vec<String>,
    ) -> Result<CommandOutput, CommandError>;
}

/// Adapts a synchronous closure over the execution context to [`CommandHandler`]
pub struct SyncHandler<F>(pub F);

#[async_trait]
impl<F> CommandHandler for SyncHandler<F>
where
    F: Fn(&mut ExecutionContext, Vec<String>) -> Result<CommandOutput, CommandError>
        + Send
        + Sync,
{
    async fn call(
        &self,
        interp: &mut Interpreter,
        args: Vec<String>,
    ) -> Result<CommandOutput, CommandError> {
        (self.0)(&mut interp.ctx, args)
    }
}

/// A registered command
#[derive(Clone)]
pub struct Command {
    /// Upper-case name used in `<%NAME%>`
    pub name: String,
    pub handler: Arc<dyn CommandHandler>,
    /// Pass arguments through unexpanded
    pub delay_args: bool,
    /// Deprecated; still runs but is reported after the run
    pub illegal: bool,
    pub args: ArgPolicy,
    pub description: String,
}

impl Command {
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.into().to_uppercase(),
            handler: Arc::new(handler),
            delay_args: false,
            illegal: false,
            args: ArgPolicy::Standard,
            description: String::new(),
        }
    }

    pub fn delay_args(mut self) -> Self {
        self.delay_args = true;
        self
    }

    pub fn illegal(mut self) -> Self {
        self.illegal = true;
        self
    }

    pub fn with_args(mut self, policy: ArgPolicy) -> Self {
        self.args = policy;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("delay_args", &self.delay_args)
            .field("illegal", &self.illegal)
            .field("args", &self.args)
            .finish()
    }
}

/// Commands by upper-case name
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in Builtin::ALL {
            registry.register(builtin.command());
        }
        registry
    }

    /// Add a command, replacing any command of the same name
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.commands.insert(command.name.clone(), command)
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.trim().to_uppercase())
    }

    /// Sorted command names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Commands sorted by name
    pub fn commands(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }
}
