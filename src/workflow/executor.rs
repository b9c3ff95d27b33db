//! Block-text expansion and command dispatch

use super::context::ExecutionContext;
use super::library::WorkflowLibrary;
use crate::commands::CommandRegistry;
use crate::config::SmartblocksConfig;
use crate::host::Host;
use crate::node::Node;
use crate::store::DocumentStore;
use crate::template::{TemplateError, Token, suggest_correction, tokenize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used where expansion recurses into itself
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Collaborators shared by every run
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub host: Host,
    pub registry: Arc<CommandRegistry>,
    pub library: Arc<WorkflowLibrary>,
    pub config: Arc<SmartblocksConfig>,
}

/// Result of expanding one piece of block text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub text: String,
    /// Children contributed by commands that returned nodes
    pub children: Vec<Node>,
    /// Extra blocks to place after the current one
    pub next_blocks: Vec<Node>,
}

/// Evaluates block text against one run's context
pub struct Interpreter {
    pub services: Services,
    pub ctx: ExecutionContext,
    pub(crate) depth: usize,
}

impl Interpreter {
    pub fn new(services: Services, ctx: ExecutionContext) -> Self {
        Self {
            services,
            ctx,
            depth: 0,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.services.store.as_ref()
    }

    pub fn host(&self) -> &Host {
        &self.services.host
    }

    pub fn config(&self) -> &SmartblocksConfig {
        &self.services.config
    }

    /// Expand every command marker in `text`.
    ///
    /// With `track` set, the produced text is also appended to the context's
    /// `current_content` so commands like `CURSOR` see what precedes them.
    pub fn expand<'a>(
        &'a mut self,
        text: &'a str,
        track: bool,
    ) -> BoxFuture<'a, Result<Expansion, TemplateError>> {
        Box::pin(async move {
            let mut expansion = Expansion::default();

            for token in tokenize(text) {
                match token {
                    Token::Text(literal) => {
                        if track {
                            self.ctx.current_content.push_str(&literal);
                        }
                        expansion.text.push_str(&literal);
                    }
                    Token::Command(payload) => {
                        let mut nodes = self.dispatch(&payload).await?.into_iter();
                        if let Some(first) = nodes.next() {
                            if track {
                                self.ctx.current_content.push_str(&first.text);
                            }
                            expansion.text.push_str(&first.text);
                            expansion.children.extend(first.children);
                        }
                        expansion.next_blocks.extend(nodes);
                    }
                }
            }

            Ok(expansion)
        })
    }

    /// Expand `text` and keep only the resulting text
    pub async fn expand_text(&mut self, text: &str) -> Result<String, TemplateError> {
        Ok(self.expand(text, false).await?.text)
    }

    /// Run one `NAME:args` payload
    async fn dispatch(&mut self, payload: &str) -> Result<Vec<Node>, TemplateError> {
        let (name, raw_args) = match payload.split_once(':') {
            Some((name, args)) => (name, Some(args)),
            None => (payload, None),
        };

        let Some(command) = self.services.registry.get(name).cloned() else {
            let names = self.services.registry.names();
            let suggestion = suggest_correction(name.trim(), &names);
            tracing::debug!(
                command = name,
                suggestion = suggestion.as_deref(),
                "Unknown command left as text"
            );
            return Ok(vec![Node::text(format!("<%{}%>", payload))]);
        };

        if command.illegal {
            self.ctx.illegal_commands.insert(command.name.clone());
        }

        let raw = raw_args
            .map(|args| command.args.split(args))
            .unwrap_or_default();

        let args = if command.delay_args {
            raw
        } else {
            let mut expanded = Vec::with_capacity(raw.len());
            for arg in &raw {
                expanded.push(self.expand_text(arg).await?);
            }
            expanded
        };

        tracing::trace!(command = %command.name, args = ?args, "Dispatch");

        let output = command
            .handler
            .call(self, args)
            .await
            .map_err(|e| TemplateError::command(&command.name, e))?;

        Ok(output.into_nodes())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Interpreter fixtures for engine tests

    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::store::SqliteStore;

    pub fn services_with(host: Arc<RecordingHost>, library: WorkflowLibrary) -> Services {
        Services {
            store: Arc::new(SqliteStore::open_in_memory().unwrap()),
            host: Host::from_shared(host),
            registry: Arc::new(CommandRegistry::with_builtins()),
            library: Arc::new(library),
            config: Arc::new(SmartblocksConfig::default()),
        }
    }

    pub fn services() -> Services {
        services_with(RecordingHost::new(), WorkflowLibrary::default())
    }

    /// Interpreter positioned on a fresh block
    pub fn interpreter() -> Interpreter {
        interpreter_with(services())
    }

    pub fn interpreter_with(services: Services) -> Interpreter {
        let mut ctx = ExecutionContext::new("target", None, "Test", Default::default());
        ctx.current_uid = "current".into();
        Interpreter::new(services, ctx)
    }

    /// Expand text at block level and return just the text
    pub async fn expand(interp: &mut Interpreter, text: &str) -> String {
        interp.expand(text, true).await.unwrap().text
    }
}
