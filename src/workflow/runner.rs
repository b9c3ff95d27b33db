//! Workflow runner - loads a workflow, builds its blocks and writes them back

use super::builder::{BuiltLevel, Intro};
use super::context::{AfterRunEffect, ExecutionContext};
use super::executor::{Interpreter, Services};
use super::library::{WorkflowRef, WorkflowSource};
use super::resolver::resolve_refs;
use crate::commands::CommandOutput;
use crate::node::{Node, NodeProps};
use crate::store::{DocumentStore, RunRecord, StoreError};
use crate::template::{CommandError, TemplateError, suggest_correction};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Deepest chain of `SMARTBLOCK` calls allowed in one run
pub const MAX_NESTING: usize = 10;

/// Errors that stop a run before any block is evaluated
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow '{name}' not found{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    WorkflowNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("target block '{uid}' not found")]
    TargetNotFound { uid: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Where generated blocks go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Append to the end of a page (or block)
    Page(String),
    /// Replace the `start..end` character range of an existing block
    Block { uid: String, start: usize, end: usize },
}

impl Target {
    pub fn uid(&self) -> &str {
        match self {
            Self::Page(uid) | Self::Block { uid, .. } => uid,
        }
    }
}

/// What to do with the host's caret after the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorMode {
    /// Move it to where `CURSOR` was recorded
    Mutable,
    /// Leave editing mode
    Immutable,
    #[default]
    None,
}

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub workflow: WorkflowRef,
    pub target: Target,
    pub variables: HashMap<String, String>,
    pub cursor: CursorMode,
    pub trigger_uid: Option<String>,
    /// Started by the scheduler rather than a user
    pub scheduled: bool,
}

impl RunRequest {
    pub fn new(workflow: WorkflowRef, target: Target) -> Self {
        Self {
            workflow,
            target,
            variables: HashMap::new(),
            cursor: CursorMode::None,
            trigger_uid: None,
            scheduled: false,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutcome {
    pub workflow: String,
    /// First generated or updated block; `None` when nothing was produced
    pub root_uid: Option<String>,
    pub nodes: Vec<Node>,
    pub illegal_commands: Vec<String>,
    pub variables: HashMap<String, String>,
}

/// Workflow runner
pub struct WorkflowRunner {
    services: Services,
}

impl WorkflowRunner {
    /// Create a new workflow runner
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run a workflow against a target and persist the result
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, WorkflowError> {
        let store = self.services.store.as_ref();
        let workflow = self.load_workflow(&request.workflow).await?;
        let target_uid = request.target.uid().to_string();

        tracing::info!(
            workflow = %workflow.name,
            target = %target_uid,
            scheduled = request.scheduled,
            "Running workflow"
        );

        let mut variables = workflow.variables.clone();
        variables.extend(request.variables);

        let ctx = ExecutionContext::new(
            target_uid.clone(),
            request.trigger_uid.clone(),
            workflow.name.clone(),
            variables,
        );
        let mut interp = Interpreter::new(self.services.clone(), ctx);

        let splice = match &request.target {
            Target::Block { uid, start, end } => Some(splice_block(store, uid, *start, *end).await?),
            Target::Page(uid) => {
                if store.text(uid).await?.is_none() {
                    return Err(WorkflowError::TargetNotFound { uid: uid.clone() });
                }
                None
            }
        };

        let intro = splice.as_ref().map(|s| Intro {
            uid: s.uid.clone(),
            content: s.prefix.clone(),
        });
        let mut nodes = interp.process_children(&workflow.blocks, intro).await.into_nodes();
        resolve_refs(&mut nodes, &interp.ctx.ref_mapping);

        match &splice {
            Some(splice) => persist_spliced(store, splice, &mut nodes).await?,
            None => append_children(store, &target_uid, &nodes).await?,
        }

        let ctx = interp.ctx;
        self.apply_effects(&ctx, request.cursor).await;

        let illegal_commands: Vec<String> = ctx.illegal_commands.iter().cloned().collect();
        if !illegal_commands.is_empty() {
            self.services.host.notifier.notify(
                &format!(
                    "Deprecated commands used in '{}': {}. They still work but will be removed.",
                    workflow.name,
                    illegal_commands.join(", ")
                ),
                10,
            );
        }

        if !request.scheduled && self.services.config.is_daily_workflow(&workflow.name) {
            self.services.host.scheduler.recurring_ran(&workflow.name);
        }

        let root_uid = nodes.first().and_then(|n| n.uid.clone());
        let record = RunRecord {
            workflow_name: workflow.name.clone(),
            target_uid,
            root_uid: root_uid.clone(),
            block_count: nodes.iter().map(Node::count).sum(),
            illegal_commands: illegal_commands.clone(),
            scheduled: request.scheduled,
        };
        if let Err(e) = store.record_run(&record).await {
            tracing::warn!(error = %e, "Failed to record run");
        }

        tracing::info!(
            workflow = %workflow.name,
            root = root_uid.as_deref().unwrap_or("none"),
            blocks = record.block_count,
            "Workflow finished"
        );

        Ok(RunOutcome {
            workflow: workflow.name,
            root_uid,
            nodes,
            illegal_commands,
            variables: ctx.variables,
        })
    }

    async fn load_workflow(&self, workflow: &WorkflowRef) -> Result<WorkflowSource, WorkflowError> {
        let store = self.services.store.as_ref();
        if let Some(source) = self.services.library.resolve(store, workflow).await? {
            return Ok(source);
        }

        let name = workflow.to_string();
        let known = self.services.library.names(store).await?;
        let known: Vec<&str> = known.iter().map(String::as_str).collect();
        Err(WorkflowError::WorkflowNotFound {
            suggestion: suggest_correction(&name, &known),
            name,
        })
    }

    /// Focus or cursor placement, then queued navigation
    async fn apply_effects(&self, ctx: &ExecutionContext, cursor: CursorMode) {
        let navigator = &self.services.host.navigator;

        if let Some(uid) = &ctx.focus_on_block {
            navigator.open_block(uid).await;
        } else if let (CursorMode::Mutable, Some(position)) = (cursor, &ctx.cursor_position) {
            navigator.set_cursor(&position.uid, position.offset).await;
        } else if cursor == CursorMode::Immutable {
            navigator.blur().await;
        }

        for effect in &ctx.after_run {
            match effect {
                AfterRunEffect::OpenPage(title) => navigator.open_page(title).await,
                AfterRunEffect::OpenBlock(uid) => {
                    // Template uids point at the block generated from them
                    let uid = ctx.ref_mapping.get(uid).unwrap_or(uid);
                    navigator.open_block(uid).await
                }
            }
        }
    }
}

/// A block split around the trigger text
#[derive(Debug, Clone)]
struct Splice {
    uid: String,
    prefix: String,
    suffix: String,
    existing: Node,
}

/// Remove `start..end` (in characters) from a block and keep both halves
async fn splice_block(
    store: &dyn DocumentStore,
    uid: &str,
    start: usize,
    end: usize,
) -> Result<Splice, WorkflowError> {
    let Some(mut existing) = store.full_tree(uid).await? else {
        return Err(WorkflowError::TargetNotFound {
            uid: uid.to_string(),
        });
    };

    let chars: Vec<char> = existing.text.chars().collect();
    let end = end.min(chars.len());
    let start = start.min(end);
    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end..].iter().collect();

    existing.text = format!("{}{}", prefix, suffix);
    existing.children.clear();
    store.update_block(uid, &existing).await?;

    Ok(Splice {
        uid: uid.to_string(),
        prefix,
        suffix,
        existing,
    })
}

/// Write the run's output around a spliced block
async fn persist_spliced(
    store: &dyn DocumentStore,
    splice: &Splice,
    nodes: &mut [Node],
) -> Result<(), StoreError> {
    let mut skip = 0;
    if let Some(first) = nodes
        .first_mut()
        .filter(|n| n.uid.as_deref() == Some(splice.uid.as_str()))
    {
        first.text = format!("{}{}{}", splice.prefix, first.text, splice.suffix);

        let mut merged = splice.existing.clone();
        merged.text = first.text.clone();
        merged.apply_props(NodeProps {
            heading: first.heading,
            text_align: first.text_align,
            view_type: first.view_type,
            open: first.open,
            extra: first.props.clone(),
        });
        store.update_block(&splice.uid, &merged).await?;
        append_children(store, &splice.uid, &first.children).await?;
        skip = 1;
    }

    let rest = &nodes[skip..];
    if rest.is_empty() {
        return Ok(());
    }

    match store.parent_of(&splice.uid).await? {
        Some((parent, order)) => {
            for (offset, node) in rest.iter().enumerate() {
                store.create_block(&parent, order + 1 + offset, node).await?;
            }
        }
        // The target is a page; its output becomes children
        None => append_children(store, &splice.uid, rest).await?,
    }
    Ok(())
}

/// Create `nodes` after a parent's existing children
async fn append_children(
    store: &dyn DocumentStore,
    parent: &str,
    nodes: &[Node],
) -> Result<(), StoreError> {
    let existing = store.children(parent).await?.len();
    for (offset, node) in nodes.iter().enumerate() {
        store.create_block(parent, existing + offset, node).await?;
    }
    Ok(())
}

impl Interpreter {
    /// Run another workflow from inside a block.
    ///
    /// Without a page the sub-workflow's first block merges into the current
    /// block and the rest follow it. With a page the output is appended there
    /// and nothing is returned inline.
    pub async fn run_nested(
        &mut self,
        name: &str,
        page: Option<&str>,
    ) -> Result<CommandOutput, CommandError> {
        if self.depth >= MAX_NESTING {
            return Err(CommandError::invalid(format!(
                "SMARTBLOCK nesting deeper than {} levels",
                MAX_NESTING
            )));
        }

        let workflow = match self.services.library.find(self.store(), name).await? {
            Some(workflow) => workflow,
            None => {
                let known = self.services.library.names(self.store()).await?;
                let known: Vec<&str> = known.iter().map(String::as_str).collect();
                return Err(TemplateError::unknown_workflow(name, &known).into());
            }
        };

        tracing::debug!(workflow = %workflow.name, depth = self.depth + 1, "Entering nested workflow");

        let caller = self.ctx.begin_nested(&workflow.name);
        for (key, value) in &workflow.variables {
            self.ctx
                .variables
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        self.depth += 1;
        let result = match page {
            None => {
                let intro = Intro {
                    uid: caller.current_uid.clone(),
                    content: caller.current_content.clone(),
                };
                let built = self.process_children(&workflow.blocks, Some(intro)).await;
                Ok(CommandOutput::Nodes(built.into_nodes()))
            }
            Some(title) => self.write_to_page(title, &workflow.blocks).await,
        };
        self.depth -= 1;
        self.ctx.end_nested(caller);

        tracing::debug!(workflow = %workflow.name, "Left nested workflow");
        result
    }

    async fn write_to_page(
        &mut self,
        title: &str,
        blocks: &[Node],
    ) -> Result<CommandOutput, CommandError> {
        let title = title.trim().trim_start_matches("[[").trim_end_matches("]]");
        let page_uid = self.store().create_page(title).await?;

        let built: BuiltLevel = self.process_children(blocks, None).await;
        let mut nodes = built.into_nodes();
        resolve_refs(&mut nodes, &self.ctx.ref_mapping);
        append_children(self.store(), &page_uid, &nodes).await?;

        Ok(CommandOutput::empty())
    }
}
