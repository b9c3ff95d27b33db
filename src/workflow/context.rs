//! Per-run mutable state shared by the dispatcher, tree builder and commands

use crate::node::NodeProps;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Per-block short-circuit requested by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitBlock {
    #[default]
    No,
    /// Drop the block
    Yes,
    /// Drop the block if its text ended up empty
    End,
    /// Same test as `End`, requested by content checks
    Empty,
    /// Drop the block if it produced no children
    Childless,
}

impl ExitBlock {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "end" => Some(Self::End),
            "empty" => Some(Self::Empty),
            "childless" => Some(Self::Childless),
            _ => None,
        }
    }
}

/// Where the host should leave the caret after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPosition {
    pub uid: String,
    pub offset: usize,
}

/// Navigation that must wait until the generated tree is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterRunEffect {
    OpenPage(String),
    OpenBlock(String),
}

/// One-shot reparenting directive recorded for a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentDirective {
    None,
    Indent,
    Unindent,
}

/// State of one workflow run
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Insertion point of the run
    pub target_uid: String,

    /// Block that launched the run
    pub trigger_uid: Option<String>,

    /// Name of the workflow being expanded
    pub workflow_name: String,

    /// User variables set with `SET`
    pub variables: HashMap<String, String>,

    pub exit_block: ExitBlock,

    pub exit_workflow: bool,

    pub cursor_position: Option<CursorPosition>,

    pub focus_on_block: Option<String>,

    pub indent: HashSet<String>,

    pub unindent: HashSet<String>,

    /// Template uid -> uid assigned in this run
    pub ref_mapping: HashMap<String, String>,

    pub after_run: Vec<AfterRunEffect>,

    /// Deprecated commands that ran
    pub illegal_commands: BTreeSet<String>,

    /// Uid of the block being evaluated
    pub current_uid: String,

    /// Text produced so far for the block being evaluated
    pub current_content: String,

    /// Attributes commands asked to set on the current block
    pub pending_props: NodeProps,

    /// Result of the last `IF` in the current block
    pub if_state: Option<bool>,

    /// Overrides "today" for date commands
    pub date_basis: Option<NaiveDate>,
}

impl ExecutionContext {
    /// Fresh context for a top-level run
    pub fn new(
        target_uid: impl Into<String>,
        trigger_uid: Option<String>,
        workflow_name: impl Into<String>,
        variables: HashMap<String, String>,
    ) -> Self {
        Self {
            target_uid: target_uid.into(),
            trigger_uid,
            workflow_name: workflow_name.into(),
            variables,
            ..Default::default()
        }
    }

    /// Look up a variable
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Consume the per-block signals once a block's text has been expanded
    pub fn finish_block(&mut self) -> (ExitBlock, NodeProps) {
        self.if_state = None;
        (
            std::mem::take(&mut self.exit_block),
            std::mem::take(&mut self.pending_props),
        )
    }

    /// Read and clear the indent/unindent directive for a block.
    /// A block marked both ways stays where it is.
    pub fn take_indent(&mut self, uid: &str) -> IndentDirective {
        let indent = self.indent.remove(uid);
        let unindent = self.unindent.remove(uid);
        match (indent, unindent) {
            (true, false) => IndentDirective::Indent,
            (false, true) => IndentDirective::Unindent,
            _ => IndentDirective::None,
        }
    }

    /// Swap in a scoped context for a nested workflow and return the caller's.
    ///
    /// The nested run starts with the caller's variables, ref mapping and
    /// cursor but none of its per-block control state.
    pub fn begin_nested(&mut self, workflow_name: &str) -> ExecutionContext {
        let scoped = ExecutionContext {
            target_uid: self.target_uid.clone(),
            trigger_uid: self.trigger_uid.clone(),
            workflow_name: workflow_name.to_string(),
            variables: self.variables.clone(),
            cursor_position: self.cursor_position.clone(),
            focus_on_block: self.focus_on_block.clone(),
            ref_mapping: self.ref_mapping.clone(),
            after_run: self.after_run.clone(),
            illegal_commands: self.illegal_commands.clone(),
            current_uid: self.current_uid.clone(),
            current_content: self.current_content.clone(),
            date_basis: self.date_basis,
            ..Default::default()
        };
        std::mem::replace(self, scoped)
    }

    /// Restore the caller's context, keeping what the nested run produced
    /// for variables, refs, cursor and run-level bookkeeping
    pub fn end_nested(&mut self, caller: ExecutionContext) {
        let nested = std::mem::replace(self, caller);
        self.variables = nested.variables;
        self.ref_mapping = nested.ref_mapping;
        if nested.cursor_position.is_some() {
            self.cursor_position = nested.cursor_position;
        }
        if nested.focus_on_block.is_some() {
            self.focus_on_block = nested.focus_on_block;
        }
        self.after_run = nested.after_run;
        self.illegal_commands = nested.illegal_commands;
    }
}
