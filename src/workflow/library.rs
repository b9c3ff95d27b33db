//! Workflow lookup: workflow files, tagged blocks in the graph, predefined
//!
//! A graph block becomes a workflow when its text carries the `SmartBlock`
//! tag, e.g. `#SmartBlock Morning` or `#[[SmartBlock]] Morning`; the rest of
//! the text is the workflow name and its children are the template.

use crate::config::{SmartblocksConfig, WorkflowConfig, load_workflow_dir};
use crate::node::Node;
use crate::store::{DocumentStore, StoreError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Page title that marks a block as a workflow
pub const WORKFLOW_TAG: &str = "SmartBlock";

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#?\[\[SmartBlock\]\]|#SmartBlock\b").expect("valid workflow tag regex")
});

/// How the caller names the workflow to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRef {
    Name(String),
    /// A tagged block in the graph
    Block(String),
}

impl std::fmt::Display for WorkflowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Block(uid) => write!(f, "(({}))", uid),
        }
    }
}

/// Where a workflow was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOrigin {
    Predefined,
    File,
    Block(String),
}

/// A resolved workflow ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSource {
    pub name: String,
    pub description: Option<String>,
    pub variables: HashMap<String, String>,
    pub blocks: Vec<Node>,
    pub origin: WorkflowOrigin,
}

impl From<WorkflowConfig> for WorkflowSource {
    fn from(config: WorkflowConfig) -> Self {
        Self {
            name: config.name,
            description: config.description,
            variables: config.variables,
            blocks: config.blocks,
            origin: WorkflowOrigin::File,
        }
    }
}

/// Every workflow the engine can run
#[derive(Debug, Clone, Default)]
pub struct WorkflowLibrary {
    /// File workflows in precedence order
    files: Vec<WorkflowConfig>,
}

impl WorkflowLibrary {
    pub fn new(files: Vec<WorkflowConfig>) -> Self {
        Self { files }
    }

    /// Load workflow files from every configured directory.
    /// Earlier directories win when two files share a name.
    pub fn load(config: &SmartblocksConfig, project_dir: Option<&Path>) -> anyhow::Result<Self> {
        let dirs: Vec<PathBuf> = config.workflow_dirs(project_dir);
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for dir in dirs {
            for workflow in load_workflow_dir(&dir)? {
                if seen.insert(workflow.name.to_lowercase()) {
                    files.push(workflow);
                } else {
                    tracing::debug!(
                        workflow = %workflow.name,
                        dir = %dir.display(),
                        "Workflow shadowed by an earlier directory"
                    );
                }
            }
        }

        tracing::debug!(count = files.len(), "Loaded workflow files");
        Ok(Self { files })
    }

    /// Workflows that ship with the engine
    pub fn predefined() -> Vec<WorkflowSource> {
        [
            ("Current Time", "<%TIME%>"),
            ("Today", "<%TODAY%>"),
            ("Tomorrow", "<%TOMORROW%>"),
            ("Yesterday", "<%YESTERDAY%>"),
            ("Horizontal Line", "---"),
        ]
        .into_iter()
        .map(|(name, text)| WorkflowSource {
            name: name.to_string(),
            description: None,
            variables: HashMap::new(),
            blocks: vec![Node::text(text)],
            origin: WorkflowOrigin::Predefined,
        })
        .collect()
    }

    /// Find a workflow by name: files first, then tagged blocks, then predefined
    pub async fn find(
        &self,
        store: &dyn DocumentStore,
        name: &str,
    ) -> Result<Option<WorkflowSource>, StoreError> {
        let name = name.trim();

        if let Some(config) = self
            .files
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
        {
            return Ok(Some(config.clone().into()));
        }

        for tagged in store.references(WORKFLOW_TAG).await? {
            if tagged_name(&tagged.text).eq_ignore_ascii_case(name) {
                return from_block(store, &tagged.uid).await;
            }
        }

        Ok(Self::predefined()
            .into_iter()
            .find(|w| w.name.eq_ignore_ascii_case(name)))
    }

    pub async fn resolve(
        &self,
        store: &dyn DocumentStore,
        workflow: &WorkflowRef,
    ) -> Result<Option<WorkflowSource>, StoreError> {
        match workflow {
            WorkflowRef::Name(name) => self.find(store, name).await,
            WorkflowRef::Block(uid) => from_block(store, uid).await,
        }
    }

    /// Every reachable workflow, with shadowed names removed
    pub async fn list(&self, store: &dyn DocumentStore) -> Result<Vec<WorkflowSource>, StoreError> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();

        for config in &self.files {
            if seen.insert(config.name.to_lowercase()) {
                all.push(config.clone().into());
            }
        }

        for tagged in store.references(WORKFLOW_TAG).await? {
            let name = tagged_name(&tagged.text);
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                continue;
            }
            if let Some(source) = from_block(store, &tagged.uid).await? {
                all.push(source);
            }
        }

        for source in Self::predefined() {
            if seen.insert(source.name.to_lowercase()) {
                all.push(source);
            }
        }

        Ok(all)
    }

    /// Names of every reachable workflow, for suggestions
    pub async fn names(&self, store: &dyn DocumentStore) -> Result<Vec<String>, StoreError> {
        Ok(self.list(store).await?.into_iter().map(|w| w.name).collect())
    }
}

/// Workflow name carried by a tagged block's text
fn tagged_name(text: &str) -> String {
    TAG.replace_all(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

async fn from_block(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Option<WorkflowSource>, StoreError> {
    let Some(root) = store.full_tree(uid).await? else {
        return Ok(None);
    };

    Ok(Some(WorkflowSource {
        name: tagged_name(&root.text),
        description: None,
        variables: HashMap::new(),
        blocks: root.children,
        origin: WorkflowOrigin::Block(uid.to_string()),
    }))
}
