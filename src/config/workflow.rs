//! Workflow file configuration

use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A workflow authored as a TOML file
///
/// ```toml
/// name = "Morning"
/// description = "Daily check-in"
///
/// [[blocks]]
/// text = "<%INPUT:How are you?%%fine%>"
///
/// [[blocks]]
/// text = "Tasks"
/// [[blocks.children]]
/// text = "<%BLOCKMENTIONS:10,TODO%>"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Workflow name used by `SMARTBLOCK:` and the CLI
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Variables set before the first block runs
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Template blocks
    #[serde(default)]
    pub blocks: Vec<Node>,
}

impl WorkflowConfig {
    /// Validate the workflow structure
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("workflow name is empty".to_string());
        }

        if self.blocks.is_empty() {
            errors.push(format!("workflow '{}' has no blocks", self.name));
        }

        // Template uids are the targets of ((uid)) references
        let mut seen_uids = HashSet::new();
        let mut stack: Vec<&Node> = self.blocks.iter().collect();
        while let Some(node) = stack.pop() {
            if let Some(uid) = &node.uid {
                if uid.is_empty() || uid.contains(['(', ')']) || uid.contains(char::is_whitespace)
                {
                    errors.push(format!("block uid '{}' cannot be referenced", uid));
                }
                if !seen_uids.insert(uid.as_str()) {
                    errors.push(format!("duplicate block uid: {}", uid));
                }
            }
            stack.extend(node.children.iter());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Total number of template blocks
    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(Node::count).sum()
    }
}
