//! Rewrites `((uid))` references to template blocks into generated uids

use crate::node::Node;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static BLOCK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([^()\s]+)\)\)").expect("valid block ref regex"));

/// Rewrite references in `nodes`, children before parents.
/// References to uids missing from `mapping` are left alone.
pub fn resolve_refs(nodes: &mut [Node], mapping: &HashMap<String, String>) {
    if mapping.is_empty() {
        return;
    }
    for node in nodes {
        resolve_refs(&mut node.children, mapping);
        if let Some(rewritten) = rewrite(&node.text, mapping) {
            node.text = rewritten;
        }
    }
}

/// Rewrite one piece of text, returning `None` when nothing changed
pub fn rewrite(text: &str, mapping: &HashMap<String, String>) -> Option<String> {
    if !text.contains("((") {
        return None;
    }

    let mut changed = false;
    let rewritten = BLOCK_REF.replace_all(text, |caps: &Captures| match mapping.get(&caps[1]) {
        Some(uid) => {
            changed = true;
            format!("(({}))", uid)
        }
        None => caps[0].to_string(),
    });

    changed.then(|| rewritten.into_owned())
}
