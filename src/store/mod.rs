//! Document store collaborator
//!
//! The engine reads workflow sources from and writes generated blocks to an
//! outliner graph through [`DocumentStore`]. Writes within one run are ordered:
//! siblings are created in ascending order.
//!
//! # Example
//!
//! ```ignore
//! use smartblocks::store::{DocumentStore, SqliteStore};
//!
//! let store = SqliteStore::open_in_memory()?;
//! let page = store.create_page("Inbox").await?;
//! store.create_block(&page, 0, &Node::text("hello")).await?;
//! ```

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::node::Node;
use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;

/// Length of generated block identifiers
pub const UID_LEN: usize = 9;

/// Errors from the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block '{uid}' not found")]
    BlockNotFound { uid: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid block props: {0}")]
    Props(#[from] serde_json::Error),
}

/// A block that mentions a page
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRef {
    pub uid: String,
    pub text: String,
    /// Title of the page the block lives on
    pub page_title: Option<String>,
}

/// One row of the run log
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub workflow_name: String,
    pub target_uid: String,
    pub root_uid: Option<String>,
    pub block_count: usize,
    pub illegal_commands: Vec<String>,
    pub scheduled: bool,
}

/// Read/write access to the outliner graph
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Text of a block (or a page's title)
    async fn text(&self, uid: &str) -> Result<Option<String>, StoreError>;

    /// Child uids in order
    async fn children(&self, uid: &str) -> Result<Vec<String>, StoreError>;

    /// A block with its whole subtree
    async fn full_tree(&self, uid: &str) -> Result<Option<Node>, StoreError>;

    /// Parent uid and position among its siblings
    async fn parent_of(&self, uid: &str) -> Result<Option<(String, usize)>, StoreError>;

    /// Create `node` and its subtree under `parent` at `order`, returning the new uid.
    /// A node that already carries a uid keeps it.
    async fn create_block(&self, parent: &str, order: usize, node: &Node)
    -> Result<String, StoreError>;

    /// Replace a block's text and attributes; children are untouched
    async fn update_block(&self, uid: &str, node: &Node) -> Result<(), StoreError>;

    /// Delete a block and its subtree
    async fn delete_block(&self, uid: &str) -> Result<(), StoreError>;

    /// Create a page, returning its uid
    async fn create_page(&self, title: &str) -> Result<String, StoreError>;

    /// Look up a page by title
    async fn find_page(&self, title: &str) -> Result<Option<String>, StoreError>;

    /// Title of the page containing a block
    async fn page_of(&self, uid: &str) -> Result<Option<String>, StoreError>;

    /// Blocks whose text references the page `title`
    async fn references(&self, title: &str) -> Result<Vec<BlockRef>, StoreError>;

    /// Append to the run log; stores without one ignore it
    async fn record_run(&self, _run: &RunRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Generate a fresh opaque block identifier
pub fn generate_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uid() {
        let a = generate_uid();
        let b = generate_uid();
        assert_eq!(a.len(), UID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::BlockNotFound { uid: "abc".into() };
        assert_eq!(err.to_string(), "block 'abc' not found");
    }
}
