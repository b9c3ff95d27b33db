//! SQLite-backed block graph

use super::schema::init_schema;
use super::{BlockRef, DocumentStore, RunRecord, StoreError, generate_uid};
use crate::node::{Node, TextAlign, ViewType};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Block graph stored in a single SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a graph database
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create graph directory at {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open graph database at {}", path.display()))?;

        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway graph that lives only as long as the store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Default graph location (~/.local/share/smartblocks/graph.db on Linux)
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("smartblocks").join("graph.db"))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Most recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT workflow_name, target_uid, root_uid, block_count, illegal_commands, scheduled
             FROM workflow_runs
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let runs = stmt
            .query_map([limit as i64], |row| {
                let illegal: Option<String> = row.get(4)?;
                Ok(RunRecord {
                    workflow_name: row.get(0)?,
                    target_uid: row.get(1)?,
                    root_uid: row.get(2)?,
                    block_count: row.get::<_, i64>(3)? as usize,
                    illegal_commands: illegal
                        .filter(|s| !s.is_empty())
                        .map(|s| s.split(',').map(String::from).collect())
                        .unwrap_or_default(),
                    scheduled: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn load_node(conn: &Connection, uid: &str) -> Result<Option<Node>, StoreError> {
    let row = conn
        .query_row(
            "SELECT text, heading, text_align, view_type, open, props FROM blocks WHERE uid = ?1",
            [uid],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((text, heading, text_align, view_type, open, props)) = row else {
        return Ok(None);
    };

    let props = match props {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
        _ => Default::default(),
    };

    Ok(Some(Node {
        text,
        children: Vec::new(),
        uid: Some(uid.to_string()),
        heading: heading.map(|h| h as u8),
        text_align: text_align.as_deref().and_then(TextAlign::parse),
        view_type: view_type.as_deref().and_then(ViewType::parse),
        open,
        props,
    }))
}

fn child_uids(conn: &Connection, uid: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT uid FROM blocks WHERE parent_uid = ?1 ORDER BY sort_order")?;
    let uids = stmt
        .query_map([uid], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(uids)
}

fn load_tree(conn: &Connection, uid: &str) -> Result<Option<Node>, StoreError> {
    let Some(mut node) = load_node(conn, uid)? else {
        return Ok(None);
    };

    for child in child_uids(conn, uid)? {
        if let Some(child_node) = load_tree(conn, &child)? {
            node.children.push(child_node);
        }
    }

    Ok(Some(node))
}

fn props_json(node: &Node) -> Result<Option<String>, StoreError> {
    if node.props.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(&node.props)?))
    }
}

fn insert_tree(
    conn: &Connection,
    parent: &str,
    order: usize,
    node: &Node,
    timestamp: &str,
) -> Result<String, StoreError> {
    let uid = node.uid.clone().unwrap_or_else(generate_uid);

    conn.execute(
        "INSERT INTO blocks (uid, parent_uid, sort_order, text, heading, text_align, view_type, open, props, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            &uid,
            parent,
            order as i64,
            &node.text,
            node.heading.map(i64::from),
            node.text_align.map(|a| a.as_str()),
            node.view_type.map(|v| v.as_str()),
            node.open,
            props_json(node)?,
            timestamp,
        ],
    )?;

    for (i, child) in node.children.iter().enumerate() {
        insert_tree(conn, &uid, i, child, timestamp)?;
    }

    Ok(uid)
}

fn exists(conn: &Connection, uid: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM blocks WHERE uid = ?1", [uid], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn mention_pattern(title: &str) -> Option<Regex> {
    let escaped = regex::escape(title);
    Regex::new(&format!(r"\[\[{escaped}\]\]|#{escaped}(?:[^\w/-]|$)")).ok()
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn text(&self, uid: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let text = conn
            .query_row("SELECT text FROM blocks WHERE uid = ?1", [uid], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(text)
    }

    async fn children(&self, uid: &str) -> Result<Vec<String>, StoreError> {
        child_uids(&self.conn(), uid)
    }

    async fn full_tree(&self, uid: &str) -> Result<Option<Node>, StoreError> {
        load_tree(&self.conn(), uid)
    }

    async fn parent_of(&self, uid: &str) -> Result<Option<(String, usize)>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT parent_uid, sort_order FROM blocks WHERE uid = ?1",
                [uid],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            None => Err(StoreError::BlockNotFound {
                uid: uid.to_string(),
            }),
            Some((None, _)) => Ok(None),
            Some((Some(parent), order)) => Ok(Some((parent, order as usize))),
        }
    }

    async fn create_block(
        &self,
        parent: &str,
        order: usize,
        node: &Node,
    ) -> Result<String, StoreError> {
        let mut conn = self.conn();
        if !exists(&conn, parent)? {
            return Err(StoreError::BlockNotFound {
                uid: parent.to_string(),
            });
        }

        let tx = conn.transaction()?;
        let sibling_count = child_uids(&tx, parent)?.len();
        let order = order.min(sibling_count);

        tx.execute(
            "UPDATE blocks SET sort_order = sort_order + 1 WHERE parent_uid = ?1 AND sort_order >= ?2",
            params![parent, order as i64],
        )?;
        let uid = insert_tree(&tx, parent, order, node, &now())?;
        tx.commit()?;

        tracing::debug!(uid = %uid, parent = parent, order, "Created block");
        Ok(uid)
    }

    async fn update_block(&self, uid: &str, node: &Node) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE blocks
             SET text = ?2, heading = ?3, text_align = ?4, view_type = ?5, open = ?6, props = ?7, updated_at = ?8
             WHERE uid = ?1",
            params![
                uid,
                &node.text,
                node.heading.map(i64::from),
                node.text_align.map(|a| a.as_str()),
                node.view_type.map(|v| v.as_str()),
                node.open,
                props_json(node)?,
                now(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::BlockNotFound {
                uid: uid.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_block(&self, uid: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let position = conn
            .query_row(
                "SELECT parent_uid, sort_order FROM blocks WHERE uid = ?1",
                [uid],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((parent, order)) = position else {
            return Err(StoreError::BlockNotFound {
                uid: uid.to_string(),
            });
        };

        let tx = conn.transaction()?;
        tx.execute(
            "WITH RECURSIVE subtree(uid) AS (
                SELECT ?1
                UNION ALL
                SELECT b.uid FROM blocks b JOIN subtree s ON b.parent_uid = s.uid
             )
             DELETE FROM blocks WHERE uid IN (SELECT uid FROM subtree)",
            [uid],
        )?;
        if let Some(parent) = parent {
            tx.execute(
                "UPDATE blocks SET sort_order = sort_order - 1 WHERE parent_uid = ?1 AND sort_order > ?2",
                params![parent, order],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn create_page(&self, title: &str) -> Result<String, StoreError> {
        if let Some(uid) = self.find_page(title).await? {
            return Ok(uid);
        }

        let uid = generate_uid();
        let timestamp = now();
        self.conn().execute(
            "INSERT INTO blocks (uid, parent_uid, sort_order, text, page_title, created_at, updated_at)
             VALUES (?1, NULL, 0, ?2, ?2, ?3, ?3)",
            params![&uid, title, timestamp],
        )?;

        tracing::debug!(uid = %uid, title = title, "Created page");
        Ok(uid)
    }

    async fn find_page(&self, title: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let uid = conn
            .query_row(
                "SELECT uid FROM blocks WHERE page_title = ?1",
                [title],
                |row| row.get(0),
            )
            .optional()?;
        Ok(uid)
    }

    async fn page_of(&self, uid: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let title = conn
            .query_row(
                "WITH RECURSIVE up(uid, parent_uid, page_title) AS (
                    SELECT uid, parent_uid, page_title FROM blocks WHERE uid = ?1
                    UNION ALL
                    SELECT b.uid, b.parent_uid, b.page_title FROM blocks b JOIN up ON b.uid = up.parent_uid
                 )
                 SELECT page_title FROM up WHERE page_title IS NOT NULL LIMIT 1",
                [uid],
                |row| row.get(0),
            )
            .optional()?;
        Ok(title)
    }

    async fn references(&self, title: &str) -> Result<Vec<BlockRef>, StoreError> {
        let Some(pattern) = mention_pattern(title) else {
            return Ok(Vec::new());
        };

        let candidates: Vec<(String, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT uid, text FROM blocks
                 WHERE page_title IS NULL AND (instr(text, ?1) > 0 OR instr(text, ?2) > 0)
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(
                    params![format!("[[{}]]", title), format!("#{}", title)],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut refs = Vec::new();
        for (uid, text) in candidates {
            if !pattern.is_match(&text) {
                continue;
            }
            let page_title = self.page_of(&uid).await?;
            refs.push(BlockRef {
                uid,
                text,
                page_title,
            });
        }

        Ok(refs)
    }

    async fn record_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO workflow_runs (workflow_name, target_uid, root_uid, block_count, illegal_commands, scheduled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &run.workflow_name,
                &run.target_uid,
                &run.root_uid,
                run.block_count as i64,
                run.illegal_commands.join(","),
                run.scheduled,
                now(),
            ],
        )?;
        Ok(())
    }
}
