//! Database schema for the block graph

use rusqlite::Connection;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS blocks (
            uid TEXT PRIMARY KEY,
            parent_uid TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            text TEXT NOT NULL DEFAULT '',
            page_title TEXT UNIQUE,
            heading INTEGER,
            text_align TEXT,
            view_type TEXT,
            open INTEGER,
            props TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(parent_uid) REFERENCES blocks(uid)
        );

        CREATE INDEX IF NOT EXISTS idx_blocks_parent ON blocks(parent_uid, sort_order);
        CREATE INDEX IF NOT EXISTS idx_blocks_page_title ON blocks(page_title);

        CREATE TABLE IF NOT EXISTS workflow_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workflow_name TEXT NOT NULL,
            target_uid TEXT NOT NULL,
            root_uid TEXT,
            block_count INTEGER NOT NULL,
            illegal_commands TEXT,
            scheduled INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workflow_runs_workflow ON workflow_runs(workflow_name);
        CREATE INDEX IF NOT EXISTS idx_workflow_runs_created ON workflow_runs(created_at);
        "#,
    )
}
