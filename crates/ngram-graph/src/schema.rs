//! Table layout, indexes, migrations, and durability pragmas.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::{Graph, StoreError};

/// Column list `token0_id,token1_id,...` for a context of `order` slots.
pub(crate) fn token_columns(order: usize) -> String {
    (0..order)
        .map(|i| format!("token{i}_id"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether the database already holds a graph.
pub(crate) fn is_initialized(conn: &Connection) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'info'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Create every table for a graph of the given order.
pub(crate) fn create_tables(conn: &Connection, order: usize) -> Result<(), StoreError> {
    debug!("creating table: info");
    conn.execute_batch(
        "CREATE TABLE info (
            attribute TEXT NOT NULL PRIMARY KEY,
            text TEXT NOT NULL)",
    )?;

    debug!("creating table: tokens");
    conn.execute_batch(
        "CREATE TABLE tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT UNIQUE NOT NULL,
            is_word INTEGER NOT NULL)",
    )?;

    debug!("creating table: token_stems");
    conn.execute_batch(
        "CREATE TABLE token_stems (
            token_id INTEGER,
            stem TEXT NOT NULL)",
    )?;

    let token_defs = (0..order)
        .map(|i| format!("token{i}_id INTEGER REFERENCES tokens(id)"))
        .collect::<Vec<_>>()
        .join(",\n            ");
    debug!(order, "creating table: nodes");
    conn.execute_batch(&format!(
        "CREATE TABLE nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            count INTEGER NOT NULL,
            {token_defs})"
    ))?;

    debug!("creating table: edges");
    conn.execute_batch(
        "CREATE TABLE edges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prev_node INTEGER NOT NULL REFERENCES nodes(id),
            next_node INTEGER NOT NULL REFERENCES nodes(id),
            count INTEGER NOT NULL,
            has_space INTEGER NOT NULL)",
    )?;

    Ok(())
}

/// Bring an older store up to date.
///
/// The obsolete `tokens_text` index duplicated the UNIQUE constraint. Stores
/// from earlier releases also kept node counts with triggers; counts are now
/// maintained by [`Graph::add_edge`], so a surviving trigger would count twice.
pub(crate) fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "DROP INDEX IF EXISTS tokens_text;
         DROP TRIGGER IF EXISTS edges_insert_trigger;
         DROP TRIGGER IF EXISTS edges_update_trigger;
         DROP TRIGGER IF EXISTS edges_delete_trigger;",
    )?;
    Ok(())
}

/// Journal and sync settings for the connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Durability {
    /// Truncating journal, normal syncs.
    Normal,
    /// In-memory journal, no syncs. Used while batch learning.
    Bulk,
}

pub(crate) fn apply_durability(conn: &Connection, mode: Durability) -> Result<(), StoreError> {
    let (journal, sync) = match mode {
        Durability::Normal => ("TRUNCATE", "NORMAL"),
        Durability::Bulk => ("MEMORY", "OFF"),
    };
    // journal_mode answers with the mode now in effect.
    conn.pragma_update_and_check(None, "journal_mode", journal, |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", sync)?;
    Ok(())
}

impl Graph {
    /// Create the full index set, removing the bulk-learning index.
    pub fn ensure_indexes(&self) -> Result<(), StoreError> {
        debug!("ensuring reply indexes");
        self.conn.execute_batch(&format!(
            "DROP INDEX IF EXISTS learn_index;
             CREATE UNIQUE INDEX IF NOT EXISTS nodes_token_ids ON nodes ({});
             CREATE UNIQUE INDEX IF NOT EXISTS edges_all_next ON edges
                 (next_node, prev_node, has_space, count);
             CREATE UNIQUE INDEX IF NOT EXISTS edges_all_prev ON edges
                 (prev_node, next_node, has_space, count);",
            self.columns.all_tokens
        ))?;
        Ok(())
    }

    /// Swap the two reply indexes for one narrow index suited to inserts.
    pub fn drop_reply_indexes(&self) -> Result<(), StoreError> {
        debug!("dropping reply indexes for bulk learning");
        self.conn.execute_batch(
            "DROP INDEX IF EXISTS edges_all_next;
             DROP INDEX IF EXISTS edges_all_prev;
             CREATE INDEX IF NOT EXISTS learn_index ON edges (prev_node, next_node);",
        )?;
        Ok(())
    }

    /// Switch journal and sync settings. Must not be called inside a
    /// transaction.
    pub fn set_durability(&self, mode: Durability) -> Result<(), StoreError> {
        debug!(?mode, "setting durability");
        apply_durability(&self.conn, mode)
    }

    /// Names of the indexes currently defined on the store.
    pub fn index_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}
