//! SQLite-backed n-gram transition graph.
//!
//! The graph stores three kinds of rows:
//! - **tokens**: distinct token texts, flagged as words or not, with an
//!   optional stem side table;
//! - **nodes**: fixed-width contexts of `order` token ids, each carrying the
//!   total count of edges that lead into it;
//! - **edges**: counted transitions between two nodes, tagged with whether
//!   whitespace separated them.
//!
//! A node's `count` always equals the sum of `count` over the edges whose
//! `next_node` is that node. [`Graph::add_edge`] keeps it that way by writing
//! the edge and the node count inside one savepoint (see
//! [`Graph::atomically`]).
//!
//! Everything is append or increment only. The one exception is the stem
//! table, which is rebuilt whenever the stemmer changes.
//!
//! # Example
//!
//! ```
//! use graph_core::ContextSlot;
//! use ngram_graph::Graph;
//!
//! let graph = Graph::init_in_memory(2, "Cobe").unwrap();
//! let hello = graph.get_or_create_token("hello", None).unwrap();
//! let a = graph.get_node_id(&[ContextSlot::Boundary, ContextSlot::Token(hello)]).unwrap();
//! let b = graph.get_node_id(&[ContextSlot::Token(hello), ContextSlot::Boundary]).unwrap();
//!
//! graph.add_edge(a, b, false).unwrap();
//! graph.add_edge(a, b, false).unwrap();
//! assert_eq!(graph.node_incoming_count(b).unwrap(), 2);
//! ```

mod edges;
mod error;
mod nodes;
mod schema;
mod search;
mod tokens;

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use graph_core::{END_TOKEN, SCHEMA_VERSION, TokenId};

pub use edges::Edge;
pub use error::StoreError;
pub use schema::Durability;
pub use search::MAX_WALK_STEPS;
pub use tokens::Token;

/// Savepoint name used by [`Graph::atomically`]. SQLite allows nesting
/// savepoints with the same name; each RELEASE pops the innermost.
const SAVEPOINT: &str = "graph_write";

/// SQL fragments that depend on the context order, built once at open.
#[derive(Debug)]
struct Columns {
    /// `token0_id,token1_id,...`
    all_tokens: String,
    /// `token0_id = ?1 AND token1_id = ?2 AND ...`
    match_tokens: String,
    /// `?1,?2,...`
    placeholders: String,
    /// `token{order-1}_id`
    last_token: String,
}

impl Columns {
    fn new(order: usize) -> Self {
        Columns {
            all_tokens: schema::token_columns(order),
            match_tokens: (0..order)
                .map(|i| format!("token{i}_id = ?{}", i + 1))
                .collect::<Vec<_>>()
                .join(" AND "),
            placeholders: (1..=order)
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(","),
            last_token: format!("token{}_id", order - 1),
        }
    }
}

/// Row counts for a store.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GraphStats {
    pub tokens: i64,
    pub nodes: i64,
    pub edges: i64,
}

/// A transition graph stored in one SQLite database.
#[derive(Debug)]
pub struct Graph {
    conn: Connection,
    order: usize,
    end_token: TokenId,
    columns: Columns,
}

impl Graph {
    /// Open an initialized store.
    ///
    /// Fails with [`StoreError::IncompatibleVersion`] before touching anything
    /// else if the recorded schema version differs from [`SCHEMA_VERSION`].
    pub fn open(conn: Connection) -> Result<Self, StoreError> {
        if !schema::is_initialized(&conn)? {
            return Err(StoreError::NotInitialized);
        }

        let version = read_info(&conn, "version")?;
        if version.as_deref() != Some(SCHEMA_VERSION) {
            return Err(StoreError::IncompatibleVersion { found: version });
        }

        schema::run_migrations(&conn)?;

        let raw_order = read_info(&conn, "order")?;
        let order = raw_order
            .as_deref()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| StoreError::InvalidInfo {
                key: "order",
                value: raw_order.clone(),
            })?;

        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::apply_durability(&conn, Durability::Normal)?;

        let mut graph = Graph {
            conn,
            order,
            end_token: TokenId(0),
            columns: Columns::new(order),
        };
        graph.end_token = graph.get_or_create_token(END_TOKEN, None)?;
        debug!(order, end_token = %graph.end_token, "opened graph store");
        Ok(graph)
    }

    /// Initialize an empty database and open it.
    ///
    /// Creates the tables, records `order`, `tokenizer`, and `version`, builds
    /// the full index set, and creates the end token.
    pub fn init(conn: Connection, order: usize, tokenizer: &str) -> Result<Self, StoreError> {
        if order == 0 {
            return Err(StoreError::InvalidOrder(order));
        }
        if schema::is_initialized(&conn)? {
            return Err(StoreError::AlreadyInitialized);
        }

        info!(order, tokenizer, "initializing graph store");
        conn.execute_batch("BEGIN")?;
        let created = (|| {
            schema::create_tables(&conn, order)?;
            write_info(&conn, "order", Some(&order.to_string()))?;
            write_info(&conn, "tokenizer", Some(tokenizer))?;
            write_info(&conn, "version", Some(SCHEMA_VERSION))?;
            Ok::<_, StoreError>(())
        })();
        match created {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(err) => {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback after failed init");
                }
                return Err(err);
            }
        }

        let graph = Graph::open(conn)?;
        graph.ensure_indexes()?;
        Ok(graph)
    }

    /// Initialize a throwaway in-memory store.
    pub fn init_in_memory(order: usize, tokenizer: &str) -> Result<Self, StoreError> {
        Graph::init(Connection::open_in_memory()?, order, tokenizer)
    }

    /// Open the store in the database file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Graph::open(Connection::open(path)?)
    }

    /// Create the database file at `path` and initialize a store in it.
    pub fn init_path(
        path: impl AsRef<Path>,
        order: usize,
        tokenizer: &str,
    ) -> Result<Self, StoreError> {
        Graph::init(Connection::open(path)?, order, tokenizer)
    }

    /// Context width of every node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Id of the reserved chain boundary token.
    #[inline]
    pub fn end_token(&self) -> TokenId {
        self.end_token
    }

    /// Read an `info` attribute.
    pub fn get_info_text(&self, attribute: &str) -> Result<Option<String>, StoreError> {
        read_info(&self.conn, attribute)
    }

    /// Write an `info` attribute; `None` deletes it.
    pub fn set_info_text(&self, attribute: &str, text: Option<&str>) -> Result<(), StoreError> {
        write_info(&self.conn, attribute, text)
    }

    /// Run `f` inside a savepoint.
    ///
    /// Every statement `f` issues is committed together, or rolled back
    /// together if `f` returns an error. Savepoints nest, so this works both
    /// on its own and inside an open batch transaction.
    pub fn atomically<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {SAVEPOINT}"))?;
                Ok(value)
            }
            Err(err) => {
                let undo = format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}");
                if let Err(rollback) = self.conn.execute_batch(&undo) {
                    warn!(error = %rollback, "savepoint rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Open a long-lived transaction (batch learning).
    pub fn begin_transaction(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commit the transaction opened by [`begin_transaction`](Self::begin_transaction).
    pub fn commit_transaction(&self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Whether a transaction opened by `begin_transaction` is still open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Token, node, and edge row counts.
    pub fn stats(&self) -> Result<GraphStats, StoreError> {
        let count = |table: &str| -> Result<i64, StoreError> {
            Ok(self
                .conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(GraphStats {
            tokens: count("tokens")?,
            nodes: count("nodes")?,
            edges: count("edges")?,
        })
    }
}

fn read_info(conn: &Connection, attribute: &str) -> Result<Option<String>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT text FROM info WHERE attribute = ?1",
            params![attribute],
            |row| row.get::<_, String>(0),
        )
        .optional()?)
}

fn write_info(conn: &Connection, attribute: &str, text: Option<&str>) -> Result<(), StoreError> {
    match text {
        None => {
            conn.execute("DELETE FROM info WHERE attribute = ?1", params![attribute])?;
        }
        Some(text) => {
            conn.execute(
                "INSERT INTO info (attribute, text) VALUES (?1, ?2)
                 ON CONFLICT(attribute) DO UPDATE SET text = excluded.text",
                params![attribute, text],
            )?;
        }
    }
    Ok(())
}
