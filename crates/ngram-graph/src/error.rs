use graph_core::EdgeId;
use thiserror::Error;

/// Failures raised by the graph store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was written by an incompatible schema version.
    #[error("cannot read a version {} brain", .found.as_deref().unwrap_or("<missing>"))]
    IncompatibleVersion { found: Option<String> },

    /// The database has no `info` table; it was never initialized.
    #[error("graph store is not initialized")]
    NotInitialized,

    /// `init` was called on a database that already holds a graph.
    #[error("graph store is already initialized")]
    AlreadyInitialized,

    /// A required `info` attribute is missing or unparseable.
    #[error("invalid info attribute {key:?}: {value:?}")]
    InvalidInfo { key: &'static str, value: Option<String> },

    /// Context order must be at least one.
    #[error("invalid context order {0}")]
    InvalidOrder(usize),

    /// A context tuple did not have exactly `order` slots.
    #[error("context has {found} slots, expected {expected}")]
    ContextOrder { expected: usize, found: usize },

    /// An edge id that does not exist was looked up.
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
