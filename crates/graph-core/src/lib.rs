//! Core identifier types for the n-gram transition graph.
//!
//! Every row in the graph store is addressed by a 64-bit SQLite rowid. The
//! newtypes here keep token, node, and edge identifiers from being mixed up at
//! call sites. [`ContextSlot`] and [`ChainToken`] replace the sentinel integers
//! a flat id space would otherwise need for the chain boundary and for
//! whitespace.

use serde::{Deserialize, Serialize};

/// Text of the reserved token that marks the start and end of every chain.
pub const END_TOKEN: &str = "";

/// Schema version written to, and required from, the `info` table.
pub const SCHEMA_VERSION: &str = "2";

/// Identifier of a row in the `tokens` table.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TokenId(pub i64);

/// Identifier of a row in the `nodes` table (one order-length context).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub i64);

/// Identifier of a row in the `edges` table (one counted transition).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub i64);

macro_rules! rowid_accessors {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// The raw SQLite rowid.
                #[inline]
                pub fn get(self) -> i64 {
                    self.0
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

rowid_accessors!(TokenId, NodeId, EdgeId);

/// Which way a walk follows edges.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    /// Follow edges from `prev_node` to `next_node`.
    Forward,
    /// Follow edges from `next_node` back to `prev_node`.
    Backward,
}

/// One position of a context tuple.
///
/// `Boundary` stands for the end token. The graph store maps it to the end
/// token's real id when a node is written, so callers never handle that id.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum ContextSlot {
    Token(TokenId),
    Boundary,
}

/// A resolved input token, before contexts are built.
///
/// Whitespace is never stored as a token; it survives only as the `has_space`
/// flag of the transition that crosses it.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ChainToken {
    Token(TokenId),
    Space,
}
