use rusqlite::{OptionalExtension, params};

use graph_core::{EdgeId, NodeId};

use crate::{Graph, StoreError};

/// A row of the `edges` table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub prev_node: NodeId,
    pub next_node: NodeId,
    pub has_space: bool,
    pub count: i64,
}

impl Graph {
    /// Record one observation of `prev -> next`.
    ///
    /// Increments the matching edge or inserts it with count 1, and adds the
    /// same delta to `next`'s incoming count. Both writes land in one
    /// savepoint.
    pub fn add_edge(
        &self,
        prev: NodeId,
        next: NodeId,
        has_space: bool,
    ) -> Result<EdgeId, StoreError> {
        self.atomically(|g| {
            let existing = g
                .conn
                .prepare_cached(
                    "SELECT id FROM edges
                     WHERE prev_node = ?1 AND next_node = ?2 AND has_space = ?3",
                )?
                .query_row(params![prev.get(), next.get(), has_space], |row| {
                    row.get::<_, i64>(0)
                })
                .optional()?;

            let id = match existing {
                Some(id) => {
                    g.conn
                        .prepare_cached("UPDATE edges SET count = count + 1 WHERE id = ?1")?
                        .execute([id])?;
                    id
                }
                None => {
                    g.conn
                        .prepare_cached(
                            "INSERT INTO edges (prev_node, next_node, has_space, count)
                             VALUES (?1, ?2, ?3, 1)",
                        )?
                        .execute(params![prev.get(), next.get(), has_space])?;
                    g.conn.last_insert_rowid()
                }
            };

            g.conn
                .prepare_cached("UPDATE nodes SET count = count + 1 WHERE id = ?1")?
                .execute([next.get()])?;
            Ok(EdgeId(id))
        })
    }

    /// Fetch a full edge row.
    pub fn edge(&self, id: EdgeId) -> Result<Option<Edge>, StoreError> {
        Ok(self
            .conn
            .prepare_cached(
                "SELECT prev_node, next_node, has_space, count FROM edges WHERE id = ?1",
            )?
            .query_row([id.get()], |row| {
                Ok(Edge {
                    id,
                    prev_node: NodeId(row.get(0)?),
                    next_node: NodeId(row.get(1)?),
                    has_space: row.get(2)?,
                    count: row.get(3)?,
                })
            })
            .optional()?)
    }

    /// Whether whitespace followed the trailing token of the edge's source.
    pub fn has_space(&self, id: EdgeId) -> Result<bool, StoreError> {
        self.edge(id)?
            .map(|e| e.has_space)
            .ok_or(StoreError::UnknownEdge(id))
    }

    /// `log2(edge.count) - log2(prev_node.count)`.
    ///
    /// A source node that has never been entered (the start boundary of a
    /// fresh store) has count zero; its edges score 0.0.
    pub fn edge_logprob(&self, id: EdgeId) -> Result<f64, StoreError> {
        let (edge_count, node_count) = self
            .conn
            .prepare_cached(
                "SELECT edges.count, nodes.count FROM edges
                 JOIN nodes ON nodes.id = edges.prev_node
                 WHERE edges.id = ?1",
            )?
            .query_row([id.get()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .optional()?
            .ok_or(StoreError::UnknownEdge(id))?;

        if node_count <= 0 || edge_count <= 0 {
            return Ok(0.0);
        }
        Ok((edge_count as f64).log2() - (node_count as f64).log2())
    }

    /// The text an edge contributes to a rendered reply: the trailing token
    /// of its source context, and whether a space follows it.
    pub fn edge_text(&self, id: EdgeId) -> Result<(String, bool), StoreError> {
        let sql = format!(
            "SELECT tokens.text, edges.has_space FROM edges
             JOIN nodes ON nodes.id = edges.prev_node
             JOIN tokens ON tokens.id = nodes.{}
             WHERE edges.id = ?1",
            self.columns.last_token
        );
        self.conn
            .prepare_cached(&sql)?
            .query_row([id.get()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?
            .ok_or(StoreError::UnknownEdge(id))
    }
}
