use rusqlite::{OptionalExtension, params_from_iter};

use graph_core::{ContextSlot, NodeId};

use crate::{Graph, StoreError};

impl Graph {
    fn slot_ids(&self, context: &[ContextSlot]) -> Result<Vec<i64>, StoreError> {
        if context.len() != self.order {
            return Err(StoreError::ContextOrder {
                expected: self.order,
                found: context.len(),
            });
        }
        Ok(context
            .iter()
            .map(|slot| match slot {
                ContextSlot::Token(id) => id.get(),
                ContextSlot::Boundary => self.end_token.get(),
            })
            .collect())
    }

    /// Look up a node by its context, creating it with a zero count if absent.
    pub fn get_node_id(&self, context: &[ContextSlot]) -> Result<NodeId, StoreError> {
        let ids = self.slot_ids(context)?;

        let select = format!("SELECT id FROM nodes WHERE {}", self.columns.match_tokens);
        let found = self
            .conn
            .prepare_cached(&select)?
            .query_row(params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))
            .optional()?;
        if let Some(id) = found {
            return Ok(NodeId(id));
        }

        let insert = format!(
            "INSERT INTO nodes (count, {}) VALUES (0, {})",
            self.columns.all_tokens, self.columns.placeholders
        );
        self.conn
            .prepare_cached(&insert)?
            .execute(params_from_iter(ids.iter()))?;
        Ok(NodeId(self.conn.last_insert_rowid()))
    }

    /// Look up a node without creating it.
    pub fn find_node_id(&self, context: &[ContextSlot]) -> Result<Option<NodeId>, StoreError> {
        let ids = self.slot_ids(context)?;
        let select = format!("SELECT id FROM nodes WHERE {}", self.columns.match_tokens);
        Ok(self
            .conn
            .prepare_cached(&select)?
            .query_row(params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))
            .optional()?
            .map(NodeId))
    }

    /// The stored incoming count of a node; zero for an unknown id.
    pub fn node_incoming_count(&self, node: NodeId) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .prepare_cached("SELECT count FROM nodes WHERE id = ?1")?
            .query_row([node.get()], |row| row.get::<_, i64>(0))
            .optional()?
            .unwrap_or(0))
    }

    /// Nodes whose stored count differs from the sum of their incoming edge
    /// counts. Empty on a healthy store.
    pub fn inconsistent_nodes(&self) -> Result<Vec<NodeId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT nodes.id FROM nodes
             LEFT JOIN (SELECT next_node, sum(count) AS total FROM edges GROUP BY next_node) AS e
                 ON e.next_node = nodes.id
             WHERE nodes.count != coalesce(e.total, 0)
             ORDER BY nodes.id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(NodeId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
