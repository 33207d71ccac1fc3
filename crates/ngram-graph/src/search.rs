//! Random sampling and bounded random walks.
//!
//! Sampling draws an offset from the caller's generator and reads the row at
//! that offset in id order. Results depend only on the generator state and
//! the stored rows, never on which indexes exist.

use rand::Rng;
use rusqlite::{OptionalExtension, params};
use tracing::trace;

use graph_core::{Direction, EdgeId, NodeId, TokenId};

use crate::{Graph, StoreError};

/// Longest walk taken before giving up on a branch. Learned chains always
/// reach the boundary, but a cycle can keep a sample path circling.
pub const MAX_WALK_STEPS: usize = 4096;

impl Graph {
    /// A uniformly sampled token other than the end token, or `None` if the
    /// store holds no other tokens.
    pub fn random_token<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<TokenId>, StoreError> {
        let end = self.end_token.get();
        let total: i64 = self
            .conn
            .prepare_cached("SELECT count(*) FROM tokens WHERE id > ?1")?
            .query_row([end], |row| row.get(0))?;
        if total == 0 {
            return Ok(None);
        }

        let offset = rng.random_range(0..total);
        Ok(self
            .conn
            .prepare_cached("SELECT id FROM tokens WHERE id > ?1 ORDER BY id LIMIT 1 OFFSET ?2")?
            .query_row(params![end, offset], |row| row.get::<_, i64>(0))
            .optional()?
            .map(TokenId))
    }

    /// A uniformly sampled node whose first slot holds `token`.
    pub fn random_node_with_leading_token<R: Rng + ?Sized>(
        &self,
        token: TokenId,
        rng: &mut R,
    ) -> Result<Option<NodeId>, StoreError> {
        let total: i64 = self
            .conn
            .prepare_cached("SELECT count(*) FROM nodes WHERE token0_id = ?1")?
            .query_row([token.get()], |row| row.get(0))?;
        if total == 0 {
            return Ok(None);
        }

        let offset = rng.random_range(0..total);
        Ok(self
            .conn
            .prepare_cached(
                "SELECT id FROM nodes WHERE token0_id = ?1 ORDER BY id LIMIT 1 OFFSET ?2",
            )?
            .query_row(params![token.get(), offset], |row| row.get::<_, i64>(0))
            .optional()?
            .map(NodeId))
    }

    /// Take one random step away from `node`.
    fn random_step<R: Rng + ?Sized>(
        &self,
        node: NodeId,
        direction: Direction,
        rng: &mut R,
    ) -> Result<Option<(EdgeId, NodeId)>, StoreError> {
        let (count_sql, pick_sql) = match direction {
            Direction::Forward => (
                "SELECT count(*) FROM edges WHERE prev_node = ?1",
                "SELECT id, next_node FROM edges WHERE prev_node = ?1
                 ORDER BY id LIMIT 1 OFFSET ?2",
            ),
            Direction::Backward => (
                "SELECT count(*) FROM edges WHERE next_node = ?1",
                "SELECT id, prev_node FROM edges WHERE next_node = ?1
                 ORDER BY id LIMIT 1 OFFSET ?2",
            ),
        };

        let total: i64 = self
            .conn
            .prepare_cached(count_sql)?
            .query_row([node.get()], |row| row.get(0))?;
        if total == 0 {
            return Ok(None);
        }

        let offset = rng.random_range(0..total);
        Ok(self
            .conn
            .prepare_cached(pick_sql)?
            .query_row(params![node.get(), offset], |row| {
                Ok((EdgeId(row.get(0)?), NodeId(row.get(1)?)))
            })
            .optional()?)
    }

    /// Walk once at random from `start` until `end` is reached.
    ///
    /// Forward walks follow edges out of each node; backward walks follow
    /// edges into it. The returned edge ids are in walk order, so a backward
    /// path reads from `start` toward the beginning of the chain. Returns
    /// `None` when the walk dead-ends or exceeds [`MAX_WALK_STEPS`].
    pub fn search_random_walk<R: Rng + ?Sized>(
        &self,
        start: NodeId,
        end: NodeId,
        direction: Direction,
        rng: &mut R,
    ) -> Result<Option<Vec<EdgeId>>, StoreError> {
        let mut path = Vec::new();
        let mut current = start;

        while path.len() < MAX_WALK_STEPS {
            let Some((edge, next)) = self.random_step(current, direction, rng)? else {
                trace!(node = %current, ?direction, "walk dead end");
                return Ok(None);
            };
            path.push(edge);
            if next == end {
                return Ok(Some(path));
            }
            current = next;
        }

        trace!(start = %start, ?direction, "walk exceeded step limit");
        Ok(None)
    }
}
