//! Sliding context windows for learning n-gram transitions.
//!
//! Learning turns a resolved token sequence into a chain of fixed-width
//! contexts. The chain is padded with `order` boundary slots on both ends, so
//! every learned chain starts and ends at the all-boundary context:
//!
//! ```text
//! "a b c", order 3
//! [B B B] -> [B B a] -> [B a b] -> [a b c] -> [b c B] -> [c B B] -> [B B B]
//!                   space      space
//! ```
//!
//! Whitespace never occupies a slot. It is absorbed into the `has_space` flag
//! of the transition that crosses it. Everything here is pure; the graph store
//! resolves contexts to node ids.

use std::collections::VecDeque;

use graph_core::{ChainToken, ContextSlot};

/// An ordered tuple of `order` context slots.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Context(Vec<ContextSlot>);

impl Context {
    /// Build a context from its slots.
    pub fn new(slots: Vec<ContextSlot>) -> Self {
        Context(slots)
    }

    /// The all-boundary context that begins and ends every chain.
    pub fn boundary(order: usize) -> Self {
        Context(vec![ContextSlot::Boundary; order])
    }

    #[inline]
    pub fn slots(&self) -> &[ContextSlot] {
        &self.0
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.0.len()
    }
}

/// One learned step: `prev` was followed by `next`, with whitespace between
/// their trailing tokens when `has_space` is set.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Transition {
    pub prev: Context,
    pub has_space: bool,
    pub next: Context,
}

/// A sliding window of `order` slots.
///
/// Feed it one chain element at a time with [`push`](Self::push); each time
/// the window fills it yields the context it holds, then drops its oldest
/// slot.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    slots: VecDeque<ContextSlot>,
    order: usize,
    has_space: bool,
}

impl ContextWindow {
    /// Create an empty window.
    ///
    /// # Panics
    /// Panics if `order` is zero.
    pub fn new(order: usize) -> Self {
        assert!(order > 0, "context order must be positive");
        ContextWindow {
            slots: VecDeque::with_capacity(order),
            order,
            has_space: false,
        }
    }

    /// Advance the window by one chain element.
    ///
    /// Returns the full context and whether whitespace preceded its newest
    /// slot, or `None` while the window is still filling or when the element
    /// was whitespace.
    pub fn push(&mut self, token: ChainToken) -> Option<(Context, bool)> {
        let slot = match token {
            ChainToken::Space => {
                self.has_space = true;
                return None;
            }
            ChainToken::Token(id) => ContextSlot::Token(id),
        };
        self.push_slot(slot)
    }

    fn push_slot(&mut self, slot: ContextSlot) -> Option<(Context, bool)> {
        self.slots.push_back(slot);
        if self.slots.len() < self.order {
            return None;
        }

        let context = Context(self.slots.iter().copied().collect());
        let has_space = std::mem::take(&mut self.has_space);
        self.slots.pop_front();
        Some((context, has_space))
    }

    /// Push a boundary slot.
    pub fn push_boundary(&mut self) -> Option<(Context, bool)> {
        self.push_slot(ContextSlot::Boundary)
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }
}

/// Build the padded context sequence for `tokens`.
///
/// Leading whitespace is absorbed into the first real transition; trailing
/// whitespace into the transition toward the closing boundary.
pub fn contexts(tokens: &[ChainToken], order: usize) -> Vec<(Context, bool)> {
    let mut window = ContextWindow::new(order);
    let mut out = Vec::with_capacity(tokens.len() + order + 1);

    for _ in 0..order {
        out.extend(window.push_boundary());
    }
    for &token in tokens {
        out.extend(window.push(token));
    }
    for _ in 0..order {
        out.extend(window.push_boundary());
    }

    out
}

/// Pair consecutive contexts into transitions.
///
/// The `has_space` flag of a transition is the flag carried by its `next`
/// context.
pub fn transitions(tokens: &[ChainToken], order: usize) -> Vec<Transition> {
    let contexts = contexts(tokens, order);
    contexts
        .windows(2)
        .map(|pair| Transition {
            prev: pair[0].0.clone(),
            has_space: pair[1].1,
            next: pair[1].0.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_core::TokenId;

    use ContextSlot::Boundary as B;

    fn t(id: i64) -> ChainToken {
        ChainToken::Token(TokenId(id))
    }

    fn s(id: i64) -> ContextSlot {
        ContextSlot::Token(TokenId(id))
    }

    #[test]
    fn window_fills_before_yielding() {
        let mut window = ContextWindow::new(3);
        assert_eq!(window.push(t(1)), None);
        assert_eq!(window.push(t(2)), None);
        let (ctx, space) = window.push(t(3)).unwrap();
        assert_eq!(ctx.slots(), &[s(1), s(2), s(3)]);
        assert!(!space);
    }

    #[test]
    fn window_slides_by_one() {
        let mut window = ContextWindow::new(2);
        window.push(t(1));
        window.push(t(2));
        let (ctx, _) = window.push(t(3)).unwrap();
        assert_eq!(ctx.slots(), &[s(2), s(3)]);
    }

    #[test]
    fn space_sets_flag_on_next_context() {
        let mut window = ContextWindow::new(2);
        window.push(t(1));
        window.push(t(2));
        assert_eq!(window.push(ChainToken::Space), None);
        let (ctx, space) = window.push(t(3)).unwrap();
        assert_eq!(ctx.slots(), &[s(2), s(3)]);
        assert!(space);

        // The flag is consumed by the context that crossed it.
        let (_, space) = window.push(t(4)).unwrap();
        assert!(!space);
    }

    #[test]
    #[should_panic(expected = "context order must be positive")]
    fn zero_order_panics() {
        ContextWindow::new(0);
    }

    #[test]
    fn contexts_are_padded_with_boundaries() {
        // a _ b _ c with order 3
        let tokens = [t(2), ChainToken::Space, t(3), ChainToken::Space, t(4)];
        let got: Vec<(Vec<ContextSlot>, bool)> = contexts(&tokens, 3)
            .into_iter()
            .map(|(c, sp)| (c.slots().to_vec(), sp))
            .collect();

        assert_eq!(
            got,
            vec![
                (vec![B, B, B], false),
                (vec![B, B, s(2)], false),
                (vec![B, s(2), s(3)], true),
                (vec![s(2), s(3), s(4)], true),
                (vec![s(3), s(4), B], false),
                (vec![s(4), B, B], false),
                (vec![B, B, B], false),
            ]
        );
    }

    #[test]
    fn transitions_start_and_end_at_boundary() {
        let tokens = [t(2), t(3), t(4)];
        let steps = transitions(&tokens, 2);
        let boundary = Context::boundary(2);

        assert_eq!(steps.first().unwrap().prev, boundary);
        assert_eq!(steps.last().unwrap().next, boundary);
        // Each transition's next is the following transition's prev.
        for pair in steps.windows(2) {
            assert_eq!(pair[0].next, pair[1].prev);
        }
    }

    #[test]
    fn transitions_carry_space_of_next_context() {
        let tokens = [t(2), ChainToken::Space, t(3), t(4)];
        let steps = transitions(&tokens, 2);
        let flags: Vec<bool> = steps.iter().map(|tr| tr.has_space).collect();
        // [B B]->[B 2], [B 2]->[2 3] (space), [2 3]->[3 4], [3 4]->[4 B], [4 B]->[B B]
        assert_eq!(flags, vec![false, true, false, false, false]);
    }

    #[test]
    fn no_context_contains_whitespace() {
        let tokens = [t(2), ChainToken::Space, ChainToken::Space, t(3), t(4)];
        for (ctx, _) in contexts(&tokens, 3) {
            assert_eq!(ctx.order(), 3);
        }
        assert_eq!(transitions(&tokens, 3).len(), 6);
    }
}
