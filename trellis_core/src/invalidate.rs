// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Level-indexed dirty tracking.
//!
//! The [`Invalidator`] records which nodes need work, grouped by tree level.
//! Level indexing is what lets measurement propagate sizes strictly
//! bottom-up and areas strictly top-down without sorting the dirty set every
//! frame: pass 1 walks populated levels from the deepest upward, pass 2 from
//! the shallowest downward, and rendering drains from the shallowest level.
//!
//! # Flags
//!
//! Each entry carries a [`Dirty`] set naming the work still owed:
//!
//! - [`Dirty::SIZE`]: wrap size recomputation (pass 1).
//! - [`Dirty::AREA`]: drawing area, clip and effective visibility (pass 2).
//! - [`Dirty::ARRANGE`]: the node's children must be re-slotted (pass 2).
//! - [`Dirty::PAINT`]: the node must be redrawn (render).
//!
//! An entry disappears once all its flags are cleared; a node with no entry
//! is clean.
//!
//! # Generations
//!
//! There are two generations, *active* and *shadow*. Writes go to the active
//! generation, except while a render drain is in progress
//! ([`begin_drain`](Invalidator::begin_drain)), when they go to the shadow
//! generation so that the set being drained is never mutated by the paint
//! callbacks draining it. [`swap`](Invalidator::swap) at the frame boundary
//! promotes those writes to the next frame's working set.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::node::NodeId;
use crate::queue::UniqueQueue;

bitflags! {
    /// Kinds of pending work on a node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Dirty: u8 {
        /// Wrap size must be recomputed.
        const SIZE = 1;
        /// Drawing area must be recomputed.
        const AREA = 1 << 1;
        /// Children must be re-slotted by this node's layout strategy.
        const ARRANGE = 1 << 2;
        /// The node must be redrawn.
        const PAINT = 1 << 3;

        /// Everything a size-affecting change implies.
        const LAYOUT = Self::SIZE.bits() | Self::AREA.bits() | Self::PAINT.bits();
        /// Everything a placement-only change implies.
        const PLACEMENT = Self::AREA.bits() | Self::PAINT.bits();
        /// Work consumed by measurement.
        const MEASURE = Self::SIZE.bits() | Self::AREA.bits() | Self::ARRANGE.bits();
    }
}

type Level = BTreeMap<NodeId, Dirty>;

/// One buffer of per-level dirty sets.
#[derive(Clone, Debug, Default)]
struct Generation {
    levels: BTreeMap<u32, Level>,
}

impl Generation {
    fn insert(&mut self, node: NodeId, level: u32, flags: Dirty) -> bool {
        let entry = self.levels.entry(level).or_default().entry(node);
        let mut fresh = false;
        let slot = entry.or_insert_with(|| {
            fresh = true;
            Dirty::empty()
        });
        *slot |= flags;
        fresh
    }

    fn remove(&mut self, node: NodeId, level: u32) -> Option<Dirty> {
        let set = self.levels.get_mut(&level)?;
        let flags = set.remove(&node);
        if set.is_empty() {
            self.levels.remove(&level);
        }
        flags
    }

    fn get(&self, node: NodeId, level: u32) -> Dirty {
        self.levels
            .get(&level)
            .and_then(|set| set.get(&node))
            .copied()
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.levels.values().map(BTreeMap::len).sum()
    }
}

fn level_has(level: &Level, flags: Dirty) -> bool {
    level.values().any(|f| f.intersects(flags))
}

/// Registry of nodes needing recomputation, indexed by level.
///
/// The invalidator only stores handles and levels; it never looks at the
/// tree. [`NodeTree`](crate::node::NodeTree) keeps it consistent with
/// reparenting and destruction.
#[derive(Clone, Debug, Default)]
pub struct Invalidator {
    generations: [Generation; 2],
    active: usize,
    draining: bool,
}

impl Invalidator {
    /// Creates an empty invalidator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> &Generation {
        &self.generations[self.active]
    }

    fn active_mut(&mut self) -> &mut Generation {
        &mut self.generations[self.active]
    }

    fn writable_mut(&mut self) -> &mut Generation {
        let idx = if self.draining {
            1 - self.active
        } else {
            self.active
        };
        &mut self.generations[idx]
    }

    // -- Marking --

    /// Marks `node` as needing layout and repaint ([`Dirty::LAYOUT`]).
    ///
    /// Returns `true` if the node had no entry yet.
    pub fn invalidate(&mut self, node: NodeId, level: u32) -> bool {
        self.invalidate_with(node, level, Dirty::LAYOUT)
    }

    /// Adds `flags` to `node`'s entry at `level`.
    ///
    /// Marking an already-marked node is idempotent apart from the union of
    /// flags. Returns `true` if the node had no entry yet.
    pub fn invalidate_with(&mut self, node: NodeId, level: u32, flags: Dirty) -> bool {
        if flags.is_empty() {
            return false;
        }
        tracing::trace!(?node, level, ?flags, draining = self.draining, "invalidate");
        self.writable_mut().insert(node, level, flags)
    }

    /// Removes `node` from both generations.
    ///
    /// Used when a node is destroyed. Empty levels are pruned so that level
    /// queries and [`tree_depth`](Self::tree_depth) stay exact. Returns
    /// `true` if any entry was removed.
    pub fn cancel_invalidation(&mut self, node: NodeId, level: u32) -> bool {
        let a = self.generations[0].remove(node, level).is_some();
        let b = self.generations[1].remove(node, level).is_some();
        a || b
    }

    /// Clears `flags` from `node`'s entry in the active generation.
    ///
    /// The entry is dropped once no flag remains. Clearing flags on a clean
    /// node is a no-op.
    pub fn clear(&mut self, node: NodeId, level: u32, flags: Dirty) {
        let generation = self.active_mut();
        let Some(set) = generation.levels.get_mut(&level) else {
            return;
        };
        let Some(current) = set.get_mut(&node) else {
            return;
        };
        current.remove(flags);
        if current.is_empty() {
            set.remove(&node);
            if set.is_empty() {
                generation.levels.remove(&level);
            }
        }
    }

    /// Moves `node`'s entries in both generations from level `from` to `to`.
    pub fn relevel(&mut self, node: NodeId, from: u32, to: u32) {
        if from == to {
            return;
        }
        for generation in &mut self.generations {
            if let Some(flags) = generation.remove(node, from) {
                generation.insert(node, to, flags);
            }
        }
    }

    // -- Queries --

    /// Returns the flags pending on `node` in the active generation.
    #[must_use]
    pub fn flags(&self, node: NodeId, level: u32) -> Dirty {
        self.active().get(node, level)
    }

    /// Returns the flags pending on `node` in the shadow generation.
    #[must_use]
    pub fn shadow_flags(&self, node: NodeId, level: u32) -> Dirty {
        self.generations[1 - self.active].get(node, level)
    }

    /// Returns `true` if the active generation holds any node.
    #[must_use]
    pub fn has_invalidated_nodes(&self) -> bool {
        !self.active().levels.is_empty()
    }

    /// Returns `true` if any active entry carries one of `flags`.
    #[must_use]
    pub fn has_pending(&self, flags: Dirty) -> bool {
        self.active()
            .levels
            .values()
            .any(|level| level_has(level, flags))
    }

    /// Number of nodes in the active generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active().len()
    }

    /// Returns `true` if neither generation holds any node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.iter().all(|g| g.levels.is_empty())
    }

    /// Highest populated level of the active generation plus one, or zero.
    #[must_use]
    pub fn tree_depth(&self) -> u32 {
        self.active()
            .levels
            .last_key_value()
            .map_or(0, |(level, _)| level + 1)
    }

    /// Returns a node from the lowest populated level of the active
    /// generation (the one with the lowest handle), or `None`.
    #[must_use]
    pub fn get_next_invalidated_component(&self) -> Option<NodeId> {
        self.active()
            .levels
            .first_key_value()
            .and_then(|(_, set)| set.keys().next().copied())
    }

    /// Queues every active node at `level` carrying one of `flags`.
    ///
    /// Returns how many nodes were newly queued.
    pub fn add_invalidated_components_to_queue(
        &self,
        level: u32,
        flags: Dirty,
        queue: &mut UniqueQueue<NodeId>,
    ) -> usize {
        let Some(set) = self.active().levels.get(&level) else {
            return 0;
        };
        set.iter()
            .filter(|(_, f)| f.intersects(flags))
            .filter(|(node, _)| queue.enqueue(**node))
            .count()
    }

    /// Nearest populated level strictly shallower than `level` (closer to
    /// the roots) holding one of `flags`.
    #[must_use]
    pub fn upper_invalidated_level(&self, level: u32, flags: Dirty) -> Option<u32> {
        self.active()
            .levels
            .range(..level)
            .rev()
            .find(|(_, set)| level_has(set, flags))
            .map(|(l, _)| *l)
    }

    /// Nearest populated level strictly deeper than `level` holding one of
    /// `flags`.
    #[must_use]
    pub fn lower_invalidated_level(&self, level: u32, flags: Dirty) -> Option<u32> {
        self.active()
            .levels
            .range(level.saturating_add(1)..)
            .find(|(_, set)| level_has(set, flags))
            .map(|(l, _)| *l)
    }

    /// Shallowest active level holding one of `flags`.
    #[must_use]
    pub fn shallowest_level(&self, flags: Dirty) -> Option<u32> {
        self.active()
            .levels
            .iter()
            .find(|(_, set)| level_has(set, flags))
            .map(|(l, _)| *l)
    }

    /// Deepest active level holding one of `flags`.
    #[must_use]
    pub fn deepest_level(&self, flags: Dirty) -> Option<u32> {
        self.active()
            .levels
            .iter()
            .rev()
            .find(|(_, set)| level_has(set, flags))
            .map(|(l, _)| *l)
    }

    /// Iterates `(level, node, flags)` over the active generation, shallowest
    /// level first.
    pub fn iter(&self) -> impl Iterator<Item = (u32, NodeId, Dirty)> + '_ {
        self.active()
            .levels
            .iter()
            .flat_map(|(level, set)| set.iter().map(move |(node, f)| (*level, *node, *f)))
    }

    // -- Frame boundaries --

    /// Starts a render drain; subsequent writes go to the shadow generation.
    pub fn begin_drain(&mut self) {
        self.draining = true;
    }

    /// Ends a render drain; writes go to the active generation again.
    pub fn end_drain(&mut self) {
        self.draining = false;
    }

    /// Returns `true` between [`begin_drain`](Self::begin_drain) and
    /// [`end_drain`](Self::end_drain).
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Exchanges the active and shadow generations.
    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }

    /// Clears the shadow generation, and the active one too unless
    /// `second_pass_only` is set because an area pass is about to consume it.
    pub fn reset(&mut self, second_pass_only: bool) {
        self.generations[1 - self.active].levels.clear();
        if !second_pass_only {
            self.active_mut().levels.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(idx: u32) -> NodeId {
        NodeId { idx, generation: 0 }
    }

    #[test]
    fn invalidate_twice_keeps_one_entry() {
        let mut inv = Invalidator::new();
        assert!(inv.invalidate(id(1), 2));
        assert!(!inv.invalidate(id(1), 2));
        assert_eq!(inv.len(), 1);
        assert_eq!(inv.flags(id(1), 2), Dirty::LAYOUT);
    }

    #[test]
    fn flags_accumulate() {
        let mut inv = Invalidator::new();
        inv.invalidate_with(id(1), 0, Dirty::AREA);
        inv.invalidate_with(id(1), 0, Dirty::PAINT);
        assert_eq!(inv.flags(id(1), 0), Dirty::PLACEMENT);
    }

    #[test]
    fn cancel_restores_pristine_state() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(4), 3);
        assert!(inv.cancel_invalidation(id(4), 3));
        assert!(inv.is_empty());
        assert!(!inv.has_invalidated_nodes());
        assert_eq!(inv.tree_depth(), 0);
        assert_eq!(inv.shallowest_level(Dirty::all()), None);
        assert!(!inv.cancel_invalidation(id(4), 3));
    }

    #[test]
    fn clear_drops_entry_when_no_flags_remain() {
        let mut inv = Invalidator::new();
        inv.invalidate_with(id(1), 1, Dirty::SIZE | Dirty::PAINT);
        inv.clear(id(1), 1, Dirty::SIZE);
        assert_eq!(inv.flags(id(1), 1), Dirty::PAINT);
        inv.clear(id(1), 1, Dirty::PAINT);
        assert!(!inv.has_invalidated_nodes());
        assert_eq!(inv.tree_depth(), 0);
        // Clearing a clean node is harmless.
        inv.clear(id(1), 1, Dirty::all());
    }

    #[test]
    fn tree_depth_tracks_deepest_level() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(1), 0);
        inv.invalidate(id(2), 4);
        assert_eq!(inv.tree_depth(), 5);
        inv.cancel_invalidation(id(2), 4);
        assert_eq!(inv.tree_depth(), 1);
    }

    #[test]
    fn level_navigation_skips_gaps() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(1), 1);
        inv.invalidate(id(2), 4);
        inv.invalidate_with(id(3), 6, Dirty::PAINT);

        assert_eq!(inv.upper_invalidated_level(4, Dirty::all()), Some(1));
        assert_eq!(inv.upper_invalidated_level(1, Dirty::all()), None);
        assert_eq!(inv.lower_invalidated_level(1, Dirty::all()), Some(4));
        assert_eq!(inv.lower_invalidated_level(4, Dirty::all()), Some(6));
        assert_eq!(inv.lower_invalidated_level(4, Dirty::SIZE), None);
        assert_eq!(inv.deepest_level(Dirty::SIZE), Some(4));
        assert_eq!(inv.shallowest_level(Dirty::PAINT), Some(1));
    }

    #[test]
    fn next_component_comes_from_lowest_level() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(9), 2);
        inv.invalidate(id(5), 1);
        inv.invalidate(id(3), 1);
        assert_eq!(inv.get_next_invalidated_component(), Some(id(3)));
    }

    #[test]
    fn bulk_transfer_filters_by_flag() {
        let mut inv = Invalidator::new();
        inv.invalidate_with(id(1), 2, Dirty::SIZE);
        inv.invalidate_with(id(2), 2, Dirty::PAINT);
        inv.invalidate_with(id(3), 3, Dirty::SIZE);
        let mut queue = UniqueQueue::new();
        assert_eq!(
            inv.add_invalidated_components_to_queue(2, Dirty::SIZE, &mut queue),
            1
        );
        assert_eq!(queue.pop(), Some(id(1)));
        assert!(queue.is_empty());
    }

    #[test]
    fn writes_during_drain_land_in_shadow() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(1), 0);
        inv.begin_drain();
        inv.invalidate_with(id(2), 1, Dirty::PAINT);
        inv.clear(id(1), 0, Dirty::all());
        assert!(
            !inv.has_invalidated_nodes(),
            "draining set must not see new writes"
        );
        assert_eq!(inv.shadow_flags(id(2), 1), Dirty::PAINT);
        inv.end_drain();

        inv.swap();
        inv.reset(true);
        assert_eq!(inv.flags(id(2), 1), Dirty::PAINT);
        assert_eq!(inv.len(), 1);
    }

    #[test]
    fn cancel_reaches_shadow_generation() {
        let mut inv = Invalidator::new();
        inv.begin_drain();
        inv.invalidate(id(7), 2);
        inv.end_drain();
        assert!(inv.cancel_invalidation(id(7), 2));
        assert!(inv.is_empty());
    }

    #[test]
    fn reset_modes() {
        let mut inv = Invalidator::new();
        inv.invalidate(id(1), 0);
        inv.begin_drain();
        inv.invalidate(id(2), 0);
        inv.end_drain();

        inv.reset(true);
        assert_eq!(inv.len(), 1, "active survives a second-pass-only reset");
        assert_eq!(inv.shadow_flags(id(2), 0), Dirty::empty());

        inv.reset(false);
        assert!(inv.is_empty());
    }

    #[test]
    fn relevel_moves_both_generations() {
        let mut inv = Invalidator::new();
        inv.invalidate_with(id(1), 3, Dirty::AREA);
        inv.begin_drain();
        inv.invalidate_with(id(1), 3, Dirty::PAINT);
        inv.end_drain();

        inv.relevel(id(1), 3, 1);
        assert_eq!(inv.flags(id(1), 1), Dirty::AREA);
        assert_eq!(inv.shadow_flags(id(1), 1), Dirty::PAINT);
        assert_eq!(inv.tree_depth(), 2);
    }
}
