// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-pass incremental measurement.
//!
//! Measurement follows a drain-recompute pattern over the tree's
//! [`Invalidator`](crate::invalidate::Invalidator), one level at a time:
//!
//! 1. **Size pass** (bottom-up). Starting at the deepest level holding
//!    [`Dirty::SIZE`], each node's wrap size is recomputed from its element's
//!    intrinsic size and its children's outer sizes. A changed size marks the
//!    node for placement and its parent for [`Dirty::SIZE`] and
//!    [`Dirty::ARRANGE`], one level up. An unchanged size stops propagation
//!    right there. The pass then moves to the next shallower level that still
//!    holds size work, until none is left.
//! 2. **Area pass** (top-down). Starting at the shallowest level holding
//!    [`Dirty::AREA`] or [`Dirty::ARRANGE`], each node is placed inside the
//!    slot its parent assigned, clipped against the parent's clip, and given
//!    its effective visibility. When any of those changed, or the node owes
//!    [`Dirty::ARRANGE`], its element re-slots the children and every child is
//!    marked [`Dirty::AREA`] one level down.
//!
//! Both passes only ever visit dirty nodes, and every visited node is
//! un-dirtied for the flags its pass consumes.

use kurbo::{Rect, Size};

use crate::error::{Error, Result};
use crate::invalidate::Dirty;
use crate::layout::{outer_size, place, resolve_wrap_size};
use crate::node::{INVALID, NodeId, NodeTree};
use crate::queue::UniqueQueue;

/// Flags consumed by the area pass.
const AREA_WORK: Dirty = Dirty::AREA.union(Dirty::ARRANGE);

/// The set of changes produced by a single [`MeasureProvider::measure`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeasureReport {
    /// Nodes whose wrap size changed, deepest first.
    pub resized: Vec<NodeId>,
    /// Nodes whose drawing area changed, shallowest first.
    pub moved: Vec<NodeId>,
    /// Nodes visited by the size pass.
    pub sizes_recomputed: u32,
    /// Nodes whose area was recomputed by the area pass.
    pub areas_recomputed: u32,
}

impl MeasureReport {
    /// Clears all change lists and counters.
    pub fn clear(&mut self) {
        self.resized.clear();
        self.moved.clear();
        self.sizes_recomputed = 0;
        self.areas_recomputed = 0;
    }

    /// Returns `true` if no geometry changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resized.is_empty() && self.moved.is_empty()
    }
}

/// Runs the size and area passes over a [`NodeTree`].
///
/// The provider holds only scratch buffers, so one instance can be reused
/// across frames (and trees) without reallocating.
#[derive(Debug, Default)]
pub struct MeasureProvider {
    queue: UniqueQueue<NodeId>,
    child_sizes: Vec<Size>,
    slots: Vec<Rect>,
}

impl MeasureProvider {
    /// Creates a provider with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs both passes and returns what changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LevelMismatch`] if a node's stored level disagrees
    /// with its parent's. The tree is left partially measured.
    pub fn measure(&mut self, tree: &mut NodeTree) -> Result<MeasureReport> {
        self.prepare(tree, true)
    }

    /// Runs the area pass, preceded by the size pass when `all_passes` is set.
    ///
    /// Skipping the size pass is only meaningful when the caller knows no
    /// size work is pending; rendering refuses to draw while it is.
    ///
    /// # Errors
    ///
    /// See [`measure`](Self::measure).
    pub fn prepare(&mut self, tree: &mut NodeTree, all_passes: bool) -> Result<MeasureReport> {
        let mut report = MeasureReport::default();
        self.prepare_into(tree, all_passes, &mut report)?;
        Ok(report)
    }

    /// Like [`measure`](Self::measure), but reuses a caller-provided report
    /// to avoid allocation.
    ///
    /// # Errors
    ///
    /// See [`measure`](Self::measure).
    pub fn measure_into(&mut self, tree: &mut NodeTree, report: &mut MeasureReport) -> Result<()> {
        self.prepare_into(tree, true, report)
    }

    /// Like [`prepare`](Self::prepare), but reuses a caller-provided report.
    ///
    /// # Errors
    ///
    /// See [`measure`](Self::measure).
    pub fn prepare_into(
        &mut self,
        tree: &mut NodeTree,
        all_passes: bool,
        report: &mut MeasureReport,
    ) -> Result<()> {
        report.clear();
        if all_passes {
            self.recompute_wrap_sizes(tree, report)?;
        }
        self.recompute_drawing_areas(tree, report)?;
        tracing::debug!(
            sizes = report.sizes_recomputed,
            areas = report.areas_recomputed,
            resized = report.resized.len(),
            moved = report.moved.len(),
            "measured"
        );
        Ok(())
    }

    /// Size pass: recomputes wrap sizes bottom-up for every node holding
    /// [`Dirty::SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::LevelMismatch`] if a resized node's parent is not
    /// exactly one level up.
    pub fn recompute_wrap_sizes(
        &mut self,
        tree: &mut NodeTree,
        report: &mut MeasureReport,
    ) -> Result<()> {
        let Some(mut level) = tree.invalidator.deepest_level(Dirty::SIZE) else {
            return Ok(());
        };
        loop {
            self.queue.clear();
            tree.invalidator
                .add_invalidated_components_to_queue(level, Dirty::SIZE, &mut self.queue);
            while let Some(id) = self.queue.pop() {
                self.recompute_wrap_size(tree, id, level, report)?;
            }
            match tree.invalidator.upper_invalidated_level(level, Dirty::SIZE) {
                Some(next) => level = next,
                None => return Ok(()),
            }
        }
    }

    fn recompute_wrap_size(
        &mut self,
        tree: &mut NodeTree,
        id: NodeId,
        level: u32,
        report: &mut MeasureReport,
    ) -> Result<()> {
        let idx = id.idx as usize;
        report.sizes_recomputed += 1;

        let size = if tree.flags[idx].hidden {
            Size::ZERO
        } else {
            self.child_sizes.clear();
            collect_outer_sizes(tree, id.idx, &mut self.child_sizes);
            let intrinsic = tree.element_at(id.idx).intrinsic_size(&self.child_sizes);
            resolve_wrap_size(&tree.props[idx], intrinsic)
        };

        tree.invalidator.clear(id, level, Dirty::SIZE);
        if size == tree.wrap_size[idx] {
            return Ok(());
        }
        tree.wrap_size[idx] = size;
        tree.invalidator.invalidate_with(id, level, Dirty::PLACEMENT);
        report.resized.push(id);

        let parent = tree.parent[idx];
        if parent != INVALID {
            let expected = tree.level[parent as usize] + 1;
            if expected != level {
                return Err(Error::LevelMismatch {
                    node: id,
                    expected,
                    found: level,
                });
            }
            tree.mark(parent, Dirty::SIZE | Dirty::ARRANGE);
        }
        Ok(())
    }

    /// Area pass: recomputes drawing areas top-down for every node holding
    /// [`Dirty::AREA`] or [`Dirty::ARRANGE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::LevelMismatch`] if a re-slotted child is not exactly
    /// one level below its parent.
    pub fn recompute_drawing_areas(
        &mut self,
        tree: &mut NodeTree,
        report: &mut MeasureReport,
    ) -> Result<()> {
        let Some(mut level) = tree.invalidator.shallowest_level(AREA_WORK) else {
            return Ok(());
        };
        loop {
            self.queue.clear();
            tree.invalidator
                .add_invalidated_components_to_queue(level, AREA_WORK, &mut self.queue);
            while let Some(id) = self.queue.pop() {
                self.recompute_drawing_area(tree, id, level, report)?;
            }
            match tree.invalidator.lower_invalidated_level(level, AREA_WORK) {
                Some(next) => level = next,
                None => return Ok(()),
            }
        }
    }

    fn recompute_drawing_area(
        &mut self,
        tree: &mut NodeTree,
        id: NodeId,
        level: u32,
        report: &mut MeasureReport,
    ) -> Result<()> {
        let idx = id.idx as usize;
        let flags = tree.invalidator.flags(id, level);
        let mut rearrange = flags.contains(Dirty::ARRANGE);

        if flags.contains(Dirty::AREA) {
            report.areas_recomputed += 1;
            let parent = tree.parent[idx];
            let (slot, parent_clip, parent_hidden) = if parent == INVALID {
                (tree.viewport, tree.viewport, false)
            } else {
                let p = parent as usize;
                (tree.slot[idx], tree.clip_area[p], tree.effective_hidden[p])
            };

            let area = place(slot, tree.wrap_size[idx], &tree.props[idx]);
            let clip = area.intersect(parent_clip);
            let hidden = parent_hidden || tree.flags[idx].hidden;

            let area_changed = area != tree.drawing_area[idx];
            let visibility_changed =
                clip != tree.clip_area[idx] || hidden != tree.effective_hidden[idx];
            if area_changed {
                report.moved.push(id);
            }
            if area_changed || visibility_changed {
                tree.drawing_area[idx] = area;
                tree.clip_area[idx] = clip;
                tree.effective_hidden[idx] = hidden;
                // The parent redraws to erase what the node covered before.
                tree.mark(id.idx, Dirty::PAINT);
                if parent != INVALID {
                    tree.mark(parent, Dirty::PAINT);
                }
                rearrange = true;
            }
        }

        if rearrange {
            self.arrange_children(tree, id.idx, level)?;
        }
        tree.invalidator.clear(id, level, AREA_WORK);
        Ok(())
    }

    fn arrange_children(&mut self, tree: &mut NodeTree, idx: u32, level: u32) -> Result<()> {
        self.child_sizes.clear();
        collect_outer_sizes(tree, idx, &mut self.child_sizes);
        if self.child_sizes.is_empty() {
            return Ok(());
        }

        let content = tree.drawing_area[idx as usize];
        self.slots.clear();
        tree.element_at(idx)
            .arrange(content, &self.child_sizes, &mut self.slots);
        if self.slots.len() != self.child_sizes.len() {
            tracing::warn!(
                node = ?tree.id_at(idx),
                expected = self.child_sizes.len(),
                got = self.slots.len(),
                "arrangement produced the wrong number of slots"
            );
            self.slots.resize(self.child_sizes.len(), content);
        }

        let mut child = tree.first_child[idx as usize];
        let mut i = 0;
        while child != INVALID {
            let c = child as usize;
            if tree.level[c] != level + 1 {
                return Err(Error::LevelMismatch {
                    node: tree.id_at(child),
                    expected: level + 1,
                    found: tree.level[c],
                });
            }
            tree.slot[c] = self.slots[i];
            tree.mark(child, Dirty::AREA);
            child = tree.next_sibling[c];
            i += 1;
        }
        Ok(())
    }
}

/// Appends the outer size of each child of `idx`, in sibling order.
///
/// Hidden children take no space.
fn collect_outer_sizes(tree: &NodeTree, idx: u32, out: &mut Vec<Size>) {
    let mut child = tree.first_child[idx as usize];
    while child != INVALID {
        let c = child as usize;
        out.push(if tree.flags[c].hidden {
            Size::ZERO
        } else {
            outer_size(tree.wrap_size[c], &tree.props[c])
        });
        child = tree.next_sibling[c];
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Insets, Point};

    use super::*;
    use crate::element::{Block, Panel, StackPanel};
    use crate::layout::Stack;
    use crate::node::{Align, LayoutProps};

    fn block(w: f64, h: f64) -> Block {
        Block::new(Size::new(w, h))
    }

    fn measured(tree: &mut NodeTree) -> MeasureReport {
        MeasureProvider::new().measure(tree).unwrap()
    }

    /// Measures and drops the paint work a render would have consumed.
    fn settled(tree: &mut NodeTree) {
        measured(tree);
        tree.invalidator_mut().reset(false);
    }

    #[test]
    fn centered_child_follows_parent_resize() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::fixed(100.0, 100.0));
        let child = tree
            .create_child(root, block(20.0, 20.0), LayoutProps::centered())
            .unwrap();

        measured(&mut tree);
        assert_eq!(tree.drawing_area(root), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(tree.drawing_area(child), Rect::new(40.0, 40.0, 60.0, 60.0));
        assert!(!tree.invalidator().has_pending(Dirty::MEASURE));

        tree.set_props(root, LayoutProps::fixed(200.0, 200.0)).unwrap();
        let report = measured(&mut tree);
        assert_eq!(tree.drawing_area(child), Rect::new(90.0, 90.0, 110.0, 110.0));
        assert_eq!(tree.wrap_size(child), Size::new(20.0, 20.0));
        assert_eq!(report.resized, vec![root]);
        assert_eq!(report.moved, vec![root, child]);
    }

    #[test]
    fn sizes_propagate_bottom_up() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::AUTO);
        let mid = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let leaf = tree.create_child(mid, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        measured(&mut tree);
        assert_eq!(tree.wrap_size(root), Size::new(10.0, 10.0));

        tree.update_element(leaf, block(30.0, 5.0)).unwrap();
        let report = measured(&mut tree);
        assert_eq!(report.resized, vec![leaf, mid, root]);
        assert_eq!(tree.wrap_size(root), Size::new(30.0, 5.0));
    }

    #[test]
    fn unchanged_parent_stops_size_propagation() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::AUTO);
        let fixed = tree
            .create_child(root, Panel::default(), LayoutProps::fixed(50.0, 50.0))
            .unwrap();
        let leaf = tree.create_child(fixed, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        settled(&mut tree);

        tree.update_element(leaf, block(20.0, 20.0)).unwrap();
        let mut provider = MeasureProvider::new();
        let mut report = MeasureReport::default();
        provider.recompute_wrap_sizes(&mut tree, &mut report).unwrap();

        assert_eq!(report.resized, vec![leaf]);
        assert_eq!(report.sizes_recomputed, 2);
        assert_eq!(tree.dirty(fixed), Dirty::ARRANGE);
        assert_eq!(tree.dirty(root), Dirty::empty());
    }

    #[test]
    fn same_size_child_leaves_parent_clean() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::AUTO);
        let a = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let b = tree.create_child(a, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        settled(&mut tree);

        tree.invalidate(b).unwrap();
        let mut provider = MeasureProvider::new();
        let mut report = MeasureReport::default();
        provider.recompute_wrap_sizes(&mut tree, &mut report).unwrap();

        assert!(report.resized.is_empty());
        assert_eq!(report.sizes_recomputed, 1);
        assert!(!tree.dirty(b).contains(Dirty::SIZE));
        assert_eq!(tree.dirty(a), Dirty::empty());
        assert_eq!(tree.dirty(root), Dirty::empty());
    }

    #[test]
    fn moving_root_translates_descendants() {
        let mut tree = NodeTree::new();
        let props = LayoutProps::fixed(100.0, 100.0);
        let root = tree.create_node(Panel::default(), props);
        let a = tree.create_child(root, Panel::default(), LayoutProps::centered()).unwrap();
        let b = tree.create_child(a, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        settled(&mut tree);
        let area = Rect::new(45.0, 45.0, 55.0, 55.0);
        assert_eq!(tree.drawing_area(a), area);
        assert_eq!(tree.drawing_area(b), area);

        let delta = Point::new(7.0, 3.0);
        tree.set_props(root, props.at(delta)).unwrap();
        let report = measured(&mut tree);

        assert_eq!(report.sizes_recomputed, 0);
        assert!(report.resized.is_empty());
        assert_eq!(report.moved, vec![root, a, b]);
        assert_eq!(tree.drawing_area(root), Rect::new(7.0, 3.0, 107.0, 103.0));
        let moved = area + delta.to_vec2();
        assert_eq!(tree.drawing_area(a), moved);
        assert_eq!(tree.drawing_area(b), moved);
        assert_eq!(tree.wrap_size(a), Size::new(10.0, 10.0));
        assert_eq!(tree.wrap_size(b), Size::new(10.0, 10.0));
        assert!(!tree.invalidator().has_pending(Dirty::MEASURE));
    }

    #[test]
    fn placement_change_skips_size_pass() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::fixed(100.0, 100.0));
        let child = tree.create_child(root, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        settled(&mut tree);

        tree.set_props(child, LayoutProps::AUTO.with_align(Align::End, Align::Start))
            .unwrap();
        let report = measured(&mut tree);
        assert_eq!(report.sizes_recomputed, 0);
        assert_eq!(report.moved, vec![child]);
        assert_eq!(tree.drawing_area(child), Rect::new(90.0, 0.0, 100.0, 10.0));
        assert_eq!(tree.dirty(root), Dirty::PAINT);
        assert_eq!(tree.dirty(child), Dirty::PAINT);
    }

    #[test]
    fn stack_growth_shifts_later_siblings() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(StackPanel::new(Stack::vertical(0.0)), LayoutProps::AUTO);
        let first = tree.create_child(root, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        let second = tree.create_child(root, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        measured(&mut tree);
        assert_eq!(tree.drawing_area(second), Rect::new(0.0, 10.0, 10.0, 20.0));

        tree.update_element(first, block(10.0, 25.0)).unwrap();
        let report = measured(&mut tree);
        assert_eq!(tree.drawing_area(second), Rect::new(0.0, 25.0, 10.0, 35.0));
        assert!(report.moved.contains(&second));
    }

    #[test]
    fn margins_count_toward_parent_size() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::AUTO);
        let child = tree
            .create_child(
                root,
                block(10.0, 10.0),
                LayoutProps::AUTO.with_margin(Insets::uniform(5.0)),
            )
            .unwrap();
        measured(&mut tree);
        assert_eq!(tree.wrap_size(root), Size::new(20.0, 20.0));
        assert_eq!(tree.drawing_area(child), Rect::new(5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn hidden_nodes_collapse_and_hide_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(StackPanel::new(Stack::horizontal(0.0)), LayoutProps::AUTO);
        let a = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let a1 = tree.create_child(a, block(10.0, 10.0), LayoutProps::AUTO).unwrap();
        let b = tree.create_child(root, block(5.0, 5.0), LayoutProps::AUTO).unwrap();
        measured(&mut tree);
        assert_eq!(tree.drawing_area(b).x0, 10.0);

        tree.set_hidden(a, true).unwrap();
        measured(&mut tree);
        assert_eq!(tree.wrap_size(a), Size::ZERO);
        assert!(tree.is_effectively_hidden(a));
        assert!(tree.is_effectively_hidden(a1));
        assert!(!tree.is_effectively_hidden(b));
        assert_eq!(tree.drawing_area(b).x0, 0.0);
        assert_eq!(tree.wrap_size(root), Size::new(5.0, 5.0));

        tree.set_hidden(a, false).unwrap();
        measured(&mut tree);
        assert!(!tree.is_effectively_hidden(a1));
        assert_eq!(tree.drawing_area(b).x0, 10.0);
    }

    #[test]
    fn clip_is_intersected_with_ancestors() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::fixed(50.0, 50.0));
        let child = tree
            .create_child(
                root,
                block(40.0, 40.0),
                LayoutProps::AUTO.at(kurbo::Point::new(30.0, 30.0)),
            )
            .unwrap();
        measured(&mut tree);
        assert_eq!(tree.drawing_area(child), Rect::new(30.0, 30.0, 70.0, 70.0));
        assert_eq!(tree.clip_area(child), Rect::new(30.0, 30.0, 50.0, 50.0));
    }

    #[test]
    fn area_pass_alone_leaves_size_work() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(block(10.0, 10.0), LayoutProps::AUTO);
        let report = MeasureProvider::new().prepare(&mut tree, false).unwrap();
        assert_eq!(report.sizes_recomputed, 0);
        assert!(tree.dirty(root).contains(Dirty::SIZE));
        assert!(!tree.dirty(root).contains(Dirty::AREA));
    }

    #[test]
    fn clean_tree_is_not_touched() {
        let mut tree = NodeTree::new();
        tree.create_node(block(10.0, 10.0), LayoutProps::AUTO);
        settled(&mut tree);
        let report = measured(&mut tree);
        assert_eq!(report, MeasureReport::default());
    }

    #[test]
    fn level_mismatch_is_fatal() {
        let mut tree = NodeTree::new();
        let root = tree.create_node(Panel::default(), LayoutProps::AUTO);
        let child = tree.create_child(root, block(1.0, 1.0), LayoutProps::AUTO).unwrap();
        measured(&mut tree);

        tree.update_element(child, block(2.0, 2.0)).unwrap();
        tree.level[root.idx as usize] = 3;
        let err = MeasureProvider::new().measure(&mut tree).unwrap_err();
        assert_eq!(
            err,
            Error::LevelMismatch {
                node: child,
                expected: 4,
                found: 1
            }
        );
        assert!(err.is_fatal());
    }
}
