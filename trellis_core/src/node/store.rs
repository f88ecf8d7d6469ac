// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use core::mem;

use kurbo::{Rect, Size};

use super::id::{INVALID, NodeId};
use super::props::{LayoutProps, NodeFlags};
use super::traverse::{Ancestors, Children, Descendants};
use crate::config::TreeConfig;
use crate::element::{Element, Panel};
use crate::error::{Error, Result};
use crate::invalidate::{Dirty, Invalidator};

/// Work owed by a parent whose child list changed.
const PARENT_RELAYOUT: Dirty = Dirty::SIZE.union(Dirty::ARRANGE).union(Dirty::PAINT);
/// Work owed by a node that was created, attached or detached.
const NODE_RELAYOUT: Dirty = Dirty::LAYOUT.union(Dirty::ARRANGE);

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters make stale handles detectable.
///
/// The tree owns its [`Invalidator`]: every mutation marks the affected nodes
/// with the [`Dirty`] flags it implies, so callers never have to invalidate
/// by hand after a structural or property change.
///
/// Mutations taking a handle return [`Error::StaleNode`] for destroyed nodes.
/// Read accessors panic instead, like slice indexing.
#[derive(Debug)]
pub struct NodeTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) level: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) props: Vec<LayoutProps>,
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) element: Vec<Option<Box<dyn Element>>>,

    // -- Computed properties (written by measurement) --
    pub(crate) wrap_size: Vec<Size>,
    pub(crate) slot: Vec<Rect>,
    pub(crate) drawing_area: Vec<Rect>,
    pub(crate) clip_area: Vec<Rect>,
    pub(crate) effective_hidden: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) invalidator: Invalidator,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) draw_index: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<NodeId>,
    pub(crate) pending_removed: Vec<NodeId>,

    pub(crate) viewport: Rect,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates an empty tree with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::DEFAULT)
    }

    /// Creates an empty tree.
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            level: Vec::new(),
            props: Vec::new(),
            flags: Vec::new(),
            element: Vec::new(),
            wrap_size: Vec::new(),
            slot: Vec::new(),
            drawing_area: Vec::new(),
            clip_area: Vec::new(),
            effective_hidden: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            invalidator: Invalidator::new(),
            traversal_order: Vec::new(),
            draw_index: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            viewport: config.viewport,
        }
    }

    // -- Allocation API --

    /// Creates a new root node and returns its handle.
    ///
    /// The node has no parent, sits at level 0, occupies the viewport as its
    /// slot, and is marked for a full layout and paint.
    pub fn create_node<E: Element + 'static>(&mut self, element: E, props: LayoutProps) -> NodeId {
        self.alloc(Box::new(element), props)
    }

    /// Creates a new node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if `parent` has been destroyed; nothing
    /// is allocated in that case.
    pub fn create_child<E: Element + 'static>(
        &mut self,
        parent: NodeId,
        element: E,
        props: LayoutProps,
    ) -> Result<NodeId> {
        self.check(parent)?;
        let child = self.alloc(Box::new(element), props);
        self.add_child(parent, child)?;
        Ok(child)
    }

    fn alloc(&mut self, element: Box<dyn Element>, props: LayoutProps) -> NodeId {
        let viewport = self.viewport;
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on destroy.
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.level[i] = 0;
            self.props[i] = props;
            self.flags[i] = NodeFlags::default();
            self.element[i] = Some(element);
            self.wrap_size[i] = Size::ZERO;
            self.slot[i] = viewport;
            self.drawing_area[i] = Rect::ZERO;
            self.clip_area[i] = Rect::ZERO;
            self.effective_hidden[i] = false;
            self.alive[i] = true;
            self.draw_index[i] = INVALID;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.level.push(0);
            self.props.push(props);
            self.flags.push(NodeFlags::default());
            self.element.push(Some(element));
            self.wrap_size.push(Size::ZERO);
            self.slot.push(viewport);
            self.drawing_area.push(Rect::ZERO);
            self.clip_area.push(Rect::ZERO);
            self.effective_hidden.push(false);
            self.generation.push(0);
            self.alive.push(true);
            self.draw_index.push(INVALID);
            idx
        };

        let id = self.id_at(idx);
        self.traversal_dirty = true;
        self.pending_added.push(id);
        self.invalidator.invalidate_with(id, 0, NODE_RELAYOUT);
        id
    }

    /// Destroys a node and its entire subtree, freeing their slots for reuse.
    ///
    /// Every destroyed node's invalidation is cancelled before this returns,
    /// and the former parent (if any) is marked for relayout and repaint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        let idx = id.idx;
        let parent = self.parent[idx as usize];
        if parent != INVALID {
            self.unlink_from_parent(idx);
            self.mark(parent, PARENT_RELAYOUT);
        }

        // Unlinked above, so the walk stays inside the subtree.
        let doomed: Vec<u32> = self.descendants(id).map(|n| n.idx).collect();
        for n in doomed {
            let i = n as usize;
            let old = self.id_at(n);
            self.invalidator.cancel_invalidation(old, self.level[i]);
            self.element[i] = None;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.alive[i] = false;
            self.draw_index[i] = INVALID;
            // Bump generation so old handles immediately fail validation.
            self.generation[i] = self.generation[i].wrapping_add(1);
            self.free_list.push(n);
            self.pending_removed.push(old);
        }
        self.traversal_dirty = true;
        tracing::debug!(?id, "destroyed subtree");
        Ok(())
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Re-levels `child`'s subtree under the new ancestry, marks the parent
    /// for relayout and repaint, and marks `child` for a full layout.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleNode`] if either handle is stale.
    /// - [`Error::AlreadyAttached`] if `child` already has a parent.
    /// - [`Error::Cycle`] if `child` is `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        let p = parent.idx;
        let c = child.idx;

        let first = self.first_child[p as usize];
        if first == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = first;
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
        self.parent[c as usize] = p;
        self.finish_attach(p, c);
        Ok(())
    }

    /// Inserts `child` before `sibling` in `sibling`'s parent.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleNode`] if either handle is stale.
    /// - [`Error::NotAttached`] if `sibling` has no parent.
    /// - [`Error::AlreadyAttached`] if `child` already has a parent.
    /// - [`Error::Cycle`] if `child` is an ancestor of `sibling`.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) -> Result<()> {
        self.check(sibling)?;
        let s = sibling.idx;
        let p = self.parent[s as usize];
        if p == INVALID {
            return Err(Error::NotAttached(sibling));
        }
        self.check_attach(self.id_at(p), child)?;
        let c = child.idx;

        let prev = self.prev_sibling[s as usize];
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = prev;
        if prev != INVALID {
            self.next_sibling[prev as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;
        self.parent[c as usize] = p;
        self.finish_attach(p, c);
        Ok(())
    }

    /// Detaches `child` from its parent, making it a root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale, or
    /// [`Error::NotAttached`] if the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) -> Result<()> {
        self.check(child)?;
        let c = child.idx;
        let p = self.parent[c as usize];
        if p == INVALID {
            return Err(Error::NotAttached(child));
        }
        self.unlink_from_parent(c);
        self.mark(p, PARENT_RELAYOUT);

        self.relevel_subtree(c, 0);
        self.slot[c as usize] = self.viewport;
        self.mark(c, NODE_RELAYOUT);
        self.traversal_dirty = true;
        Ok(())
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is detached first. The tree is
    /// left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if either handle is stale, or
    /// [`Error::Cycle`] if `child` is `new_parent` or one of its ancestors.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> Result<()> {
        self.check(child)?;
        self.check(new_parent)?;
        self.check_cycle(new_parent, child)?;
        let c = child.idx;
        let old = self.parent[c as usize];
        if old != INVALID {
            self.unlink_from_parent(c);
            self.mark(old, PARENT_RELAYOUT);
        }
        self.add_child(new_parent, child)
    }

    /// Returns the parent of a node, if any.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over the strict ancestors of a node, nearest first.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        self.validate(id);
        Ancestors::new(self, id.idx)
    }

    /// Returns a pre-order iterator over `id` and all its descendants.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    /// Returns the live nodes without a parent, in slot order.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len)
            .filter(|&idx| self.alive[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the node's depth; roots are at level 0.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn level(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.level[id.idx as usize]
    }

    /// Returns the node's layout properties.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn props(&self, id: NodeId) -> LayoutProps {
        self.validate(id);
        self.props[id.idx as usize]
    }

    /// Returns the node's flags.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the node's element.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn element(&self, id: NodeId) -> &dyn Element {
        self.validate(id);
        self.element_at(id.idx)
    }

    /// Returns the cached wrap size.
    ///
    /// Only valid after measurement.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn wrap_size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.wrap_size[id.idx as usize]
    }

    /// Returns the area the parent's arrangement assigned to the node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn slot(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.slot[id.idx as usize]
    }

    /// Returns the cached drawing area in absolute coordinates.
    ///
    /// Only valid after measurement.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn drawing_area(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.drawing_area[id.idx as usize]
    }

    /// Returns the drawing area intersected with every ancestor's clip.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn clip_area(&self, id: NodeId) -> Rect {
        self.validate(id);
        self.clip_area[id.idx as usize]
    }

    /// Returns whether the node is hidden, directly or by an ancestor.
    ///
    /// Only valid after measurement.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn is_effectively_hidden(&self, id: NodeId) -> bool {
        self.validate(id);
        self.effective_hidden[id.idx as usize]
    }

    /// Returns the node's position in draw order.
    ///
    /// Only valid after [`update_traversal_order`](Self::update_traversal_order).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn draw_index(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.draw_index[id.idx as usize]
    }

    /// Returns the viewport.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    // -- Mutation API (auto-marks dirty) --

    /// Replaces the node's layout properties.
    ///
    /// Size changes mark the node for a full layout; alignment or position
    /// changes only for placement; margin changes also make the parent
    /// re-measure and re-slot its children. Identical props mark nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn set_props(&mut self, id: NodeId, props: LayoutProps) -> Result<()> {
        self.check(id)?;
        let idx = id.idx;
        let old = mem::replace(&mut self.props[idx as usize], props);
        if old.size_differs(&props) {
            self.mark(idx, Dirty::LAYOUT);
        }
        if old.placement_differs(&props) {
            self.mark(idx, Dirty::PLACEMENT);
        }
        if old.margin_differs(&props) {
            self.mark(idx, Dirty::PLACEMENT);
            let parent = self.parent[idx as usize];
            if parent != INVALID {
                self.mark(parent, Dirty::SIZE | Dirty::ARRANGE);
            }
        }
        Ok(())
    }

    /// Hides or shows a node and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<()> {
        self.check(id)?;
        let flags = &mut self.flags[id.idx as usize];
        if flags.hidden != hidden {
            flags.hidden = hidden;
            self.mark(id.idx, Dirty::LAYOUT | Dirty::ARRANGE);
            // Hidden nodes take no space, even when their wrap size is zero.
            let parent = self.parent[id.idx as usize];
            if parent != INVALID {
                self.mark(parent, PARENT_RELAYOUT);
            }
        }
        Ok(())
    }

    /// Replaces the node's element.
    ///
    /// The new element may measure, arrange and paint differently, so the
    /// node is marked for a full layout and its children for re-slotting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn update_element<E: Element + 'static>(&mut self, id: NodeId, element: E) -> Result<()> {
        self.check(id)?;
        self.element[id.idx as usize] = Some(Box::new(element));
        self.mark(id.idx, Dirty::LAYOUT | Dirty::ARRANGE);
        Ok(())
    }

    /// Changes the viewport, marking every root for placement.
    pub fn set_viewport(&mut self, viewport: Rect) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        for root in self.roots() {
            self.slot[root.idx as usize] = viewport;
            self.mark(root.idx, Dirty::PLACEMENT);
        }
    }

    // -- Invalidation API --

    /// Marks a node for a full layout and paint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn invalidate(&mut self, id: NodeId) -> Result<()> {
        self.invalidate_with(id, Dirty::LAYOUT)
    }

    /// Adds `flags` to a node's pending work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn invalidate_with(&mut self, id: NodeId, flags: Dirty) -> Result<()> {
        self.check(id)?;
        self.mark(id.idx, flags);
        Ok(())
    }

    /// Marks a node for repaint only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn invalidate_paint(&mut self, id: NodeId) -> Result<()> {
        self.invalidate_with(id, Dirty::PAINT)
    }

    /// Drops all pending work for a node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleNode`] if the handle is stale.
    pub fn cancel_invalidation(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        self.invalidator
            .cancel_invalidation(id, self.level[id.idx as usize]);
        Ok(())
    }

    /// Returns the pending work for a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn dirty(&self, id: NodeId) -> Dirty {
        self.validate(id);
        self.invalidator.flags(id, self.level[id.idx as usize])
    }

    /// Returns `true` if any node has pending work.
    #[must_use]
    pub fn has_invalidated_nodes(&self) -> bool {
        self.invalidator.has_invalidated_nodes()
    }

    /// Returns the tree's invalidator.
    #[must_use]
    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Returns the tree's invalidator for direct manipulation.
    ///
    /// Entries must be keyed by each node's current [`level`](Self::level).
    pub fn invalidator_mut(&mut self) -> &mut Invalidator {
        &mut self.invalidator
    }

    // -- Traversal cache --

    /// Rebuilds the depth-first pre-order draw order if topology changed.
    ///
    /// Returns `true` if a rebuild happened.
    pub fn update_traversal_order(&mut self) -> bool {
        if !self.traversal_dirty {
            return false;
        }
        let mut order = mem::take(&mut self.traversal_order);
        order.clear();
        for root in self.roots() {
            order.extend(self.descendants(root).map(|n| n.idx));
        }
        for (pos, &idx) in (0_u32..).zip(&order) {
            self.draw_index[idx as usize] = pos;
        }
        self.traversal_order = order;
        self.traversal_dirty = false;
        true
    }

    /// Returns the cached draw order.
    ///
    /// Only valid after [`update_traversal_order`](Self::update_traversal_order).
    pub fn draw_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.traversal_order.iter().map(|&idx| self.id_at(idx))
    }

    // -- Lifecycle --

    /// Returns and clears the nodes created since the last call.
    pub fn take_added(&mut self) -> Vec<NodeId> {
        mem::take(&mut self.pending_added)
    }

    /// Returns and clears the nodes destroyed since the last call.
    ///
    /// The returned handles are already stale; use them as keys only.
    pub fn take_removed(&mut self) -> Vec<NodeId> {
        mem::take(&mut self.pending_removed)
    }

    // -- Consistency --

    /// Checks that every node sits one level below its parent.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::LevelMismatch`] found, in slot order.
    pub fn verify_levels(&self) -> Result<()> {
        for idx in 0..self.len {
            let i = idx as usize;
            if !self.alive[i] {
                continue;
            }
            let p = self.parent[i];
            let expected = if p == INVALID {
                0
            } else {
                self.level[p as usize] + 1
            };
            if self.level[i] != expected {
                return Err(Error::LevelMismatch {
                    node: self.id_at(idx),
                    expected,
                    found: self.level[i],
                });
            }
        }
        Ok(())
    }

    // -- Internal helpers --

    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    pub(crate) fn element_at(&self, idx: u32) -> &dyn Element {
        // Only destroyed slots lack an element.
        self.element[idx as usize]
            .as_deref()
            .unwrap_or(&Panel::TRANSPARENT)
    }

    pub(crate) fn mark(&mut self, idx: u32, flags: Dirty) {
        let id = self.id_at(idx);
        let level = self.level[idx as usize];
        self.invalidator.invalidate_with(id, level, flags);
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(Error::StaleNode(id))
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_cycle(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut cur = parent.idx;
        while cur != INVALID {
            if cur == child.idx {
                return Err(Error::Cycle { parent, child });
            }
            cur = self.parent[cur as usize];
        }
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(parent)?;
        self.check(child)?;
        if self.parent[child.idx as usize] != INVALID {
            return Err(Error::AlreadyAttached(child));
        }
        self.check_cycle(parent, child)
    }

    fn finish_attach(&mut self, p: u32, c: u32) {
        self.relevel_subtree(c, self.level[p as usize] + 1);
        self.mark(p, PARENT_RELAYOUT);
        self.mark(c, NODE_RELAYOUT);
        self.traversal_dirty = true;
    }

    /// Sets `idx` to `level` and its descendants to match, moving their
    /// invalidator entries along.
    fn relevel_subtree(&mut self, idx: u32, level: u32) {
        if self.level[idx as usize] == level {
            return;
        }
        let nodes: Vec<u32> = Descendants::new(self, idx).map(|n| n.idx).collect();
        for n in nodes {
            let new = if n == idx {
                level
            } else {
                self.level[self.parent[n as usize] as usize] + 1
            };
            let id = self.id_at(n);
            let old = mem::replace(&mut self.level[n as usize], new);
            self.invalidator.relevel(id, old, new);
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
        self.traversal_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Insets;

    use super::*;
    use crate::element::Block;

    fn tree() -> NodeTree {
        NodeTree::new()
    }

    fn node(tree: &mut NodeTree) -> NodeId {
        tree.create_node(Panel::default(), LayoutProps::AUTO)
    }

    #[test]
    fn create_and_destroy() {
        let mut tree = tree();
        let id = node(&mut tree);
        assert!(tree.is_alive(id));
        assert_eq!(tree.node_count(), 1);
        tree.destroy(id).unwrap();
        assert!(!tree.is_alive(id));
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.take_removed(), vec![id]);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = tree();
        let id1 = node(&mut tree);
        tree.destroy(id1).unwrap();
        let id2 = node(&mut tree);
        assert!(!tree.is_alive(id1));
        assert!(tree.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
        assert_eq!(tree.set_hidden(id1, true), Err(Error::StaleNode(id1)));
    }

    #[test]
    fn new_nodes_are_fully_dirty() {
        let mut tree = tree();
        let id = node(&mut tree);
        assert!(tree.dirty(id).contains(Dirty::LAYOUT | Dirty::ARRANGE));
        assert_eq!(tree.take_added(), vec![id]);
        assert!(tree.take_added().is_empty());
    }

    #[test]
    fn add_child_and_query() {
        let mut tree = tree();
        let parent = node(&mut tree);
        let child1 = node(&mut tree);
        let child2 = node(&mut tree);

        tree.add_child(parent, child1).unwrap();
        tree.add_child(parent, child2).unwrap();

        assert_eq!(tree.parent(child1), Some(parent));
        assert_eq!(tree.parent(child2), Some(parent));
        assert_eq!(tree.level(child2), 1);
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![child1, child2]);
    }

    #[test]
    fn attach_errors_leave_tree_untouched() {
        let mut tree = tree();
        let a = node(&mut tree);
        let b = tree.create_child(a, Panel::default(), LayoutProps::AUTO).unwrap();
        let c = tree.create_child(b, Panel::default(), LayoutProps::AUTO).unwrap();

        assert_eq!(tree.add_child(c, b), Err(Error::AlreadyAttached(b)));
        assert_eq!(
            tree.reparent(a, c),
            Err(Error::Cycle {
                parent: c,
                child: a
            })
        );
        assert_eq!(tree.add_child(a, a), Err(Error::Cycle { parent: a, child: a }));
        assert_eq!(tree.remove_from_parent(a), Err(Error::NotAttached(a)));
        assert_eq!(tree.parent(c), Some(b));
        assert_eq!(tree.level(c), 2);
        tree.verify_levels().unwrap();
    }

    #[test]
    fn remove_from_parent_makes_a_root() {
        let mut tree = tree();
        let parent = node(&mut tree);
        let child = tree.create_child(parent, Panel::default(), LayoutProps::AUTO).unwrap();
        let grandchild = tree.create_child(child, Panel::default(), LayoutProps::AUTO).unwrap();

        tree.remove_from_parent(child).unwrap();
        assert_eq!(tree.parent(child), None);
        assert!(tree.children(parent).next().is_none());
        assert_eq!(tree.level(child), 0);
        assert_eq!(tree.level(grandchild), 1);
        assert_eq!(tree.slot(child), tree.viewport());
        assert!(tree.roots().contains(&child));
        tree.verify_levels().unwrap();
    }

    #[test]
    fn insert_before_works() {
        let mut tree = tree();
        let parent = node(&mut tree);
        let a = node(&mut tree);
        let b = node(&mut tree);
        let c = node(&mut tree);

        tree.add_child(parent, a).unwrap();
        tree.add_child(parent, c).unwrap();
        tree.insert_before(b, c).unwrap();
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![a, b, c]);

        let d = node(&mut tree);
        tree.insert_before(d, a).unwrap();
        assert_eq!(tree.children(parent).next(), Some(d));
    }

    #[test]
    fn reparent_moves_invalidations_with_levels() {
        let mut tree = tree();
        let p1 = node(&mut tree);
        let p2 = node(&mut tree);
        let mid = tree.create_child(p2, Panel::default(), LayoutProps::AUTO).unwrap();
        let child = tree.create_child(p1, Panel::default(), LayoutProps::AUTO).unwrap();
        let leaf = tree.create_child(child, Panel::default(), LayoutProps::AUTO).unwrap();
        assert_eq!(tree.level(leaf), 2);

        tree.reparent(child, mid).unwrap();
        assert_eq!(tree.parent(child), Some(mid));
        assert_eq!(tree.level(child), 2);
        assert_eq!(tree.level(leaf), 3);
        assert!(tree.children(p1).next().is_none());
        // The leaf's pending work followed it to its new level.
        assert_eq!(tree.invalidator().flags(leaf, 3), tree.dirty(leaf));
        assert!(!tree.dirty(leaf).is_empty());
        assert_eq!(tree.invalidator().flags(leaf, 2), Dirty::empty());
        tree.verify_levels().unwrap();
    }

    #[test]
    fn destroy_cascades_and_cancels() {
        let mut tree = tree();
        let root = node(&mut tree);
        let mid = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let leaf = tree.create_child(mid, Panel::default(), LayoutProps::AUTO).unwrap();
        let keep = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();

        tree.destroy(mid).unwrap();
        assert!(!tree.is_alive(mid));
        assert!(!tree.is_alive(leaf));
        assert!(tree.is_alive(keep));
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![keep]);
        let residual: Vec<_> = tree
            .invalidator()
            .iter()
            .filter(|(_, n, _)| *n == mid || *n == leaf)
            .collect();
        assert!(residual.is_empty());
        assert!(tree.dirty(root).contains(PARENT_RELAYOUT));
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn roots_returns_parentless_nodes() {
        let mut tree = tree();
        let a = node(&mut tree);
        let b = node(&mut tree);
        let c = node(&mut tree);
        tree.add_child(a, c).unwrap();

        let roots = tree.roots();
        assert_eq!(roots, vec![a, b]);
    }

    #[test]
    fn set_props_marks_by_kind_of_change() {
        let mut tree = tree();
        let root = node(&mut tree);
        let child = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        tree.invalidator_mut().reset(false);

        tree.set_props(child, LayoutProps::centered()).unwrap();
        assert_eq!(tree.dirty(child), Dirty::PLACEMENT);
        assert_eq!(tree.dirty(root), Dirty::empty());

        tree.invalidator_mut().reset(false);
        tree.set_props(child, LayoutProps::centered().with_margin(Insets::uniform(3.0)))
            .unwrap();
        assert_eq!(tree.dirty(root), Dirty::SIZE | Dirty::ARRANGE);

        tree.invalidator_mut().reset(false);
        tree.set_props(child, tree.props(child)).unwrap();
        assert!(!tree.has_invalidated_nodes());

        tree.set_props(child, LayoutProps::fixed(5.0, 5.0)).unwrap();
        assert!(tree.dirty(child).contains(Dirty::LAYOUT));
    }

    #[test]
    fn set_viewport_marks_roots() {
        let mut tree = tree();
        let root = node(&mut tree);
        tree.invalidator_mut().reset(false);
        let viewport = Rect::new(0.0, 0.0, 320.0, 240.0);
        tree.set_viewport(viewport);
        assert_eq!(tree.slot(root), viewport);
        assert_eq!(tree.dirty(root), Dirty::PLACEMENT);
    }

    #[test]
    fn traversal_order_is_preorder() {
        let mut tree = tree();
        let root = node(&mut tree);
        let a = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let b = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        let a1 = tree.create_child(a, Panel::default(), LayoutProps::AUTO).unwrap();

        assert!(tree.update_traversal_order());
        assert!(!tree.update_traversal_order());
        assert_eq!(tree.draw_order().collect::<Vec<_>>(), vec![root, a, a1, b]);
        let indices: Vec<u32> = [root, a, a1, b].iter().map(|&n| tree.draw_index(n)).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(tree.ancestors(a1).collect::<Vec<_>>(), vec![a, root]);
    }

    #[test]
    fn update_element_marks_layout() {
        let mut tree = tree();
        let id = node(&mut tree);
        tree.invalidator_mut().reset(false);
        tree.update_element(id, Block::new(Size::new(4.0, 4.0))).unwrap();
        assert!(tree.dirty(id).contains(Dirty::LAYOUT | Dirty::ARRANGE));
    }

    #[test]
    fn level_mismatch_is_reported() {
        let mut tree = tree();
        let root = node(&mut tree);
        let child = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
        tree.level[child.idx as usize] = 5;
        assert_eq!(
            tree.verify_levels(),
            Err(Error::LevelMismatch {
                node: child,
                expected: 1,
                found: 5
            })
        );
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_getter() {
        let mut tree = tree();
        let id = node(&mut tree);
        tree.destroy(id).unwrap();
        let _ = tree.drawing_area(id);
    }
}
