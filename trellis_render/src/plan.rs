// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the nodes a frame visited, in draw order.

use kurbo::Rect;
use trellis_core::node::NodeId;

/// One node visited by the render scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderItem {
    /// The node.
    pub node: NodeId,
    /// Depth of the node; items are grouped by ascending level.
    pub level: u32,
    /// Pre-order position of the node within the tree.
    pub draw_index: u32,
    /// Drawing area at the time of drawing.
    pub area: Rect,
    /// Visible part of the drawing area.
    pub clip: Rect,
    /// `false` when the node was un-dirtied without drawing because it is
    /// hidden or fully clipped.
    pub drawn: bool,
}

/// Items visited in one frame, in the order they were handled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPlan {
    /// Visited nodes, back to front.
    pub items: Vec<RenderItem>,
}

impl RenderPlan {
    /// Creates an empty render plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns `true` if no node was visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The nodes that were actually drawn, in draw order.
    pub fn drawn(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().filter(|item| item.drawn).map(|item| item.node)
    }
}
