// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration for the tree, the renderer and the frame driver.

use kurbo::Rect;

/// Configuration for a [`NodeTree`](crate::node::NodeTree).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeConfig {
    /// Area assigned to every root node, and the clip of the whole tree.
    pub viewport: Rect,
}

impl TreeConfig {
    /// An 800×600 viewport at the origin.
    pub const DEFAULT: Self = Self::with_viewport(Rect::new(0.0, 0.0, 800.0, 600.0));

    /// Configuration with the given viewport.
    #[must_use]
    pub const fn with_viewport(viewport: Rect) -> Self {
        Self { viewport }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration for the render scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Redraw every descendant of a node that is redrawn.
    ///
    /// Painting a node overwrites whatever its children drew last frame, so
    /// turning this off is only correct for engines that composite each node
    /// on its own surface.
    pub repaint_descendants: bool,
}

impl RenderConfig {
    /// Painter's-algorithm rendering into a single target.
    pub const DEFAULT: Self = Self {
        repaint_descendants: true,
    };

    /// Only nodes explicitly marked for paint are redrawn.
    pub const RETAINED_SURFACES: Self = Self {
        repaint_descendants: false,
    };
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration for a frame driver that owns a tree and both providers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Tree configuration.
    pub tree: TreeConfig,
    /// Render configuration.
    pub render: RenderConfig,
    /// Reject frame-loop calls made off the thread that created the driver.
    pub enforce_ui_thread: bool,
}

impl PipelineConfig {
    /// Default viewport, painter's-algorithm rendering, thread checks on.
    pub const DEFAULT: Self = Self {
        tree: TreeConfig::DEFAULT,
        render: RenderConfig::DEFAULT,
        enforce_ui_thread: true,
    };

    /// Returns a copy with the given viewport.
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Rect) -> Self {
        self.tree.viewport = viewport;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
