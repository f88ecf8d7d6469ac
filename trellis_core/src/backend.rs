// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-backend contract.
//!
//! Trellis never touches pixels itself. A *rendering engine* (GPU, software
//! rasterizer, terminal, or a recording test double) implements
//! [`RenderingEngine`]; each node's element implements [`Paintable`] and
//! draws through a [`PaintContext`] that carries the node's geometry and
//! clips every fill to it.
//!
//! # Frame protocol
//!
//! For every frame that has dirty nodes, the render scheduler calls:
//!
//! ```text
//!   initialize_frame(background)
//!   for each dirty, visible node in draw order:
//!       set_clip(node clip)
//!       Paintable::paint(node, PaintContext)  ──► fill_rect(..)*
//!   finalize_frame()
//! ```
//!
//! Frames without dirty nodes make no engine calls at all.
//! [`shutdown`](RenderingEngine::shutdown) is called once when the frame
//! driver is torn down.

use kurbo::Rect;

use crate::color::Color;
use crate::node::NodeId;

/// Draws into a render target on behalf of the render scheduler.
pub trait RenderingEngine {
    /// Starts a frame. `background` is the root element's background.
    fn initialize_frame(&mut self, background: Color);

    /// Restricts subsequent fills to `clip`.
    fn set_clip(&mut self, clip: Rect);

    /// Fills `rect` with `color`.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Ends the frame; the engine may present it.
    fn finalize_frame(&mut self);

    /// Releases engine resources. No further calls follow.
    fn shutdown(&mut self) {}
}

/// How a node draws itself.
pub trait Paintable {
    /// The node's background; transparent by default.
    fn background(&self) -> Color {
        Color::TRANSPARENT
    }

    /// Draws the node. The default fills the drawing area with
    /// [`background`](Self::background).
    fn paint(&self, cx: &mut PaintContext<'_>) {
        cx.fill(self.background());
    }
}

/// Per-node drawing context handed to [`Paintable::paint`].
pub struct PaintContext<'a> {
    node: NodeId,
    area: Rect,
    clip: Rect,
    engine: &'a mut dyn RenderingEngine,
    requests: &'a mut Vec<NodeId>,
}

impl core::fmt::Debug for PaintContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PaintContext")
            .field("node", &self.node)
            .field("area", &self.area)
            .field("clip", &self.clip)
            .finish_non_exhaustive()
    }
}

impl<'a> PaintContext<'a> {
    /// Creates a context for drawing `node`.
    ///
    /// Repaint requests raised through the context are appended to
    /// `requests`; the scheduler applies them once the node is done.
    pub fn new(
        node: NodeId,
        area: Rect,
        clip: Rect,
        engine: &'a mut dyn RenderingEngine,
        requests: &'a mut Vec<NodeId>,
    ) -> Self {
        Self {
            node,
            area,
            clip,
            engine,
            requests,
        }
    }

    /// The node being drawn.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The node's drawing area.
    #[must_use]
    pub fn area(&self) -> Rect {
        self.area
    }

    /// The visible part of the drawing area.
    #[must_use]
    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Fills the whole drawing area. Transparent colors draw nothing.
    pub fn fill(&mut self, color: Color) {
        self.fill_rect(self.area, color);
    }

    /// Fills `rect`, clipped to the node's visible area.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if color.is_transparent() {
            return;
        }
        let visible = rect.intersect(self.clip);
        if visible.area() > 0.0 {
            self.engine.fill_rect(visible, color);
        }
    }

    /// Asks for `node` to be drawn again in the next frame.
    ///
    /// Requests never extend the frame being drawn.
    pub fn request_repaint(&mut self, node: NodeId) {
        self.requests.push(node);
    }

    /// Direct access to the engine, for drawing that fills cannot express.
    pub fn engine(&mut self) -> &mut dyn RenderingEngine {
        &mut *self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Fills(Vec<(Rect, Color)>);

    impl RenderingEngine for Fills {
        fn initialize_frame(&mut self, _: Color) {}
        fn set_clip(&mut self, _: Rect) {}
        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.0.push((rect, color));
        }
        fn finalize_frame(&mut self) {}
    }

    fn node() -> NodeId {
        NodeId {
            idx: 0,
            generation: 0,
        }
    }

    #[test]
    fn fills_are_clipped() {
        let mut engine = Fills::default();
        let mut requests = Vec::new();
        let mut cx = PaintContext::new(
            node(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(50.0, 0.0, 100.0, 100.0),
            &mut engine,
            &mut requests,
        );
        cx.fill(Color::WHITE);
        cx.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::BLACK);
        cx.fill(Color::TRANSPARENT);
        assert_eq!(engine.0, vec![(Rect::new(50.0, 0.0, 100.0, 100.0), Color::WHITE)]);
    }

    #[test]
    fn repaint_requests_are_collected() {
        let mut engine = Fills::default();
        let mut requests = Vec::new();
        let mut cx = PaintContext::new(node(), Rect::ZERO, Rect::ZERO, &mut engine, &mut requests);
        cx.request_repaint(node());
        assert_eq!(requests, vec![node()]);
    }
}
