// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render scheduler.
//!
//! [`RenderProvider::render`] drains every [`Dirty::PAINT`] entry of a fully
//! measured tree, shallowest level first, and draws each visible node
//! through the [`RenderingEngine`]. Paint callbacks may ask for more
//! repaints; those are recorded in the invalidator's shadow generation and
//! become the next frame's work when the generations are swapped.

use std::collections::HashMap;

use kurbo::Rect;
use trellis_core::backend::{PaintContext, RenderingEngine};
use trellis_core::config::RenderConfig;
use trellis_core::invalidate::Dirty;
use trellis_core::node::{NodeId, NodeTree};
use trellis_core::queue::UniqueQueue;
use trellis_core::trace::RenderEvent;
use trellis_core::{Error, Result};

use crate::damage::DamageRegion;
use crate::plan::{RenderItem, RenderPlan};

/// The outcome of one [`RenderProvider::render`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Nodes visited, in draw order.
    pub plan: RenderPlan,
    /// Union of the old and new painted areas of every visited node, plus
    /// the last painted areas of destroyed nodes.
    pub damage: DamageRegion,
    /// Nodes drawn.
    pub drawn: u32,
    /// Nodes un-dirtied without drawing (hidden or fully clipped).
    pub skipped: u32,
    /// Repaint requests raised while drawing, deferred to the next frame.
    pub deferred: u32,
}

impl FrameReport {
    /// Resets the report for reuse.
    pub fn clear(&mut self) {
        self.plan.clear();
        self.damage = DamageRegion::None;
        self.drawn = 0;
        self.skipped = 0;
        self.deferred = 0;
    }

    /// Returns `true` if the frame made no engine calls.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.plan.is_empty()
    }

    /// Builds the trace event for this report.
    #[must_use]
    pub fn event(&self, frame_index: u64) -> RenderEvent {
        RenderEvent {
            frame_index,
            drawn: self.drawn,
            skipped: self.skipped,
            deferred: self.deferred,
            damage_rects: u32::try_from(self.damage.rect_count()).unwrap_or(u32::MAX),
        }
    }
}

/// Draws the dirty part of a [`NodeTree`].
#[derive(Debug, Default)]
pub struct RenderProvider {
    config: RenderConfig,
    /// Last clip each visible node was drawn into.
    painted: HashMap<NodeId, Rect>,
    queue: UniqueQueue<NodeId>,
    batch: Vec<NodeId>,
    subtree: Vec<NodeId>,
    requests: Vec<NodeId>,
}

impl RenderProvider {
    /// Creates a provider with the given configuration.
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The provider's configuration.
    #[must_use]
    pub fn config(&self) -> RenderConfig {
        self.config
    }

    /// Forgets where nodes were last drawn.
    pub fn reset(&mut self) {
        self.painted.clear();
    }

    /// Draws every node marked [`Dirty::PAINT`], then swaps the
    /// invalidator's generations.
    ///
    /// `root` supplies the frame background. A tree without pending work
    /// returns an idle report and makes no engine calls.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleNode`] if `root` is stale.
    /// - [`Error::MeasurePending`] if size, area or arrange work is still
    ///   pending. Nothing is drawn.
    pub fn render(
        &mut self,
        tree: &mut NodeTree,
        root: NodeId,
        engine: &mut dyn RenderingEngine,
    ) -> Result<FrameReport> {
        let mut report = FrameReport::default();
        self.render_into(tree, root, engine, &mut report)?;
        Ok(report)
    }

    /// Like [`render`](Self::render), but reuses a caller-provided report.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_into(
        &mut self,
        tree: &mut NodeTree,
        root: NodeId,
        engine: &mut dyn RenderingEngine,
        report: &mut FrameReport,
    ) -> Result<()> {
        report.clear();
        if !tree.is_alive(root) {
            return Err(Error::StaleNode(root));
        }
        for gone in tree.take_removed() {
            if let Some(rect) = self.painted.remove(&gone) {
                report.damage.add_rect(rect);
            }
        }
        if !tree.has_invalidated_nodes() {
            return Ok(());
        }
        if tree.invalidator().has_pending(Dirty::MEASURE) {
            return Err(Error::MeasurePending);
        }

        tree.update_traversal_order();
        if self.config.repaint_descendants {
            self.spread_paint(tree)?;
        }

        engine.initialize_frame(tree.element(root).background());
        tree.invalidator_mut().begin_drain();
        let drained = self.drain(tree, engine, report);
        tree.invalidator_mut().end_drain();
        engine.finalize_frame();
        tree.invalidator_mut().swap();
        tree.invalidator_mut().reset(true);
        drained?;

        tracing::debug!(
            drawn = report.drawn,
            skipped = report.skipped,
            deferred = report.deferred,
            "rendered"
        );
        Ok(())
    }

    /// Marks every descendant of a node due for paint.
    fn spread_paint(&mut self, tree: &mut NodeTree) -> Result<()> {
        self.batch.clear();
        self.batch.extend(
            tree.invalidator()
                .iter()
                .filter(|(_, _, flags)| flags.contains(Dirty::PAINT))
                .map(|(_, id, _)| id),
        );
        self.batch.sort_unstable_by_key(|&id| tree.draw_index(id));

        // Pre-order indices: a subtree occupies a contiguous range.
        let mut covered_until = 0;
        for &id in &self.batch {
            let start = tree.draw_index(id);
            if start < covered_until {
                continue;
            }
            self.subtree.clear();
            self.subtree.extend(tree.descendants(id).skip(1));
            covered_until = start
                .saturating_add(1)
                .saturating_add(u32::try_from(self.subtree.len()).unwrap_or(u32::MAX));
            for &node in &self.subtree {
                tree.invalidate_with(node, Dirty::PAINT)?;
            }
        }
        Ok(())
    }

    fn drain(
        &mut self,
        tree: &mut NodeTree,
        engine: &mut dyn RenderingEngine,
        report: &mut FrameReport,
    ) -> Result<()> {
        while let Some(level) = tree.invalidator().shallowest_level(Dirty::PAINT) {
            self.queue.clear();
            tree.invalidator()
                .add_invalidated_components_to_queue(level, Dirty::PAINT, &mut self.queue);
            self.batch.clear();
            while let Some(id) = self.queue.pop() {
                self.batch.push(id);
            }
            self.batch.sort_unstable_by_key(|&id| tree.draw_index(id));

            for i in 0..self.batch.len() {
                let id = self.batch[i];
                self.draw_node(tree, id, level, engine, report)?;
            }
        }
        Ok(())
    }

    fn draw_node(
        &mut self,
        tree: &mut NodeTree,
        id: NodeId,
        level: u32,
        engine: &mut dyn RenderingEngine,
        report: &mut FrameReport,
    ) -> Result<()> {
        let area = tree.drawing_area(id);
        let clip = tree.clip_area(id);
        let visible = !tree.is_effectively_hidden(id) && clip.area() > 0.0;

        if visible {
            engine.set_clip(clip);
            let mut cx = PaintContext::new(id, area, clip, &mut *engine, &mut self.requests);
            tree.element(id).paint(&mut cx);
            report.drawn += 1;
            if let Some(old) = self.painted.insert(id, clip) {
                report.damage.add_rect(old);
            }
            report.damage.add_rect(clip);
        } else {
            report.skipped += 1;
            if let Some(old) = self.painted.remove(&id) {
                report.damage.add_rect(old);
            }
        }
        report.plan.items.push(RenderItem {
            node: id,
            level,
            draw_index: tree.draw_index(id),
            area,
            clip,
            drawn: visible,
        });
        tree.invalidator_mut().clear(id, level, Dirty::PAINT);

        for node in self.requests.drain(..) {
            if tree.is_alive(node) {
                // Lands in the shadow generation while draining.
                tree.invalidate_paint(node)?;
                report.deferred += 1;
            } else {
                tracing::warn!(?node, "repaint requested for a destroyed node");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;
    use trellis_core::color::Color;
    use trellis_core::element::{Block, Panel};
    use trellis_core::measure::MeasureProvider;
    use trellis_core::node::LayoutProps;

    use super::*;
    use crate::recording::{EngineCall, RecordingEngine};

    fn scene() -> (NodeTree, NodeId, NodeId) {
        let mut tree = NodeTree::new();
        let root = tree.create_node(
            Panel::new(Color::WHITE),
            LayoutProps::fixed(100.0, 100.0),
        );
        let child = tree
            .create_child(
                root,
                Block::new(Size::new(20.0, 20.0)).with_color(Color::rgb(255, 0, 0)),
                LayoutProps::centered(),
            )
            .unwrap();
        MeasureProvider::new().measure(&mut tree).unwrap();
        (tree, root, child)
    }

    #[test]
    fn first_frame_draws_parent_then_child() {
        let (mut tree, root, child) = scene();
        let mut engine = RecordingEngine::new();
        let report = RenderProvider::default()
            .render(&mut tree, root, &mut engine)
            .unwrap();

        assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root, child]);
        assert_eq!(
            engine.calls(),
            &[
                EngineCall::InitializeFrame(Color::WHITE),
                EngineCall::SetClip(Rect::new(0.0, 0.0, 100.0, 100.0)),
                EngineCall::FillRect(Rect::new(0.0, 0.0, 100.0, 100.0), Color::WHITE),
                EngineCall::SetClip(Rect::new(40.0, 40.0, 60.0, 60.0)),
                EngineCall::FillRect(Rect::new(40.0, 40.0, 60.0, 60.0), Color::rgb(255, 0, 0)),
                EngineCall::FinalizeFrame,
            ]
        );
        assert!(!tree.has_invalidated_nodes());
    }

    #[test]
    fn clean_tree_makes_no_engine_calls() {
        let (mut tree, root, _) = scene();
        let mut provider = RenderProvider::default();
        let mut engine = RecordingEngine::new();
        provider.render(&mut tree, root, &mut engine).unwrap();
        engine.take_calls();

        let report = provider.render(&mut tree, root, &mut engine).unwrap();
        assert!(report.is_idle());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn pending_measure_refuses_to_draw() {
        let (mut tree, root, child) = scene();
        tree.update_element(child, Block::new(Size::new(5.0, 5.0))).unwrap();
        let mut engine = RecordingEngine::new();
        let err = RenderProvider::default()
            .render(&mut tree, root, &mut engine)
            .unwrap_err();
        assert_eq!(err, Error::MeasurePending);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn repainting_a_parent_repaints_its_children() {
        let (mut tree, root, child) = scene();
        let mut provider = RenderProvider::default();
        let mut engine = RecordingEngine::new();
        provider.render(&mut tree, root, &mut engine).unwrap();

        tree.invalidate_paint(root).unwrap();
        let report = provider.render(&mut tree, root, &mut engine).unwrap();
        assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root, child]);

        let mut retained = RenderProvider::new(RenderConfig::RETAINED_SURFACES);
        tree.invalidate_paint(root).unwrap();
        let report = retained.render(&mut tree, root, &mut engine).unwrap();
        assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn moving_a_node_damages_old_and_new_areas() {
        let (mut tree, root, child) = scene();
        let mut provider = RenderProvider::new(RenderConfig::RETAINED_SURFACES);
        let mut engine = RecordingEngine::new();
        provider.render(&mut tree, root, &mut engine).unwrap();

        tree.set_props(child, LayoutProps::AUTO).unwrap();
        MeasureProvider::new().measure(&mut tree).unwrap();
        let report = provider.render(&mut tree, root, &mut engine).unwrap();
        // The parent repaints over the old area; the child draws at the new one.
        assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root, child]);
        assert_eq!(report.damage.bounds(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn destroyed_nodes_damage_their_last_area() {
        let (mut tree, root, child) = scene();
        let mut provider = RenderProvider::new(RenderConfig::RETAINED_SURFACES);
        let mut engine = RecordingEngine::new();
        provider.render(&mut tree, root, &mut engine).unwrap();

        tree.destroy(child).unwrap();
        MeasureProvider::new().measure(&mut tree).unwrap();
        let report = provider.render(&mut tree, root, &mut engine).unwrap();
        assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root]);
        assert!(matches!(report.damage, DamageRegion::Rects(ref r) if r.len() == 1));
    }

    #[test]
    fn stale_root_is_rejected() {
        let (mut tree, root, _) = scene();
        tree.destroy(root).unwrap();
        let mut engine = RecordingEngine::new();
        let err = RenderProvider::default()
            .render(&mut tree, root, &mut engine)
            .unwrap_err();
        assert_eq!(err, Error::StaleNode(root));
    }
}
