// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame driver.
//!
//! A [`Pipeline`] owns the node tree together with the measure and render
//! providers and runs one frame per [`frame`](Pipeline::frame) call:
//!
//! ```text
//!   dispatch ──► size pass ──► area pass ──► render
//!   (jobs from     (bottom-up)    (top-down)     (dirty nodes,
//!    other threads)                               draw order)
//! ```
//!
//! Every phase is bracketed by [`PhaseBeginEvent`] / [`PhaseEndEvent`] and
//! the frame ends with a [`FrameSummary`](trellis_core::trace::FrameSummary).

use trellis_core::backend::RenderingEngine;
use trellis_core::config::PipelineConfig;
use trellis_core::dispatch::{DispatchHandle, Dispatcher, UiDispatcher};
use trellis_core::measure::{MeasureProvider, MeasureReport};
use trellis_core::node::{NodeId, NodeTree};
use trellis_core::time::Clock;
use trellis_core::trace::{
    FrameBeginEvent, FrameSummaryBuilder, MeasureEvent, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, Tracer,
};
use trellis_core::Result;

use crate::provider::{FrameReport, RenderProvider};

/// Owns a node tree and drives its frames.
#[derive(Debug)]
pub struct Pipeline {
    tree: NodeTree,
    measure: MeasureProvider,
    render: RenderProvider,
    dispatcher: UiDispatcher<NodeTree>,
    config: PipelineConfig,
    clock: Clock,
    frame_index: u64,
    report: MeasureReport,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Creates a pipeline with [`PipelineConfig::DEFAULT`], bound to the
    /// calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::DEFAULT)
    }

    /// Creates a pipeline with the given configuration, bound to the calling
    /// thread.
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            tree: NodeTree::with_config(config.tree),
            measure: MeasureProvider::new(),
            render: RenderProvider::new(config.render),
            dispatcher: UiDispatcher::new(),
            config,
            clock: Clock::new(),
            frame_index: 0,
            report: MeasureReport::default(),
        }
    }

    /// The pipeline's configuration.
    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Mutable access to the node tree.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// Index of the next frame.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns a handle that other threads use to mutate the tree.
    ///
    /// Scheduled jobs run at the start of the next [`frame`](Self::frame), or
    /// on [`run_dispatched`](Self::run_dispatched).
    #[must_use]
    pub fn dispatch_handle(&self) -> DispatchHandle<NodeTree> {
        self.dispatcher.handle()
    }

    /// Runs the jobs scheduled through [`dispatch_handle`](Self::dispatch_handle).
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`](trellis_core::Error::WrongThread) off
    /// the UI thread.
    pub fn run_dispatched(&mut self) -> Result<usize> {
        self.dispatcher.run_pending(&mut self.tree)
    }

    /// Marks a node for a full layout and repaint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`](trellis_core::Error::WrongThread) off
    /// the UI thread when thread checks are enabled, or
    /// [`Error::StaleNode`](trellis_core::Error::StaleNode).
    pub fn invalidate(&mut self, node: NodeId) -> Result<()> {
        self.check_thread()?;
        self.tree.invalidate(node)
    }

    /// Returns `true` if any node has pending work.
    #[must_use]
    pub fn has_invalidated_nodes(&self) -> bool {
        self.tree.has_invalidated_nodes()
    }

    /// Runs both measurement passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`](trellis_core::Error::WrongThread) off
    /// the UI thread when thread checks are enabled, or any measurement
    /// error.
    pub fn measure(&mut self) -> Result<&MeasureReport> {
        self.prepare(true)
    }

    /// Runs the area pass, preceded by the size pass when `all_passes` is
    /// set.
    ///
    /// # Errors
    ///
    /// See [`measure`](Self::measure).
    pub fn prepare(&mut self, all_passes: bool) -> Result<&MeasureReport> {
        self.check_thread()?;
        self.measure
            .prepare_into(&mut self.tree, all_passes, &mut self.report)?;
        Ok(&self.report)
    }

    /// Draws the dirty nodes of a measured tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`](trellis_core::Error::WrongThread) off
    /// the UI thread when thread checks are enabled, or any error of
    /// [`RenderProvider::render`].
    pub fn render(&mut self, root: NodeId, engine: &mut dyn RenderingEngine) -> Result<FrameReport> {
        self.check_thread()?;
        self.render.render(&mut self.tree, root, engine)
    }

    /// Runs one full frame: dispatched jobs, both measurement passes, then
    /// rendering, reporting each phase to `tracer`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any phase. The frame counter only advances
    /// on success.
    pub fn frame(
        &mut self,
        root: NodeId,
        engine: &mut dyn RenderingEngine,
        tracer: &mut Tracer<'_>,
    ) -> Result<FrameReport> {
        self.check_thread()?;
        let frame_index = self.frame_index;

        let begin = FrameBeginEvent {
            frame_index,
            now: self.clock.now(),
            dirty_nodes: u32::try_from(self.tree.invalidator().len()).unwrap_or(u32::MAX),
            tree_depth: self.tree.invalidator().tree_depth(),
        };
        tracer.frame_begin(&begin);
        let mut summary = FrameSummaryBuilder::new(&begin);

        self.begin_phase(tracer, &mut summary, PhaseKind::Dispatch);
        self.dispatcher.run_pending(&mut self.tree)?;
        self.end_phase(tracer, &mut summary, PhaseKind::Dispatch);

        self.report.clear();
        self.begin_phase(tracer, &mut summary, PhaseKind::SizePass);
        self.measure
            .recompute_wrap_sizes(&mut self.tree, &mut self.report)?;
        self.end_phase(tracer, &mut summary, PhaseKind::SizePass);

        self.begin_phase(tracer, &mut summary, PhaseKind::AreaPass);
        self.measure
            .recompute_drawing_areas(&mut self.tree, &mut self.report)?;
        self.end_phase(tracer, &mut summary, PhaseKind::AreaPass);
        tracer.measure(&MeasureEvent::new(frame_index, &self.report));

        #[cfg(feature = "trace-rich")]
        {
            use trellis_core::trace::{NodeChange, NodeField};
            let changes: Vec<NodeChange> = self
                .report
                .resized
                .iter()
                .map(|id| (id, NodeField::Size))
                .chain(self.report.moved.iter().map(|id| (id, NodeField::Area)))
                .map(|(id, field)| NodeChange {
                    node_index: id.index(),
                    field,
                })
                .collect();
            if !changes.is_empty() {
                tracer.node_changes(frame_index, &changes);
            }
        }

        self.begin_phase(tracer, &mut summary, PhaseKind::Render);
        let report = self.render.render(&mut self.tree, root, engine)?;
        self.end_phase(tracer, &mut summary, PhaseKind::Render);
        tracer.render(&report.event(frame_index));

        #[cfg(feature = "trace-rich")]
        if let crate::damage::DamageRegion::Rects(rects) = &report.damage {
            let rects: Vec<_> = rects
                .iter()
                .map(|r| trellis_core::trace::DamageRect::from_rect(*r))
                .collect();
            tracer.damage_rects(frame_index, &rects);
        }

        summary.set_idle(report.is_idle());
        tracer.frame_summary(&summary.finish());
        self.frame_index += 1;
        Ok(report)
    }

    /// Drops all pending work and forgets what was drawn.
    pub fn reset(&mut self) {
        self.tree.invalidator_mut().reset(false);
        self.render.reset();
        self.report.clear();
    }

    /// Tears the pipeline down, shutting the engine down with it.
    pub fn shutdown(self, engine: &mut dyn RenderingEngine) {
        tracing::debug!(frames = self.frame_index, "pipeline shut down");
        engine.shutdown();
    }

    fn check_thread(&self) -> Result<()> {
        if self.config.enforce_ui_thread {
            self.dispatcher.ensure_ui_thread()
        } else {
            Ok(())
        }
    }

    fn begin_phase(&self, tracer: &mut Tracer<'_>, summary: &mut FrameSummaryBuilder, phase: PhaseKind) {
        let timestamp = self.clock.now();
        summary.phase_begin(phase, timestamp);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn end_phase(&self, tracer: &mut Tracer<'_>, summary: &mut FrameSummaryBuilder, phase: PhaseKind) {
        let timestamp = self.clock.now();
        summary.phase_end(phase, timestamp);
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }
}
