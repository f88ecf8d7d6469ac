// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end frames through the [`Pipeline`].

use std::cell::Cell;
use std::rc::Rc;

use trellis_core::backend::{PaintContext, Paintable};
use trellis_core::color::Color;
use trellis_core::element::{Block, Panel, StackPanel};
use trellis_core::kurbo::{Rect, Size};
use trellis_core::layout::{Measurable, Stack};
use trellis_core::node::{LayoutProps, NodeId};
use trellis_core::trace::Tracer;
use trellis_core::Error;
use trellis_render::{EngineCall, Pipeline, RecordingEngine};

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);

fn frame(pipeline: &mut Pipeline, root: NodeId, engine: &mut RecordingEngine) -> trellis_render::FrameReport {
    pipeline.frame(root, engine, &mut Tracer::none()).unwrap()
}

#[test]
fn resize_moves_centered_child() {
    let mut pipeline = Pipeline::new();
    let tree = pipeline.tree_mut();
    let root = tree.create_node(Panel::new(Color::WHITE), LayoutProps::fixed(100.0, 100.0));
    let child = tree
        .create_child(root, Block::new(Size::new(20.0, 20.0)), LayoutProps::centered())
        .unwrap();

    let mut engine = RecordingEngine::new();
    frame(&mut pipeline, root, &mut engine);
    assert_eq!(pipeline.tree().drawing_area(child), Rect::new(40.0, 40.0, 60.0, 60.0));

    pipeline
        .tree_mut()
        .set_props(root, LayoutProps::fixed(200.0, 200.0))
        .unwrap();
    let report = frame(&mut pipeline, root, &mut engine);
    assert_eq!(pipeline.tree().drawing_area(child), Rect::new(90.0, 90.0, 110.0, 110.0));
    assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root, child]);
    assert_eq!(pipeline.frame_index(), 2);
}

#[test]
fn idle_frames_make_no_engine_calls() {
    let mut pipeline = Pipeline::new();
    let root = pipeline
        .tree_mut()
        .create_node(Block::new(Size::new(10.0, 10.0)), LayoutProps::AUTO);
    let mut engine = RecordingEngine::new();
    frame(&mut pipeline, root, &mut engine);
    assert_eq!(engine.frames(), 1);
    engine.take_calls();

    let report = frame(&mut pipeline, root, &mut engine);
    assert!(report.is_idle());
    assert!(engine.calls().is_empty());
    assert_eq!(engine.frames(), 1);
}

#[test]
fn draw_order_is_level_then_sibling_order() {
    let mut pipeline = Pipeline::new();
    let tree = pipeline.tree_mut();
    let root = tree.create_node(StackPanel::new(Stack::horizontal(0.0)), LayoutProps::AUTO);
    let a = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
    let b = tree.create_child(root, Panel::default(), LayoutProps::AUTO).unwrap();
    let a1 = tree
        .create_child(a, Block::new(Size::new(5.0, 5.0)), LayoutProps::AUTO)
        .unwrap();
    let b1 = tree
        .create_child(b, Block::new(Size::new(5.0, 5.0)), LayoutProps::AUTO)
        .unwrap();

    let mut engine = RecordingEngine::new();
    let report = frame(&mut pipeline, root, &mut engine);
    let order: Vec<_> = report.plan.items.iter().map(|item| item.node).collect();
    assert_eq!(order, vec![root, a, b, a1, b1]);
    let levels: Vec<_> = report.plan.items.iter().map(|item| item.level).collect();
    assert_eq!(levels, vec![0, 1, 1, 2, 2]);
}

#[test]
fn hidden_subtrees_are_not_drawn() {
    let mut pipeline = Pipeline::new();
    let tree = pipeline.tree_mut();
    let root = tree.create_node(Panel::default(), LayoutProps::fixed(50.0, 50.0));
    let shown = tree
        .create_child(root, Block::new(Size::new(10.0, 10.0)).with_color(RED), LayoutProps::AUTO)
        .unwrap();
    let hidden = tree.create_child(root, Panel::new(BLUE), LayoutProps::AUTO).unwrap();
    tree.create_child(hidden, Block::new(Size::new(10.0, 10.0)).with_color(BLUE), LayoutProps::AUTO)
        .unwrap();
    tree.set_hidden(hidden, true).unwrap();

    let mut engine = RecordingEngine::new();
    let report = frame(&mut pipeline, root, &mut engine);
    assert_eq!(report.plan.drawn().collect::<Vec<_>>(), vec![root, shown]);
    assert_eq!(report.skipped, 2);
    assert!(engine.fills().all(|(_, color)| color != BLUE));
    assert!(!pipeline.has_invalidated_nodes());
}

#[test]
fn render_before_measure_is_rejected() {
    let mut pipeline = Pipeline::new();
    let root = pipeline
        .tree_mut()
        .create_node(Block::new(Size::new(10.0, 10.0)), LayoutProps::AUTO);
    let mut engine = RecordingEngine::new();

    assert_eq!(pipeline.render(root, &mut engine).unwrap_err(), Error::MeasurePending);
    assert!(engine.calls().is_empty());

    // The area pass alone does not clear size work.
    pipeline.prepare(false).unwrap();
    assert_eq!(pipeline.render(root, &mut engine).unwrap_err(), Error::MeasurePending);

    pipeline.measure().unwrap();
    let report = pipeline.render(root, &mut engine).unwrap();
    assert_eq!(report.drawn, 1);
}

/// Draws a counter and asks to be drawn again until it reaches a limit.
#[derive(Debug)]
struct Ticker {
    painted: Rc<Cell<u32>>,
    limit: u32,
}

impl Measurable for Ticker {
    fn intrinsic_size(&self, _: &[Size]) -> Size {
        Size::new(4.0, 4.0)
    }
}

impl Paintable for Ticker {
    fn paint(&self, cx: &mut PaintContext<'_>) {
        let n = self.painted.get() + 1;
        self.painted.set(n);
        cx.fill(RED);
        if n < self.limit {
            cx.request_repaint(cx.node());
        }
    }
}

#[test]
fn repaint_requests_land_in_the_next_frame() {
    let painted = Rc::new(Cell::new(0));
    let mut pipeline = Pipeline::new();
    let root = pipeline.tree_mut().create_node(
        Ticker {
            painted: Rc::clone(&painted),
            limit: 3,
        },
        LayoutProps::AUTO,
    );

    let mut engine = RecordingEngine::new();
    let report = frame(&mut pipeline, root, &mut engine);
    assert_eq!(painted.get(), 1);
    assert_eq!(report.deferred, 1);
    assert!(pipeline.has_invalidated_nodes());

    frame(&mut pipeline, root, &mut engine);
    assert_eq!(painted.get(), 2);
    let report = frame(&mut pipeline, root, &mut engine);
    assert_eq!(painted.get(), 3);
    assert_eq!(report.deferred, 0);
    assert!(!pipeline.has_invalidated_nodes());

    frame(&mut pipeline, root, &mut engine);
    assert_eq!(painted.get(), 3);
}

#[test]
fn other_threads_mutate_through_the_dispatcher() {
    let mut pipeline = Pipeline::new();
    let root = pipeline
        .tree_mut()
        .create_node(Panel::default(), LayoutProps::fixed(30.0, 30.0));
    let mut engine = RecordingEngine::new();
    frame(&mut pipeline, root, &mut engine);

    let handle = pipeline.dispatch_handle();
    std::thread::spawn(move || {
        handle.schedule(move |tree| {
            tree.set_props(root, LayoutProps::fixed(60.0, 40.0)).unwrap();
        });
    })
    .join()
    .unwrap();

    frame(&mut pipeline, root, &mut engine);
    assert_eq!(pipeline.tree().drawing_area(root), Rect::new(0.0, 0.0, 60.0, 40.0));
}

#[test]
fn shutdown_reaches_the_engine() {
    let pipeline = Pipeline::new();
    let mut engine = RecordingEngine::new();
    pipeline.shutdown(&mut engine);
    assert_eq!(engine.calls(), &[EngineCall::Shutdown]);
}
