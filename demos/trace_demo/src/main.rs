// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless frame loop that exercises the tracing and diagnostics pipeline.
//!
//! Builds a small column of blocks, mutates it over 30 frames (growing
//! blocks, hiding one, resizing the root from a worker thread) and renders
//! each frame into a [`RecordingEngine`]. Events go to both a
//! [`PrettyPrintSink`] and a [`RecorderSink`]; the recording is exported as
//! Chrome trace JSON and the final tree is dumped to stdout.

use std::fs::File;
use std::io::BufWriter;

use trellis_core::color::Color;
use trellis_core::element::{Block, Panel, StackPanel};
use trellis_core::kurbo::Size;
use trellis_core::layout::Stack;
use trellis_core::node::{LayoutProps, NodeId};
use trellis_core::trace::{
    DamageRect, FrameBeginEvent, FrameSummary, MeasureEvent, NodeChange, PhaseBeginEvent,
    PhaseEndEvent, RenderEvent, TraceSink, Tracer,
};
use trellis_debug::pretty::PrettyPrintSink;
use trellis_debug::recorder::RecorderSink;
use trellis_render::{Pipeline, RecordingEngine};

const FRAME_COUNT: u32 = 30;

const PALETTE: [Color; 4] = [
    Color::rgb(242, 67, 54),
    Color::rgb(77, 176, 80),
    Color::rgb(33, 150, 243),
    Color::rgb(255, 194, 8),
];

/// Forwards every event to two sinks.
struct Both<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl TraceSink for Both<'_> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.pretty.on_frame_begin(e);
        self.recorder.on_frame_begin(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_measure(&mut self, e: &MeasureEvent) {
        self.pretty.on_measure(e);
        self.recorder.on_measure(e);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.pretty.on_render(e);
        self.recorder.on_render(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.pretty.on_frame_summary(s);
        self.recorder.on_frame_summary(s);
    }

    fn on_node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        self.pretty.on_node_changes(frame_index, changes);
        self.recorder.on_node_changes(frame_index, changes);
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.pretty.on_damage_rects(frame_index, rects);
        self.recorder.on_damage_rects(frame_index, rects);
    }
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- tree --------------------------------------------------------------
    let mut pipeline = Pipeline::new();
    let tree = pipeline.tree_mut();
    let root = tree.create_node(Panel::new(Color::WHITE), LayoutProps::fixed(320.0, 240.0));
    let column = tree
        .create_child(root, StackPanel::new(Stack::vertical(4.0)), LayoutProps::centered())
        .expect("root is alive");
    let blocks: Vec<NodeId> = PALETTE
        .iter()
        .map(|&color| {
            tree.create_child(
                column,
                Block::new(Size::new(40.0, 20.0)).with_color(color),
                LayoutProps::AUTO,
            )
            .expect("column is alive")
        })
        .collect();

    let mut engine = RecordingEngine::new();

    // -- frames ------------------------------------------------------------
    for step in 0..FRAME_COUNT {
        if step % 5 == 4 {
            let which = (step / 5) as usize % blocks.len();
            let grow = 40.0 + 4.0 * f64::from(step);
            pipeline
                .tree_mut()
                .update_element(
                    blocks[which],
                    Block::new(Size::new(grow, 20.0)).with_color(PALETTE[which]),
                )
                .expect("block is alive");
        }
        if step == 12 {
            pipeline
                .tree_mut()
                .set_hidden(blocks[1], true)
                .expect("block is alive");
        }
        if step == 20 {
            let handle = pipeline.dispatch_handle();
            std::thread::spawn(move || {
                handle.schedule(move |tree| {
                    if let Err(err) = tree.set_props(root, LayoutProps::fixed(400.0, 300.0)) {
                        eprintln!("resize failed: {err}");
                    }
                });
            })
            .join()
            .expect("worker thread panicked");
        }

        let mut sink = Both {
            pretty: &mut pretty,
            recorder: &mut recorder,
        };
        let mut tracer = Tracer::new(&mut sink);
        pipeline
            .frame(root, &mut engine, &mut tracer)
            .expect("frame failed");
    }

    println!("{}", trellis_debug::dump::dump_tree(pipeline.tree()));
    println!(
        "{} engine frames, {} fills",
        engine.frames(),
        engine.fills().count()
    );
    pipeline.shutdown(&mut engine);

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    trellis_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}
