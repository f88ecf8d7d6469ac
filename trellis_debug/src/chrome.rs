// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};
use trellis_core::time::{Duration, HostTime};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration slices; everything else becomes an instant event
/// at the most recent timestamp seen in the recording.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                last_us = us(e.now);
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "dirty_nodes": e.dirty_nodes,
                        "tree_depth": e.tree_depth,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_us = us(e.timestamp);
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_us = us(e.timestamp);
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Frame",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Measure(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Measure",
                    "cat": "Layout",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "sizes_recomputed": e.sizes_recomputed,
                        "areas_recomputed": e.areas_recomputed,
                        "resized": e.resized,
                        "moved": e.moved,
                    }
                }));
            }
            RecordedEvent::Render(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Render",
                    "cat": "Render",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "drawn": e.drawn,
                        "skipped": e.skipped,
                        "deferred": e.deferred,
                        "damage_rects": e.damage_rects,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": us(s.now),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "dirty_nodes": s.dirty_nodes,
                        "dispatch_us": Duration(s.dispatch_nanos).as_micros_f64(),
                        "size_us": Duration(s.size_nanos).as_micros_f64(),
                        "area_us": Duration(s.area_nanos).as_micros_f64(),
                        "render_us": Duration(s.render_nanos).as_micros_f64(),
                        "idle": s.idle,
                    }
                }));
            }
            RecordedEvent::NodeChangesCount { frame_index, count } => {
                events.push(rich_count("NodeChanges", last_us, frame_index, count));
            }
            RecordedEvent::DamageRectsCount { frame_index, count } => {
                events.push(rich_count("DamageRects", last_us, frame_index, count));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    Duration(t.nanos()).as_micros_f64()
}

fn rich_count(name: &str, ts: f64, frame_index: u64, count: u32) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": "Rich",
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "p",
        "args": {
            "frame_index": frame_index,
            "count": count,
        }
    })
}
