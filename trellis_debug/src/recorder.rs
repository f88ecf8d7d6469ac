// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Rich events ([`on_node_changes`](TraceSink::on_node_changes),
//! [`on_damage_rects`](TraceSink::on_damage_rects)) store only the count.

use trellis_core::time::HostTime;
use trellis_core::trace::{
    DamageRect, FrameBeginEvent, FrameSummary, MeasureEvent, NodeChange, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RenderEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_MEASURE: u8 = 4;
const TAG_RENDER: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;
const TAG_NODE_CHANGES_COUNT: u8 = 7;
const TAG_DAMAGE_RECTS_COUNT: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, len: usize) {
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Dispatch => 0,
            PhaseKind::SizePass => 1,
            PhaseKind::AreaPass => 2,
            PhaseKind::Render => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.nanos());
        self.write_u32(e.dirty_nodes);
        self.write_u32(e.tree_depth);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_measure(&mut self, e: &MeasureEvent) {
        self.write_u8(TAG_MEASURE);
        self.write_u64(e.frame_index);
        self.write_u32(e.sizes_recomputed);
        self.write_u32(e.areas_recomputed);
        self.write_u32(e.resized);
        self.write_u32(e.moved);
    }

    fn on_render(&mut self, e: &RenderEvent) {
        self.write_u8(TAG_RENDER);
        self.write_u64(e.frame_index);
        self.write_u32(e.drawn);
        self.write_u32(e.skipped);
        self.write_u32(e.deferred);
        self.write_u32(e.damage_rects);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.now.nanos());
        self.write_u32(s.dirty_nodes);
        self.write_u64(s.dispatch_nanos);
        self.write_u64(s.size_nanos);
        self.write_u64(s.area_nanos);
        self.write_u64(s.render_nanos);
        self.write_u8(u8::from(s.idle));
    }

    fn on_node_changes(&mut self, frame_index: u64, changes: &[NodeChange]) {
        self.write_u8(TAG_NODE_CHANGES_COUNT);
        self.write_u64(frame_index);
        self.write_count(changes.len());
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(frame_index);
        self.write_count(rects.len());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`MeasureEvent`].
    Measure(MeasureEvent),
    /// A [`RenderEvent`].
    Render(RenderEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Node-change count for a frame.
    NodeChangesCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of node changes.
        count: u32,
    },
    /// Damage-rect count for a frame.
    DamageRectsCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of damage rects.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Dispatch,
            1 => PhaseKind::SizePass,
            2 => PhaseKind::AreaPass,
            _ => PhaseKind::Render,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
            dirty_nodes: self.read_u32()?,
            tree_depth: self.read_u32()?,
        }))
    }

    fn decode_phase(&mut self, begin: bool) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let phase = self.read_phase()?;
        let timestamp = self.read_time()?;
        Some(if begin {
            RecordedEvent::PhaseBegin(PhaseBeginEvent {
                frame_index,
                phase,
                timestamp,
            })
        } else {
            RecordedEvent::PhaseEnd(PhaseEndEvent {
                frame_index,
                phase,
                timestamp,
            })
        })
    }

    fn decode_measure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Measure(MeasureEvent {
            frame_index: self.read_u64()?,
            sizes_recomputed: self.read_u32()?,
            areas_recomputed: self.read_u32()?,
            resized: self.read_u32()?,
            moved: self.read_u32()?,
        }))
    }

    fn decode_render(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Render(RenderEvent {
            frame_index: self.read_u64()?,
            drawn: self.read_u32()?,
            skipped: self.read_u32()?,
            deferred: self.read_u32()?,
            damage_rects: self.read_u32()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
            dirty_nodes: self.read_u32()?,
            dispatch_nanos: self.read_u64()?,
            size_nanos: self.read_u64()?,
            area_nanos: self.read_u64()?,
            render_nanos: self.read_u64()?,
            idle: self.read_u8()? != 0,
        }))
    }

    fn decode_count(&mut self) -> Option<(u64, u32)> {
        Some((self.read_u64()?, self.read_u32()?))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase(true),
            TAG_PHASE_END => self.decode_phase(false),
            TAG_MEASURE => self.decode_measure(),
            TAG_RENDER => self.decode_render(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_NODE_CHANGES_COUNT => self
                .decode_count()
                .map(|(frame_index, count)| RecordedEvent::NodeChangesCount { frame_index, count }),
            TAG_DAMAGE_RECTS_COUNT => self
                .decode_count()
                .map(|(frame_index, count)| RecordedEvent::DamageRectsCount { frame_index, count }),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
