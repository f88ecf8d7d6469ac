// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A rendering engine that records calls instead of drawing.

use kurbo::Rect;
use trellis_core::backend::RenderingEngine;
use trellis_core::color::Color;

/// One call received by a [`RecordingEngine`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineCall {
    /// [`RenderingEngine::initialize_frame`].
    InitializeFrame(Color),
    /// [`RenderingEngine::set_clip`].
    SetClip(Rect),
    /// [`RenderingEngine::fill_rect`].
    FillRect(Rect, Color),
    /// [`RenderingEngine::finalize_frame`].
    FinalizeFrame,
    /// [`RenderingEngine::shutdown`].
    Shutdown,
}

/// Records every engine call, for tests and headless runs.
#[derive(Clone, Debug, Default)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    frames: u32,
}

impl RecordingEngine {
    /// Creates an engine with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far.
    #[must_use]
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Returns and clears the call log.
    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        core::mem::take(&mut self.calls)
    }

    /// Number of frames finalized.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// The fills recorded so far, in order.
    pub fn fills(&self) -> impl Iterator<Item = (Rect, Color)> + '_ {
        self.calls.iter().filter_map(|call| match *call {
            EngineCall::FillRect(rect, color) => Some((rect, color)),
            _ => None,
        })
    }
}

impl RenderingEngine for RecordingEngine {
    fn initialize_frame(&mut self, background: Color) {
        self.calls.push(EngineCall::InitializeFrame(background));
    }

    fn set_clip(&mut self, clip: Rect) {
        self.calls.push(EngineCall::SetClip(clip));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.calls.push(EngineCall::FillRect(rect, color));
    }

    fn finalize_frame(&mut self) {
        self.calls.push(EngineCall::FinalizeFrame);
        self.frames += 1;
    }

    fn shutdown(&mut self) {
        self.calls.push(EngineCall::Shutdown);
    }
}
