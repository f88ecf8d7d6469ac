// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render scheduling, damage tracking and the frame driver for trellis.
//!
//! This crate sits between [`trellis_core`]'s measured node tree and a
//! [`RenderingEngine`](trellis_core::backend::RenderingEngine). It defines:
//!
//! - [`RenderProvider`]: draws dirty nodes in draw order and finalizes the
//!   frame
//! - [`RenderPlan`] / [`RenderItem`]: the nodes a frame visited
//! - [`DamageRegion`]: spatial damage tracking for partial presentation
//! - [`Pipeline`]: owns the tree and runs dispatch, measure and render once
//!   per frame
//! - [`RecordingEngine`]: an engine that records calls, for tests and
//!   headless use
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables frame-loop instrumentation.
//! - `trace-rich` (disabled by default, implies `trace`): Reports per-node
//!   changes and damage rectangles from [`Pipeline::frame`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod damage;
mod pipeline;
mod plan;
mod provider;
mod recording;

pub use damage::DamageRegion;
pub use pipeline::Pipeline;
pub use plan::{RenderItem, RenderPlan};
pub use provider::{FrameReport, RenderProvider};
pub use recording::{EngineCall, RecordingEngine};
