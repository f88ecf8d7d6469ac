// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree, invalidation tracking and incremental measurement for
//! retained-mode user interfaces.
//!
//! `trellis_core` keeps a tree of visual nodes and recomputes only what a
//! change actually affects. Nodes are stored in struct-of-arrays layout with
//! generational index handles.
//!
//! # Architecture
//!
//! Mutations record work in a level-indexed invalidator; each frame drains it
//! in two measurement passes before the render scheduler (in
//! `trellis_render`) draws whatever is left:
//!
//! ```text
//!   NodeTree::set_props / add_child / ...
//!       │  marks SIZE | AREA | ARRANGE | PAINT
//!       ▼
//!   Invalidator (level → node → flags, two generations)
//!       │
//!       ▼
//!   MeasureProvider::measure()
//!       ├─ size pass: deepest level ─► level 0 (wrap sizes)
//!       └─ area pass: level 0 ─► deepest level (drawing areas, clips)
//!       │
//!       ▼
//!   RenderProvider::render() ──► RenderingEngine
//! ```
//!
//! **[`node`]**: Struct-of-arrays node tree with generational handles.
//! Props and flags are set by the caller; wrap sizes, slots, drawing areas
//! and clips are computed by measurement.
//!
//! **[`invalidate`]**: [`Dirty`](invalidate::Dirty) flags and the
//! [`Invalidator`](invalidate::Invalidator) registry that the passes drain.
//!
//! **[`measure`]**: The two-pass [`MeasureProvider`](measure::MeasureProvider).
//!
//! **[`layout`]**: The [`Measurable`](layout::Measurable) layout-strategy
//! contract and the geometry helpers both passes use.
//!
//! **[`backend`]**: The [`RenderingEngine`](backend::RenderingEngine) and
//! [`Paintable`](backend::Paintable) contracts.
//!
//! **[`element`]**: The [`Element`](element::Element) bound every node's
//! element satisfies, plus stock elements.
//!
//! **[`dispatch`]**: UI-thread checks and cross-thread task hand-off.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   change and damage-rect events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod color;
pub mod config;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod invalidate;
pub mod layout;
pub mod measure;
pub mod node;
pub mod queue;
pub mod time;
pub mod trace;

pub use error::{Error, Result};
pub use kurbo;
