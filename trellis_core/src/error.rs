// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for tree mutation, measurement and rendering.

use std::result::Result as StdResult;

use thiserror::Error;

use crate::node::NodeId;

/// Result type for trellis operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
///
/// Everything except [`Error::EmptyQueue`] is a precondition violation or an
/// engine bug. Those are not retried: the caller is expected to abort the
/// frame and surface the failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A [`UniqueQueue`](crate::queue::UniqueQueue) was dequeued or peeked
    /// while empty.
    #[error("queue is empty")]
    EmptyQueue,

    /// The handle refers to a node that has been destroyed.
    #[error("stale node handle: {0:?}")]
    StaleNode(NodeId),

    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// The prospective parent.
        parent: NodeId,
        /// The node being attached.
        child: NodeId,
    },

    /// The node already has a parent; detach it first.
    #[error("{0:?} already has a parent")]
    AlreadyAttached(NodeId),

    /// The operation needs an attached node.
    #[error("{0:?} has no parent")]
    NotAttached(NodeId),

    /// A UI-thread-only operation was called from another thread.
    #[error("called off the UI thread")]
    WrongThread,

    /// Rendering was requested while size or area recomputation is pending.
    #[error("render requested with measurement pending")]
    MeasurePending,

    /// A node's level disagrees with its parent's.
    #[error("level mismatch at {node:?}: expected {expected}, found {found}")]
    LevelMismatch {
        /// The offending node.
        node: NodeId,
        /// `parent.level + 1`.
        expected: u32,
        /// The stored level.
        found: u32,
    },
}

impl Error {
    /// Returns `true` for precondition violations and engine bugs.
    ///
    /// Fatal errors leave the frame in an unspecified state; the next
    /// invalidation starts a fresh measure/render cycle.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::EmptyQueue)
    }
}
