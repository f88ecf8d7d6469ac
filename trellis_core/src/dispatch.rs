// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UI-thread affinity and cross-thread work hand-off.
//!
//! The node tree, the measure provider and the render provider are all
//! single-threaded and are owned by one *UI thread*. Other threads never
//! touch them directly: they schedule closures through a [`DispatchHandle`],
//! and the UI thread runs those closures against its context (typically the
//! [`NodeTree`](crate::node::NodeTree)) at the start of the next frame.
//!
//! ```text
//!   worker thread                         UI thread
//!   ─────────────                         ─────────
//!   handle.schedule(|tree| ..) ──mpsc──►  dispatcher.run_pending(&mut tree)
//!                                         measure ─► render
//! ```

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, ThreadId};

use crate::error::{Error, Result};

/// A unit of work shipped to the UI thread.
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Knows which thread is the UI thread.
pub trait Dispatcher {
    /// Returns `true` when called on the UI thread.
    fn is_ui_thread(&self) -> bool;

    /// Fails with [`Error::WrongThread`] off the UI thread.
    ///
    /// # Errors
    ///
    /// See above.
    fn ensure_ui_thread(&self) -> Result<()> {
        if self.is_ui_thread() {
            Ok(())
        } else {
            Err(Error::WrongThread)
        }
    }
}

/// The UI-thread side of the hand-off, bound to the thread that created it.
pub struct UiDispatcher<C> {
    owner: ThreadId,
    sender: Sender<Task<C>>,
    receiver: Receiver<Task<C>>,
}

impl<C> core::fmt::Debug for UiDispatcher<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<C> Default for UiDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> UiDispatcher<C> {
    /// Creates a dispatcher owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            owner: thread::current().id(),
            sender,
            receiver,
        }
    }

    /// Returns a handle that other threads use to schedule work.
    #[must_use]
    pub fn handle(&self) -> DispatchHandle<C> {
        DispatchHandle {
            owner: self.owner,
            sender: self.sender.clone(),
        }
    }

    /// Runs every task scheduled so far against `context`, in scheduling
    /// order, and returns how many ran.
    ///
    /// Tasks scheduled by the tasks themselves run in the same call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongThread`] off the UI thread; nothing runs.
    pub fn run_pending(&self, context: &mut C) -> Result<usize> {
        self.ensure_ui_thread()?;
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(context);
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "ran dispatched tasks");
        }
        Ok(ran)
    }
}

impl<C> Dispatcher for UiDispatcher<C> {
    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

/// A cloneable, `Send` handle for scheduling work on the UI thread.
pub struct DispatchHandle<C> {
    owner: ThreadId,
    sender: Sender<Task<C>>,
}

impl<C> Clone for DispatchHandle<C> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            sender: self.sender.clone(),
        }
    }
}

impl<C> core::fmt::Debug for DispatchHandle<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<C> DispatchHandle<C> {
    /// Queues `task` for the UI thread.
    ///
    /// Returns `false`, and drops the task, if the dispatcher is gone.
    pub fn schedule(&self, task: impl FnOnce(&mut C) + Send + 'static) -> bool {
        if self.sender.send(Box::new(task)).is_ok() {
            true
        } else {
            tracing::warn!("dispatcher dropped; task discarded");
            false
        }
    }
}

impl<C> Dispatcher for DispatchHandle<C> {
    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}
