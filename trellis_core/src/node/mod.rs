// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is one element of the visual tree. Each node has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes stale when
//!   the node is destroyed, so a recycled slot is never mistaken for the old
//!   node.
//! - Topology: parent, first-child and sibling links forming an ordered
//!   tree, plus a cached *level* (depth, roots are level 0).
//! - **Inputs** set by the caller: [`props`](NodeTree::set_props),
//!   [`flags`](NodeTree::set_hidden) and the
//!   [`element`](NodeTree::update_element) that measures, arranges and
//!   paints the node.
//! - **Outputs** produced by measurement: the wrap size, the slot assigned by
//!   the parent, the drawing area, the clip area and effective visibility.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Invalidation
//!
//! Every mutation records the work it causes in the tree's
//! [`Invalidator`](crate::invalidate::Invalidator), keyed by the node's
//! level:
//!
//! - Size-affecting changes mark [`LAYOUT`](crate::invalidate::Dirty::LAYOUT).
//! - Alignment and position changes mark
//!   [`PLACEMENT`](crate::invalidate::Dirty::PLACEMENT).
//! - Structural changes mark the parent for re-measuring and re-slotting its
//!   children, and the moved subtree for a full layout.

mod id;
mod props;
mod store;
mod traverse;

pub use id::{INVALID, NodeId};
pub use props::{Align, LayoutProps, Length, NodeFlags, Position};
pub use store::NodeTree;
pub use traverse::{Ancestors, Children, Descendants};
