// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.
//!
//! All iterators walk the sibling links in place and never allocate.

use super::id::{INVALID, NodeId};
use super::store::NodeTree;

/// An iterator over the direct children of a node, in sibling order.
///
/// Created by [`NodeTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a NodeTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a NodeTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// An iterator over the strict ancestors of a node, nearest first.
///
/// Created by [`NodeTree::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a NodeTree,
    current: u32,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(tree: &'a NodeTree, start: u32) -> Self {
        Self {
            tree,
            current: tree.parent[start as usize],
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.parent[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// A depth-first pre-order iterator over a node and all its descendants.
///
/// Created by [`NodeTree::descendants`]. The starting node is yielded first.
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a NodeTree,
    root: u32,
    next: u32,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(tree: &'a NodeTree, root: u32) -> Self {
        Self {
            tree,
            root,
            next: root,
        }
    }

    fn advance(&self, idx: u32) -> u32 {
        let tree = self.tree;
        let first = tree.first_child[idx as usize];
        if first != INVALID {
            return first;
        }
        let mut cur = idx;
        while cur != self.root {
            let sibling = tree.next_sibling[cur as usize];
            if sibling != INVALID {
                return sibling;
            }
            cur = tree.parent[cur as usize];
        }
        INVALID
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next == INVALID {
            return None;
        }
        let idx = self.next;
        self.next = self.advance(idx);
        Some(self.tree.id_at(idx))
    }
}
