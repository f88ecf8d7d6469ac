// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dumps of a [`NodeTree`].

use std::fmt::{self, Write};

use trellis_core::kurbo::Rect;
use trellis_core::node::{NodeId, NodeTree};

/// Renders every root and its subtree, one node per line.
///
/// Each line shows the node's level, wrap size, drawing area and clip,
/// followed by `hidden` when the node is effectively hidden and its pending
/// dirty flags, if any. Children are indented two spaces under their parent.
#[must_use]
pub fn dump_tree(tree: &NodeTree) -> String {
    let mut out = String::new();
    for root in tree.roots() {
        // Writing into a String cannot fail.
        let _ = write_subtree(tree, root, &mut out);
    }
    out
}

/// Writes `root` and its descendants to `out`.
///
/// # Errors
///
/// Returns any error from `out`.
///
/// # Panics
///
/// Panics if `root` is stale.
pub fn write_subtree(tree: &NodeTree, root: NodeId, out: &mut dyn Write) -> fmt::Result {
    let base = tree.level(root);
    for id in tree.descendants(root) {
        let depth = tree.level(id).saturating_sub(base) as usize;
        let size = tree.wrap_size(id);
        write!(
            out,
            "{:indent$}{id:?} L{} size={}x{} area={} clip={}",
            "",
            tree.level(id),
            size.width,
            size.height,
            RectFmt(tree.drawing_area(id)),
            RectFmt(tree.clip_area(id)),
            indent = depth * 2,
        )?;
        if tree.is_effectively_hidden(id) {
            out.write_str(" hidden")?;
        }
        let dirty = tree.dirty(id);
        if !dirty.is_empty() {
            out.write_str(" dirty=")?;
            for (i, (name, _)) in dirty.iter_names().enumerate() {
                if i > 0 {
                    out.write_char('|')?;
                }
                out.write_str(name)?;
            }
        }
        out.write_char('\n')?;
    }
    Ok(())
}

struct RectFmt(Rect);

impl fmt::Display for RectFmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(f, "({},{},{},{})", r.x0, r.y0, r.x1, r.y1)
    }
}
