// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial damage tracking for partial re-rendering.

use kurbo::Rect;

/// A region of the render target that changed in a frame.
///
/// Engines that keep the previous frame around can use this to present only
/// the areas that were redrawn or uncovered.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// The entire target needs presenting.
    #[default]
    Full,
    /// A list of axis-aligned rectangles in target coordinates.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame can be reused.
    None,
}

impl DamageRegion {
    /// Returns `true` if no region needs presenting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Adds one rectangle. Empty rectangles are ignored.
    pub fn add_rect(&mut self, rect: Rect) {
        if rect.area() <= 0.0 {
            return;
        }
        match self {
            Self::Full => {}
            Self::Rects(rects) => {
                if rects.iter().any(|r| r.union(rect) == *r) {
                    return;
                }
                rects.retain(|r| rect.union(*r) != rect);
                rects.push(rect);
            }
            Self::None => *self = Self::Rects(vec![rect]),
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::None) => {}
            (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (Self::Rects(_), Self::Rects(b)) => {
                for &rect in b {
                    self.add_rect(rect);
                }
            }
        }
    }

    /// The smallest rectangle covering the region, or `None` for
    /// [`DamageRegion::Full`] and [`DamageRegion::None`].
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Rects(rects) => rects.iter().copied().reduce(|a, b| a.union(b)),
            Self::Full | Self::None => None,
        }
    }

    /// Number of rectangles; a full region counts as one.
    #[must_use]
    pub fn rect_count(&self) -> usize {
        match self {
            Self::Full => 1,
            Self::Rects(rects) => rects.len(),
            Self::None => 0,
        }
    }
}
