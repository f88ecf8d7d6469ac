// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node layout properties.

use kurbo::{Insets, Point};

/// A size constraint along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Length {
    /// Use the element's intrinsic extent.
    #[default]
    Auto,
    /// A fixed extent in logical pixels.
    Fixed(f64),
}

/// How a node is placed inside its slot along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    /// Leading edge (left or top).
    #[default]
    Start,
    /// Centered.
    Center,
    /// Trailing edge (right or bottom).
    End,
    /// Fill the slot. Only applies when the length on that axis is
    /// [`Length::Auto`]; fixed lengths are placed at the leading edge.
    Stretch,
}

/// Where a node sits inside its slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Position {
    /// Placed by [`Align`].
    #[default]
    Auto,
    /// Offset from the top-left of the slot (after margins), ignoring
    /// alignment.
    Fixed(Point),
}

/// Per-node boolean flags.
///
/// Setting [`hidden`](Self::hidden) collapses the node to zero size and
/// suppresses painting for it and its entire subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Whether the node (and its subtree) is hidden.
    pub hidden: bool,
}

/// Layout inputs owned by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutProps {
    /// Horizontal extent.
    pub width: Length,
    /// Vertical extent.
    pub height: Length,
    /// Horizontal placement.
    pub h_align: Align,
    /// Vertical placement.
    pub v_align: Align,
    /// Space reserved around the node inside its slot.
    pub margin: Insets,
    /// Explicit placement, overriding alignment.
    pub position: Position,
}

impl LayoutProps {
    /// Auto size, top-left aligned, no margin.
    pub const AUTO: Self = Self {
        width: Length::Auto,
        height: Length::Auto,
        h_align: Align::Start,
        v_align: Align::Start,
        margin: Insets::ZERO,
        position: Position::Auto,
    };

    /// Fixed width and height.
    #[must_use]
    pub const fn fixed(width: f64, height: f64) -> Self {
        Self {
            width: Length::Fixed(width),
            height: Length::Fixed(height),
            ..Self::AUTO
        }
    }

    /// Auto size, centered on both axes.
    #[must_use]
    pub const fn centered() -> Self {
        Self::AUTO.with_align(Align::Center, Align::Center)
    }

    /// Returns a copy with the given alignment.
    #[must_use]
    pub const fn with_align(mut self, h_align: Align, v_align: Align) -> Self {
        self.h_align = h_align;
        self.v_align = v_align;
        self
    }

    /// Returns a copy with the given margin.
    #[must_use]
    pub const fn with_margin(mut self, margin: Insets) -> Self {
        self.margin = margin;
        self
    }

    /// Returns a copy with a fixed position.
    #[must_use]
    pub const fn at(mut self, origin: Point) -> Self {
        self.position = Position::Fixed(origin);
        self
    }

    /// Returns `true` if switching from `self` to `other` can change the
    /// node's wrap size.
    #[must_use]
    pub fn size_differs(&self, other: &Self) -> bool {
        self.width != other.width || self.height != other.height
    }

    /// Returns `true` if switching from `self` to `other` changes what the
    /// parent reserves for this node.
    #[must_use]
    pub fn margin_differs(&self, other: &Self) -> bool {
        self.margin != other.margin
    }

    /// Returns `true` if switching from `self` to `other` only moves the node
    /// within its slot.
    #[must_use]
    pub fn placement_differs(&self, other: &Self) -> bool {
        self.h_align != other.h_align
            || self.v_align != other.v_align
            || self.position != other.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_classification() {
        let base = LayoutProps::fixed(10.0, 10.0);
        let moved = base.at(Point::new(5.0, 5.0));
        assert!(base.placement_differs(&moved));
        assert!(!base.size_differs(&moved));

        let resized = LayoutProps::fixed(20.0, 10.0);
        assert!(base.size_differs(&resized));
        assert!(!base.placement_differs(&resized));

        let spaced = base.with_margin(Insets::uniform(2.0));
        assert!(base.margin_differs(&spaced));
        assert!(!base.size_differs(&spaced));
    }

    #[test]
    fn default_is_auto() {
        assert_eq!(LayoutProps::default(), LayoutProps::AUTO);
    }
}
