// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout-strategy contract and geometry helpers.
//!
//! Layout is split between the node's element and its props:
//!
//! - The element ([`Measurable`]) decides how big its content wants to be
//!   given its children's outer sizes, and how to split its own area into
//!   one slot per child.
//! - The props ([`LayoutProps`]) override the extent with fixed lengths and
//!   decide where the node sits inside the slot its parent gave it
//!   ([`place`]).
//!
//! Children are always passed as *outer* sizes: wrap size plus margins, or
//! zero for hidden children.

use kurbo::{Point, Rect, Size};

use crate::node::{Align, LayoutProps, Length, Position};

/// How a node sizes its content and slots its children.
///
/// Both methods must be pure functions of their arguments; the measurement
/// passes only call them for dirty nodes and cache the results.
pub trait Measurable {
    /// Returns the content size given the children's outer sizes, in child
    /// order.
    ///
    /// The default overlays all children and takes the largest extent on
    /// each axis.
    fn intrinsic_size(&self, children: &[Size]) -> Size {
        overlay_size(children)
    }

    /// Fills `slots` with one area per child, in child order, inside
    /// `content`.
    ///
    /// `slots` arrives empty. The default gives every child the whole content
    /// area.
    fn arrange(&self, content: Rect, children: &[Size], slots: &mut Vec<Rect>) {
        slots.extend(core::iter::repeat_n(content, children.len()));
    }
}

/// The largest width and largest height among `children`.
#[must_use]
pub fn overlay_size(children: &[Size]) -> Size {
    children.iter().fold(Size::ZERO, |acc, s| {
        Size::new(acc.width.max(s.width), acc.height.max(s.height))
    })
}

/// Layout direction of a [`Stack`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    #[default]
    Vertical,
}

impl Axis {
    fn main(self, size: Size) -> f64 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    fn cross(self, size: Size) -> f64 {
        match self {
            Self::Horizontal => size.height,
            Self::Vertical => size.width,
        }
    }

    fn pack(self, main: f64, cross: f64) -> Size {
        match self {
            Self::Horizontal => Size::new(main, cross),
            Self::Vertical => Size::new(cross, main),
        }
    }
}

/// Lays children out one after another along an axis.
///
/// Each child's slot spans the full cross extent of the content area, so
/// cross-axis alignment is up to the child's own props.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stack {
    /// Direction of the stack.
    pub axis: Axis,
    /// Gap between consecutive children.
    pub spacing: f64,
}

impl Stack {
    /// A vertical stack.
    #[must_use]
    pub const fn vertical(spacing: f64) -> Self {
        Self {
            axis: Axis::Vertical,
            spacing,
        }
    }

    /// A horizontal stack.
    #[must_use]
    pub const fn horizontal(spacing: f64) -> Self {
        Self {
            axis: Axis::Horizontal,
            spacing,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "child counts are far below f64's exact integer range"
    )]
    fn gaps(&self, count: usize) -> f64 {
        count.saturating_sub(1) as f64 * self.spacing
    }
}

impl Measurable for Stack {
    fn intrinsic_size(&self, children: &[Size]) -> Size {
        let main: f64 = children.iter().map(|s| self.axis.main(*s)).sum();
        let cross = children
            .iter()
            .map(|s| self.axis.cross(*s))
            .fold(0.0, f64::max);
        self.axis.pack(main + self.gaps(children.len()), cross)
    }

    fn arrange(&self, content: Rect, children: &[Size], slots: &mut Vec<Rect>) {
        let cross = self.axis.cross(content.size());
        let mut offset = 0.0;
        for child in children {
            let main = self.axis.main(*child);
            let origin = match self.axis {
                Axis::Horizontal => Point::new(content.x0 + offset, content.y0),
                Axis::Vertical => Point::new(content.x0, content.y0 + offset),
            };
            slots.push(Rect::from_origin_size(origin, self.axis.pack(main, cross)));
            offset += main + self.spacing;
        }
    }
}

/// Applies fixed lengths to an element's intrinsic size.
///
/// Negative results are clamped to zero and logged.
#[must_use]
pub fn resolve_wrap_size(props: &LayoutProps, intrinsic: Size) -> Size {
    let pick = |length: Length, intrinsic: f64| match length {
        Length::Auto => intrinsic,
        Length::Fixed(v) => v,
    };
    let size = Size::new(pick(props.width, intrinsic.width), pick(props.height, intrinsic.height));
    if size.width < 0.0 || size.height < 0.0 || !size.is_finite() {
        tracing::warn!(?size, "clamping invalid wrap size");
        return Size::new(clamp_extent(size.width), clamp_extent(size.height));
    }
    size
}

fn clamp_extent(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// The space a node occupies in its parent's layout: wrap size plus margins.
#[must_use]
pub fn outer_size(wrap: Size, props: &LayoutProps) -> Size {
    let m = props.margin;
    Size::new(
        (wrap.width + m.x_value()).max(0.0),
        (wrap.height + m.y_value()).max(0.0),
    )
}

/// Computes a node's drawing area inside the slot its parent assigned.
///
/// Margins are removed from the slot first; a slot smaller than its margins
/// collapses to an empty area at the inner edge (logged). A
/// [`Position::Fixed`] origin is an offset from the inner top-left corner and
/// overrides alignment. [`Align::Stretch`] fills the inner extent on axes
/// whose length is [`Length::Auto`].
#[must_use]
pub fn place(slot: Rect, wrap: Size, props: &LayoutProps) -> Rect {
    let m = props.margin;
    let mut inner = Rect::new(slot.x0 + m.x0, slot.y0 + m.y0, slot.x1 - m.x1, slot.y1 - m.y1);
    if inner.x1 < inner.x0 || inner.y1 < inner.y0 {
        tracing::warn!(?slot, margin = ?m, "slot smaller than margins");
        inner.x1 = inner.x1.max(inner.x0);
        inner.y1 = inner.y1.max(inner.y0);
    }

    if let Position::Fixed(offset) = props.position {
        return Rect::from_origin_size(inner.origin() + offset.to_vec2(), wrap);
    }

    let (x, width) = place_axis(inner.x0, inner.width(), wrap.width, props.width, props.h_align);
    let (y, height) = place_axis(inner.y0, inner.height(), wrap.height, props.height, props.v_align);
    Rect::from_origin_size((x, y), (width, height))
}

fn place_axis(start: f64, room: f64, wrap: f64, length: Length, align: Align) -> (f64, f64) {
    match (align, length) {
        (Align::Stretch, Length::Auto) => (start, room),
        (Align::Start | Align::Stretch, _) => (start, wrap),
        (Align::Center, _) => (start + (room - wrap) / 2.0, wrap),
        (Align::End, _) => (start + room - wrap, wrap),
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Insets;

    use super::*;

    struct Overlay;
    impl Measurable for Overlay {}

    #[test]
    fn overlay_takes_max_extent() {
        let sizes = [Size::new(10.0, 40.0), Size::new(30.0, 5.0)];
        assert_eq!(Overlay.intrinsic_size(&sizes), Size::new(30.0, 40.0));
        assert_eq!(Overlay.intrinsic_size(&[]), Size::ZERO);

        let mut slots = Vec::new();
        let content = Rect::new(0.0, 0.0, 50.0, 50.0);
        Overlay.arrange(content, &sizes, &mut slots);
        assert_eq!(slots, vec![content, content]);
    }

    #[test]
    fn stack_sums_main_axis() {
        let stack = Stack::vertical(2.0);
        let sizes = [Size::new(10.0, 5.0), Size::new(20.0, 7.0), Size::new(4.0, 1.0)];
        assert_eq!(stack.intrinsic_size(&sizes), Size::new(20.0, 17.0));
        assert_eq!(Stack::horizontal(1.0).intrinsic_size(&sizes), Size::new(36.0, 7.0));
    }

    #[test]
    fn stack_slots_follow_each_other() {
        let stack = Stack::horizontal(5.0);
        let sizes = [Size::new(10.0, 5.0), Size::new(20.0, 7.0)];
        let mut slots = Vec::new();
        stack.arrange(Rect::new(100.0, 50.0, 200.0, 80.0), &sizes, &mut slots);
        assert_eq!(
            slots,
            vec![
                Rect::new(100.0, 50.0, 110.0, 80.0),
                Rect::new(115.0, 50.0, 135.0, 80.0),
            ]
        );
    }

    #[test]
    fn fixed_lengths_override_intrinsic() {
        let props = LayoutProps::fixed(100.0, 40.0);
        assert_eq!(resolve_wrap_size(&props, Size::new(3.0, 3.0)), Size::new(100.0, 40.0));
        assert_eq!(
            resolve_wrap_size(&LayoutProps::AUTO, Size::new(3.0, 4.0)),
            Size::new(3.0, 4.0)
        );
    }

    #[test]
    fn negative_sizes_clamp_to_zero() {
        let props = LayoutProps::fixed(-5.0, 10.0);
        assert_eq!(resolve_wrap_size(&props, Size::ZERO), Size::new(0.0, 10.0));
    }

    #[test]
    fn centered_child_in_fixed_parent() {
        let area = place(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Size::new(20.0, 20.0),
            &LayoutProps::centered(),
        );
        assert_eq!(area, Rect::new(40.0, 40.0, 60.0, 60.0));
    }

    #[test]
    fn alignment_and_stretch() {
        let slot = Rect::new(0.0, 0.0, 100.0, 50.0);
        let wrap = Size::new(10.0, 10.0);
        let end = LayoutProps::AUTO.with_align(Align::End, Align::End);
        assert_eq!(place(slot, wrap, &end), Rect::new(90.0, 40.0, 100.0, 50.0));

        let stretch = LayoutProps::AUTO.with_align(Align::Stretch, Align::Start);
        assert_eq!(place(slot, wrap, &stretch), Rect::new(0.0, 0.0, 100.0, 10.0));

        // Fixed lengths are not stretched.
        let fixed = LayoutProps::fixed(10.0, 10.0).with_align(Align::Stretch, Align::Stretch);
        assert_eq!(place(slot, wrap, &fixed), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn margins_shrink_the_slot() {
        let props = LayoutProps::AUTO.with_margin(Insets::uniform(5.0));
        let area = place(Rect::new(0.0, 0.0, 100.0, 100.0), Size::new(10.0, 10.0), &props);
        assert_eq!(area, Rect::new(5.0, 5.0, 15.0, 15.0));
        assert_eq!(outer_size(Size::new(10.0, 10.0), &props), Size::new(20.0, 20.0));

        // A slot smaller than its margins collapses instead of inverting.
        let tiny = place(Rect::new(0.0, 0.0, 4.0, 4.0), Size::ZERO, &props);
        assert!(tiny.width() >= 0.0 && tiny.height() >= 0.0);
    }

    #[test]
    fn fixed_position_offsets_from_inner_origin() {
        let props = LayoutProps::AUTO
            .with_margin(Insets::uniform(2.0))
            .at(Point::new(10.0, 20.0));
        let area = place(Rect::new(100.0, 100.0, 200.0, 200.0), Size::new(5.0, 5.0), &props);
        assert_eq!(area, Rect::new(112.0, 122.0, 117.0, 127.0));
    }
}
