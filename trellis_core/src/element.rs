// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node capabilities and a few stock elements.

use core::fmt;

use kurbo::{Rect, Size};

use crate::backend::Paintable;
use crate::color::Color;
use crate::layout::{Measurable, Stack};

/// Everything a node's element must provide.
///
/// Implemented for every type that is [`Measurable`], [`Paintable`] and
/// `Debug`.
pub trait Element: Measurable + Paintable + fmt::Debug {}

impl<T: Measurable + Paintable + fmt::Debug + ?Sized> Element for T {}

/// A container that overlays its children on a solid background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Panel {
    /// Fill color.
    pub background: Color,
}

impl Panel {
    /// A panel that draws nothing.
    pub const TRANSPARENT: Self = Self::new(Color::TRANSPARENT);

    /// A panel with the given background.
    #[must_use]
    pub const fn new(background: Color) -> Self {
        Self { background }
    }
}

impl Measurable for Panel {}

impl Paintable for Panel {
    fn background(&self) -> Color {
        self.background
    }
}

/// A leaf with a fixed intrinsic size, filled with one color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    /// Intrinsic size.
    pub size: Size,
    /// Fill color.
    pub color: Color,
}

impl Block {
    /// An opaque black block of the given size.
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            size,
            color: Color::BLACK,
        }
    }

    /// Returns a copy with the given color.
    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl Measurable for Block {
    fn intrinsic_size(&self, _children: &[Size]) -> Size {
        self.size
    }
}

impl Paintable for Block {
    fn background(&self) -> Color {
        self.color
    }
}

/// A container that stacks its children along an axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StackPanel {
    /// Layout strategy.
    pub stack: Stack,
    /// Fill color.
    pub background: Color,
}

impl StackPanel {
    /// A transparent stack panel.
    #[must_use]
    pub const fn new(stack: Stack) -> Self {
        Self {
            stack,
            background: Color::TRANSPARENT,
        }
    }
}

impl Measurable for StackPanel {
    fn intrinsic_size(&self, children: &[Size]) -> Size {
        self.stack.intrinsic_size(children)
    }

    fn arrange(&self, content: Rect, children: &[Size], slots: &mut Vec<Rect>) {
        self.stack.arrange(content, children, slots);
    }
}

impl Paintable for StackPanel {
    fn background(&self) -> Color {
        self.background
    }
}
