// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel geometry for grid cells and the viewport.

/// Size of a single grid cell, in pixels.
///
/// Every item in the grid shares this size. Components are expected to be
/// non-negative.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellSize {
    /// Width of a cell.
    pub width: i32,
    /// Height of a cell.
    pub height: i32,
}

impl CellSize {
    /// Creates a new cell size, clamping negative components to `0`.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Size of the scrollable viewport, in pixels, after padding is removed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    /// Horizontal space available to cells.
    pub width: i32,
    /// Vertical space available to cells.
    pub height: i32,
}

impl ViewportSize {
    /// Creates a new viewport size, clamping negative components to `0`.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }
}

/// Screen rectangle occupied by a positioned slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl CellRect {
    /// Creates a rectangle from its origin and size.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a cell-sized rectangle at the given origin.
    #[inline]
    #[must_use]
    pub const fn at(x: i32, y: i32, size: CellSize) -> Self {
        Self::new(x, y, size.width, size.height)
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns this rectangle moved by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }
}

/// Converts a cell count into pixels, saturating at `i32::MAX`.
#[inline]
pub(crate) fn px(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Signed difference `a - b` between two grid coordinates, in cells.
#[inline]
pub(crate) fn cell_delta(a: usize, b: usize) -> i32 {
    if a >= b { px(a - b) } else { -px(b - a) }
}

/// Number of whole or partial cells of `cell` extent needed to cover `extent`,
/// plus one so a partially visible boundary cell on either side is included.
#[inline]
pub(crate) fn cells_to_cover(extent: i32, cell: i32) -> usize {
    debug_assert!(cell > 0, "cell extent must be strictly positive");
    let extent = usize::try_from(extent.max(0)).unwrap_or(0);
    let cell = usize::try_from(cell.max(1)).unwrap_or(1);
    extent.div_ceil(cell) + 1
}

#[cfg(feature = "kurbo")]
mod kurbo_interop {
    use super::{CellRect, CellSize};

    impl From<CellRect> for kurbo::Rect {
        fn from(rect: CellRect) -> Self {
            Self::new(
                f64::from(rect.x),
                f64::from(rect.y),
                f64::from(rect.right()),
                f64::from(rect.bottom()),
            )
        }
    }

    impl From<CellSize> for kurbo::Size {
        fn from(size: CellSize) -> Self {
            Self::new(f64::from(size.width), f64::from(size.height))
        }
    }
}
