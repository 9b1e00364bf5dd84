// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout state carried between passes, plus per-pass bookkeeping types.

use core::num::NonZeroUsize;

use hashbrown::HashMap;

use crate::geometry::cells_to_cover;
use crate::{CellRect, CellSize, ViewportSize};

/// Direction of a scroll-driven fill.
///
/// A directional fill shifts the window by one column or row before filling.
/// [`FillDirection::None`] fills in place, which is what a full rebuild uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillDirection {
    /// Fill the current window without shifting it.
    #[default]
    None,
    /// Shift one column toward the start (content moved right).
    Start,
    /// Shift one column toward the end (content moved left).
    End,
    /// Shift one row up (content moved down).
    Up,
    /// Shift one row down (content moved up).
    Down,
}

/// How a data index was classified during a predictive pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Removal {
    /// The removed item was on screen when the change was reported.
    Visible,
    /// The removed item was off screen; only its index range is known.
    Invisible,
}

/// Removal classification built fresh for every pre-layout pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemovalCache {
    entries: HashMap<usize, Removal>,
}

impl RemovalCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the classification of `index`, replacing any previous entry.
    pub fn insert(&mut self, index: usize, removal: Removal) {
        self.entries.insert(index, removal);
    }

    /// Classification of `index`, if it was removed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Removal> {
        self.entries.get(&index).copied()
    }

    /// Number of classified indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(index, classification)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Removal)> + '_ {
        self.entries.iter().map(|(&index, &removal)| (index, removal))
    }

    /// Number of off-screen removals at indices strictly below `position`.
    #[must_use]
    pub fn invisible_below(&self, position: usize) -> usize {
        self.entries
            .iter()
            .filter(|&(&index, &removal)| removal == Removal::Invisible && index < position)
            .count()
    }
}

/// Range of data indices affected by the most recent removal notification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChangeRange {
    /// First removed index.
    pub start: usize,
    /// Number of removed items.
    pub count: usize,
}

impl ChangeRange {
    /// Indices covered by this range.
    #[must_use]
    pub fn indices(&self) -> core::ops::Range<usize> {
        self.start..self.start.saturating_add(self.count)
    }
}

/// The top-left visible cell and its pixel position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// Data index of the top-left visible cell.
    pub position: usize,
    /// Left edge of that cell in viewport coordinates.
    pub left: i32,
    /// Top edge of that cell in viewport coordinates.
    pub top: i32,
}

/// A slot placed on screen by the most recent pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement<S> {
    /// Pool handle.
    pub slot: S,
    /// Data index the slot is bound to.
    pub index: usize,
    /// Where the slot was positioned.
    pub rect: CellRect,
}

/// Layout state that persists across passes.
///
/// This is everything the engine remembers about "where the user has
/// scrolled to" and how the grid is shaped. The on-screen slots themselves
/// are tracked separately by [`GridVirtualizer`](crate::GridVirtualizer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualizerState {
    pub(crate) total_columns: NonZeroUsize,
    pub(crate) cell_size: Option<CellSize>,
    pub(crate) viewport: ViewportSize,
    pub(crate) visible_columns: usize,
    pub(crate) visible_rows: usize,
    pub(crate) first_visible_position: usize,
    pub(crate) force_clear_offsets: bool,
    pub(crate) pending_change: Option<ChangeRange>,
    pub(crate) layout_requested: bool,
}

impl Default for VirtualizerState {
    fn default() -> Self {
        Self {
            total_columns: NonZeroUsize::MIN,
            cell_size: None,
            viewport: ViewportSize::default(),
            visible_columns: 0,
            visible_rows: 0,
            first_visible_position: 0,
            force_clear_offsets: false,
            pending_change: None,
            layout_requested: true,
        }
    }
}

impl VirtualizerState {
    /// Configured number of columns.
    #[must_use]
    pub const fn total_columns(&self) -> usize {
        self.total_columns.get()
    }

    /// Cell size, once measured.
    #[must_use]
    pub const fn cell_size(&self) -> Option<CellSize> {
        self.cell_size
    }

    /// Viewport the last pass was computed for.
    #[must_use]
    pub const fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    /// Number of columns in the visible window.
    #[must_use]
    pub const fn visible_columns(&self) -> usize {
        self.visible_columns
    }

    /// Number of rows in the visible window.
    #[must_use]
    pub const fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    /// Data index of the top-left visible cell.
    #[must_use]
    pub const fn first_visible_position(&self) -> usize {
        self.first_visible_position
    }

    /// Removal range waiting to be consumed by the next real layout.
    #[must_use]
    pub const fn pending_change(&self) -> Option<ChangeRange> {
        self.pending_change
    }

    /// Number of rows needed for `item_count` items.
    #[must_use]
    pub const fn total_rows(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.total_columns.get())
    }

    /// Grid row of a data index.
    #[must_use]
    pub const fn row_of(&self, index: usize) -> usize {
        index / self.total_columns.get()
    }

    /// Grid column of a data index.
    #[must_use]
    pub const fn column_of(&self, index: usize) -> usize {
        index % self.total_columns.get()
    }

    /// Data index at a grid row and column.
    #[must_use]
    pub const fn position_of(&self, row: usize, column: usize) -> usize {
        row * self.total_columns.get() + column
    }

    /// Grid row of the top-left visible cell.
    #[must_use]
    pub const fn first_visible_row(&self) -> usize {
        self.row_of(self.first_visible_position)
    }

    /// Grid column of the top-left visible cell.
    #[must_use]
    pub const fn first_visible_column(&self) -> usize {
        self.column_of(self.first_visible_position)
    }

    /// Number of cells in the visible window.
    #[must_use]
    pub const fn visible_cell_count(&self) -> usize {
        self.visible_columns * self.visible_rows
    }

    /// Recomputes the visible window dimensions for the current viewport.
    ///
    /// Does nothing until a cell size has been measured. A zero-sized cell
    /// makes every column or row visible along that axis.
    pub(crate) fn update_window_sizing(&mut self, item_count: usize) {
        let Some(size) = self.cell_size else {
            return;
        };
        let total_columns = self.total_columns();
        let total_rows = self.total_rows(item_count);
        self.visible_columns = if size.width > 0 {
            cells_to_cover(self.viewport.width, size.width).min(total_columns)
        } else {
            total_columns
        };
        self.visible_rows = if size.height > 0 {
            cells_to_cover(self.viewport.height, size.height).min(total_rows)
        } else {
            total_rows
        };
    }
}
