// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fixed-cell grid engine: measurement, predictive and real layout,
//! scroll-driven fills, and disappearing-slot handling.

use alloc::vec::Vec;
use core::hash::Hash;
use core::num::NonZeroUsize;

use hashbrown::{HashMap, HashSet};

use crate::geometry::{cell_delta, px};
use crate::state::{Anchor, FillDirection, Placement, Removal, RemovalCache, VirtualizerState};
use crate::{CellRect, CellSize, ChangeRange, DataSource, ViewPool, ViewportSize};

/// Entry points a host calls to drive a layout engine.
///
/// The host owns the rendering surface and the pool. It serializes calls:
/// a pass always runs to completion before the next one starts.
pub trait LayoutEngine {
    /// Handle type of the pool this engine places.
    type Slot;

    /// Establishes the cell size if it is not known yet.
    fn on_measure<P, D>(&mut self, pool: &mut P, data: &D) -> Option<CellSize>
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized;

    /// Runs a predictive pass before a dataset change is applied.
    fn on_pre_layout<P, D>(&mut self, pool: &mut P, data: &D) -> RemovalCache
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized;

    /// Rebuilds the visible window for the current state.
    fn on_real_layout<P, D>(&mut self, pool: &mut P, data: &D)
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized;

    /// Changes the number of grid columns.
    fn on_column_count_changed(&mut self, columns: NonZeroUsize);

    /// Records a removal of `count` items starting at `start`.
    fn on_items_removed(&mut self, start: usize, count: usize);

    /// Drops every on-screen slot after the data source was replaced.
    fn on_data_source_swapped<P>(&mut self, pool: &mut P)
    where
        P: ViewPool<Slot = Self::Slot>;
}

/// Virtualized grid of uniformly sized cells.
///
/// The engine keeps a [`VirtualizerState`] (scroll anchor, grid shape, pending
/// removal range) and the list of slots it placed on the last pass. Every
/// pass rebuilds the visible window through a [`ViewPool`]; scroll calls
/// shift the window incrementally and only bind slots for newly exposed cells.
///
/// ## Example
///
/// ```rust
/// use core::num::NonZeroUsize;
/// use understory_virtual_grid::{
///     CellSize, GridVirtualizer, LayoutEngine, RecyclingPool, ViewportSize,
/// };
///
/// let mut pool = RecyclingPool::new(CellSize::new(100, 100));
/// let mut grid = GridVirtualizer::new().with_columns(NonZeroUsize::new(10).unwrap());
/// grid.set_viewport_size(ViewportSize::new(300, 300));
///
/// // 1000 items, laid out 10 per row.
/// grid.on_real_layout(&mut pool, &1000_usize);
/// assert_eq!(grid.state().visible_columns(), 4);
/// assert_eq!(grid.placements().len(), 16);
///
/// // Scroll down 250px; rows 2..6 are now in the window.
/// assert_eq!(grid.scroll_vertically_by(250, &mut pool, &1000_usize), 250);
/// assert_eq!(grid.state().first_visible_row(), 2);
/// assert_eq!(grid.anchor().top, -50);
/// ```
#[derive(Debug)]
pub struct GridVirtualizer<S> {
    state: VirtualizerState,
    placements: Vec<Placement<S>>,
}

impl<S> Default for GridVirtualizer<S> {
    fn default() -> Self {
        Self {
            state: VirtualizerState::default(),
            placements: Vec::new(),
        }
    }
}

impl<S: Clone + Eq + Hash> GridVirtualizer<S> {
    /// Creates a single-column grid with no measured cell size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of columns, builder style.
    #[must_use]
    pub fn with_columns(mut self, columns: NonZeroUsize) -> Self {
        self.set_column_count(columns);
        self
    }

    /// Layout state carried between passes.
    #[must_use]
    pub const fn state(&self) -> &VirtualizerState {
        &self.state
    }

    /// Slots placed by the most recent pass, top-left first.
    #[must_use]
    pub fn placements(&self) -> &[Placement<S>] {
        &self.placements
    }

    /// Data indices currently on screen, in fill order.
    pub fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.placements.iter().map(|p| p.index)
    }

    /// Measured cell size, if any.
    #[must_use]
    pub const fn cell_size(&self) -> Option<CellSize> {
        self.state.cell_size
    }

    /// Current scroll anchor.
    ///
    /// With nothing on screen the offsets are reported as zero.
    #[must_use]
    pub fn anchor(&self) -> Anchor {
        let (left, top) = self
            .placements
            .first()
            .map_or((0, 0), |p| (p.rect.x, p.rect.y));
        Anchor {
            position: self.state.first_visible_position,
            left,
            top,
        }
    }

    /// Returns `true` if geometry or configuration changed since the last real layout.
    #[must_use]
    pub const fn needs_layout(&self) -> bool {
        self.state.layout_requested
    }

    /// Sets the number of grid columns. Takes effect on the next pass.
    pub fn set_column_count(&mut self, columns: NonZeroUsize) {
        if columns != self.state.total_columns {
            self.state.total_columns = columns;
            self.state.layout_requested = true;
        }
    }

    /// Sets the viewport size. Takes effect on the next pass.
    pub fn set_viewport_size(&mut self, viewport: ViewportSize) {
        if viewport != self.state.viewport {
            self.state.viewport = viewport;
            self.state.layout_requested = true;
        }
    }

    /// Runs whichever layout pass `data` says is in progress.
    ///
    /// Returns the removal classification for a pre-layout pass and `None`
    /// for a real one.
    pub fn layout_children<P, D>(&mut self, pool: &mut P, data: &D) -> Option<RemovalCache>
    where
        P: ViewPool<Slot = S>,
        D: DataSource + ?Sized,
    {
        if data.is_pre_layout() {
            Some(self.on_pre_layout(pool, data))
        } else {
            self.on_real_layout(pool, data);
            None
        }
    }

    /// Makes `position` the top-left cell on the next real layout.
    ///
    /// Requests past the end of the data are ignored.
    pub fn scroll_to_position<D>(&mut self, position: usize, data: &D)
    where
        D: DataSource + ?Sized,
    {
        let item_count = data.item_count();
        if position >= item_count {
            log::warn!("cannot scroll to {position}, item count is {item_count}");
            return;
        }
        self.state.first_visible_position = position;
        self.state.force_clear_offsets = true;
        self.state.layout_requested = true;
    }

    /// Returns `true` if the grid is wider than the viewport.
    #[must_use]
    pub fn can_scroll_horizontally(&self) -> bool {
        self.max_scroll_x() > 0
    }

    /// Returns `true` if `item_count` items make the grid taller than the viewport.
    #[must_use]
    pub fn can_scroll_vertically(&self, item_count: usize) -> bool {
        self.max_scroll_y(item_count) > 0
    }

    /// Scrolls the content horizontally by `dx` pixels.
    ///
    /// Positive `dx` reveals columns toward the end. The scroll is clamped to
    /// the grid's extent; the distance actually scrolled is returned.
    pub fn scroll_horizontally_by<P, D>(&mut self, dx: i32, pool: &mut P, data: &D) -> i32
    where
        P: ViewPool<Slot = S>,
        D: DataSource + ?Sized,
    {
        let Some(top_left) = self.placements.first().map(|p| p.rect) else {
            return 0;
        };
        let max_offset = self.max_scroll_x();
        if dx == 0 || max_offset <= 0 {
            return 0;
        }
        let current = i64::from(px(self.state.first_visible_column()))
            * i64::from(top_left.width)
            - i64::from(top_left.x);
        let target = (current + i64::from(dx)).clamp(0, max_offset);
        let delta = clamp_i32(current - target);
        if delta == 0 {
            return 0;
        }
        self.offset_placements(pool, delta, 0);

        let item_count = data.item_count();
        let total_columns = self.state.total_columns();
        let mut shifted = false;
        while let Some(rect) = self.placements.first().map(|p| p.rect) {
            let first_column = self.state.first_visible_column();
            let direction = if delta < 0
                && rect.right() <= 0
                && first_column + 1 < total_columns
                && self.state.first_visible_position + 1 < item_count
            {
                FillDirection::End
            } else if delta > 0 && rect.x > 0 && first_column > 0 {
                FillDirection::Start
            } else {
                break;
            };
            self.fill(direction, 0, 0, pool, item_count, None);
            shifted = true;
        }
        if !shifted {
            self.fill(FillDirection::None, 0, 0, pool, item_count, None);
        }
        -delta
    }

    /// Scrolls the content vertically by `dy` pixels.
    ///
    /// Positive `dy` reveals rows toward the bottom. The scroll is clamped to
    /// the grid's extent; the distance actually scrolled is returned.
    pub fn scroll_vertically_by<P, D>(&mut self, dy: i32, pool: &mut P, data: &D) -> i32
    where
        P: ViewPool<Slot = S>,
        D: DataSource + ?Sized,
    {
        let Some(top_left) = self.placements.first().map(|p| p.rect) else {
            return 0;
        };
        let item_count = data.item_count();
        let max_offset = self.max_scroll_y(item_count);
        if dy == 0 || max_offset <= 0 {
            return 0;
        }
        let current = i64::from(px(self.state.first_visible_row()))
            * i64::from(top_left.height)
            - i64::from(top_left.y);
        let target = (current + i64::from(dy)).clamp(0, max_offset);
        let delta = clamp_i32(current - target);
        if delta == 0 {
            return 0;
        }
        self.offset_placements(pool, 0, delta);

        let total_rows = self.state.total_rows(item_count);
        let total_columns = self.state.total_columns();
        let mut shifted = false;
        while let Some(rect) = self.placements.first().map(|p| p.rect) {
            let first_row = self.state.first_visible_row();
            let direction = if delta < 0
                && rect.bottom() <= 0
                && first_row + 1 < total_rows
                && self.state.first_visible_position + total_columns < item_count
            {
                FillDirection::Down
            } else if delta > 0 && rect.y > 0 && first_row > 0 {
                FillDirection::Up
            } else {
                break;
            };
            self.fill(direction, 0, 0, pool, item_count, None);
            shifted = true;
        }
        if !shifted {
            self.fill(FillDirection::None, 0, 0, pool, item_count, None);
        }
        -delta
    }

    fn max_scroll_x(&self) -> i64 {
        let Some(size) = self.state.cell_size else {
            return 0;
        };
        i64::from(px(self.state.total_columns())) * i64::from(size.width)
            - i64::from(self.state.viewport.width)
    }

    fn max_scroll_y(&self, item_count: usize) -> i64 {
        let Some(size) = self.state.cell_size else {
            return 0;
        };
        i64::from(px(self.state.total_rows(item_count))) * i64::from(size.height)
            - i64::from(self.state.viewport.height)
    }

    fn offset_placements<P>(&mut self, pool: &mut P, dx: i32, dy: i32)
    where
        P: ViewPool<Slot = S>,
    {
        for placement in &mut self.placements {
            placement.rect = placement.rect.offset(dx, dy);
            pool.layout(&placement.slot, placement.rect);
        }
    }

    fn release_all<P>(&mut self, pool: &mut P)
    where
        P: ViewPool<Slot = S>,
    {
        self.placements.clear();
        pool.detach_all_and_scrap();
    }

    fn measure<P>(&mut self, pool: &mut P, item_count: usize) -> Option<CellSize>
    where
        P: ViewPool<Slot = S>,
    {
        if let Some(size) = self.state.cell_size {
            return Some(size);
        }
        if item_count == 0 {
            return None;
        }
        let slot = pool.acquire(0);
        let size = pool.measure(&slot);
        pool.detach_and_scrap(&slot);
        if size.is_empty() {
            log::warn!("first item measured as {size:?}; the grid will not scroll on that axis");
        }
        self.state.cell_size = Some(size);
        Some(size)
    }

    fn classify_removals<P>(&self, pool: &P) -> RemovalCache
    where
        P: ViewPool<Slot = S>,
    {
        let mut cache = RemovalCache::new();
        for placement in &self.placements {
            if pool.is_flagged_removed(&placement.slot) {
                cache.insert(pool.layout_position(&placement.slot), Removal::Visible);
            }
        }
        if cache.is_empty() {
            if let Some(range) = self.state.pending_change {
                for index in range.indices() {
                    cache.insert(index, Removal::Invisible);
                }
            }
        }
        cache
    }

    /// Shared body of the predictive and real passes, from anchor selection
    /// through the fill. Returns the last known rect of every slot that was
    /// on screen when the pass started.
    fn rebuild<P>(
        &mut self,
        pool: &mut P,
        item_count: usize,
        predictive: Option<&RemovalCache>,
    ) -> HashMap<S, CellRect>
    where
        P: ViewPool<Slot = S>,
    {
        let size = self.state.cell_size.unwrap_or_default();
        let viewport = self.state.viewport;
        let total_rows = self.state.total_rows(item_count);
        let total_columns = self.state.total_columns();

        let (mut left, mut top) = if let Some(top_left) = self.placements.first() {
            if predictive.is_none() && self.state.visible_cell_count() >= item_count {
                log::debug!("{item_count} items fit without scrolling; resetting anchor");
                self.state.first_visible_position = 0;
                (0, 0)
            } else if self.state.force_clear_offsets {
                self.state.force_clear_offsets = false;
                (0, 0)
            } else {
                (top_left.rect.x, top_left.rect.y)
            }
        } else if self.state.force_clear_offsets {
            // A position requested before anything was on screen.
            self.state.force_clear_offsets = false;
            (0, 0)
        } else {
            self.state.first_visible_position = 0;
            (0, 0)
        };

        if predictive.is_none()
            && i64::from(viewport.height) > i64::from(px(total_rows)) * i64::from(size.height)
        {
            self.state.first_visible_position %= total_columns;
            top = 0;
            if self.state.first_visible_position + self.state.visible_columns > item_count {
                self.state.first_visible_position =
                    item_count.saturating_sub(self.state.visible_columns);
                left = 0;
            }
            log::debug!(
                "content shorter than viewport; first position now {}",
                self.state.first_visible_position
            );
        }

        let first_row = self.state.first_visible_row();
        let first_column = self.state.first_visible_column();
        let (mut row, mut new_top) =
            clamp_to_extent(first_row, top, total_rows, size.height, viewport.height);
        let (mut column, mut new_left) =
            clamp_to_extent(first_column, left, total_columns, size.width, viewport.width);
        if self.state.position_of(row, column) >= item_count {
            // The partial last row has no item in this column.
            if row > 0 {
                row -= 1;
            } else {
                (column, new_left) =
                    clamp_to_extent(column, new_left, item_count, size.width, viewport.width);
            }
        }
        if (row, column) != (first_row, first_column) || (new_left, new_top) != (left, top) {
            self.state.first_visible_position = self.state.position_of(row, column);
            (left, top) = (new_left, new_top);
            log::debug!("window out of bounds; clamped to row {row}, column {column}");
        }

        let last_rects = self
            .placements
            .drain(..)
            .map(|p| (p.slot, p.rect))
            .collect();
        pool.detach_all_and_scrap();

        self.fill(FillDirection::None, left, top, pool, item_count, predictive);
        last_rects
    }

    /// Fills the visible window row by row.
    ///
    /// With slots already on screen, the window starts at the current top-left
    /// slot shifted one cell in `direction`; slots that stay inside the window
    /// are re-attached in place and the rest are recycled. With nothing on
    /// screen, the window starts at `(empty_left, empty_top)`.
    fn fill<P>(
        &mut self,
        direction: FillDirection,
        empty_left: i32,
        empty_top: i32,
        pool: &mut P,
        item_count: usize,
        predictive: Option<&RemovalCache>,
    ) where
        P: ViewPool<Slot = S>,
    {
        let Some(size) = self.state.cell_size else {
            return;
        };
        if item_count == 0 {
            return;
        }

        let (mut start_left, mut start_top) = (empty_left, empty_top);
        let mut cached: HashMap<usize, Placement<S>> = HashMap::new();
        if let Some(top_left) = self.placements.first() {
            start_left = top_left.rect.x;
            start_top = top_left.rect.y;
            match direction {
                FillDirection::Start => start_left = start_left.saturating_sub(size.width),
                FillDirection::End => start_left = start_left.saturating_add(size.width),
                FillDirection::Up => start_top = start_top.saturating_sub(size.height),
                FillDirection::Down => start_top = start_top.saturating_add(size.height),
                FillDirection::None => {}
            }
            for placement in self.placements.drain(..) {
                pool.detach(&placement.slot);
                cached.insert(placement.index, placement);
            }
        }

        let total_columns = self.state.total_columns();
        let first = &mut self.state.first_visible_position;
        match direction {
            FillDirection::Start => *first = first.saturating_sub(1),
            FillDirection::End => *first += 1,
            FillDirection::Up => *first = first.saturating_sub(total_columns),
            FillDirection::Down => *first += total_columns,
            FillDirection::None => {}
        }

        let first_row = self.state.first_visible_row();
        let first_column = self.state.first_visible_column();
        let mut placed: HashSet<usize> = HashSet::new();
        for r in 0..self.state.visible_rows {
            let top = start_top.saturating_add(px(r).saturating_mul(size.height));
            let mut row_end: Option<(usize, usize, CellRect)> = None;
            for c in 0..self.state.visible_columns {
                let column = first_column + c;
                if column >= total_columns {
                    break;
                }
                let mut position = self.state.position_of(first_row + r, column);
                let mut shift = 0;
                if let Some(cache) = predictive {
                    shift = cache.invisible_below(position);
                    position -= shift;
                }
                if position >= item_count || placed.contains(&position) {
                    continue;
                }
                let left = start_left.saturating_add(px(c).saturating_mul(size.width));
                let placement = match cached.remove(&position) {
                    Some(placement) => {
                        pool.attach(&placement.slot);
                        placement
                    }
                    None => {
                        let rect = CellRect::at(left, top, size);
                        let slot = pool.acquire(position);
                        pool.layout(&slot, rect);
                        pool.attach(&slot);
                        Placement {
                            slot,
                            index: position,
                            rect,
                        }
                    }
                };
                row_end = Some((position, shift, placement.rect));
                placed.insert(position);
                self.placements.push(placement);
            }

            if let (Some(cache), Some((reference, shift, reference_rect))) = (predictive, row_end)
            {
                self.layout_appearing(
                    pool,
                    item_count,
                    cache.len(),
                    reference,
                    shift,
                    reference_rect,
                    &mut placed,
                );
            }
        }

        for (_, placement) in cached {
            pool.detach_and_recycle(&placement.slot);
        }
        log::trace!(
            "filled {:?}: first position {}, {} slots on screen",
            direction,
            self.state.first_visible_position,
            self.placements.len()
        );
    }

    /// Lays out the items expected to slide in after a row's last cell once
    /// off-screen removals are applied.
    fn layout_appearing<P>(
        &mut self,
        pool: &mut P,
        item_count: usize,
        extra_count: usize,
        reference: usize,
        shift: usize,
        reference_rect: CellRect,
        placed: &mut HashSet<usize>,
    ) where
        P: ViewPool<Slot = S>,
    {
        for extra in 1..=extra_count {
            let position = reference + extra;
            if position >= item_count || !placed.insert(position) {
                continue;
            }
            let state = &self.state;
            let row_delta = cell_delta(
                state.row_of(position + shift),
                state.row_of(reference + shift),
            );
            let column_delta = cell_delta(
                state.column_of(position + shift),
                state.column_of(reference + shift),
            );
            let rect = reference_rect.offset(
                column_delta.saturating_mul(reference_rect.width),
                row_delta.saturating_mul(reference_rect.height),
            );
            let slot = pool.acquire(position);
            pool.layout(&slot, rect);
            pool.attach(&slot);
            self.placements.push(Placement {
                slot,
                index: position,
                rect,
            });
        }
    }

    /// Positions scrapped slots whose items still exist at their exit location.
    fn layout_disappearing<P>(&self, pool: &mut P, last_rects: &HashMap<S, CellRect>)
    where
        P: ViewPool<Slot = S>,
    {
        let scrap: Vec<S> = pool.scrap_list().to_vec();
        let mut seen: HashSet<S> = HashSet::with_capacity(scrap.len());
        for slot in scrap {
            if pool.is_flagged_removed(&slot) || !seen.insert(slot.clone()) {
                continue;
            }
            let Some(rect) = last_rects.get(&slot) else {
                continue;
            };
            let old = pool.layout_position(&slot);
            let new = pool.adapter_position(&slot).unwrap_or(old);
            let row_delta = cell_delta(self.state.row_of(new), self.state.row_of(old));
            let column_delta = cell_delta(self.state.column_of(new), self.state.column_of(old));
            let exit = rect.offset(
                column_delta.saturating_mul(rect.width),
                row_delta.saturating_mul(rect.height),
            );
            pool.layout_disappearing(&slot, exit);
        }
    }
}

impl<S: Clone + Eq + Hash> LayoutEngine for GridVirtualizer<S> {
    type Slot = S;

    fn on_measure<P, D>(&mut self, pool: &mut P, data: &D) -> Option<CellSize>
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized,
    {
        self.measure(pool, data.item_count())
    }

    fn on_pre_layout<P, D>(&mut self, pool: &mut P, data: &D) -> RemovalCache
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized,
    {
        let item_count = data.item_count();
        if item_count == 0 {
            self.release_all(pool);
            return RemovalCache::new();
        }
        if self.placements.is_empty() {
            return RemovalCache::new();
        }
        self.measure(pool, item_count);
        self.state.update_window_sizing(item_count);

        let removals = self.classify_removals(pool);
        self.rebuild(pool, item_count, Some(&removals));
        log::trace!(
            "pre-layout: {} removals classified, {} slots on screen",
            removals.len(),
            self.placements.len()
        );
        removals
    }

    fn on_real_layout<P, D>(&mut self, pool: &mut P, data: &D)
    where
        P: ViewPool<Slot = Self::Slot>,
        D: DataSource + ?Sized,
    {
        self.state.layout_requested = false;
        let item_count = data.item_count();
        if item_count == 0 {
            self.release_all(pool);
            pool.recycle_scrap();
            return;
        }
        self.state.pending_change = None;
        self.measure(pool, item_count);
        self.state.update_window_sizing(item_count);

        let last_rects = self.rebuild(pool, item_count, None);
        if !pool.scrap_list().is_empty() {
            self.layout_disappearing(pool, &last_rects);
        }
        pool.recycle_scrap();
        log::trace!(
            "layout: first position {}, {}x{} window, {} slots on screen",
            self.state.first_visible_position,
            self.state.visible_columns,
            self.state.visible_rows,
            self.placements.len()
        );
    }

    fn on_column_count_changed(&mut self, columns: NonZeroUsize) {
        self.set_column_count(columns);
    }

    fn on_items_removed(&mut self, start: usize, count: usize) {
        self.state.pending_change = (count > 0).then_some(ChangeRange { start, count });
    }

    fn on_data_source_swapped<P>(&mut self, pool: &mut P)
    where
        P: ViewPool<Slot = Self::Slot>,
    {
        log::debug!("data source swapped; discarding {} slots", self.placements.len());
        pool.remove_all();
        self.placements.clear();
        self.state = VirtualizerState {
            total_columns: self.state.total_columns,
            viewport: self.state.viewport,
            ..VirtualizerState::default()
        };
    }
}

/// Pulls the scroll position along one axis back inside the content.
///
/// `index` and `offset` are the first visible cell and its leading edge. If
/// they scroll past `count * cell - viewport`, or `index` is not a cell at
/// all, the far edge of the content is aligned with the far edge of the
/// viewport instead.
fn clamp_to_extent(
    index: usize,
    offset: i32,
    count: usize,
    cell: i32,
    viewport: i32,
) -> (usize, i32) {
    let last = count.saturating_sub(1);
    if cell <= 0 {
        return (index.min(last), 0);
    }
    let cell = i64::from(cell);
    let max = (i64::from(px(count)) * cell - i64::from(viewport)).max(0);
    let current = i64::from(px(index)) * cell - i64::from(offset);
    if index < count && current <= max {
        return (index, offset);
    }
    let clamped = usize::try_from(max / cell).unwrap_or(0);
    if clamped > last {
        (last, 0)
    } else {
        (clamped, clamp_i32(-(max % cell)))
    }
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
