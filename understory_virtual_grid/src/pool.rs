// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator traits consumed by the grid engine.

use core::fmt::Debug;
use core::hash::Hash;

use crate::{CellRect, CellSize};

/// Source of the item count for the current layout pass.
pub trait DataSource {
    /// Number of items in the dataset, as seen by the current pass.
    ///
    /// During a pre-layout pass this is the count *before* the pending
    /// change is applied.
    fn item_count(&self) -> usize;

    /// Returns `true` if the current pass is a predictive pre-layout.
    fn is_pre_layout(&self) -> bool {
        false
    }
}

impl DataSource for usize {
    fn item_count(&self) -> usize {
        *self
    }
}

/// Item count plus pass kind, for hosts that track both themselves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PassContext {
    /// Number of items visible to this pass.
    pub item_count: usize,
    /// Whether this is a predictive pre-layout.
    pub pre_layout: bool,
}

impl PassContext {
    /// A real layout over `item_count` items.
    #[must_use]
    pub const fn real(item_count: usize) -> Self {
        Self {
            item_count,
            pre_layout: false,
        }
    }

    /// A pre-layout over the `item_count` items that existed before the change.
    #[must_use]
    pub const fn pre(item_count: usize) -> Self {
        Self {
            item_count,
            pre_layout: true,
        }
    }
}

impl DataSource for PassContext {
    fn item_count(&self) -> usize {
        self.item_count
    }

    fn is_pre_layout(&self) -> bool {
        self.pre_layout
    }
}

/// A pool of item views, materialized and recycled on demand.
///
/// Slots are opaque handles. The grid engine never looks at a slot's content;
/// it only asks the pool to bind, measure, position, attach, and release them.
///
/// The engine is the sole mutator of the pool for the duration of a pass.
pub trait ViewPool {
    /// Handle for a pooled view.
    type Slot: Clone + Eq + Hash + Debug;

    /// Returns a slot bound to data `index`, unattached.
    ///
    /// Implementations may return a scrapped slot that already shows `index`
    /// or rebind a recycled one. Callers never request an index at or past the
    /// current item count.
    fn acquire(&mut self, index: usize) -> Self::Slot;

    /// Measures a slot, including any margins or decorations.
    fn measure(&mut self, slot: &Self::Slot) -> CellSize;

    /// Positions a slot at `rect`.
    fn layout(&mut self, slot: &Self::Slot, rect: CellRect);

    /// Attaches a slot to the visible set.
    fn attach(&mut self, slot: &Self::Slot);

    /// Temporarily detaches a slot; it is expected to be re-attached or
    /// recycled before the pass ends.
    fn detach(&mut self, slot: &Self::Slot);

    /// Detaches a slot and hands it back for reuse with any index.
    fn detach_and_recycle(&mut self, slot: &Self::Slot);

    /// Detaches a slot into the scrap list, where it stays bound to its index.
    fn detach_and_scrap(&mut self, slot: &Self::Slot);

    /// Detaches every attached slot into the scrap list.
    fn detach_all_and_scrap(&mut self);

    /// Slots currently held in scrap.
    fn scrap_list(&self) -> &[Self::Slot];

    /// Recycles everything left in scrap.
    fn recycle_scrap(&mut self);

    /// Removes every slot from the visible set without any animation.
    fn remove_all(&mut self);

    /// Re-attaches a scrapped slot as disappearing, positioned at `rect`, so
    /// the rendering surface can animate its exit.
    fn layout_disappearing(&mut self, slot: &Self::Slot, rect: CellRect);

    /// Returns `true` if the item behind this slot was removed from the data source.
    fn is_flagged_removed(&self, slot: &Self::Slot) -> bool;

    /// Data index the slot was last laid out at.
    fn layout_position(&self, slot: &Self::Slot) -> usize;

    /// Data index of the slot's item after pending changes are applied.
    ///
    /// Returns `None` if the item no longer exists. The default assumes no
    /// pending change moved the item.
    fn adapter_position(&self, slot: &Self::Slot) -> Option<usize> {
        if self.is_flagged_removed(slot) {
            None
        } else {
            Some(self.layout_position(slot))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSource, PassContext};

    #[test]
    fn plain_counts_are_real_passes() {
        let count = 12_usize;
        assert_eq!(count.item_count(), 12);
        assert!(!count.is_pre_layout());
    }

    #[test]
    fn pass_context_reports_its_kind() {
        let pre: &dyn DataSource = &PassContext::pre(7);
        assert_eq!(pre.item_count(), 7);
        assert!(pre.is_pre_layout());
        assert!(!PassContext::real(7).is_pre_layout());
        assert_eq!(PassContext::default(), PassContext::real(0));
    }
}
