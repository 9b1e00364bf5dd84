// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`ViewPool`] that tracks slot lifecycles without rendering anything.
//!
//! [`RecyclingPool`] is useful for headless hosts and tests. It models the three
//! places a slot can live besides the visible set:
//!
//! - **scrap**: detached but still bound to its data index, and preferred when
//!   that index is requested again,
//! - **recycled**: unbound, reusable for any index,
//! - **disappearing**: re-attached only so an exit animation can play.
//!
//! Removals are simulated with [`RecyclingPool::mark_removed`], which flags
//! bound slots the way a data provider would, and folded in with
//! [`RecyclingPool::commit_changes`] once the real layout pass has run.
//!
//! Disappearing slots live until the next pass starts: the first
//! [`ViewPool::detach_all_and_scrap`] of a pass recycles them, so hosts that
//! never commit still reuse them.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::{CellRect, CellSize, ChangeRange, ViewPool};

bitflags::bitflags! {
    /// Lifecycle flags of a pooled slot.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SlotFlags: u8 {
        /// Slot is part of the visible set.
        const ATTACHED     = 0b0000_0001;
        /// Slot sits in scrap, still bound to its index.
        const SCRAP        = 0b0000_0010;
        /// The item behind the slot was removed from the data.
        const REMOVED      = 0b0000_0100;
        /// Slot is shown only for its exit animation.
        const DISAPPEARING = 0b0000_1000;
        /// Slot is unbound and free for reuse.
        const RECYCLED     = 0b0001_0000;
    }
}

/// Handle of a slot owned by a [`RecyclingPool`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct SlotRecord {
    position: usize,
    adapter_position: Option<usize>,
    rect: Option<CellRect>,
    flags: SlotFlags,
}

/// In-memory pool of slots with scrap and recycle lists.
#[derive(Clone, Debug, Default)]
pub struct RecyclingPool {
    item_size: CellSize,
    size_overrides: HashMap<usize, CellSize>,
    slots: Vec<SlotRecord>,
    attached: Vec<SlotId>,
    pub(crate) scrap: Vec<SlotId>,
    recycled: Vec<SlotId>,
    disappearing: Vec<SlotId>,
    pending_removal: Option<ChangeRange>,
    pre_layout: bool,
    measure_count: usize,
}

impl RecyclingPool {
    /// Creates an empty pool whose items all measure `item_size`.
    #[must_use]
    pub fn new(item_size: CellSize) -> Self {
        Self {
            item_size,
            ..Self::default()
        }
    }

    /// Makes the item at `index` measure `size` instead of the default.
    pub fn set_item_size(&mut self, index: usize, size: CellSize) {
        self.size_overrides.insert(index, size);
    }

    /// Switches how scrapped slots are matched in [`ViewPool::acquire`].
    ///
    /// In pre-layout, indices refer to positions before the pending change;
    /// otherwise they refer to positions after it.
    pub fn set_pre_layout(&mut self, pre_layout: bool) {
        self.pre_layout = pre_layout;
    }

    /// Flags the items in `start..start + count` as removed and shifts the
    /// adapter position of every bound slot after them.
    pub fn mark_removed(&mut self, start: usize, count: usize) {
        let range = ChangeRange { start, count };
        for record in &mut self.slots {
            if record.flags.contains(SlotFlags::RECYCLED) {
                continue;
            }
            record.adapter_position = shift_position(record.position, range);
            if record.adapter_position.is_none() {
                record.flags.insert(SlotFlags::REMOVED);
            }
        }
        self.pending_removal = Some(range);
    }

    /// Applies pending changes after a real layout pass.
    ///
    /// Bound slots adopt their adapter positions, and disappearing slots are
    /// recycled as if their exit animations had finished.
    pub fn commit_changes(&mut self) {
        for id in core::mem::take(&mut self.disappearing) {
            self.recycle(id);
        }
        for record in &mut self.slots {
            if record.flags.contains(SlotFlags::RECYCLED) {
                continue;
            }
            if let Some(position) = record.adapter_position {
                record.position = position;
            }
        }
        self.pending_removal = None;
        self.pre_layout = false;
    }

    /// Flags of `slot`.
    #[must_use]
    pub fn flags(&self, slot: SlotId) -> SlotFlags {
        self.record(slot).map_or(SlotFlags::empty(), |r| r.flags)
    }

    /// Last rect `slot` was positioned at while bound.
    #[must_use]
    pub fn rect_of(&self, slot: SlotId) -> Option<CellRect> {
        self.record(slot).and_then(|r| r.rect)
    }

    /// Slots in the visible set, in attach order.
    #[must_use]
    pub fn attached(&self) -> &[SlotId] {
        &self.attached
    }

    /// Slots kept on screen for an exit animation.
    #[must_use]
    pub fn disappearing(&self) -> &[SlotId] {
        &self.disappearing
    }

    /// Number of slots ever created.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of calls to [`ViewPool::measure`].
    #[must_use]
    pub const fn measure_count(&self) -> usize {
        self.measure_count
    }

    fn record(&self, slot: SlotId) -> Option<&SlotRecord> {
        let record = self.slots.get(slot.idx());
        debug_assert!(record.is_some(), "unknown slot {slot:?}");
        record
    }

    fn record_mut(&mut self, slot: SlotId) -> Option<&mut SlotRecord> {
        let record = self.slots.get_mut(slot.idx());
        debug_assert!(record.is_some(), "unknown slot {slot:?}");
        record
    }

    fn unlink(&mut self, slot: SlotId) {
        self.attached.retain(|&s| s != slot);
        self.scrap.retain(|&s| s != slot);
        self.disappearing.retain(|&s| s != slot);
    }

    fn recycle(&mut self, slot: SlotId) {
        if self.flags(slot).contains(SlotFlags::RECYCLED) {
            return;
        }
        self.unlink(slot);
        if let Some(record) = self.record_mut(slot) {
            record.flags = SlotFlags::RECYCLED;
            record.rect = None;
        }
        self.recycled.push(slot);
    }

    /// Pre-layout hands back removed slots for their old index; a real pass never does.
    fn matches(&self, record: &SlotRecord, index: usize) -> bool {
        if self.pre_layout {
            record.position == index
        } else {
            !record.flags.contains(SlotFlags::REMOVED) && record.adapter_position == Some(index)
        }
    }

    fn bind(&mut self, index: usize) -> SlotId {
        let (position, adapter_position) = match (self.pre_layout, self.pending_removal) {
            (true, Some(range)) => (index, shift_position(index, range)),
            _ => (index, Some(index)),
        };
        let flags = if adapter_position.is_none() {
            SlotFlags::REMOVED
        } else {
            SlotFlags::empty()
        };
        let record = SlotRecord {
            position,
            adapter_position,
            rect: None,
            flags,
        };
        if let Some(id) = self.recycled.pop() {
            self.slots[id.idx()] = record;
            id
        } else {
            let id = SlotId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
            self.slots.push(record);
            id
        }
    }
}

impl ViewPool for RecyclingPool {
    type Slot = SlotId;

    fn acquire(&mut self, index: usize) -> SlotId {
        let hit = self
            .scrap
            .iter()
            .copied()
            .find(|&id| self.matches(&self.slots[id.idx()], index));
        match hit {
            Some(id) => {
                self.scrap.retain(|&s| s != id);
                if let Some(record) = self.record_mut(id) {
                    record.flags.remove(SlotFlags::SCRAP);
                }
                id
            }
            None => self.bind(index),
        }
    }

    fn measure(&mut self, slot: &SlotId) -> CellSize {
        self.measure_count += 1;
        let position = self.record(*slot).map_or(0, |r| r.position);
        self.size_overrides
            .get(&position)
            .copied()
            .unwrap_or(self.item_size)
    }

    fn layout(&mut self, slot: &SlotId, rect: CellRect) {
        if let Some(record) = self.record_mut(*slot) {
            record.rect = Some(rect);
        }
    }

    fn attach(&mut self, slot: &SlotId) {
        let slot = *slot;
        if self.flags(slot).contains(SlotFlags::ATTACHED) {
            return;
        }
        self.unlink(slot);
        if let Some(record) = self.record_mut(slot) {
            record.flags.remove(SlotFlags::SCRAP | SlotFlags::DISAPPEARING);
            record.flags.insert(SlotFlags::ATTACHED);
        }
        self.attached.push(slot);
    }

    fn detach(&mut self, slot: &SlotId) {
        self.attached.retain(|s| s != slot);
        if let Some(record) = self.record_mut(*slot) {
            record.flags.remove(SlotFlags::ATTACHED);
        }
    }

    fn detach_and_recycle(&mut self, slot: &SlotId) {
        self.recycle(*slot);
    }

    fn detach_and_scrap(&mut self, slot: &SlotId) {
        let slot = *slot;
        self.unlink(slot);
        if let Some(record) = self.record_mut(slot) {
            record.flags.remove(SlotFlags::ATTACHED | SlotFlags::DISAPPEARING);
            record.flags.insert(SlotFlags::SCRAP);
        }
        self.scrap.push(slot);
    }

    fn detach_all_and_scrap(&mut self) {
        for slot in core::mem::take(&mut self.disappearing) {
            self.recycle(slot);
        }
        for slot in core::mem::take(&mut self.attached) {
            if let Some(record) = self.record_mut(slot) {
                record.flags.remove(SlotFlags::ATTACHED);
                record.flags.insert(SlotFlags::SCRAP);
            }
            self.scrap.push(slot);
        }
    }

    fn scrap_list(&self) -> &[SlotId] {
        &self.scrap
    }

    fn recycle_scrap(&mut self) {
        for slot in core::mem::take(&mut self.scrap) {
            self.recycle(slot);
        }
    }

    fn remove_all(&mut self) {
        let live: Vec<SlotId> = self
            .attached
            .iter()
            .chain(&self.scrap)
            .chain(&self.disappearing)
            .copied()
            .collect();
        for slot in live {
            self.recycle(slot);
        }
    }

    fn layout_disappearing(&mut self, slot: &SlotId, rect: CellRect) {
        let slot = *slot;
        self.unlink(slot);
        if let Some(record) = self.record_mut(slot) {
            record.rect = Some(rect);
            record.flags.remove(SlotFlags::SCRAP | SlotFlags::ATTACHED);
            record.flags.insert(SlotFlags::DISAPPEARING);
        }
        self.disappearing.push(slot);
    }

    fn is_flagged_removed(&self, slot: &SlotId) -> bool {
        self.flags(*slot).contains(SlotFlags::REMOVED)
    }

    fn layout_position(&self, slot: &SlotId) -> usize {
        self.record(*slot).map_or(0, |r| r.position)
    }

    fn adapter_position(&self, slot: &SlotId) -> Option<usize> {
        self.record(*slot).and_then(|r| r.adapter_position)
    }
}

/// Position of `position` after `range` is removed, or `None` if it was removed.
fn shift_position(position: usize, range: ChangeRange) -> Option<usize> {
    let removed = range.indices();
    if removed.contains(&position) {
        None
    } else if position >= removed.end {
        Some(position - range.count)
    } else {
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{RecyclingPool, SlotFlags};
    use crate::{CellRect, CellSize, ViewPool};

    #[test]
    fn scrap_is_preferred_for_the_same_index() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        let a = pool.acquire(3);
        pool.attach(&a);
        pool.detach_all_and_scrap();
        assert_eq!(pool.flags(a), SlotFlags::SCRAP);

        // A different index binds a fresh slot.
        let b = pool.acquire(4);
        assert_ne!(a, b);
        // The scrapped slot comes back for its own index.
        assert_eq!(pool.acquire(3), a);
        assert!(pool.scrap_list().is_empty());
    }

    #[test]
    fn recycled_slots_are_rebound() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        let a = pool.acquire(0);
        pool.attach(&a);
        pool.detach_and_recycle(&a);
        assert_eq!(pool.flags(a), SlotFlags::RECYCLED);

        let b = pool.acquire(42);
        assert_eq!(a, b);
        assert_eq!(pool.layout_position(&b), 42);
        assert_eq!(pool.slot_count(), 1);
    }

    #[test]
    fn removal_flags_and_shifts_bound_slots() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        let slots: Vec<_> = (0..6).map(|i| pool.acquire(i)).collect();
        for slot in &slots {
            pool.attach(slot);
        }
        pool.mark_removed(1, 2);

        assert_eq!(pool.adapter_position(&slots[0]), Some(0));
        assert!(pool.is_flagged_removed(&slots[1]));
        assert!(pool.is_flagged_removed(&slots[2]));
        assert_eq!(pool.adapter_position(&slots[2]), None);
        assert_eq!(pool.adapter_position(&slots[5]), Some(3));
        // Layout positions stay put until the change is committed.
        assert_eq!(pool.layout_position(&slots[5]), 5);

        pool.commit_changes();
        assert_eq!(pool.layout_position(&slots[5]), 3);
    }

    #[test]
    fn size_overrides_apply_per_index() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        pool.set_item_size(1, CellSize::new(50, 5));
        let a = pool.acquire(0);
        let b = pool.acquire(1);
        assert_eq!(pool.measure(&a), CellSize::new(10, 10));
        assert_eq!(pool.measure(&b), CellSize::new(50, 5));
        assert_eq!(pool.measure_count(), 2);
    }

    #[test]
    fn disappearing_slots_leave_scrap_and_recycle_on_commit() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        let a = pool.acquire(0);
        pool.attach(&a);
        pool.detach_all_and_scrap();
        pool.layout_disappearing(&a, CellRect::new(0, -10, 10, 10));
        assert!(pool.scrap_list().is_empty());
        assert_eq!(pool.disappearing(), &[a]);
        assert_eq!(pool.rect_of(a), Some(CellRect::new(0, -10, 10, 10)));

        pool.commit_changes();
        assert!(pool.disappearing().is_empty());
        assert!(pool.flags(a).contains(SlotFlags::RECYCLED));
    }

    #[test]
    fn next_pass_reuses_uncommitted_disappearing_slots() {
        let mut pool = RecyclingPool::new(CellSize::new(10, 10));
        for round in 0..5 {
            // Each round is one pass that leaves its only slot disappearing.
            pool.detach_all_and_scrap();
            let slot = pool.acquire(round);
            pool.attach(&slot);
            pool.detach_all_and_scrap();
            pool.layout_disappearing(&slot, CellRect::new(0, 0, 10, 10));
            assert_eq!(pool.disappearing(), &[slot]);
        }
        assert_eq!(pool.slot_count(), 1);

        pool.detach_all_and_scrap();
        assert!(pool.disappearing().is_empty());
        assert!(pool.scrap_list().is_empty());
    }
}
