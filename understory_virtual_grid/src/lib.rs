// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_virtual_grid --heading-base-level=0

//! Understory Virtual Grid: a fixed-cell, two-axis virtualized grid engine.
//!
//! This crate positions a bounded window of grid cells drawn from a
//! potentially large dataset and recycles the views behind them instead of
//! materializing every item. All cells share one size, measured once from the
//! first item.
//!
//! The core concepts are:
//!
//! - [`GridVirtualizer`]: the engine. It owns a [`VirtualizerState`] (scroll
//!   anchor, grid shape, pending removal range) and the [`Placement`]s from
//!   the last pass, and implements [`LayoutEngine`].
//! - [`ViewPool`]: the host's pool of item views. The engine acquires, positions,
//!   attaches, scraps, and recycles opaque slot handles through it.
//! - [`DataSource`]: the item count for the current pass and whether that pass
//!   is a predictive pre-layout.
//! - [`RemovalCache`]: the per-pass classification of removed indices into
//!   [`Removal::Visible`] and [`Removal::Invisible`], used to animate changes.
//! - [`RecyclingPool`]: an in-memory [`ViewPool`] for headless hosts and tests.
//!
//! This crate does **not** draw anything, bind item content, or define
//! animation curves. Host frameworks are responsible for:
//!
//! - Serializing layout passes on the thread that owns the rendering surface.
//! - Calling [`LayoutEngine::on_pre_layout`] then [`LayoutEngine::on_real_layout`]
//!   when the dataset changes, and [`LayoutEngine::on_real_layout`] on resize
//!   or configuration changes (see [`GridVirtualizer::needs_layout`]).
//! - Forwarding scroll deltas to [`GridVirtualizer::scroll_horizontally_by`] and
//!   [`GridVirtualizer::scroll_vertically_by`].
//! - Forwarding removal notifications to [`LayoutEngine::on_items_removed`].
//!
//! ## Minimal example
//!
//! ```rust
//! use core::num::NonZeroUsize;
//! use understory_virtual_grid::{
//!     CellSize, GridVirtualizer, LayoutEngine, PassContext, RecyclingPool, Removal,
//!     ViewportSize,
//! };
//!
//! // Items are 100×100; the viewport shows a bit more than 3×3 of them.
//! let mut pool = RecyclingPool::new(CellSize::new(100, 100));
//! let mut grid = GridVirtualizer::new().with_columns(NonZeroUsize::new(5).unwrap());
//! grid.set_viewport_size(ViewportSize::new(320, 320));
//!
//! grid.on_real_layout(&mut pool, &PassContext::real(200));
//! assert_eq!(grid.anchor().position, 0);
//! assert!(grid.visible_indices().all(|i| i < 200));
//!
//! // Two items far below the window are removed.
//! grid.on_items_removed(150, 2);
//! let removals = grid.on_pre_layout(&mut pool, &PassContext::pre(200));
//! assert_eq!(removals.get(150), Some(Removal::Invisible));
//! grid.on_real_layout(&mut pool, &PassContext::real(198));
//! assert!(grid.state().pending_change().is_none());
//! ```
//!
//! ## Features
//!
//! - `std` *(default)*: enables `std` support in optional dependencies.
//! - `libm`: `no_std` math support for optional dependencies.
//! - `kurbo`: `From` conversions from [`CellRect`] and [`CellSize`] into
//!   `kurbo::Rect` and `kurbo::Size`.
//!
//! All geometry is in integer pixels. This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod geometry;
mod pool;
pub mod recycler;
mod state;
mod virtualizer;

pub use geometry::{CellRect, CellSize, ViewportSize};
pub use pool::{DataSource, PassContext, ViewPool};
pub use recycler::{RecyclingPool, SlotFlags, SlotId};
pub use state::{
    Anchor, ChangeRange, FillDirection, Placement, Removal, RemovalCache, VirtualizerState,
};
pub use virtualizer::{GridVirtualizer, LayoutEngine};
