//! The realized-item window and its loading state machine.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::source::{FetchId, FetchRequest};
use crate::{IndexRange, ItemRect, VisibleRange};

/// Progress of the current pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadingState {
    /// No pass has started yet.
    #[default]
    Idle,
    /// The window is computed; visible items are not realized yet.
    ItemsLoading,
    /// Visible items are realized and positioned.
    ViewPortLoaded,
    /// Look-ahead items are realized.
    ItemsLoaded,
    /// Items outside the window are released; nothing is pending.
    Complete,
}

pub type LoadingStateCallback = Arc<dyn Fn(LoadingState) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// A rendered element and where it sits on the surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealizedItem<E> {
    pub index: usize,
    pub element: E,
    pub rect: ItemRect,
}

/// Visible range plus the look-ahead window around it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowPlan {
    pub visible: IndexRange,
    pub window: IndexRange,
}

impl WindowPlan {
    /// Extends `visible` by `pages_to_load / 2` pages on each side, one page being the
    /// visible item count.
    pub fn new(visible: Option<VisibleRange>, count: usize, pages_to_load: usize) -> Self {
        let Some(visible) = visible else {
            return Self::default();
        };
        let reach = (pages_to_load / 2).saturating_mul(visible.len());
        Self {
            visible: visible.into(),
            window: IndexRange::new(
                visible.first.saturating_sub(reach),
                visible.last.saturating_add(reach).saturating_add(1).min(count),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    range: IndexRange,
    generation: u64,
}

/// Owns realized elements, fetch bookkeeping and loading-state listeners.
pub struct WindowManager<E> {
    state: LoadingState,
    realized: BTreeMap<usize, RealizedItem<E>>,
    in_flight: BTreeMap<FetchId, InFlight>,
    failed: Vec<IndexRange>,
    next_fetch_id: u64,
    listeners: Vec<(ListenerId, LoadingStateCallback)>,
    next_listener_id: u64,
}

impl<E> Default for WindowManager<E> {
    fn default() -> Self {
        Self {
            state: LoadingState::Idle,
            realized: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            failed: Vec::new(),
            next_fetch_id: 0,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for WindowManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowManager")
            .field("state", &self.state)
            .field("realized", &self.realized.len())
            .field("in_flight", &self.in_flight.len())
            .field("failed", &self.failed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> WindowManager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadingState {
        self.state
    }

    pub fn add_listener(&mut self, f: impl Fn(LoadingState) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Arc::new(f)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Moves to `state` and notifies listeners; re-entering the current state is a no-op.
    pub fn enter(&mut self, state: LoadingState) {
        if self.state == state {
            return;
        }
        ttrace!(from = ?self.state, to = ?state, "WindowManager::enter");
        self.state = state;
        for (_, f) in &self.listeners {
            f(state);
        }
    }

    /// Starts over at `ItemsLoading` for pass `generation`. Outstanding fetches that overlap
    /// `keep` move to the new pass; the rest become stale.
    pub fn invalidate(&mut self, keep: IndexRange, generation: u64) {
        self.in_flight.retain(|_, f| {
            let overlaps = f.range.start < keep.end && keep.start < f.range.end;
            if overlaps {
                f.generation = generation;
            }
            overlaps
        });
        self.failed.clear();
        self.enter(LoadingState::ItemsLoading);
    }

    /// Drops every realized element.
    pub fn clear(&mut self) {
        self.realized.clear();
    }

    pub fn len(&self) -> usize {
        self.realized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realized.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RealizedItem<E>> {
        self.realized.get(&index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RealizedItem<E>> {
        self.realized.get_mut(&index)
    }

    pub fn is_realized(&self, index: usize) -> bool {
        self.realized.contains_key(&index)
    }

    /// Realized items in index order.
    pub fn iter(&self) -> impl Iterator<Item = &RealizedItem<E>> {
        self.realized.values()
    }

    pub fn realize(&mut self, index: usize, element: E, rect: ItemRect) {
        self.realized.insert(
            index,
            RealizedItem {
                index,
                element,
                rect,
            },
        );
    }

    /// Recomputes rects in place, dropping items `rect` no longer places.
    pub fn reposition(&mut self, mut rect: impl FnMut(usize) -> Option<ItemRect>) {
        self.realized.retain(|&index, item| match rect(index) {
            Some(r) => {
                item.rect = r;
                true
            }
            None => false,
        });
    }

    /// Releases items outside `window`; returns how many were dropped.
    pub fn release_outside(&mut self, window: IndexRange) -> usize {
        let before = self.realized.len();
        self.realized.retain(|&index, _| window.contains(index));
        before - self.realized.len()
    }

    fn is_requested(&self, index: usize) -> bool {
        self.in_flight.values().any(|f| f.range.contains(index))
            || self.failed.iter().any(|r| r.contains(index))
    }

    /// Contiguous runs in `range` that are neither realized, in flight nor failed.
    pub fn missing_runs(&self, range: IndexRange) -> Vec<IndexRange> {
        let mut runs = Vec::new();
        let mut run: Option<IndexRange> = None;
        for index in range.start..range.end {
            if self.is_realized(index) || self.is_requested(index) {
                if let Some(r) = run.take() {
                    runs.push(r);
                }
                continue;
            }
            match run.as_mut() {
                Some(r) => r.end = index + 1,
                None => run = Some(IndexRange::new(index, index + 1)),
            }
        }
        runs.extend(run);
        runs
    }

    /// Records a fetch for `run` and returns the request to hand to the data source.
    pub fn begin_fetch(&mut self, run: IndexRange, generation: u64) -> FetchRequest {
        let id = FetchId(self.next_fetch_id);
        self.next_fetch_id += 1;
        self.in_flight.insert(
            id,
            InFlight {
                range: run,
                generation,
            },
        );
        FetchRequest {
            id,
            generation,
            index: run.start,
            count_before: 0,
            count_after: run.len().saturating_sub(1),
        }
    }

    /// Removes a fetch from the in-flight set. `None` when it is unknown or stale.
    pub fn finish_fetch(&mut self, id: FetchId, generation: u64) -> Option<IndexRange> {
        let f = self.in_flight.remove(&id)?;
        (f.generation == generation).then_some(f.range)
    }

    pub fn mark_failed(&mut self, range: IndexRange) {
        self.failed.push(range);
    }

    pub fn pending_fetches(&self) -> usize {
        self.in_flight.len()
    }

    /// True when every index in `range` is realized.
    pub fn covers(&self, range: IndexRange) -> bool {
        (range.start..range.end).all(|i| self.is_realized(i))
    }
}
