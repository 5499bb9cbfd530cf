use alloc::vec::Vec;

use super::{ArrangeInput, ItemBox, LayoutStrategy};
use crate::coords::{Anchor, Slot, Span};
use crate::fenwick::Fenwick;
use crate::{Orientation, VisibleRange};

/// One item per line, each line as long as its item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListLayout {
    pub orientation: Orientation,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
        }
    }
}

impl ListLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

#[derive(Clone, Debug)]
pub struct ListArrangement {
    items: Vec<ItemBox>,
    sums: Fenwick,
    cross_extent: u64,
}

impl ListArrangement {
    pub(crate) fn new(layout: &ListLayout, input: &ArrangeInput<'_>) -> Self {
        let items: Vec<ItemBox> = (0..input.count)
            .map(|i| {
                ItemBox::from_metrics((input.item_metrics)(i), layout.orientation, input.direction)
            })
            .collect();
        let sums = Fenwick::from_extents(items.iter().map(|b| b.main.outer() as u64));
        let cross_extent = items
            .iter()
            .map(|b| b.cross.outer() as u64)
            .max()
            .unwrap_or(0);
        Self {
            items,
            sums,
            cross_extent,
        }
    }

    fn content_main(&self, index: usize) -> Span {
        let b = &self.items[index].main;
        Span::new(self.sums.prefix_sum(index) + b.lead as u64, b.size)
    }
}

impl LayoutStrategy for ListArrangement {
    fn count(&self) -> usize {
        self.items.len()
    }

    fn extent(&self) -> u64 {
        self.sums.total()
    }

    fn cross_extent(&self) -> u64 {
        self.cross_extent
    }

    fn position_of(&self, index: usize) -> Option<Slot> {
        let b = self.items.get(index)?;
        Some(Slot {
            main: self.content_main(index),
            cross: Span::new(b.cross.lead as u64, b.cross.size),
        })
    }

    fn anchor_of(&self, index: usize) -> Option<Anchor> {
        let b = self.items.get(index)?;
        Some(Anchor {
            outer: Span::new(self.sums.prefix_sum(index), b.main.outer()),
            content: self.content_main(index),
        })
    }

    fn index_at(&self, main: u64, _cross: u64) -> Option<usize> {
        if self.items.is_empty() || main >= self.extent() {
            return None;
        }
        Some(self.sums.lower_bound(main).min(self.items.len() - 1))
    }

    fn visible_range(&self, offset: u64, viewport_main: u32) -> Option<VisibleRange> {
        let count = self.items.len();
        if count == 0 {
            return None;
        }
        let last_index = count - 1;
        let end = offset.saturating_add(viewport_main.max(1) as u64);

        let mut first = self.sums.lower_bound(offset).min(last_index);
        // The offset may sit in this item's trailing margin.
        if self.content_main(first).end() <= offset && first < last_index {
            first += 1;
        }

        let mut last = self.sums.lower_bound(end - 1).min(last_index);
        // Or the viewport may end inside the next item's leading margin.
        if self.content_main(last).start >= end && last > first {
            last -= 1;
        }

        Some(VisibleRange {
            first,
            last: last.max(first),
        })
    }
}
