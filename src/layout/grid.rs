use super::{ArrangeInput, ItemBox, LayoutStrategy, items_per_line};
use crate::coords::{Anchor, Slot, Span, cross_of};
use crate::{Orientation, VisibleRange};

/// Uniform cells packed into lines across the scroll axis.
///
/// Every cell takes the outer size of item 0. With a horizontal orientation lines are
/// columns filled top to bottom; with a vertical one they are rows filled along the
/// reading direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLayout {
    pub orientation: Orientation,
    /// Cap on items per line. `None` fills as many as fit the viewport.
    pub maximum_rows_or_columns: Option<u32>,
}

impl GridLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_maximum_rows_or_columns(mut self, max: Option<u32>) -> Self {
        self.maximum_rows_or_columns = max;
        self
    }
}

#[derive(Clone, Debug)]
pub struct GridArrangement {
    count: usize,
    per_line: usize,
    lines: usize,
    cell: ItemBox,
}

impl GridArrangement {
    pub(crate) fn new(layout: &GridLayout, input: &ArrangeInput<'_>) -> Self {
        let cell = if input.count > 0 {
            ItemBox::from_metrics((input.item_metrics)(0), layout.orientation, input.direction)
        } else {
            ItemBox::default()
        };
        let per_line = items_per_line(
            cross_of(input.viewport, layout.orientation),
            cell.cross.outer() as u64,
            layout.maximum_rows_or_columns,
        );
        Self {
            count: input.count,
            per_line,
            lines: input.count.div_ceil(per_line),
            cell,
        }
    }

    pub fn items_per_line(&self) -> usize {
        self.per_line
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    fn pitch_main(&self) -> u64 {
        (self.cell.main.outer() as u64).max(1)
    }

    fn pitch_cross(&self) -> u64 {
        self.cell.cross.outer() as u64
    }

    fn line_content(&self, line: usize) -> Span {
        Span::new(
            line as u64 * self.pitch_main() + self.cell.main.lead as u64,
            self.cell.main.size,
        )
    }
}

impl LayoutStrategy for GridArrangement {
    fn count(&self) -> usize {
        self.count
    }

    fn extent(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.lines as u64 * self.pitch_main()
    }

    fn cross_extent(&self) -> u64 {
        self.per_line.min(self.count) as u64 * self.pitch_cross()
    }

    fn position_of(&self, index: usize) -> Option<Slot> {
        if index >= self.count {
            return None;
        }
        let slot = (index % self.per_line) as u64;
        Some(Slot {
            main: self.line_content(index / self.per_line),
            cross: Span::new(
                slot * self.pitch_cross() + self.cell.cross.lead as u64,
                self.cell.cross.size,
            ),
        })
    }

    fn anchor_of(&self, index: usize) -> Option<Anchor> {
        if index >= self.count {
            return None;
        }
        let line = index / self.per_line;
        Some(Anchor {
            outer: Span::new(line as u64 * self.pitch_main(), self.cell.main.outer()),
            content: self.line_content(line),
        })
    }

    fn index_at(&self, main: u64, cross: u64) -> Option<usize> {
        if self.count == 0 || main >= self.extent() {
            return None;
        }
        let line = (main / self.pitch_main()) as usize;
        let slot = match self.pitch_cross() {
            0 => 0,
            p => (cross / p) as usize,
        };
        if slot >= self.per_line {
            return None;
        }
        let index = line * self.per_line + slot;
        (index < self.count).then_some(index)
    }

    fn visible_range(&self, offset: u64, viewport_main: u32) -> Option<VisibleRange> {
        if self.count == 0 {
            return None;
        }
        let pitch = self.pitch_main();
        let last_line_index = self.lines - 1;
        let end = offset.saturating_add(viewport_main.max(1) as u64);

        let mut first_line = (offset / pitch).min(last_line_index as u64) as usize;
        if self.line_content(first_line).end() <= offset && first_line < last_line_index {
            first_line += 1;
        }

        let mut last_line = ((end - 1) / pitch).min(last_line_index as u64) as usize;
        if self.line_content(last_line).start >= end && last_line > first_line {
            last_line -= 1;
        }
        let last_line = last_line.max(first_line);

        let first = first_line * self.per_line;
        let last = (last_line + 1)
            .saturating_mul(self.per_line)
            .saturating_sub(1)
            .min(self.count - 1);
        Some(VisibleRange { first, last })
    }
}
