use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use super::{ArrangeInput, ItemBox, LayoutStrategy, items_per_line};
use crate::coords::{Anchor, Slot, Span, cross_of, main_of};
use crate::{ListViewError, Orientation, Result, Size, VisibleRange};

/// Base cell size shared by every item in a cell-spanning layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupInfo {
    /// When false every item occupies exactly one cell.
    pub enable_cell_spanning: bool,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GroupInfo {
    pub fn new(cell_width: u32, cell_height: u32) -> Self {
        Self {
            enable_cell_spanning: true,
            cell_width,
            cell_height,
        }
    }
}

/// Content size of one item; it spans as many cells as its outer box needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemInfo {
    pub width: u32,
    pub height: u32,
}

impl ItemInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub type ItemInfoFn = Arc<dyn Fn(usize) -> ItemInfo + Send + Sync>;

/// Most lines a single item may span along the scroll axis.
pub const MAX_SPAN_LINES: usize = 4096;

/// Grid of base cells in which items may span several cells.
///
/// Items are packed in index order. Each item takes the first position, scanning lines
/// from the earliest one with a free cell and slots from the leading edge, where its whole
/// span is free.
pub struct CellSpanningLayout {
    pub orientation: Orientation,
    pub maximum_rows_or_columns: Option<u32>,
    pub group_info: GroupInfo,
    pub item_info: ItemInfoFn,
}

impl Clone for CellSpanningLayout {
    fn clone(&self) -> Self {
        Self {
            orientation: self.orientation,
            maximum_rows_or_columns: self.maximum_rows_or_columns,
            group_info: self.group_info,
            item_info: Arc::clone(&self.item_info),
        }
    }
}

impl fmt::Debug for CellSpanningLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellSpanningLayout")
            .field("orientation", &self.orientation)
            .field("maximum_rows_or_columns", &self.maximum_rows_or_columns)
            .field("group_info", &self.group_info)
            .finish_non_exhaustive()
    }
}

impl CellSpanningLayout {
    pub fn new(
        group_info: GroupInfo,
        item_info: impl Fn(usize) -> ItemInfo + Send + Sync + 'static,
    ) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            maximum_rows_or_columns: None,
            group_info,
            item_info: Arc::new(item_info),
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_maximum_rows_or_columns(mut self, max: Option<u32>) -> Self {
        self.maximum_rows_or_columns = max;
        self
    }

    pub fn with_item_info(
        mut self,
        item_info: impl Fn(usize) -> ItemInfo + Send + Sync + 'static,
    ) -> Self {
        self.item_info = Arc::new(item_info);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.group_info.cell_width == 0 {
            return Err(ListViewError::invalid("cell_width", "must be non-zero"));
        }
        if self.group_info.cell_height == 0 {
            return Err(ListViewError::invalid("cell_height", "must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Placement {
    line: usize,
    lines: usize,
    slot: usize,
    slots: usize,
    content: Slot,
}

/// Cell occupancy, line-major. Cells past the end are free.
struct Occupancy {
    per_line: usize,
    cells: Vec<bool>,
}

impl Occupancy {
    fn is_taken(&self, line: usize, slot: usize) -> bool {
        self.cells
            .get(line * self.per_line + slot)
            .copied()
            .unwrap_or(false)
    }

    fn line_full(&self, line: usize) -> bool {
        (0..self.per_line).all(|s| self.is_taken(line, s))
    }

    fn fits(&self, line: usize, slot: usize, lines: usize, slots: usize) -> bool {
        (line..line + lines).all(|l| (slot..slot + slots).all(|s| !self.is_taken(l, s)))
    }

    fn fill(&mut self, line: usize, slot: usize, lines: usize, slots: usize) {
        let needed = (line + lines) * self.per_line;
        if self.cells.len() < needed {
            self.cells.resize(needed, false);
        }
        for l in line..line + lines {
            for s in slot..slot + slots {
                self.cells[l * self.per_line + s] = true;
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct CellSpanningArrangement {
    per_line: usize,
    cell_main: u64,
    cell_cross: u64,
    lines: usize,
    placements: Vec<Placement>,
    /// First line with a free cell when each item was placed; non-decreasing.
    floors: Vec<usize>,
    /// Line past the furthest end of items `0..=i`; non-decreasing.
    reach: Vec<usize>,
}

impl CellSpanningArrangement {
    pub(crate) fn new(layout: &CellSpanningLayout, input: &ArrangeInput<'_>) -> Result<Self> {
        let cell = Size::new(layout.group_info.cell_width, layout.group_info.cell_height);
        let cell_main = main_of(cell, layout.orientation).max(1) as u64;
        let cell_cross = cross_of(cell, layout.orientation).max(1) as u64;
        let per_line = items_per_line(
            cross_of(input.viewport, layout.orientation),
            cell_cross,
            layout.maximum_rows_or_columns,
        );

        let mut occupancy = Occupancy {
            per_line,
            cells: Vec::new(),
        };
        let mut placements = Vec::with_capacity(input.count);
        let mut floors = Vec::with_capacity(input.count);
        let mut reach = Vec::with_capacity(input.count);
        let mut floor = 0usize;
        let mut lines = 0usize;

        for i in 0..input.count {
            let info = (layout.item_info)(i);
            let metrics = (input.item_metrics)(i);
            let b = ItemBox::new(
                Size::new(info.width, info.height),
                metrics.margins,
                layout.orientation,
                input.direction,
            );
            let (span_lines, span_slots) = if layout.group_info.enable_cell_spanning {
                (
                    (b.main.outer() as u64).div_ceil(cell_main).max(1) as usize,
                    ((b.cross.outer() as u64).div_ceil(cell_cross) as usize).clamp(1, per_line),
                )
            } else {
                (1, 1)
            };
            if span_lines > MAX_SPAN_LINES {
                twarn!(
                    index = i,
                    span_lines,
                    "CellSpanningArrangement: item spans too many lines"
                );
                return Err(ListViewError::invalid(
                    "item_info",
                    "item spans more than MAX_SPAN_LINES lines",
                ));
            }

            while occupancy.line_full(floor) {
                floor += 1;
            }
            floors.push(floor);

            let mut line = floor;
            let slot = loop {
                if let Some(s) = (0..=per_line - span_slots)
                    .find(|&s| occupancy.fits(line, s, span_lines, span_slots))
                {
                    break s;
                }
                line += 1;
            };
            occupancy.fill(line, slot, span_lines, span_slots);
            lines = lines.max(line + span_lines);
            reach.push(lines);

            placements.push(Placement {
                line,
                lines: span_lines,
                slot,
                slots: span_slots,
                content: Slot {
                    main: Span::new(line as u64 * cell_main + b.main.lead as u64, b.main.size),
                    cross: Span::new(
                        slot as u64 * cell_cross + b.cross.lead as u64,
                        b.cross.size,
                    ),
                },
            });
        }

        Ok(Self {
            per_line,
            cell_main,
            cell_cross,
            lines,
            placements,
            floors,
            reach,
        })
    }

    pub fn items_per_line(&self) -> usize {
        self.per_line
    }

    /// First index whose item, or any earlier one, reaches past `main`. Items before it end
    /// at or before `main`.
    fn first_reaching(&self, main: u64) -> usize {
        self.reach.partition_point(|&line| line as u64 * self.cell_main <= main)
    }

    fn outer_main(&self, p: &Placement) -> Span {
        Span::new(
            p.line as u64 * self.cell_main,
            (p.lines as u64 * self.cell_main).min(u32::MAX as u64) as u32,
        )
    }
}

impl LayoutStrategy for CellSpanningArrangement {
    fn count(&self) -> usize {
        self.placements.len()
    }

    fn extent(&self) -> u64 {
        self.lines as u64 * self.cell_main
    }

    fn cross_extent(&self) -> u64 {
        if self.placements.is_empty() {
            return 0;
        }
        self.per_line as u64 * self.cell_cross
    }

    fn position_of(&self, index: usize) -> Option<Slot> {
        self.placements.get(index).map(|p| p.content)
    }

    fn anchor_of(&self, index: usize) -> Option<Anchor> {
        let p = self.placements.get(index)?;
        Some(Anchor {
            outer: self.outer_main(p),
            content: p.content.main,
        })
    }

    fn index_at(&self, main: u64, cross: u64) -> Option<usize> {
        let start = self.first_reaching(main);
        for (i, p) in self.placements.iter().enumerate().skip(start) {
            if self.floors[i] as u64 * self.cell_main > main {
                break;
            }
            let outer = self.outer_main(p);
            let slot_start = p.slot as u64 * self.cell_cross;
            let slot_end = (p.slot + p.slots) as u64 * self.cell_cross;
            if main >= outer.start && main < outer.end() && cross >= slot_start && cross < slot_end
            {
                return Some(i);
            }
        }
        None
    }

    fn visible_range(&self, offset: u64, viewport_main: u32) -> Option<VisibleRange> {
        if self.placements.is_empty() {
            return None;
        }
        let end = offset.saturating_add(viewport_main.max(1) as u64);
        let start = self.first_reaching(offset);
        let mut range: Option<VisibleRange> = None;
        for (i, p) in self.placements.iter().enumerate().skip(start) {
            // Every later item starts at or after this floor.
            if self.floors[i] as u64 * self.cell_main >= end {
                break;
            }
            let c = p.content.main;
            if c.start < end && c.end() > offset {
                range = Some(match range {
                    None => VisibleRange { first: i, last: i },
                    Some(r) => VisibleRange {
                        first: r.first,
                        last: i,
                    },
                });
            }
        }
        range.or_else(|| {
            let last = self.placements.len() - 1;
            let i = (start.min(last)..=last)
                .find(|&i| self.placements[i].content.main.end() > offset)
                .unwrap_or(last);
            Some(VisibleRange { first: i, last: i })
        })
    }
}
