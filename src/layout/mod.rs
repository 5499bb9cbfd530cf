//! Layout strategies.
//!
//! A [`Layout`] is plain configuration. Each pass turns it into an [`Arrangement`], the
//! geometry for one `(count, viewport, direction, metrics)` snapshot, which answers every
//! position and visibility query through [`LayoutStrategy`]. Arrangements are rebuilt rather
//! than patched, so swapping layouts never leaks cached positions from the previous one.

use alloc::sync::Arc;

use crate::coords::{Anchor, AxisMargins, Slot, cross_of, main_of};
use crate::{Direction, ItemMetrics, Orientation, Result, Size, VisibleRange};

mod cell_spanning;
mod grid;
mod list;

pub use cell_spanning::{
    CellSpanningArrangement, CellSpanningLayout, GroupInfo, ItemInfo, ItemInfoFn, MAX_SPAN_LINES,
};
pub use grid::{GridArrangement, GridLayout};
pub use list::{ListArrangement, ListLayout};

/// Supplies the content size and margins of the item at an index.
pub type ItemMetricsFn = Arc<dyn Fn(usize) -> ItemMetrics + Send + Sync>;

/// Geometry queries shared by all arrangements.
///
/// All offsets are logical: `main` runs along the scroll axis from the leading edge, `cross`
/// across it. [`crate::CoordinateMapper`] converts them to physical rectangles.
pub trait LayoutStrategy {
    fn count(&self) -> usize;

    /// Content length along the scroll axis.
    fn extent(&self) -> u64;

    /// Content length across the scroll axis.
    fn cross_extent(&self) -> u64;

    /// The content box of `index`, or `None` when out of range.
    fn position_of(&self, index: usize) -> Option<Slot>;

    /// The span used to scroll `index` into view.
    fn anchor_of(&self, index: usize) -> Option<Anchor>;

    /// Hit test: the item whose cell contains the logical point.
    fn index_at(&self, main: u64, cross: u64) -> Option<usize>;

    /// Items whose content box intersects `[offset, offset + viewport_main)`.
    ///
    /// Returns `None` iff the arrangement is empty.
    fn visible_range(&self, offset: u64, viewport_main: u32) -> Option<VisibleRange>;
}

/// Everything an arrangement is computed from.
pub struct ArrangeInput<'a> {
    pub count: usize,
    pub viewport: Size,
    pub direction: Direction,
    pub item_metrics: &'a (dyn Fn(usize) -> ItemMetrics + Send + Sync),
}

/// Layout configuration, dispatched as a closed set of strategies.
#[derive(Clone, Debug)]
pub enum Layout {
    List(ListLayout),
    Grid(GridLayout),
    CellSpanning(CellSpanningLayout),
}

impl Default for Layout {
    fn default() -> Self {
        Self::Grid(GridLayout::default())
    }
}

impl From<ListLayout> for Layout {
    fn from(l: ListLayout) -> Self {
        Self::List(l)
    }
}

impl From<GridLayout> for Layout {
    fn from(l: GridLayout) -> Self {
        Self::Grid(l)
    }
}

impl From<CellSpanningLayout> for Layout {
    fn from(l: CellSpanningLayout) -> Self {
        Self::CellSpanning(l)
    }
}

impl Layout {
    pub fn list() -> Self {
        Self::List(ListLayout::default())
    }

    pub fn grid() -> Self {
        Self::Grid(GridLayout::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Grid(_) => "grid",
            Self::CellSpanning(_) => "cell-spanning",
        }
    }

    pub fn orientation(&self) -> Orientation {
        match self {
            Self::List(l) => l.orientation,
            Self::Grid(l) => l.orientation,
            Self::CellSpanning(l) => l.orientation,
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        match self {
            Self::List(l) => l.orientation = orientation,
            Self::Grid(l) => l.orientation = orientation,
            Self::CellSpanning(l) => l.orientation = orientation,
        }
    }

    /// Cap on items per line. Lists always hold one item per line.
    pub fn maximum_rows_or_columns(&self) -> Option<u32> {
        match self {
            Self::List(_) => None,
            Self::Grid(l) => l.maximum_rows_or_columns,
            Self::CellSpanning(l) => l.maximum_rows_or_columns,
        }
    }

    /// Sets the per-line cap on grid-like layouts; ignored by lists.
    pub fn set_maximum_rows_or_columns(&mut self, max: Option<u32>) {
        match self {
            Self::List(_) => {}
            Self::Grid(l) => l.maximum_rows_or_columns = max,
            Self::CellSpanning(l) => l.maximum_rows_or_columns = max,
        }
    }

    /// Alias for [`Self::set_maximum_rows_or_columns`] on horizontal layouts.
    pub fn set_max_rows(&mut self, max: Option<u32>) {
        self.set_maximum_rows_or_columns(max);
    }

    pub fn validate(&self) -> Result<()> {
        if self.maximum_rows_or_columns() == Some(0) {
            return Err(crate::ListViewError::invalid(
                "maximum_rows_or_columns",
                "must be at least 1",
            ));
        }
        if let Self::CellSpanning(l) = self {
            l.validate()?;
        }
        Ok(())
    }

    pub fn arrange(&self, input: &ArrangeInput<'_>) -> Result<Arrangement> {
        self.validate()?;
        Ok(match self {
            Self::List(l) => Arrangement::List(ListArrangement::new(l, input)),
            Self::Grid(l) => Arrangement::Grid(GridArrangement::new(l, input)),
            Self::CellSpanning(l) => {
                Arrangement::CellSpanning(CellSpanningArrangement::new(l, input)?)
            }
        })
    }
}

/// Computed geometry for one pass.
#[derive(Clone, Debug)]
pub enum Arrangement {
    List(ListArrangement),
    Grid(GridArrangement),
    CellSpanning(CellSpanningArrangement),
}

macro_rules! dispatch {
    ($self:ident, $a:ident => $e:expr) => {
        match $self {
            Arrangement::List($a) => $e,
            Arrangement::Grid($a) => $e,
            Arrangement::CellSpanning($a) => $e,
        }
    };
}

impl LayoutStrategy for Arrangement {
    fn count(&self) -> usize {
        dispatch!(self, a => a.count())
    }

    fn extent(&self) -> u64 {
        dispatch!(self, a => a.extent())
    }

    fn cross_extent(&self) -> u64 {
        dispatch!(self, a => a.cross_extent())
    }

    fn position_of(&self, index: usize) -> Option<Slot> {
        dispatch!(self, a => a.position_of(index))
    }

    fn anchor_of(&self, index: usize) -> Option<Anchor> {
        dispatch!(self, a => a.anchor_of(index))
    }

    fn index_at(&self, main: u64, cross: u64) -> Option<usize> {
        dispatch!(self, a => a.index_at(main, cross))
    }

    fn visible_range(&self, offset: u64, viewport_main: u32) -> Option<VisibleRange> {
        dispatch!(self, a => a.visible_range(offset, viewport_main))
    }
}

/// One axis of an item's outer box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct AxisBox {
    pub(crate) lead: u32,
    pub(crate) size: u32,
    pub(crate) trail: u32,
}

impl AxisBox {
    pub(crate) fn outer(&self) -> u32 {
        self.lead.saturating_add(self.size).saturating_add(self.trail)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ItemBox {
    pub(crate) main: AxisBox,
    pub(crate) cross: AxisBox,
}

impl ItemBox {
    pub(crate) fn new(
        size: Size,
        margins: crate::Margins,
        orientation: Orientation,
        direction: Direction,
    ) -> Self {
        let m = AxisMargins::resolve(margins, orientation, direction);
        Self {
            main: AxisBox {
                lead: m.main_leading,
                size: main_of(size, orientation),
                trail: m.main_trailing,
            },
            cross: AxisBox {
                lead: m.cross_leading,
                size: cross_of(size, orientation),
                trail: m.cross_trailing,
            },
        }
    }

    pub(crate) fn from_metrics(
        metrics: ItemMetrics,
        orientation: Orientation,
        direction: Direction,
    ) -> Self {
        Self::new(metrics.size, metrics.margins, orientation, direction)
    }
}

/// Items per line: as many cells as fit across the viewport, at least one, at most `cap`.
pub(crate) fn items_per_line(viewport_cross: u32, pitch_cross: u64, cap: Option<u32>) -> usize {
    let fit = if pitch_cross == 0 {
        1
    } else {
        (viewport_cross as u64 / pitch_cross).max(1)
    };
    let fit = usize::try_from(fit).unwrap_or(usize::MAX);
    match cap {
        Some(cap) => fit.min(cap as usize),
        None => fit,
    }
}
