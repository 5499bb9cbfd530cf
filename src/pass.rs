use crate::layout::{Arrangement, Layout};
use crate::{CoordinateMapper, Direction, Size, VisibleRange};

/// Returned by every invalidating call; identifies the pass that will reflect it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassTicket {
    pub generation: u64,
}

/// Where the next pass should scroll to. The last one set before the pass wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollTarget {
    Offset(u64),
    FirstVisible(usize),
    EnsureVisible(usize),
}

/// Inputs a pass lays out with.
#[derive(Clone, Debug)]
pub struct LayoutParams {
    pub layout: Layout,
    pub direction: Direction,
    pub viewport: Size,
    pub count: usize,
}

/// Snapshot of one layout pass.
#[derive(Clone, Debug)]
pub struct LayoutPass {
    pub generation: u64,
    pub target: ScrollTarget,
    pub params: LayoutParams,
    pub arrangement: Arrangement,
    pub mapper: CoordinateMapper,
    pub scroll: u64,
    pub visible: Option<VisibleRange>,
}
