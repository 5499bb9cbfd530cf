/// The axis along which a layout scrolls.
///
/// `Horizontal` layouts advance columns left to right (or right to left in RTL) and scroll
/// horizontally. `Vertical` layouts advance rows top to bottom and scroll vertically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Reading direction of the host container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Rtl)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    /// Put the item's leading edge at the viewport's leading edge.
    Start,
    /// Put the item's trailing edge at the viewport's trailing edge.
    End,
    /// Scroll as little as possible to bring the item fully into view.
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Size of the scrolled surface, which can outgrow `u32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub width: u64,
    pub height: u64,
}

/// Per-edge margins around an item's content box, in physical (screen) terms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Margins {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(m: u32) -> Self {
        Self::new(m, m, m, m)
    }
}

/// What the host measured for one item: its content size plus margins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemMetrics {
    pub size: Size,
    pub margins: Margins,
}

impl ItemMetrics {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            margins: Margins::new(0, 0, 0, 0),
        }
    }

    pub const fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }
}

/// A physical rectangle relative to the scrolled surface's origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRect {
    pub left: u64,
    pub top: u64,
    pub width: u32,
    pub height: u32,
}

impl ItemRect {
    pub fn right(&self) -> u64 {
        self.left.saturating_add(self.width as u64)
    }

    pub fn bottom(&self) -> u64 {
        self.top.saturating_add(self.height as u64)
    }
}

/// Inclusive range of visible item indexes.
///
/// APIs return `Option<VisibleRange>`; `None` means the collection is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleRange {
    pub first: usize,
    pub last: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

/// Half-open index range `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexRange {
    pub start: usize,
    pub end: usize, // exclusive
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

impl From<VisibleRange> for IndexRange {
    fn from(r: VisibleRange) -> Self {
        Self {
            start: r.first,
            end: r.last + 1,
        }
    }
}
