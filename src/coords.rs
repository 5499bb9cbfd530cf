use crate::layout::LayoutStrategy;
use crate::{Align, Direction, Extent, ItemRect, Margins, Orientation, Size};

/// A segment on one axis: `start` offset plus `size`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u64,
    pub size: u32,
}

impl Span {
    pub fn new(start: u64, size: u32) -> Self {
        Self { start, size }
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size as u64)
    }
}

/// An item's content box in logical coordinates.
///
/// `main` runs along the scroll axis and `cross` across it. Both are measured from the
/// leading edge, so they do not change when the direction flips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    pub main: Span,
    pub cross: Span,
}

/// What the engine scrolls to when bringing an item into view.
///
/// `outer` includes the margins of the line the item sits on; `content` does not.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub outer: Span,
    pub content: Span,
}

/// Margins resolved onto the logical axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisMargins {
    pub main_leading: u32,
    pub main_trailing: u32,
    pub cross_leading: u32,
    pub cross_trailing: u32,
}

impl AxisMargins {
    /// Picks which physical margin is leading on each axis.
    ///
    /// Only the x axis mirrors under RTL, so `top` stays leading on the y axis either way.
    pub fn resolve(margins: Margins, orientation: Orientation, direction: Direction) -> Self {
        let (x_leading, x_trailing) = if direction.is_rtl() {
            (margins.right, margins.left)
        } else {
            (margins.left, margins.right)
        };
        match orientation {
            Orientation::Horizontal => Self {
                main_leading: x_leading,
                main_trailing: x_trailing,
                cross_leading: margins.top,
                cross_trailing: margins.bottom,
            },
            Orientation::Vertical => Self {
                main_leading: margins.top,
                main_trailing: margins.bottom,
                cross_leading: x_leading,
                cross_trailing: x_trailing,
            },
        }
    }
}

pub(crate) fn main_of(size: Size, orientation: Orientation) -> u32 {
    match orientation {
        Orientation::Horizontal => size.width,
        Orientation::Vertical => size.height,
    }
}

pub(crate) fn cross_of(size: Size, orientation: Orientation) -> u32 {
    match orientation {
        Orientation::Horizontal => size.height,
        Orientation::Vertical => size.width,
    }
}

/// Physical scroll offsets for the host's scroll container.
///
/// `left` is measured from the physical left edge, so in RTL a horizontal layout at logical
/// scroll 0 reports `left == max_scroll`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollPoint {
    pub left: u64,
    pub top: u64,
}

/// Converts between the logical space layouts work in and the physical space hosts see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinateMapper {
    orientation: Orientation,
    direction: Direction,
    viewport: Size,
    extent: u64,
    cross_extent: u64,
}

impl CoordinateMapper {
    pub fn new(
        orientation: Orientation,
        direction: Direction,
        viewport: Size,
        extent: u64,
        cross_extent: u64,
    ) -> Self {
        Self {
            orientation,
            direction,
            viewport,
            extent,
            cross_extent,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn viewport_main(&self) -> u32 {
        main_of(self.viewport, self.orientation)
    }

    pub fn viewport_cross(&self) -> u32 {
        cross_of(self.viewport, self.orientation)
    }

    /// Length of the scrolled surface along the scroll axis.
    pub fn surface_main(&self) -> u64 {
        self.extent.max(self.viewport_main() as u64)
    }

    /// Length of the scrolled surface across the scroll axis.
    pub fn surface_cross(&self) -> u64 {
        self.cross_extent.max(self.viewport_cross() as u64)
    }

    /// Physical size of the scrolled surface.
    pub fn surface(&self) -> Extent {
        match self.orientation {
            Orientation::Horizontal => Extent {
                width: self.surface_main(),
                height: self.surface_cross(),
            },
            Orientation::Vertical => Extent {
                width: self.surface_cross(),
                height: self.surface_main(),
            },
        }
    }

    pub fn max_scroll(&self) -> u64 {
        self.extent.saturating_sub(self.viewport_main() as u64)
    }

    pub fn clamp_scroll(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll())
    }

    fn mirror_x(&self, start: u64, size: u32, surface: u64) -> u64 {
        if self.direction.is_rtl() {
            surface.saturating_sub(start).saturating_sub(size as u64)
        } else {
            start
        }
    }

    pub fn to_physical(&self, slot: Slot) -> ItemRect {
        match self.orientation {
            Orientation::Horizontal => ItemRect {
                left: self.mirror_x(slot.main.start, slot.main.size, self.surface_main()),
                top: slot.cross.start,
                width: slot.main.size,
                height: slot.cross.size,
            },
            Orientation::Vertical => ItemRect {
                left: self.mirror_x(slot.cross.start, slot.cross.size, self.surface_cross()),
                top: slot.main.start,
                width: slot.cross.size,
                height: slot.main.size,
            },
        }
    }

    /// Maps a physical point on the surface to `(main, cross)`.
    ///
    /// Returns `None` for points outside the surface.
    pub fn to_logical(&self, x: u64, y: u64) -> Option<(u64, u64)> {
        let surface = self.surface();
        if x >= surface.width || y >= surface.height {
            return None;
        }
        let x = if self.direction.is_rtl() {
            surface.width - 1 - x
        } else {
            x
        };
        Some(match self.orientation {
            Orientation::Horizontal => (x, y),
            Orientation::Vertical => (y, x),
        })
    }

    /// Computes the scroll offset that brings `anchor` into view.
    ///
    /// `Start` snaps to 0 when the anchor's line begins at the content origin, so a leading
    /// margin on the first line is never scrolled out of view.
    pub fn offset_to_scroll(&self, anchor: Anchor, align: Align, current: u64) -> u64 {
        let view = self.viewport_main() as u64;
        let start = if anchor.outer.start == 0 {
            0
        } else {
            anchor.content.start
        };
        let end = anchor.content.end().saturating_sub(view);

        let target = match align {
            Align::Start => start,
            Align::End => end,
            Align::Auto => {
                let cur_end = current.saturating_add(view);
                if anchor.content.start >= current && anchor.content.end() <= cur_end {
                    current
                } else if anchor.content.start < current {
                    start
                } else {
                    end
                }
            }
        };

        self.clamp_scroll(target)
    }

    /// Index of the first visible item at `scroll`.
    pub fn scroll_to_index(&self, scroll: u64, strategy: &impl LayoutStrategy) -> Option<usize> {
        strategy
            .visible_range(self.clamp_scroll(scroll), self.viewport_main())
            .map(|r| r.first)
    }

    pub fn to_scroll_point(&self, scroll: u64) -> ScrollPoint {
        match self.orientation {
            Orientation::Horizontal => ScrollPoint {
                left: if self.direction.is_rtl() {
                    self.max_scroll().saturating_sub(scroll)
                } else {
                    scroll
                },
                top: 0,
            },
            Orientation::Vertical => ScrollPoint {
                left: 0,
                top: scroll,
            },
        }
    }
}
