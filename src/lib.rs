//! A headless, UI-agnostic virtualized list/grid layout engine.
//!
//! Given a large collection, the engine realizes only the items near the viewport and
//! computes their positions under a list, uniform grid or cell-spanning layout, in either
//! reading direction. Scroll position and first/last visible index stay consistent with
//! each other, and any change to the container, layout or item metrics lays the view out
//! again.
//!
//! It is UI-agnostic. The host is expected to provide:
//! - the viewport size and scroll events
//! - per-item metrics (content size plus margins)
//! - a paged [`ItemDataSource`] and an [`ItemRenderer`] that builds elements
//!
//! Work is cooperative: setters mark the view dirty and [`ListView::process`] runs the pass.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod coords;
mod error;
mod fenwick;
pub mod layout;
mod list_view;
mod options;
mod pass;
mod source;
mod state;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use coords::{Anchor, AxisMargins, CoordinateMapper, ScrollPoint, Slot, Span};
pub use error::{DataSourceError, ErrorCallback, ListViewError, Result};
pub use layout::{
    Arrangement, CellSpanningLayout, GridLayout, GroupInfo, ItemInfo, Layout, LayoutStrategy,
    ListLayout,
};
pub use list_view::ListView;
pub use options::ListViewOptions;
pub use pass::{LayoutParams, LayoutPass, PassTicket, ScrollTarget};
pub use source::{Fetch, FetchId, FetchRequest, ItemDataSource, ItemRenderer, ItemsPage};
pub use state::{ViewState, ViewportState};
pub use types::{
    Align, Direction, Extent, IndexRange, ItemMetrics, ItemRect, Margins, Orientation, Size,
    VisibleRange,
};
pub use window::{
    ListenerId, LoadingState, LoadingStateCallback, RealizedItem, WindowManager, WindowPlan,
};
