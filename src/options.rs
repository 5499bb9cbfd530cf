use alloc::sync::Arc;

use crate::layout::{ItemMetricsFn, Layout};
use crate::{Direction, ErrorCallback, ItemMetrics, Size};

/// Configuration for [`crate::ListView`].
///
/// Cheap to clone: closures are stored in `Arc`s.
pub struct ListViewOptions {
    pub layout: Layout,
    pub direction: Direction,
    /// Size of the host's scroll container.
    pub viewport: Size,
    /// Content size and margins of each item, as the host measured them.
    pub item_metrics: ItemMetricsFn,
    /// Viewport pages kept realized around the visible range, split evenly before and after.
    pub pages_to_load: usize,
    /// Scroll so this index is first visible on the first pass. Wins over
    /// `initial_scroll_position`.
    pub initial_first_visible: Option<usize>,
    pub initial_scroll_position: Option<u64>,
    /// Receives errors found while a pass runs.
    pub on_error: Option<ErrorCallback>,
}

impl Clone for ListViewOptions {
    fn clone(&self) -> Self {
        Self {
            layout: self.layout.clone(),
            direction: self.direction,
            viewport: self.viewport,
            item_metrics: Arc::clone(&self.item_metrics),
            pages_to_load: self.pages_to_load,
            initial_first_visible: self.initial_first_visible,
            initial_scroll_position: self.initial_scroll_position,
            on_error: self.on_error.clone(),
        }
    }
}

impl core::fmt::Debug for ListViewOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListViewOptions")
            .field("layout", &self.layout)
            .field("direction", &self.direction)
            .field("viewport", &self.viewport)
            .field("pages_to_load", &self.pages_to_load)
            .field("initial_first_visible", &self.initial_first_visible)
            .field("initial_scroll_position", &self.initial_scroll_position)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl ListViewOptions {
    pub const DEFAULT_PAGES_TO_LOAD: usize = 5;

    /// Creates options for a grid layout with default settings.
    pub fn new(
        viewport: Size,
        item_metrics: impl Fn(usize) -> ItemMetrics + Send + Sync + 'static,
    ) -> Self {
        Self {
            layout: Layout::default(),
            direction: Direction::Ltr,
            viewport,
            item_metrics: Arc::new(item_metrics),
            pages_to_load: Self::DEFAULT_PAGES_TO_LOAD,
            initial_first_visible: None,
            initial_scroll_position: None,
            on_error: None,
        }
    }

    /// Every item has the same metrics.
    pub fn uniform(viewport: Size, metrics: ItemMetrics) -> Self {
        Self::new(viewport, move |_| metrics)
    }

    pub fn with_layout(mut self, layout: impl Into<Layout>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_item_metrics(
        mut self,
        f: impl Fn(usize) -> ItemMetrics + Send + Sync + 'static,
    ) -> Self {
        self.item_metrics = Arc::new(f);
        self
    }

    pub fn with_pages_to_load(mut self, pages_to_load: usize) -> Self {
        self.pages_to_load = pages_to_load;
        self
    }

    pub fn with_initial_first_visible(mut self, index: usize) -> Self {
        self.initial_first_visible = Some(index);
        self
    }

    pub fn with_initial_scroll_position(mut self, offset: u64) -> Self {
        self.initial_scroll_position = Some(offset);
        self
    }

    pub fn with_on_error(
        mut self,
        f: impl Fn(&crate::ListViewError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}
