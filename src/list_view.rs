use alloc::boxed::Box;
use alloc::vec::Vec;
use core::{fmt, mem};

use crate::layout::{ArrangeInput, Layout, LayoutStrategy};
use crate::pass::{LayoutParams, LayoutPass, PassTicket, ScrollTarget};
use crate::source::{Fetch, FetchId, ItemDataSource, ItemRenderer, ItemsPage};
use crate::window::{ListenerId, LoadingState, RealizedItem, WindowManager, WindowPlan};
use crate::{
    Align, CoordinateMapper, DataSourceError, Direction, Extent, IndexRange, ItemMetrics,
    ItemRect, ListViewError, ListViewOptions, Result, ScrollPoint, Size, ViewState,
    ViewportState, VisibleRange,
};

type Continuation<D, R> = Box<dyn FnOnce(&mut ListView<D, R>)>;

/// A virtualized list/grid view.
///
/// Setters only record what changed and return a [`PassTicket`]. Nothing is laid out until
/// the host calls [`ListView::process`], so any number of changes made in between collapse
/// into a single pass. When the data source answers [`Fetch::Pending`] the pass stalls
/// until the host calls [`ListView::resolve_fetch`].
pub struct ListView<D, R>
where
    D: ItemDataSource,
    R: ItemRenderer<D::Item>,
{
    options: ListViewOptions,
    source: D,
    renderer: R,
    window: WindowManager<R::Element>,

    pass: LayoutPass,
    generation: u64,
    completed_generation: u64,
    dirty: bool,
    relayout: bool,
    target: Option<ScrollTarget>,

    /// Last offset pushed to the host; zeroed by `viewport_scroll_reset`.
    applied_scroll: u64,
    /// Count reported by the latest page when it disagreed with the source, paired with
    /// the source's own count at that time. Ignored once the source's count moves.
    count_hint: Option<(usize, usize)>,
    /// The data source was replaced; in-flight fetches belong to the old one.
    source_reset: bool,
    continuations: Vec<(PassTicket, Continuation<D, R>)>,
}

impl<D, R> fmt::Debug for ListView<D, R>
where
    D: ItemDataSource,
    R: ItemRenderer<D::Item>,
    R::Element: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("options", &self.options)
            .field("window", &self.window)
            .field("generation", &self.generation)
            .field("scroll", &self.pass.scroll)
            .field("visible", &self.pass.visible)
            .field("dirty", &self.dirty)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<D, R> ListView<D, R>
where
    D: ItemDataSource,
    R: ItemRenderer<D::Item>,
{
    /// Creates a view. The first pass runs on the first [`Self::process`].
    ///
    /// Fails with [`ListViewError::InvalidLayoutParameter`] when the layout is invalid.
    pub fn new(options: ListViewOptions, source: D, renderer: R) -> Result<Self> {
        let count = source.count();
        let params = LayoutParams {
            layout: options.layout.clone(),
            direction: options.direction,
            viewport: options.viewport,
            count,
        };
        let arrangement = params.layout.arrange(&ArrangeInput {
            count,
            viewport: params.viewport,
            direction: params.direction,
            item_metrics: &*options.item_metrics,
        })?;
        let mapper = CoordinateMapper::new(
            params.layout.orientation(),
            params.direction,
            params.viewport,
            arrangement.extent(),
            arrangement.cross_extent(),
        );
        let visible = arrangement.visible_range(0, mapper.viewport_main());

        let target = match (options.initial_first_visible, options.initial_scroll_position) {
            (Some(index), _) => Some(ScrollTarget::FirstVisible(index)),
            (None, Some(offset)) => Some(ScrollTarget::Offset(offset)),
            (None, None) => None,
        };
        tdebug!(
            count,
            layout = params.layout.name(),
            pages_to_load = options.pages_to_load,
            "ListView::new"
        );

        Ok(Self {
            options,
            source,
            renderer,
            window: WindowManager::new(),
            pass: LayoutPass {
                generation: 0,
                target: ScrollTarget::Offset(0),
                params,
                arrangement,
                mapper,
                scroll: 0,
                visible,
            },
            generation: 0,
            completed_generation: 0,
            dirty: true,
            relayout: true,
            target,
            applied_scroll: 0,
            count_hint: None,
            source_reset: false,
            continuations: Vec::new(),
        })
    }

    pub fn options(&self) -> &ListViewOptions {
        &self.options
    }

    pub fn layout(&self) -> &Layout {
        &self.options.layout
    }

    pub fn direction(&self) -> Direction {
        self.options.direction
    }

    pub fn viewport(&self) -> Size {
        self.options.viewport
    }

    pub fn pages_to_load(&self) -> usize {
        self.options.pages_to_load
    }

    pub fn item_data_source(&self) -> &D {
        &self.source
    }

    pub fn item_data_source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Item count as of the latest pass.
    pub fn count(&self) -> usize {
        self.pass.params.count
    }

    fn current_count(&self) -> usize {
        let count = self.source.count();
        match self.count_hint {
            Some((seen, hint)) if seen == count => hint,
            _ => count,
        }
    }

    pub fn loading_state(&self) -> LoadingState {
        self.window.state()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The most recent pass snapshot.
    pub fn current_pass(&self) -> &LayoutPass {
        &self.pass
    }

    /// Logical scroll offset as of the latest pass.
    pub fn scroll_position(&self) -> u64 {
        self.pass.scroll
    }

    pub fn index_of_first_visible(&self) -> Option<usize> {
        self.pass.visible.map(|r| r.first)
    }

    pub fn index_of_last_visible(&self) -> Option<usize> {
        self.pass.visible.map(|r| r.last)
    }

    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.pass.visible
    }

    /// Offset the host's scroll container currently shows.
    pub fn applied_scroll(&self) -> u64 {
        self.applied_scroll
    }

    /// Physical scroll offsets to apply to the host's scroll container.
    pub fn scroll_point(&self) -> ScrollPoint {
        self.pass.mapper.to_scroll_point(self.applied_scroll)
    }

    /// Physical size of the scrolled surface.
    pub fn content_size(&self) -> Extent {
        self.pass.mapper.surface()
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.pass.mapper
    }

    /// The content box of `index` on the surface, whether or not it is realized.
    pub fn item_rect(&self, index: usize) -> Option<ItemRect> {
        self.pass
            .arrangement
            .position_of(index)
            .map(|slot| self.pass.mapper.to_physical(slot))
    }

    /// Hit test against a physical point on the surface.
    pub fn index_at_point(&self, x: u64, y: u64) -> Option<usize> {
        let (main, cross) = self.pass.mapper.to_logical(x, y)?;
        self.pass.arrangement.index_at(main, cross)
    }

    pub fn element_from_index(&self, index: usize) -> Option<&R::Element> {
        self.window.get(index).map(|item| &item.element)
    }

    pub fn element_from_index_mut(&mut self, index: usize) -> Option<&mut R::Element> {
        self.window.get_mut(index).map(|item| &mut item.element)
    }

    pub fn realized_item(&self, index: usize) -> Option<&RealizedItem<R::Element>> {
        self.window.get(index)
    }

    /// Realized items in index order.
    pub fn realized_items(&self) -> impl Iterator<Item = &RealizedItem<R::Element>> {
        self.window.iter()
    }

    pub fn realized_count(&self) -> usize {
        self.window.len()
    }

    pub fn add_loading_state_listener(
        &mut self,
        f: impl Fn(LoadingState) + Send + Sync + 'static,
    ) -> ListenerId {
        self.window.add_listener(f)
    }

    pub fn remove_loading_state_listener(&mut self, id: ListenerId) -> bool {
        self.window.remove_listener(id)
    }

    /// Marks the view dirty. `relayout` rebuilds geometry; otherwise the next pass only
    /// re-resolves scroll against the current arrangement.
    pub fn invalidate(&mut self, relayout: bool) -> PassTicket {
        if !self.dirty {
            ttrace!(relayout, generation = self.generation + 1, "ListView::invalidate");
        }
        self.dirty = true;
        self.relayout |= relayout;
        PassTicket {
            generation: self.generation + 1,
        }
    }

    fn set_target(&mut self, target: ScrollTarget, relayout: bool) -> PassTicket {
        self.target = Some(target);
        self.invalidate(relayout)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let count = self.current_count();
        if index >= count {
            return Err(ListViewError::out_of_range(index, count));
        }
        Ok(())
    }

    pub fn set_scroll_position(&mut self, offset: u64) -> PassTicket {
        self.set_target(ScrollTarget::Offset(offset), false)
    }

    /// Scrolls so the line holding `index` starts at the viewport's leading edge.
    pub fn set_index_of_first_visible(&mut self, index: usize) -> Result<PassTicket> {
        self.check_index(index)?;
        Ok(self.set_target(ScrollTarget::FirstVisible(index), false))
    }

    /// Scrolls as little as needed to bring `index` fully into view.
    pub fn ensure_visible(&mut self, index: usize) -> Result<PassTicket> {
        self.check_index(index)?;
        Ok(self.set_target(ScrollTarget::EnsureVisible(index), false))
    }

    /// The host's scroll container moved to `offset`.
    pub fn on_scroll(&mut self, offset: u64) -> PassTicket {
        self.applied_scroll = offset;
        self.set_target(ScrollTarget::Offset(offset), false)
    }

    /// The host's scroll container lost its offset without a scroll event.
    ///
    /// The next pass pushes the offset back.
    pub fn viewport_scroll_reset(&mut self) {
        tdebug!(scroll = self.pass.scroll, "ListView::viewport_scroll_reset");
        self.applied_scroll = 0;
    }

    /// Swaps the layout, keeping the current first visible item at the leading edge.
    ///
    /// An invalid layout is rejected and the current one kept.
    pub fn set_layout(&mut self, layout: impl Into<Layout>) -> Result<PassTicket> {
        let layout = layout.into();
        layout.validate()?;
        tdebug!(
            from = self.options.layout.name(),
            to = layout.name(),
            "ListView::set_layout"
        );
        self.options.layout = layout;
        if self.target.is_none() {
            self.target = self.index_of_first_visible().map(ScrollTarget::FirstVisible);
        }
        Ok(self.invalidate(true))
    }

    /// Edits a copy of the layout and applies it like [`Self::set_layout`].
    pub fn update_layout(&mut self, f: impl FnOnce(&mut Layout)) -> Result<PassTicket> {
        let mut layout = self.options.layout.clone();
        f(&mut layout);
        self.set_layout(layout)
    }

    pub fn set_viewport_size(&mut self, viewport: Size) -> PassTicket {
        self.options.viewport = viewport;
        self.invalidate(true)
    }

    pub fn set_direction(&mut self, direction: Direction) -> PassTicket {
        self.options.direction = direction;
        self.invalidate(true)
    }

    pub fn set_pages_to_load(&mut self, pages_to_load: usize) -> PassTicket {
        self.options.pages_to_load = pages_to_load;
        self.invalidate(false)
    }

    pub fn set_item_metrics(
        &mut self,
        f: impl Fn(usize) -> ItemMetrics + Send + Sync + 'static,
    ) -> PassTicket {
        self.options.item_metrics = alloc::sync::Arc::new(f);
        self.invalidate(true)
    }

    pub fn set_on_error(&mut self, f: impl Fn(&ListViewError) + Send + Sync + 'static) {
        self.options.on_error = Some(alloc::sync::Arc::new(f));
    }

    /// Replaces the data source. Realized elements belong to the old items and are dropped.
    pub fn set_item_data_source(&mut self, source: D) -> PassTicket {
        self.source = source;
        self.count_hint = None;
        self.source_reset = true;
        self.window.clear();
        self.invalidate(true)
    }

    /// Drops realized elements and re-reads item metrics. A pending scroll or index target
    /// still applies; otherwise the current scroll position is kept and re-applied.
    pub fn force_layout(&mut self) -> PassTicket {
        tdebug!(scroll = self.pass.scroll, "ListView::force_layout");
        self.window.clear();
        self.invalidate(true)
    }

    /// Re-reads item metrics and moves realized elements without recreating them.
    pub fn recalculate_item_position(&mut self) -> PassTicket {
        self.invalidate(true)
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            viewport: ViewportState {
                size: self.options.viewport,
                scroll: self.pass.scroll,
            },
            first_visible: self.index_of_first_visible(),
        }
    }

    pub fn restore_view_state(&mut self, state: ViewState) -> PassTicket {
        self.options.viewport = state.viewport.size;
        let target = match state.first_visible {
            Some(index) if index < self.current_count() => ScrollTarget::FirstVisible(index),
            _ => ScrollTarget::Offset(state.viewport.scroll),
        };
        self.set_target(target, true)
    }

    /// True once a pass at least as new as `ticket` has completed.
    pub fn is_settled(&self, ticket: PassTicket) -> bool {
        !self.dirty && self.completed_generation >= ticket.generation
    }

    /// Runs `f` during [`Self::process`] once the pass for `ticket` completes.
    pub fn then(&mut self, ticket: PassTicket, f: impl FnOnce(&mut Self) + 'static) {
        self.continuations.push((ticket, Box::new(f)));
    }

    /// Runs pending work until the view settles or waits on a fetch.
    pub fn process(&mut self) -> LoadingState {
        loop {
            if self.dirty {
                self.begin_pass();
            }
            self.advance();
            if self.dirty {
                continue;
            }
            if self.window.state() == LoadingState::Complete {
                self.completed_generation = self.generation;
                if self.run_continuations() && self.dirty {
                    continue;
                }
            }
            break;
        }
        self.window.state()
    }

    /// Delivers a page for a fetch that returned [`Fetch::Pending`], then keeps processing.
    ///
    /// Results for stale or unknown fetches are discarded.
    pub fn resolve_fetch(
        &mut self,
        id: FetchId,
        result: core::result::Result<ItemsPage<D::Item>, DataSourceError>,
    ) -> LoadingState {
        match self.window.finish_fetch(id, self.generation) {
            Some(range) => {
                // A fetch carried over from an earlier pass may reach past this window.
                let window = self.plan().window;
                let range =
                    IndexRange::new(range.start.max(window.start), range.end.min(window.end));
                if !range.is_empty() {
                    self.apply_fetch(range, result);
                }
            }
            None => {
                twarn!(id = id.get(), "ListView::resolve_fetch: discarding stale result");
            }
        }
        self.process()
    }

    fn run_continuations(&mut self) -> bool {
        let settled = self.completed_generation;
        let (ready, rest): (Vec<_>, Vec<_>) = mem::take(&mut self.continuations)
            .into_iter()
            .partition(|(ticket, _)| ticket.generation <= settled);
        self.continuations = rest;
        let ran = !ready.is_empty();
        for (_, f) in ready {
            f(self);
        }
        ran
    }

    fn report(&self, err: ListViewError) {
        twarn!(error = %err, "ListView: reporting error");
        if let Some(on_error) = &self.options.on_error {
            on_error(&err);
        }
    }

    fn begin_pass(&mut self) {
        self.dirty = false;
        self.generation += 1;
        let relayout = mem::take(&mut self.relayout);
        let count = self.current_count();
        let recount = count != self.pass.params.count;
        let rebuild = relayout || recount;
        let source_reset = mem::take(&mut self.source_reset);

        if rebuild {
            let params = LayoutParams {
                layout: self.options.layout.clone(),
                direction: self.options.direction,
                viewport: self.options.viewport,
                count,
            };
            let input = ArrangeInput {
                count,
                viewport: params.viewport,
                direction: params.direction,
                item_metrics: &*self.options.item_metrics,
            };
            match params.layout.arrange(&input) {
                Ok(arrangement) => {
                    self.pass.mapper = CoordinateMapper::new(
                        params.layout.orientation(),
                        params.direction,
                        params.viewport,
                        arrangement.extent(),
                        arrangement.cross_extent(),
                    );
                    self.pass.arrangement = arrangement;
                    self.pass.params = params;
                }
                Err(err) => self.report(err),
            }
        }

        let mapper = self.pass.mapper;
        let arrangement = &self.pass.arrangement;
        let current = mapper.clamp_scroll(self.pass.scroll);
        let target = self
            .target
            .take()
            .unwrap_or(ScrollTarget::Offset(self.pass.scroll));

        let resolved = match target {
            ScrollTarget::Offset(offset) => Ok(mapper.clamp_scroll(offset)),
            ScrollTarget::FirstVisible(index) => arrangement
                .anchor_of(index)
                .map(|a| mapper.offset_to_scroll(a, Align::Start, current))
                .ok_or(index),
            ScrollTarget::EnsureVisible(index) => arrangement
                .anchor_of(index)
                .map(|a| mapper.offset_to_scroll(a, Align::Auto, current))
                .ok_or(index),
        };
        let scroll = match resolved {
            Ok(scroll) => scroll,
            Err(index) => {
                self.report(ListViewError::out_of_range(index, arrangement.count()));
                current
            }
        };

        self.pass.generation = self.generation;
        self.pass.target = target;
        self.pass.scroll = scroll;
        self.pass.visible = self
            .pass
            .arrangement
            .visible_range(scroll, mapper.viewport_main());
        self.applied_scroll = scroll;

        if rebuild {
            let pass = &self.pass;
            self.window.reposition(|index| {
                pass.arrangement
                    .position_of(index)
                    .map(|slot| pass.mapper.to_physical(slot))
            });
        }

        tdebug!(
            generation = self.generation,
            relayout,
            count,
            scroll,
            first = ?self.pass.visible.map(|r| r.first),
            last = ?self.pass.visible.map(|r| r.last),
            "ListView::begin_pass"
        );
        // Fetches for a replaced or resized source may describe other items.
        let keep = if source_reset || recount {
            IndexRange::default()
        } else {
            self.plan().window
        };
        self.window.invalidate(keep, self.generation);
    }

    fn plan(&self) -> WindowPlan {
        WindowPlan::new(
            self.pass.visible,
            self.pass.params.count,
            self.options.pages_to_load,
        )
    }

    fn advance(&mut self) {
        loop {
            if self.dirty {
                return;
            }
            match self.window.state() {
                LoadingState::ItemsLoading => {
                    let plan = self.plan();
                    if !self.load(plan.visible) {
                        return;
                    }
                    self.window.enter(LoadingState::ViewPortLoaded);
                }
                LoadingState::ViewPortLoaded => {
                    let plan = self.plan();
                    if !self.load(plan.window) {
                        return;
                    }
                    self.window.enter(LoadingState::ItemsLoaded);
                }
                LoadingState::ItemsLoaded => {
                    let plan = self.plan();
                    if self.window.release_outside(plan.window) > 0 {
                        ttrace!("ListView: released items outside window");
                    }
                    self.window.enter(LoadingState::Complete);
                }
                LoadingState::Idle | LoadingState::Complete => return,
            }
        }
    }

    /// Requests whatever `range` is missing. True once all of it is realized.
    fn load(&mut self, range: IndexRange) -> bool {
        for run in self.window.missing_runs(range) {
            let request = self.window.begin_fetch(run, self.generation);
            ttrace!(
                id = request.id.get(),
                index = request.index,
                count_after = request.count_after,
                "ListView: fetching"
            );
            match self.source.items_from_index(&request) {
                Fetch::Ready(page) => {
                    self.window.finish_fetch(request.id, self.generation);
                    self.apply_fetch(run, Ok(page));
                }
                Fetch::Failed(reason) => {
                    self.window.finish_fetch(request.id, self.generation);
                    self.apply_fetch(run, Err(reason));
                }
                Fetch::Pending => {}
            }
            if self.dirty {
                return false;
            }
        }
        self.window.covers(range)
    }

    fn apply_fetch(
        &mut self,
        range: IndexRange,
        result: core::result::Result<ItemsPage<D::Item>, DataSourceError>,
    ) {
        let page = match result {
            Ok(page) => page,
            Err(reason) => {
                self.window.mark_failed(range);
                self.report(ListViewError::DataSourceFailure {
                    start: range.start,
                    end: range.end,
                    reason,
                });
                return;
            }
        };

        if let Some(total) = page.total_count.filter(|&t| t != self.pass.params.count) {
            tdebug!(
                from = self.pass.params.count,
                to = total,
                "ListView: data source count changed"
            );
            self.count_hint = Some((self.source.count(), total));
            self.invalidate(true);
            return;
        }

        let first = page.first_index();
        let mut missing = false;
        for index in range.start..range.end {
            let Some(item) = index.checked_sub(first).and_then(|k| page.items.get(k)) else {
                missing = true;
                continue;
            };
            if self.window.is_realized(index) {
                continue;
            }
            let Some(rect) = self.item_rect(index) else {
                continue;
            };
            let element = self.renderer.render(index, item);
            self.window.realize(index, element, rect);
        }
        if missing {
            let err = DataSourceError::new("page did not include every requested item");
            self.window.mark_failed(range);
            self.report(ListViewError::DataSourceFailure {
                start: range.start,
                end: range.end,
                reason: err,
            });
        }
    }
}
