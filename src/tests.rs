use crate::*;

use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static RENDERED: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, PartialEq, Eq)]
struct Tile {
    index: usize,
    label: usize,
    serial: u64,
}

fn render_tile(index: usize, item: &usize) -> Tile {
    Tile {
        index,
        label: *item,
        serial: RENDERED.fetch_add(1, Ordering::Relaxed),
    }
}

type Render = fn(usize, &usize) -> Tile;

fn items(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn tiles(width: u32, height: u32, layout: impl Into<Layout>) -> ListViewOptions {
    ListViewOptions::uniform(Size::new(width, height), ItemMetrics::new(100, 100))
        .with_layout(layout)
}

fn build<S: ItemDataSource<Item = usize>>(
    options: ListViewOptions,
    source: S,
) -> ListView<S, Render> {
    ListView::new(options, source, render_tile as Render).unwrap()
}

fn settled(options: ListViewOptions, count: usize) -> ListView<Vec<usize>, Render> {
    let mut v = build(options, items(count));
    assert_eq!(v.process(), LoadingState::Complete);
    v
}

fn scroll_to<S: ItemDataSource<Item = usize>>(v: &mut ListView<S, Render>, offset: u64) {
    v.set_scroll_position(offset);
    v.process();
}

fn range<S: ItemDataSource<Item = usize>>(v: &ListView<S, Render>) -> Option<(usize, usize)> {
    v.visible_range().map(|r| (r.first, r.last))
}

fn origin<S: ItemDataSource<Item = usize>>(v: &ListView<S, Render>, index: usize) -> (u64, u64) {
    let r = v.item_rect(index).unwrap();
    (r.left, r.top)
}

fn collect_errors(options: ListViewOptions) -> (ListViewOptions, Arc<Mutex<Vec<ListViewError>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let options = options.with_on_error(move |e| sink.lock().unwrap().push(e.clone()));
    (options, errors)
}

struct Recording {
    items: Vec<usize>,
    requests: Arc<Mutex<Vec<FetchRequest>>>,
}

impl ItemDataSource for Recording {
    type Item = usize;

    fn count(&self) -> usize {
        self.items.len()
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<usize> {
        self.requests.lock().unwrap().push(*request);
        self.items.items_from_index(request)
    }
}

#[derive(Default)]
struct Deferred {
    count: usize,
    requests: Vec<FetchRequest>,
}

impl ItemDataSource for Deferred {
    type Item = usize;

    fn count(&self) -> usize {
        self.count
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<usize> {
        self.requests.push(*request);
        Fetch::Pending
    }
}

fn page_for(request: &FetchRequest) -> ItemsPage<usize> {
    let r = request.range();
    ItemsPage::new(r.start, (r.start..r.end).collect())
}

#[test]
fn first_and_last_visible_track_item_count() {
    for (count, expected) in [
        (0, None),
        (1, Some((0, 0))),
        (5, Some((0, 4))),
        (100, Some((0, 8))),
    ] {
        let v = settled(tiles(300, 350, GridLayout::new()), count);
        assert_eq!(range(&v), expected, "grid with {count} items");
        assert_eq!(v.index_of_first_visible(), expected.map(|r| r.0));
        assert_eq!(v.index_of_last_visible(), expected.map(|r| r.1));
    }

    for (count, expected) in [
        (0, None),
        (1, Some((0, 0))),
        (2, Some((0, 1))),
        (100, Some((0, 3))),
    ] {
        let v = settled(tiles(300, 350, ListLayout::new()), count);
        assert_eq!(range(&v), expected, "list with {count} items");
    }
}

#[test]
fn empty_view_reports_no_extent() {
    let v = settled(tiles(300, 300, GridLayout::new()), 0);
    assert_eq!(v.current_pass().arrangement.extent(), 0);
    assert_eq!(v.scroll_position(), 0);
    assert_eq!(v.realized_count(), 0);
    assert!(v.item_rect(0).is_none());
    assert!(v.index_at_point(10, 10).is_none());
}

#[test]
fn first_visible_in_constructor_skips_leading_items() {
    for (layout, scroll) in [
        (Layout::from(GridLayout::new()), 1200),
        (Layout::from(ListLayout::new()), 2400),
    ] {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let source = Recording {
            items: items(100),
            requests: Arc::clone(&requests),
        };
        let options = tiles(200, 200, layout.clone())
            .with_pages_to_load(10)
            .with_initial_first_visible(24);
        let mut v = build(options, source);
        assert_eq!(v.process(), LoadingState::Complete);

        assert_eq!(v.index_of_first_visible(), Some(24), "{}", layout.name());
        assert_eq!(v.scroll_position(), scroll, "{}", layout.name());
        let requests = requests.lock().unwrap();
        assert!(!requests.is_empty());
        for r in requests.iter() {
            assert!(!r.range().contains(2), "{r:?}");
            assert!(!r.range().contains(3), "{r:?}");
        }
        assert!(v.element_from_index(2).is_none());
        assert!(v.element_from_index(24).is_some());
    }
}

#[test]
fn index_set_before_first_pass_realizes_once() {
    let states = Arc::new(Mutex::new(Vec::new()));
    let mut v = build(tiles(300, 300, GridLayout::new()), items(15_000));
    let sink = Arc::clone(&states);
    v.add_loading_state_listener(move |s| sink.lock().unwrap().push(s));

    v.set_index_of_first_visible(7500).unwrap();
    v.set_scroll_position(40);
    v.set_index_of_first_visible(7500).unwrap();
    assert_eq!(v.loading_state(), LoadingState::Idle);
    assert_eq!(v.process(), LoadingState::Complete);

    assert_eq!(
        *states.lock().unwrap(),
        [
            LoadingState::ItemsLoading,
            LoadingState::ViewPortLoaded,
            LoadingState::ItemsLoaded,
            LoadingState::Complete,
        ]
    );
    assert_eq!(v.generation(), 1);
    assert_eq!(v.index_of_first_visible(), Some(7500));
    assert_eq!(v.scroll_position(), 250_000);
}

#[test]
fn removed_listener_is_not_called() {
    let calls = Arc::new(AtomicU64::new(0));
    let mut v = build(tiles(300, 300, GridLayout::new()), items(30));
    let sink = Arc::clone(&calls);
    let id = v.add_loading_state_listener(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    });
    v.process();
    assert_eq!(calls.load(Ordering::Relaxed), 4);

    assert!(v.remove_loading_state_listener(id));
    assert!(!v.remove_loading_state_listener(id));
    scroll_to(&mut v, 100);
    assert_eq!(calls.load(Ordering::Relaxed), 4);
}

#[test]
fn scroll_position_and_first_visible_stay_in_sync() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);

    v.set_index_of_first_visible(30).unwrap();
    v.process();
    assert_eq!(v.index_of_first_visible(), Some(30));
    assert_eq!(v.scroll_position(), 1000);

    scroll_to(&mut v, 2000);
    assert_eq!(v.scroll_position(), 2000);
    assert_eq!(v.index_of_first_visible(), Some(60));

    // Last writer wins.
    v.set_scroll_position(500);
    v.set_index_of_first_visible(60).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 2000);

    v.set_index_of_first_visible(60).unwrap();
    v.set_scroll_position(500);
    v.process();
    assert_eq!(v.scroll_position(), 500);
    assert_eq!(v.index_of_first_visible(), Some(15));
}

#[test]
fn scroll_position_clamps_to_content() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    // 34 columns of 100 in a 300 wide viewport.
    scroll_to(&mut v, 1_000_000);
    assert_eq!(v.scroll_position(), 3100);
    assert_eq!(range(&v), Some((93, 99)));
}

#[test]
fn visible_range_follows_scroll_and_resize() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 27);
    scroll_to(&mut v, 101);
    assert_eq!(range(&v), Some((3, 14)));

    v.set_viewport_size(Size::new(300, 500));
    v.set_scroll_position(0);
    v.process();
    assert_eq!(range(&v), Some((0, 14)));

    scroll_to(&mut v, 101);
    assert_eq!(range(&v), Some((5, 24)));

    let mut v = settled(tiles(300, 300, ListLayout::new()), 27);
    scroll_to(&mut v, 101);
    assert_eq!(range(&v), Some((1, 4)));
}

#[test]
fn grid_first_visible_and_ensure_visible() {
    for direction in [Direction::Ltr, Direction::Rtl] {
        let mut v = settled(
            tiles(300, 300, GridLayout::new()).with_direction(direction),
            27,
        );

        scroll_to(&mut v, 150);
        assert_eq!(range(&v), Some((3, 14)));

        for (index, scroll, first) in [(0, 0, 0), (1, 0, 0), (3, 100, 3)] {
            v.set_index_of_first_visible(index).unwrap();
            v.process();
            assert_eq!(v.scroll_position(), scroll, "index {index} {direction:?}");
            assert_eq!(v.index_of_first_visible(), Some(first));
        }

        for (index, scroll, first) in [(6, 150, 3), (3, 100, 3), (0, 0, 0), (12, 200, 6), (15, 300, 9)]
        {
            scroll_to(&mut v, 150);
            v.ensure_visible(index).unwrap();
            v.process();
            assert_eq!(v.scroll_position(), scroll, "ensure {index} {direction:?}");
            assert_eq!(v.index_of_first_visible(), Some(first));
        }
    }
}

#[test]
fn grid_with_trailing_margin() {
    // Outer width 175, three per column.
    let metrics = ItemMetrics::new(100, 100).with_margins(Margins::new(0, 0, 75, 0));
    let options = ListViewOptions::uniform(Size::new(300, 300), metrics);
    let mut v = settled(options, 27);

    scroll_to(&mut v, 10);
    assert_eq!(range(&v), Some((0, 5)));
    scroll_to(&mut v, 140);
    assert_eq!(range(&v), Some((3, 8)));

    v.ensure_visible(9).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 325);
    assert_eq!(origin(&v, 9), (525, 0));

    // In RTL the right margin leads.
    v.set_direction(Direction::Rtl);
    v.set_scroll_position(140);
    v.process();
    assert_eq!(range(&v), Some((0, 8)));
    scroll_to(&mut v, 310);
    assert_eq!(range(&v), Some((3, 11)));

    v.set_index_of_first_visible(3).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 250);
    assert_eq!(v.index_of_first_visible(), Some(3));
}

#[test]
fn list_with_leading_margin() {
    // Outer height 150, content starts 50 in.
    let metrics = ItemMetrics::new(300, 100).with_margins(Margins::new(0, 50, 0, 0));
    let options =
        ListViewOptions::uniform(Size::new(300, 300), metrics).with_layout(ListLayout::new());
    let mut v = settled(options, 20);

    scroll_to(&mut v, 35);
    assert_eq!(range(&v), Some((0, 1)));
    scroll_to(&mut v, 165);
    assert_eq!(range(&v), Some((1, 2)));

    v.set_index_of_first_visible(4).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 650);

    v.ensure_visible(5).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 650);

    v.ensure_visible(0).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 0);
    assert_eq!(origin(&v, 0), (0, 50));
}

#[test]
fn first_line_snaps_to_leading_edge() {
    let metrics = ItemMetrics::new(100, 100).with_margins(Margins::new(10, 0, 0, 0));
    let options = ListViewOptions::uniform(Size::new(300, 300), metrics);
    let mut v = settled(options, 27);

    assert_eq!(origin(&v, 0), (10, 0));
    assert_eq!(origin(&v, 1), (10, 100));
    assert_eq!(origin(&v, 3), (120, 0));

    v.ensure_visible(20).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 470);

    v.ensure_visible(1).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 0);

    v.ensure_visible(20).unwrap();
    v.process();
    v.set_index_of_first_visible(0).unwrap();
    v.process();
    assert_eq!(v.scroll_position(), 0);
}

#[test]
fn rtl_mirrors_item_positions() {
    let ltr = settled(tiles(300, 300, GridLayout::new()), 27);
    let rtl = settled(
        tiles(300, 300, GridLayout::new()).with_direction(Direction::Rtl),
        27,
    );

    assert_eq!(origin(&ltr, 0), (0, 0));
    assert_eq!(origin(&rtl, 0), (800, 0));
    assert_eq!(origin(&rtl, 1), (800, 100));
    assert_eq!(origin(&ltr, 4), (100, 100));
    assert_eq!(origin(&rtl, 4), (700, 100));

    assert_eq!(rtl.content_size(), Extent { width: 900, height: 300 });
    assert_eq!(rtl.scroll_point(), ScrollPoint { left: 600, top: 0 });
    assert_eq!(ltr.scroll_point(), ScrollPoint { left: 0, top: 0 });

    assert_eq!(rtl.realized_item(4).unwrap().rect, rtl.item_rect(4).unwrap());
}

#[test]
fn vertical_rtl_mirrors_cross_axis() {
    let options = tiles(300, 300, ListLayout::new()).with_direction(Direction::Rtl);
    let v = settled(options, 10);
    let r = v.item_rect(0).unwrap();
    assert_eq!((r.left, r.top), (200, 0));
    assert_eq!(origin(&v, 2), (200, 200));
}

#[test]
fn hit_testing_maps_points_to_items() {
    let ltr = settled(tiles(300, 300, GridLayout::new()), 27);
    assert_eq!(ltr.index_at_point(150, 250), Some(5));
    assert_eq!(ltr.index_at_point(899, 0), Some(24));
    assert_eq!(ltr.index_at_point(900, 0), None);

    let rtl = settled(
        tiles(300, 300, GridLayout::new()).with_direction(Direction::Rtl),
        27,
    );
    assert_eq!(rtl.index_at_point(850, 250), Some(2));
    assert_eq!(rtl.index_at_point(0, 0), Some(24));
}

#[test]
fn metrics_change_needs_force_layout() {
    for (layout, moved) in [
        (Layout::from(GridLayout::new()), (200, 0)),
        (Layout::from(ListLayout::new()), (0, 200)),
    ] {
        let mut v = settled(tiles(300, 350, layout.clone()), 10);
        assert_eq!(origin(&v, 1), (0, 100), "{}", layout.name());
        let before = v.element_from_index(1).unwrap().serial;

        v.set_item_metrics(|_| ItemMetrics::new(200, 200));
        v.force_layout();
        v.process();

        assert_eq!(origin(&v, 1), moved, "{}", layout.name());
        let item = v.realized_item(1).unwrap();
        assert_eq!((item.rect.left, item.rect.top), moved);
        assert_ne!(item.element.serial, before);
        assert_eq!(item.element.label, 1);
    }
}

#[test]
fn force_layout_keeps_pending_target() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    let before = v.element_from_index(0).unwrap().serial;

    v.set_index_of_first_visible(30).unwrap();
    v.force_layout();
    v.process();
    assert_eq!(v.index_of_first_visible(), Some(30));
    assert_eq!(v.scroll_position(), 1000);

    v.force_layout();
    v.process();
    assert_eq!(v.scroll_position(), 1000);
    assert!(v.element_from_index(0).is_none());
    assert_ne!(v.element_from_index(30).unwrap().serial, before);
}

#[test]
fn recalculate_keeps_realized_elements() {
    let mut v = settled(tiles(300, 350, GridLayout::new()), 10);
    let before = v.element_from_index(1).unwrap().clone();

    v.set_item_metrics(|_| ItemMetrics::new(200, 200));
    v.recalculate_item_position();
    v.process();

    let after = v.realized_item(1).unwrap();
    assert_eq!(after.element, before);
    assert_eq!((after.rect.left, after.rect.top), (200, 0));
}

#[test]
fn passes_restore_scroll_lost_by_host() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    scroll_to(&mut v, 300);
    assert_eq!(v.applied_scroll(), 300);

    v.viewport_scroll_reset();
    assert_eq!(v.applied_scroll(), 0);
    assert_eq!(v.scroll_position(), 300);
    v.force_layout();
    v.process();
    assert_eq!(v.applied_scroll(), 300);
    assert_eq!(v.scroll_point(), ScrollPoint { left: 300, top: 0 });

    v.viewport_scroll_reset();
    v.recalculate_item_position();
    v.process();
    assert_eq!(v.applied_scroll(), 300);
    assert_eq!(v.scroll_position(), 300);
}

#[test]
fn host_scroll_events_move_the_window() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    v.on_scroll(1000);
    v.process();
    assert_eq!(v.scroll_position(), 1000);
    assert_eq!(v.index_of_first_visible(), Some(30));
    assert!(v.element_from_index(30).is_some());
    assert!(v.element_from_index(0).is_none());
}

#[test]
fn max_rows_wraps_into_columns() {
    let mut v = settled(tiles(300, 400, GridLayout::new()), 27);
    assert_eq!(origin(&v, 3), (0, 300));

    v.update_layout(|l| l.set_max_rows(Some(2))).unwrap();
    v.process();
    for (index, expected) in [
        (0, (0, 0)),
        (1, (0, 100)),
        (2, (100, 0)),
        (3, (100, 100)),
        (4, (200, 0)),
        (5, (200, 100)),
    ] {
        assert_eq!(origin(&v, index), expected, "tile {index}");
    }

    let err = v.update_layout(|l| l.set_max_rows(Some(0))).unwrap_err();
    assert!(matches!(
        err,
        ListViewError::InvalidLayoutParameter {
            name: "maximum_rows_or_columns",
            ..
        }
    ));
    assert_eq!(v.layout().maximum_rows_or_columns(), Some(2));
}

#[test]
fn maximum_columns_in_vertical_grid() {
    let layout = GridLayout::new().with_orientation(Orientation::Vertical);
    let options =
        ListViewOptions::uniform(Size::new(300, 300), ItemMetrics::new(31, 100)).with_layout(layout);
    let mut v = settled(options, 30);
    for i in 0..9 {
        assert_eq!(origin(&v, i), (31 * i as u64, 0));
    }
    assert_eq!(origin(&v, 9), (0, 100));

    v.update_layout(|l| l.set_maximum_rows_or_columns(Some(2)))
        .unwrap();
    v.process();
    for (index, expected) in [
        (0, (0, 0)),
        (1, (31, 0)),
        (2, (0, 100)),
        (3, (31, 100)),
        (4, (0, 200)),
        (5, (31, 200)),
    ] {
        assert_eq!(origin(&v, index), expected, "tile {index}");
    }
}

#[test]
fn cell_spanning_matches_grid_for_unit_items() {
    let layout = CellSpanningLayout::new(GroupInfo::new(100, 100), |_| ItemInfo::new(100, 100))
        .with_maximum_rows_or_columns(Some(2));
    let v = settled(tiles(300, 400, layout), 27);
    for (index, expected) in [
        (0, (0, 0)),
        (1, (0, 100)),
        (2, (100, 0)),
        (3, (100, 100)),
        (4, (200, 0)),
        (5, (200, 100)),
    ] {
        assert_eq!(origin(&v, index), expected, "tile {index}");
    }
    assert_eq!(range(&v), Some((0, 5)));
}

#[test]
fn cell_spanning_packs_large_items_first_fit() {
    let layout = CellSpanningLayout::new(GroupInfo::new(100, 100), |i| {
        if i == 0 {
            ItemInfo::new(200, 200)
        } else {
            ItemInfo::new(100, 100)
        }
    });
    let v = settled(tiles(300, 300, layout), 10);

    let r0 = v.item_rect(0).unwrap();
    assert_eq!((r0.left, r0.top, r0.width, r0.height), (0, 0, 200, 200));
    assert_eq!(origin(&v, 1), (0, 200));
    assert_eq!(origin(&v, 2), (100, 200));
    assert_eq!(origin(&v, 3), (200, 0));
    assert_eq!(origin(&v, 4), (200, 100));
    assert_eq!(v.index_at_point(150, 150), Some(0));
    assert_eq!(v.index_at_point(150, 250), Some(2));
}

fn large_first_item(i: usize) -> ItemInfo {
    if i == 0 {
        ItemInfo::new(200, 200)
    } else {
        ItemInfo::new(100, 100)
    }
}

#[test]
fn cell_spanning_mirrors_in_rtl() {
    let layout = CellSpanningLayout::new(GroupInfo::new(100, 100), large_first_item);
    let v = settled(tiles(300, 300, layout).with_direction(Direction::Rtl), 10);

    assert_eq!(v.content_size(), Extent { width: 500, height: 300 });
    let r0 = v.item_rect(0).unwrap();
    assert_eq!((r0.left, r0.top, r0.width, r0.height), (300, 0, 200, 200));
    assert_eq!(origin(&v, 1), (400, 200));
    assert_eq!(origin(&v, 2), (300, 200));
    assert_eq!(origin(&v, 3), (200, 0));
    assert_eq!(origin(&v, 9), (0, 0));
    assert_eq!(v.index_at_point(350, 150), Some(0));
    assert_eq!(v.index_at_point(350, 250), Some(2));
    assert_eq!(v.index_at_point(50, 50), Some(9));
}

#[test]
fn cell_spanning_scrolled_past_spanning_item() {
    let layout = CellSpanningLayout::new(GroupInfo::new(100, 100), large_first_item);
    let mut v = settled(tiles(300, 300, layout), 10);

    scroll_to(&mut v, 200);
    assert_eq!(range(&v), Some((3, 9)));
    assert_eq!(v.index_at_point(250, 150), Some(4));
    assert_eq!(v.index_at_point(450, 50), Some(9));
    assert_eq!(v.index_at_point(450, 150), None);

    scroll_to(&mut v, 100);
    assert_eq!(range(&v), Some((0, 8)));
    assert_eq!(v.index_at_point(150, 50), Some(0));
}

#[test]
fn cell_spanning_rejects_oversized_spans() {
    let long = 100 * (layout::MAX_SPAN_LINES as u32 + 1);
    let layout = CellSpanningLayout::new(GroupInfo::new(100, 100), move |i| {
        if i == 3 {
            ItemInfo::new(long, 100)
        } else {
            ItemInfo::new(100, 100)
        }
    });
    let err = ListView::new(tiles(300, 300, layout), items(5), render_tile as Render).unwrap_err();
    assert!(matches!(
        err,
        ListViewError::InvalidLayoutParameter {
            name: "item_info",
            ..
        }
    ));
}

#[test]
fn cell_spanning_rejects_zero_cells() {
    let layout = CellSpanningLayout::new(GroupInfo::new(0, 100), |_| ItemInfo::new(100, 100));
    let err = ListView::new(tiles(300, 300, layout), items(5), render_tile as Render).unwrap_err();
    assert_eq!(
        err,
        ListViewError::InvalidLayoutParameter {
            name: "cell_width",
            reason: "must be non-zero",
        }
    );
}

#[test]
fn layout_swap_keeps_first_visible() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    v.set_index_of_first_visible(30).unwrap();
    v.process();

    v.set_layout(ListLayout::new()).unwrap();
    v.process();
    assert_eq!(v.layout().name(), "list");
    assert_eq!(v.index_of_first_visible(), Some(30));
    assert_eq!(v.scroll_position(), 3000);
    assert_eq!(origin(&v, 30), (0, 3000));
}

#[test]
fn out_of_range_index_is_rejected() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 27);
    assert_eq!(
        v.set_index_of_first_visible(1000),
        Err(ListViewError::OutOfRangeIndex {
            index: 1000,
            count: 27
        })
    );
    assert!(v.ensure_visible(1000).is_err());
    assert_eq!(v.loading_state(), LoadingState::Complete);

    scroll_to(&mut v, 100);
    assert_eq!(v.index_of_first_visible(), Some(3));
}

#[test]
fn pending_index_past_shrunk_count_is_reported() {
    let (options, errors) = collect_errors(tiles(300, 300, GridLayout::new()));
    let mut v = settled(options, 27);
    scroll_to(&mut v, 100);

    v.set_index_of_first_visible(20).unwrap();
    v.set_item_data_source(items(10));
    assert_eq!(v.process(), LoadingState::Complete);

    assert_eq!(
        *errors.lock().unwrap(),
        [ListViewError::OutOfRangeIndex {
            index: 20,
            count: 10
        }]
    );
    // Four columns of 100 leave 100 to scroll.
    assert_eq!(v.scroll_position(), 100);
    assert_eq!(v.count(), 10);
}

struct FailAfter {
    items: Vec<usize>,
    limit: usize,
}

impl ItemDataSource for FailAfter {
    type Item = usize;

    fn count(&self) -> usize {
        self.items.len()
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<usize> {
        if request.index >= self.limit {
            return Fetch::Failed(DataSourceError::new("offline"));
        }
        self.items.items_from_index(request)
    }
}

#[test]
fn data_source_failure_stalls_its_stage() {
    let (options, errors) = collect_errors(tiles(300, 300, GridLayout::new()));
    let mut v = build(
        options,
        FailAfter {
            items: items(27),
            limit: 9,
        },
    );
    assert_eq!(v.process(), LoadingState::ViewPortLoaded);
    assert_eq!(v.process(), LoadingState::ViewPortLoaded);

    assert_eq!(
        *errors.lock().unwrap(),
        [ListViewError::DataSourceFailure {
            start: 9,
            end: 27,
            reason: DataSourceError::new("offline"),
        }]
    );
    assert_eq!(v.realized_count(), 9);
    assert!(v.element_from_index(8).is_some());
}

#[test]
fn deferred_fetches_advance_the_window() {
    let mut v = build(
        tiles(300, 300, GridLayout::new()),
        Deferred {
            count: 27,
            ..Deferred::default()
        },
    );
    assert_eq!(v.process(), LoadingState::ItemsLoading);

    let first = v.item_data_source().requests[0];
    assert_eq!((first.index, first.count_before, first.count_after), (0, 0, 8));
    assert_eq!(first.generation, 1);
    assert_eq!(v.resolve_fetch(first.id, Ok(page_for(&first))), LoadingState::ViewPortLoaded);
    assert_eq!(v.element_from_index(4).unwrap().label, 4);

    let second = v.item_data_source().requests[1];
    assert_eq!(second.range(), IndexRange::new(9, 27));
    assert_eq!(v.resolve_fetch(second.id, Ok(page_for(&second))), LoadingState::Complete);
    assert_eq!(v.realized_count(), 27);
}

#[test]
fn stale_fetch_results_are_discarded() {
    let mut v = build(
        tiles(300, 300, GridLayout::new()),
        Deferred {
            count: 100,
            ..Deferred::default()
        },
    );
    v.process();
    let stale = v.item_data_source().requests[0];

    // Columns 30..33: items 90..99, window 72..100.
    scroll_to(&mut v, 3000);
    let current = v.item_data_source().requests[1];
    assert_eq!(current.range(), IndexRange::new(90, 99));
    assert!(current.generation > stale.generation);

    assert_eq!(v.resolve_fetch(stale.id, Ok(page_for(&stale))), LoadingState::ItemsLoading);
    assert!(v.element_from_index(0).is_none());

    assert_eq!(v.resolve_fetch(current.id, Ok(page_for(&current))), LoadingState::ViewPortLoaded);
    assert!(v.element_from_index(90).is_some());
}

#[test]
fn fetches_inside_the_new_window_carry_over() {
    let mut v = build(
        tiles(300, 300, GridLayout::new()),
        Deferred {
            count: 27,
            ..Deferred::default()
        },
    );
    v.process();
    let first = v.item_data_source().requests[0];

    // Items 9..18 visible; 0..9 is still in the window and already requested.
    scroll_to(&mut v, 300);
    scroll_to(&mut v, 300);
    let requested: Vec<_> = v
        .item_data_source()
        .requests
        .iter()
        .map(|r| r.range())
        .collect();
    assert_eq!(requested, [IndexRange::new(0, 9), IndexRange::new(9, 18)]);

    assert_eq!(v.resolve_fetch(first.id, Ok(page_for(&first))), LoadingState::ItemsLoading);
    assert_eq!(v.element_from_index(0).unwrap().label, 0);

    let second = v.item_data_source().requests[1];
    assert_eq!(v.resolve_fetch(second.id, Ok(page_for(&second))), LoadingState::ViewPortLoaded);
    let third = v.item_data_source().requests[2];
    assert_eq!(third.range(), IndexRange::new(18, 27));
    assert_eq!(v.resolve_fetch(third.id, Ok(page_for(&third))), LoadingState::Complete);
    assert_eq!(v.realized_count(), 27);
}

#[test]
fn replaced_source_drops_in_flight_fetches() {
    let mut v = build(
        tiles(300, 300, GridLayout::new()),
        Deferred {
            count: 27,
            ..Deferred::default()
        },
    );
    v.process();
    let old = v.item_data_source().requests[0];

    v.set_item_data_source(Deferred {
        count: 27,
        ..Deferred::default()
    });
    v.process();
    let fresh = v.item_data_source().requests[0];
    assert_eq!(fresh.range(), IndexRange::new(0, 9));

    assert_eq!(v.resolve_fetch(old.id, Ok(page_for(&old))), LoadingState::ItemsLoading);
    assert_eq!(v.realized_count(), 0);
}

struct Undercounted(Vec<usize>);

impl ItemDataSource for Undercounted {
    type Item = usize;

    fn count(&self) -> usize {
        10
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<usize> {
        self.0.items_from_index(request)
    }
}

#[test]
fn page_total_count_triggers_recount() {
    let mut v = build(tiles(300, 300, GridLayout::new()), Undercounted(items(20)));
    assert_eq!(v.process(), LoadingState::Complete);
    assert_eq!(v.count(), 20);
    assert_eq!(v.content_size().width, 700);
    assert!(v.element_from_index(19).is_some());
}

/// Estimates its count; pages report the real one.
struct Estimated {
    estimate: usize,
    items: Vec<usize>,
}

impl ItemDataSource for Estimated {
    type Item = usize;

    fn count(&self) -> usize {
        self.estimate
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<usize> {
        self.items.items_from_index(request)
    }
}

#[test]
fn source_count_change_overrides_page_count() {
    let source = Estimated {
        estimate: 10,
        items: items(12),
    };
    let mut v = build(tiles(300, 300, GridLayout::new()), source);
    assert_eq!(v.process(), LoadingState::Complete);
    assert_eq!(v.count(), 12);

    let source = v.item_data_source_mut();
    source.items.truncate(5);
    source.estimate = 5;
    v.invalidate(true);
    assert_eq!(v.process(), LoadingState::Complete);

    assert_eq!(v.count(), 5);
    assert_eq!(range(&v), Some((0, 4)));
    assert_eq!(v.realized_count(), 5);
    assert!(v.element_from_index(5).is_none());
}

#[test]
fn pages_to_load_sizes_the_window() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    // Nine visible, two pages after.
    assert_eq!(v.realized_count(), 27);
    assert!(v.element_from_index(26).is_some());

    v.set_pages_to_load(1);
    v.process();
    assert_eq!(v.realized_count(), 9);
    assert_eq!(
        v.realized_items().map(|i| i.index).collect::<Vec<_>>(),
        items(9)
    );
}

#[test]
fn continuations_run_after_the_pass_completes() {
    let ran = Arc::new(AtomicBool::new(false));
    let mut v = build(tiles(300, 300, GridLayout::new()), items(100));
    let ticket = v.set_scroll_position(500);
    assert!(!v.is_settled(ticket));

    let flag = Arc::clone(&ran);
    v.then(ticket, move |v| {
        assert_eq!(v.scroll_position(), 500);
        flag.store(true, Ordering::Relaxed);
        v.set_index_of_first_visible(3).unwrap();
    });
    assert_eq!(v.process(), LoadingState::Complete);

    assert!(ran.load(Ordering::Relaxed));
    assert!(v.is_settled(ticket));
    assert_eq!(v.scroll_position(), 100);
    assert_eq!(v.index_of_first_visible(), Some(3));
}

#[test]
fn view_state_round_trips() {
    let mut v = settled(tiles(300, 300, GridLayout::new()), 100);
    v.set_index_of_first_visible(30).unwrap();
    v.process();
    let state = v.view_state();
    assert_eq!(state.first_visible, Some(30));
    assert_eq!(state.viewport.scroll, 1000);

    let mut restored = settled(tiles(300, 300, GridLayout::new()), 100);
    restored.restore_view_state(state);
    restored.process();
    assert_eq!(restored.index_of_first_visible(), Some(30));
    assert_eq!(restored.scroll_position(), 1000);
}

#[test]
fn auto_height_host_sizes_from_content() {
    let v = settled(tiles(300, 0, GridLayout::new()), 5);
    assert_eq!(v.content_size(), Extent { width: 500, height: 100 });
}

#[test]
fn window_plan_extends_by_half_the_pages() {
    let plan = WindowPlan::new(Some(VisibleRange { first: 24, last: 27 }), 100, 10);
    assert_eq!(plan.visible, IndexRange::new(24, 28));
    assert_eq!(plan.window, IndexRange::new(4, 48));

    let plan = WindowPlan::new(Some(VisibleRange { first: 2, last: 3 }), 5, 5);
    assert_eq!(plan.window, IndexRange::new(0, 5));

    assert_eq!(WindowPlan::new(None, 0, 5), WindowPlan::default());
}

#[test]
fn vec_source_clamps_pages() {
    let mut source = items(5);
    let request = FetchRequest {
        id: FetchId(0),
        generation: 1,
        index: 3,
        count_before: 1,
        count_after: 10,
    };
    let Fetch::Ready(page) = source.items_from_index(&request) else {
        panic!("expected a page");
    };
    assert_eq!(page.items, [2, 3, 4]);
    assert_eq!(page.first_index(), 2);
    assert_eq!(page.total_count, Some(5));
}

/// 0: list, 1: grid, 2: cell-spanning with every third item two cells long.
fn layout_for(kind: u8, cell: u32) -> Layout {
    match kind {
        0 => ListLayout::new().into(),
        1 => GridLayout::new().into(),
        _ => {
            let item = cell;
            CellSpanningLayout::new(GroupInfo::new(cell, cell), move |i| {
                if i % 3 == 0 {
                    ItemInfo::new(item * 2, item)
                } else {
                    ItemInfo::new(item, item)
                }
            })
            .into()
        }
    }
}

mod properties {
    use super::{build, items, layout_for};
    use crate::{ItemMetrics, ListViewOptions, LoadingState, Margins, Size};

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn visible_range_stays_in_bounds(
            count in 0usize..400,
            width in 1u32..800,
            height in 1u32..800,
            item in 1u32..200,
            margin in 0u32..30,
            scroll in 0u64..50_000,
            kind in 0u8..3,
        ) {
            let metrics = ItemMetrics::new(item, item).with_margins(Margins::new(margin, 0, 0, margin));
            let options = ListViewOptions::uniform(Size::new(width, height), metrics)
                .with_layout(layout_for(kind, item + margin));
            let mut v = build(options, items(count));
            v.set_scroll_position(scroll);
            prop_assert_eq!(v.process(), LoadingState::Complete);

            match v.visible_range() {
                None => prop_assert_eq!(count, 0),
                Some(r) => {
                    prop_assert!(r.first <= r.last);
                    prop_assert!(r.last < count);
                    prop_assert!(v.scroll_position() <= v.mapper().max_scroll());
                    prop_assert!(v.element_from_index(r.first).is_some());
                    prop_assert!(v.element_from_index(r.last).is_some());
                }
            }
        }

        #[test]
        fn ensure_visible_is_idempotent(
            (count, index) in (1usize..200).prop_flat_map(|c| (Just(c), 0..c)),
            view in 200u32..600,
            item in 1u32..=100,
            margin in 0u32..20,
            scroll in 0u64..20_000,
            kind in 0u8..3,
        ) {
            let metrics = ItemMetrics::new(item, item).with_margins(Margins::uniform(margin));
            let options = ListViewOptions::uniform(Size::new(view, view), metrics)
                .with_layout(layout_for(kind, item + 2 * margin));
            let mut v = build(options, items(count));
            v.set_scroll_position(scroll);
            v.process();

            v.ensure_visible(index).unwrap();
            v.process();
            let settled_at = v.scroll_position();
            let rect = v.item_rect(index).unwrap();
            let (start, end) = if kind == 0 {
                (rect.top, rect.bottom())
            } else {
                (rect.left, rect.right())
            };
            prop_assert!(start >= settled_at);
            prop_assert!(end <= settled_at + view as u64);

            v.ensure_visible(index).unwrap();
            v.process();
            prop_assert_eq!(v.scroll_position(), settled_at);
        }
    }
}
