use tileview::{
    Direction, GridLayout, ItemMetrics, ListLayout, ListView, ListViewOptions, LoadingState,
    Margins, Size,
};

fn main() {
    // 10k items, 100x100 tiles with a 10px gap on the trailing edge.
    let data: Vec<String> = (0..10_000).map(|i| format!("Item {i}")).collect();
    let metrics = ItemMetrics::new(100, 100).with_margins(Margins::new(0, 0, 10, 10));
    let opts = ListViewOptions::uniform(Size::new(640, 330), metrics)
        .with_layout(GridLayout::new())
        .with_pages_to_load(3)
        .with_on_error(|e| eprintln!("listview error: {e}"));

    let mut view = ListView::new(opts, data, |index: usize, label: &String| {
        format!("<tile #{index}>{label}</tile>")
    })
    .expect("valid layout");

    view.add_loading_state_listener(|s: LoadingState| println!("  state -> {s:?}"));

    view.process();
    println!(
        "visible={:?} realized={} content={:?}",
        view.visible_range(),
        view.realized_count(),
        view.content_size()
    );

    // Jump to an item, then nudge it into view from the other side.
    view.set_index_of_first_visible(4_200).expect("in range");
    view.process();
    println!(
        "after jump: scroll={} first={:?} last={:?}",
        view.scroll_position(),
        view.index_of_first_visible(),
        view.index_of_last_visible()
    );

    view.ensure_visible(4_260).expect("in range");
    view.process();
    println!("after ensure_visible: scroll={}", view.scroll_position());
    if let Some(tile) = view.element_from_index(4_260) {
        println!("  rendered {tile} at {:?}", view.item_rect(4_260));
    }

    // Mirror for RTL hosts; the same logical scroll maps to a different scrollLeft.
    view.set_direction(Direction::Rtl);
    view.process();
    println!(
        "rtl: scroll_point={:?} rect(4200)={:?}",
        view.scroll_point(),
        view.item_rect(4_200)
    );

    // Swap to a list; the first visible item is kept.
    view.set_layout(ListLayout::new()).expect("valid layout");
    view.process();
    println!(
        "list: scroll={} first={:?}",
        view.scroll_position(),
        view.index_of_first_visible()
    );
}
