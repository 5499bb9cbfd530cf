use std::collections::VecDeque;

use tileview::{
    Fetch, FetchRequest, ItemDataSource, ItemMetrics, ItemsPage, ListLayout, ListView,
    ListViewOptions, LoadingState, Size,
};

/// Answers every fetch later, like a network-backed source.
struct Remote {
    count: usize,
    queue: VecDeque<FetchRequest>,
}

impl ItemDataSource for Remote {
    type Item = u64;

    fn count(&self) -> usize {
        self.count
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<u64> {
        self.queue.push_back(*request);
        Fetch::Pending
    }
}

fn main() {
    let opts = ListViewOptions::uniform(Size::new(320, 480), ItemMetrics::new(320, 48))
        .with_layout(ListLayout::new());
    let source = Remote {
        count: 50_000,
        queue: VecDeque::new(),
    };
    let mut view = ListView::new(opts, source, |index: usize, id: &u64| (index, *id * 10))
        .expect("valid layout");

    let mut state = view.process();
    println!("initial state={state:?}");

    // The host scrolls while the first page is still in flight; that page goes stale.
    view.on_scroll(24_000);
    state = view.process();
    println!("after scroll: state={state:?} first={:?}", view.index_of_first_visible());

    while state != LoadingState::Complete {
        let Some(request) = view.item_data_source_mut().queue.pop_front() else {
            break;
        };
        let range = request.range();
        let page = ItemsPage::new(range.start, (range.start as u64..range.end as u64).collect());
        state = view.resolve_fetch(request.id, Ok(page));
        println!(
            "resolved fetch {} ({}..{}): state={state:?} realized={}",
            request.id.get(),
            range.start,
            range.end,
            view.realized_count()
        );
    }
}
