use alloc::vec::Vec;

use crate::{DataSourceError, IndexRange};

/// Identifies one outstanding fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchId(pub(crate) u64);

impl FetchId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A request for the items around `index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchRequest {
    pub id: FetchId,
    /// Pass generation the request belongs to.
    pub generation: u64,
    pub index: usize,
    pub count_before: usize,
    pub count_after: usize,
}

impl FetchRequest {
    /// All indexes the request covers.
    pub fn range(&self) -> IndexRange {
        IndexRange::new(
            self.index.saturating_sub(self.count_before),
            self.index.saturating_add(self.count_after).saturating_add(1),
        )
    }
}

/// Items returned by a data source.
///
/// `items[offset]` is the item at `absolute_index`. Pages may hold more or fewer items than
/// requested; only requested indexes are realized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemsPage<T> {
    pub items: Vec<T>,
    pub offset: usize,
    /// The source's current item count, when it knows it.
    pub total_count: Option<usize>,
    pub absolute_index: usize,
}

impl<T> ItemsPage<T> {
    /// A page whose first item sits at `start`.
    pub fn new(start: usize, items: Vec<T>) -> Self {
        Self {
            items,
            offset: 0,
            total_count: None,
            absolute_index: start,
        }
    }

    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = Some(total_count);
        self
    }

    /// Index of `items[0]`.
    pub fn first_index(&self) -> usize {
        self.absolute_index.saturating_sub(self.offset)
    }
}

/// Outcome of [`ItemDataSource::items_from_index`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch<T> {
    Ready(ItemsPage<T>),
    /// The host will deliver the page later through `ListView::resolve_fetch`.
    Pending,
    Failed(DataSourceError),
}

/// Paged access to the items being displayed.
pub trait ItemDataSource {
    type Item;

    fn count(&self) -> usize;

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<Self::Item>;
}

impl<T: Clone> ItemDataSource for Vec<T> {
    type Item = T;

    fn count(&self) -> usize {
        self.len()
    }

    fn items_from_index(&mut self, request: &FetchRequest) -> Fetch<T> {
        let range = request.range();
        let end = range.end.min(self.len());
        if request.index >= self.len() {
            return Fetch::Failed(DataSourceError::new("index out of range"));
        }
        let start = range.start.min(end);
        Fetch::Ready(ItemsPage {
            items: self[start..end].to_vec(),
            offset: request.index - start,
            total_count: Some(self.len()),
            absolute_index: request.index,
        })
    }
}

/// Turns an item into whatever the host displays for it.
pub trait ItemRenderer<T> {
    type Element;

    fn render(&mut self, index: usize, item: &T) -> Self::Element;
}

impl<T, E, F> ItemRenderer<T> for F
where
    F: FnMut(usize, &T) -> E,
{
    type Element = E;

    fn render(&mut self, index: usize, item: &T) -> E {
        self(index, item)
    }
}
