use alloc::string::String;
use alloc::sync::Arc;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, ListViewError>;

/// Callback that receives errors found while a pass runs (the host's unhandled-error channel).
pub type ErrorCallback = Arc<dyn Fn(&ListViewError) + Send + Sync>;

/// A data source rejected a fetch.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DataSourceError {
    pub message: String,
}

impl DataSourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ListViewError {
    #[error("index {index} is out of range (count {count})")]
    OutOfRangeIndex { index: usize, count: usize },

    #[error("invalid layout parameter `{name}`: {reason}")]
    InvalidLayoutParameter {
        name: &'static str,
        reason: &'static str,
    },

    #[error("data source failed for items {start}..{end}")]
    DataSourceFailure {
        start: usize,
        end: usize,
        #[source]
        reason: DataSourceError,
    },
}

impl ListViewError {
    pub(crate) fn out_of_range(index: usize, count: usize) -> Self {
        Self::OutOfRangeIndex { index, count }
    }

    pub(crate) fn invalid(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidLayoutParameter { name, reason }
    }
}
