use crate::Size;

/// A lightweight, serializable snapshot of the viewport.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    pub size: Size,
    /// Logical scroll offset along the scroll axis.
    pub scroll: u64,
}

/// Viewport plus the first visible index, for restoring a view across sessions.
///
/// Restoring prefers `first_visible` so the same item stays at the leading edge even when
/// item sizes changed in between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewState {
    pub viewport: ViewportState,
    pub first_visible: Option<usize>,
}
