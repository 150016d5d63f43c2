//! Error types for the adaptive testing engine.
//!
//! Numerical trouble never shows up here: degenerate curvature and an exhausted
//! adaptive pool are recovered inside the estimator and the session controller.
//! What remains are contract violations by the caller, reported with enough
//! context to find the bug.

use crate::types::ItemIndex;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, CatError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatError {
    /// A response or design entry names an item the bank does not contain.
    #[error("unknown item index {0}")]
    UnknownItem(ItemIndex),

    /// Two items in the bank share an index.
    #[error("duplicate item index {0} in item bank")]
    DuplicateItemIndex(ItemIndex),

    /// Discrimination must be positive and finite; difficulty must be finite.
    #[error("item {index}: invalid {parameter} {value}")]
    InvalidItemParameter {
        index: ItemIndex,
        parameter: &'static str,
        value: f64,
    },

    #[error("item {item}: category {category} outside 1..={max_category}")]
    CategoryOutOfRange {
        item: ItemIndex,
        category: u8,
        max_category: u8,
    },

    /// The same item was answered twice within one response log.
    #[error("item {0} appears more than once in the response log")]
    DuplicateResponse(ItemIndex),

    #[error("invalid estimator options: {0}")]
    InvalidOptions(String),

    #[error("invalid session design: {0}")]
    InvalidDesign(String),

    /// A response was recorded for an item that is not the one currently on screen.
    #[error("item {got} answered, but item {expected:?} is pending")]
    NotPending {
        expected: Option<ItemIndex>,
        got: ItemIndex,
    },

    #[error("session already complete after {0} items")]
    SessionComplete(usize),

    #[error("session incomplete: {administered} of {total} positions filled")]
    SessionIncomplete { administered: usize, total: usize },
}
