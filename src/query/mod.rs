//! Dynamic filter/sort queries shared by every repository.
//!
//! Callers describe conditions as [`FilterDescriptor`]s and ordering as
//! [`SortDescriptor`]s. [`validate_filters_and_sorting`] checks them against a
//! per-table column whitelist and turns them into a [`ValidatedQuery`], which
//! is the only thing [`build_filters`] accepts. Identifiers in the generated
//! SQL therefore always come from a whitelist; values are always bound.

mod builder;
mod filter;
mod validate;
mod value;

use thiserror::Error;

pub use builder::*;
pub use filter::*;
pub use validate::*;
pub use value::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid filter descriptor: {reason}")]
    InvalidFilterShape { reason: String },

    #[error("Invalid sort descriptor: {reason}")]
    InvalidSortShape { reason: String },

    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("Unsupported operator: {operator}")]
    UnsupportedOperator { operator: String },

    #[error("Invalid sort direction: {direction}")]
    InvalidDirection { direction: String },

    #[error("Invalid value for operator {operator}: {reason}")]
    InvalidValueForOperator { operator: String, reason: String },
}

/// Hard cap on rows returned by one page.
pub const MAX_PAGE_SIZE: u32 = 500;

/// LIMIT/OFFSET window. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset,
        }
    }

    /// 1-based page number of `per_page` rows.
    pub fn number(page: u32, per_page: u32) -> Self {
        let limit = per_page.clamp(1, MAX_PAGE_SIZE);
        Self::new(limit, page.saturating_sub(1).saturating_mul(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(10_000, 0).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn page_number_computes_offset() {
        assert_eq!(Page::number(3, 25), Page { limit: 25, offset: 50 });
        assert_eq!(Page::number(0, 25).offset, 0);
    }
}
