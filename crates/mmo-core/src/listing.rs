//! # Listing Module
//!
//! Merging paged backend results (products, orders) into the list the user
//! scrolls.
//!
//! ```text
//! page 1 ──► replace ──┐
//!                      ├──► dedup by code (first occurrence wins) ──► items
//! page N ──► append  ──┘
//! ```
//!
//! Rows can shift between pages while the user scrolls (a new product is
//! approved, another sells out), so the same code may come back twice.

use std::collections::HashSet;

use crate::types::{Order, Product};

/// Anything listed by a stable business code.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Product {
    fn key(&self) -> &str {
        &self.product_code
    }
}

impl Keyed for Order {
    fn key(&self) -> &str {
        &self.order_code
    }
}

/// How a freshly fetched page joins the current list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Page 1: the fetched rows become the list.
    Replace,
    /// Page N > 1: the fetched rows go after the current list.
    Append,
}

/// Merges `incoming` into `existing` and removes duplicate codes, keeping
/// the first occurrence and the original order.
///
/// ## Example
/// ```rust
/// use mmo_core::listing::{merge_dedup, Keyed, MergeMode};
///
/// #[derive(Debug, PartialEq)]
/// struct Row(&'static str);
/// impl Keyed for Row {
///     fn key(&self) -> &str { self.0 }
/// }
///
/// let merged = merge_dedup(vec![Row("A"), Row("B")], vec![Row("B"), Row("C")], MergeMode::Append);
/// assert_eq!(merged, vec![Row("A"), Row("B"), Row("C")]);
/// ```
pub fn merge_dedup<T: Keyed>(existing: Vec<T>, incoming: Vec<T>, mode: MergeMode) -> Vec<T> {
    let combined: Vec<T> = match mode {
        MergeMode::Replace => incoming,
        MergeMode::Append => existing.into_iter().chain(incoming).collect(),
    };

    let mut seen = HashSet::with_capacity(combined.len());
    combined
        .into_iter()
        .filter(|item| seen.insert(item.key().to_string()))
        .collect()
}

/// Number of pages for `count` rows, never less than one.
///
/// ## Example
/// ```rust
/// use mmo_core::listing::total_pages;
///
/// assert_eq!(total_pages(0, 10), 1);
/// assert_eq!(total_pages(10, 10), 1);
/// assert_eq!(total_pages(11, 10), 2);
/// ```
pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(String, u32);

    impl Keyed for Row {
        fn key(&self) -> &str {
            &self.0
        }
    }

    fn row(code: &str, tag: u32) -> Row {
        Row(code.to_string(), tag)
    }

    #[test]
    fn test_replace_drops_previous_rows() {
        let merged = merge_dedup(vec![row("A", 0)], vec![row("B", 1)], MergeMode::Replace);
        assert_eq!(merged, vec![row("B", 1)]);
    }

    #[test]
    fn test_append_keeps_first_occurrence() {
        let existing = vec![row("A", 0), row("B", 0)];
        let incoming = vec![row("B", 1), row("C", 1), row("A", 1)];
        let merged = merge_dedup(existing, incoming, MergeMode::Append);
        assert_eq!(merged, vec![row("A", 0), row("B", 0), row("C", 1)]);
    }

    #[test]
    fn test_dedup_within_one_page() {
        let merged = merge_dedup(
            Vec::new(),
            vec![row("X", 0), row("X", 1), row("Y", 2)],
            MergeMode::Replace,
        );
        assert_eq!(merged, vec![row("X", 0), row("Y", 2)]);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(25, 0), 25);
    }
}
