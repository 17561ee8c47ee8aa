// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    Ten,
    Twenty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [Self; 4] = [Self::Ten, Self::Twenty, Self::Fifty, Self::Hundred];

    pub const fn get(self) -> u32 {
        match self {
            Self::Ten => 10,
            Self::Twenty => 20,
            Self::Fifty => 50,
            Self::Hundred => 100,
        }
    }

    pub fn from_limit(limit: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == limit)
    }

    pub fn next(self) -> Self {
        match self {
            Self::Ten => Self::Twenty,
            Self::Twenty => Self::Fifty,
            Self::Fifty | Self::Hundred => Self::Hundred,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Ten | Self::Twenty => Self::Ten,
            Self::Fifty => Self::Twenty,
            Self::Hundred => Self::Fifty,
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Search term plus paging position: everything that determines a list's
/// visible content. The term is kept trimmed, matching what the backend and
/// the location see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    term: String,
    page: u32,
    page_size: PageSize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            term: String::new(),
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl QueryState {
    pub fn new(term: impl Into<String>, page: u32, page_size: PageSize) -> Self {
        Self {
            term: term.into().trim().to_owned(),
            page: page.max(1),
            page_size,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Term as sent to the backend; blank terms mean "no filter".
    pub fn trimmed_term(&self) -> Option<&str> {
        let trimmed = self.term.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// A new term is a new result set, so the page goes back to 1.
    pub fn with_term(&self, term: impl Into<String>) -> Self {
        let term = term.into();
        let term = term.trim();
        if term == self.term {
            return self.clone();
        }
        Self {
            term: term.to_owned(),
            page: 1,
            page_size: self.page_size,
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Keeps the term; the page goes back to 1.
    pub fn with_page_size(&self, page_size: PageSize) -> Self {
        if page_size == self.page_size {
            return self.clone();
        }
        Self {
            term: self.term.clone(),
            page: 1,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> ResultPage<T> {
    pub fn new(rows: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            rows,
            total,
            page,
            page_size,
            total_pages: total_pages(total, page_size),
        }
    }

    pub fn empty(query: &QueryState) -> Self {
        Self::new(Vec::new(), 0, query.page(), query.page_size().get())
    }

    /// 1-based inclusive row window for "showing X to Y of N"; `(0, 0)` when
    /// the page holds nothing.
    pub fn showing_range(&self) -> (u64, u64) {
        if self.rows.is_empty() {
            return (0, 0);
        }
        let first = u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size) + 1;
        (first, first + self.rows.len() as u64 - 1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if total == 0 || page_size == 0 {
        return 0;
    }
    let pages = total.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u32),
    Gap,
}

/// Compact page strip: every page when there are at most five, otherwise the
/// first and last page around a three-wide window on the current one.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageMarker> {
    const MAX_VISIBLE: u32 = 5;

    if total_pages <= MAX_VISIBLE {
        return (1..=total_pages).map(PageMarker::Page).collect();
    }

    let mut markers = Vec::new();
    if current <= 3 {
        markers.extend((1..=5).map(PageMarker::Page));
        markers.push(PageMarker::Gap);
        markers.push(PageMarker::Page(total_pages));
    } else if current >= total_pages - 2 {
        markers.push(PageMarker::Page(1));
        markers.push(PageMarker::Gap);
        markers.extend((total_pages - 4..=total_pages).map(PageMarker::Page));
    } else {
        markers.push(PageMarker::Page(1));
        markers.push(PageMarker::Gap);
        markers.extend((current - 1..=current + 1).map(PageMarker::Page));
        markers.push(PageMarker::Gap);
        markers.push(PageMarker::Page(total_pages));
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::{PageMarker, PageSize, QueryState, ResultPage, page_window, total_pages};

    #[test]
    fn total_pages_is_zero_for_empty_results() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 100), 1);
    }

    #[test]
    fn term_change_resets_page() {
        let state = QueryState::new("oil", 4, PageSize::Twenty);
        let next = state.with_term("oil filter");
        assert_eq!(next.page(), 1);
        assert_eq!(next.term(), "oil filter");
        assert_eq!(next.page_size(), PageSize::Twenty);
    }

    #[test]
    fn same_term_keeps_page() {
        let state = QueryState::new("oil", 4, PageSize::Ten);
        assert_eq!(state.with_term("oil"), state);
    }

    #[test]
    fn surrounding_whitespace_is_not_a_new_term() {
        let state = QueryState::new("oil", 4, PageSize::Ten);
        assert_eq!(state.with_term(" oil  "), state);
        assert_eq!(QueryState::new(" oil ", 4, PageSize::Ten), state);
    }

    #[test]
    fn page_size_change_keeps_term_and_resets_page() {
        let state = QueryState::new("brake", 3, PageSize::Ten);
        let next = state.with_page_size(PageSize::Fifty);
        assert_eq!(next.term(), "brake");
        assert_eq!(next.page(), 1);
        assert_eq!(next.page_size(), PageSize::Fifty);
    }

    #[test]
    fn page_is_clamped_to_one() {
        assert_eq!(QueryState::default().with_page(0).page(), 1);
        assert_eq!(QueryState::new("", 0, PageSize::Ten).page(), 1);
    }

    #[test]
    fn trimmed_term_treats_whitespace_as_absent() {
        assert_eq!(QueryState::new("  ", 1, PageSize::Ten).trimmed_term(), None);
        assert_eq!(
            QueryState::new(" gear ", 1, PageSize::Ten).trimmed_term(),
            Some("gear")
        );
    }

    #[test]
    fn showing_range_tracks_page_position() {
        let page = ResultPage::new(vec![1, 2, 3, 4, 5], 25, 3, 10);
        assert_eq!(page.showing_range(), (21, 25));
        assert!(!page.has_next());
        assert!(page.has_prev());

        let empty: ResultPage<i32> = ResultPage::new(Vec::new(), 0, 1, 10);
        assert_eq!(empty.showing_range(), (0, 0));
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn page_window_collapses_long_ranges() {
        use PageMarker::{Gap, Page};
        assert_eq!(page_window(1, 3), vec![Page(1), Page(2), Page(3)]);
        assert_eq!(
            page_window(2, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Gap, Page(10)]
        );
        assert_eq!(
            page_window(6, 10),
            vec![Page(1), Gap, Page(5), Page(6), Page(7), Gap, Page(10)]
        );
        assert_eq!(
            page_window(9, 10),
            vec![Page(1), Gap, Page(6), Page(7), Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn page_size_steps_through_allowed_values() {
        assert_eq!(PageSize::Ten.next(), PageSize::Twenty);
        assert_eq!(PageSize::Hundred.next(), PageSize::Hundred);
        assert_eq!(PageSize::Ten.prev(), PageSize::Ten);
        assert_eq!(PageSize::from_limit(50), Some(PageSize::Fifty));
        assert_eq!(PageSize::from_limit(15), None);
    }
}
