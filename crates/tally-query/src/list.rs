// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};
use tally_app::{PageSize, QueryState, ResultPage};
use tracing::debug;

use crate::debounce::Debouncer;
use crate::sequencer::{Completion, FetchSequencer, RequestTicket};
use crate::store::QueryStore;

/// A paginated, searchable list view: a query store, a debounced search
/// input and a sequenced fetch. Operations that change the canonical query
/// hand back the ticket the caller must fetch.
#[derive(Debug)]
pub struct ListController<T, S: QueryStore> {
    input: String,
    store: S,
    debounce: Debouncer<String>,
    sequencer: FetchSequencer<ResultPage<T>>,
    message: Option<String>,
}

impl<T, S: QueryStore> ListController<T, S> {
    pub fn new(store: S, delay: Duration) -> Self {
        let input = store.current().term().to_owned();
        Self {
            input,
            store,
            debounce: Debouncer::new(delay),
            sequencer: FetchSequencer::new(),
            message: None,
        }
    }

    /// First fetch after mount, for whatever the store already holds.
    pub fn start(&mut self) -> RequestTicket {
        self.issue()
    }

    pub fn edit_term(&mut self, text: &str, now: Instant) {
        self.input = text.to_owned();
        self.debounce.schedule(text.to_owned(), now);
    }

    pub fn tick(&mut self, now: Instant) -> Option<RequestTicket> {
        let term = self.debounce.poll(now)?;
        if !self.store.set_term(&term) {
            debug!(term = %term, "search term unchanged; no fetch");
            return None;
        }
        Some(self.issue())
    }

    pub fn set_page(&mut self, page: u32) -> Option<RequestTicket> {
        self.store.set_page(page).then(|| self.issue())
    }

    pub fn next_page(&mut self) -> Option<RequestTicket> {
        let total_pages = self.page().map_or(0, |page| page.total_pages);
        let current = self.query().page();
        if current >= total_pages {
            return None;
        }
        self.set_page(current + 1)
    }

    pub fn prev_page(&mut self) -> Option<RequestTicket> {
        let current = self.query().page();
        if current <= 1 {
            return None;
        }
        self.set_page(current - 1)
    }

    pub fn set_page_size(&mut self, page_size: PageSize) -> Option<RequestTicket> {
        self.store.set_page_size(page_size).then(|| self.issue())
    }

    /// Re-issues the current query, as after a create, update or delete.
    pub fn refresh(&mut self) -> RequestTicket {
        self.issue()
    }

    /// Re-reads the store after outside navigation; the input follows the
    /// new term and any half-typed search is dropped.
    pub fn sync_location(&mut self) -> Option<RequestTicket> {
        if !self.store.sync() {
            return None;
        }
        self.debounce.cancel();
        self.input = self.store.current().term().to_owned();
        Some(self.issue())
    }

    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<ResultPage<T>>,
    ) -> Completion {
        self.sequencer.complete(ticket, outcome)
    }

    pub fn teardown(&mut self) {
        self.debounce.cancel();
        self.sequencer.invalidate();
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn query(&self) -> &QueryState {
        self.store.current()
    }

    pub fn page(&self) -> Option<&ResultPage<T>> {
        self.sequencer.data()
    }

    pub fn rows(&self) -> &[T] {
        self.page().map_or(&[], |page| page.rows.as_slice())
    }

    pub fn error(&self) -> Option<&str> {
        self.sequencer.error()
    }

    pub fn is_loading(&self) -> bool {
        self.sequencer.is_loading()
    }

    pub fn remaining_debounce(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    fn issue(&mut self) -> RequestTicket {
        self.message = None;
        self.sequencer.issue(self.store.current().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::ListController;
    use crate::sequencer::Completion;
    use crate::store::{Location, LocationHandle, LocationStore, MemoryStore};
    use anyhow::{Result, anyhow};
    use std::time::{Duration, Instant};
    use tally_app::{PageSize, QueryState, ResultPage};

    const DELAY: Duration = Duration::from_millis(300);

    fn page_for(query: &QueryState, total: u64) -> ResultPage<String> {
        let size = query.page_size().get();
        let rows = (0..size.min(total as u32))
            .map(|n| format!("{}-{n}", query.term()))
            .collect();
        ResultPage::new(rows, total, query.page(), size)
    }

    #[test]
    fn only_the_final_term_in_a_burst_is_fetched() -> Result<()> {
        let start = Instant::now();
        let mut list = ListController::<String, _>::new(MemoryStore::default(), DELAY);
        for (offset, text) in [(0, "o"), (80, "oi"), (160, "oil")] {
            list.edit_term(text, start + Duration::from_millis(offset));
            assert!(list.tick(start + Duration::from_millis(offset)).is_none());
        }
        assert_eq!(list.input(), "oil");
        assert_eq!(list.query().term(), "");

        let ticket = list
            .tick(start + Duration::from_millis(460))
            .ok_or_else(|| anyhow!("expected a fetch"))?;
        assert_eq!(ticket.query().term(), "oil");
        assert!(list.tick(start + Duration::from_millis(900)).is_none());
        Ok(())
    }

    #[test]
    fn term_change_resets_page() -> Result<()> {
        let start = Instant::now();
        let mut list = ListController::<String, _>::new(
            MemoryStore::new(QueryState::new("oil", 4, PageSize::Twenty)),
            DELAY,
        );
        list.edit_term("gear", start);
        let ticket = list
            .tick(start + DELAY)
            .ok_or_else(|| anyhow!("expected a fetch"))?;
        assert_eq!(ticket.query(), &QueryState::new("gear", 1, PageSize::Twenty));
        Ok(())
    }

    #[test]
    fn paging_stays_within_bounds() -> Result<()> {
        let mut list = ListController::<String, _>::new(MemoryStore::default(), DELAY);
        let ticket = list.start();
        let page = page_for(ticket.query(), 25);
        assert_eq!(list.complete(ticket, Ok(page)), Completion::Applied);
        assert_eq!(list.page().map(|page| page.total_pages), Some(3));

        assert!(list.prev_page().is_none());
        let ticket = list.next_page().ok_or_else(|| anyhow!("page 2 exists"))?;
        list.complete(ticket, Ok(ResultPage::new(Vec::new(), 25, 2, 10)));
        let ticket = list.next_page().ok_or_else(|| anyhow!("page 3 exists"))?;
        list.complete(ticket, Ok(ResultPage::new(Vec::new(), 25, 3, 10)));
        assert!(list.next_page().is_none());
        assert!(list.set_page(3).is_none());
        Ok(())
    }

    #[test]
    fn page_size_change_keeps_term() -> Result<()> {
        let mut list = ListController::<String, _>::new(
            MemoryStore::new(QueryState::new("oil", 3, PageSize::Ten)),
            DELAY,
        );
        let ticket = list
            .set_page_size(PageSize::Fifty)
            .ok_or_else(|| anyhow!("expected a fetch"))?;
        assert_eq!(ticket.query(), &QueryState::new("oil", 1, PageSize::Fifty));
        assert!(list.set_page_size(PageSize::Fifty).is_none());
        Ok(())
    }

    #[test]
    fn failed_fetch_shows_error_and_no_rows() -> Result<()> {
        let mut list = ListController::<String, _>::new(MemoryStore::default(), DELAY);
        let ticket = list.start();
        let page = page_for(ticket.query(), 3);
        list.complete(ticket, Ok(page));
        assert_eq!(list.rows().len(), 3);

        let ticket = list.refresh();
        list.complete(ticket, Err(anyhow!("backend returned 502")));
        assert!(list.rows().is_empty());
        assert_eq!(list.error(), Some("backend returned 502"));
        Ok(())
    }

    #[test]
    fn bookmarked_location_drives_first_fetch_and_navigation() -> Result<()> {
        let handle = LocationHandle::new(Location::parse("/items?q=foo&page=3"));
        let mut list = ListController::<String, _>::new(
            LocationStore::mount(handle.clone(), "/items"),
            DELAY,
        );
        assert_eq!(list.input(), "foo");
        let ticket = list.start();
        assert_eq!(ticket.query(), &QueryState::new("foo", 3, PageSize::Ten));

        handle.navigate("/items?q=bar&page=2&limit=20");
        let ticket = list
            .sync_location()
            .ok_or_else(|| anyhow!("navigation should refetch"))?;
        assert_eq!(ticket.query(), &QueryState::new("bar", 2, PageSize::Twenty));
        assert_eq!(list.input(), "bar");
        assert!(list.sync_location().is_none());
        Ok(())
    }

    #[test]
    fn trailing_space_does_not_refetch_or_reset_page() {
        let start = Instant::now();
        let handle = LocationHandle::new(Location::parse("/items?q=oil&page=3&limit=10"));
        let mut list = ListController::<String, _>::new(
            LocationStore::mount(handle.clone(), "/items"),
            DELAY,
        );
        list.start();
        list.edit_term("oil ", start);
        assert!(list.tick(start + DELAY).is_none());
        assert_eq!(list.input(), "oil ");
        assert_eq!(list.query(), &QueryState::new("oil", 3, PageSize::Ten));
        assert_eq!(handle.href(), "/items?q=oil&page=3&limit=10");
    }

    #[test]
    fn list_message_is_kept_until_next_fetch() {
        let mut list = ListController::<String, _>::new(MemoryStore::default(), DELAY);
        list.record_failure("delete failed: item has sales");
        assert_eq!(list.message(), Some("delete failed: item has sales"));
        list.refresh();
        assert_eq!(list.message(), None);
    }

    #[test]
    fn teardown_cancels_debounce_and_in_flight_fetch() {
        let start = Instant::now();
        let mut list = ListController::<String, _>::new(MemoryStore::default(), DELAY);
        let ticket = list.start();
        list.edit_term("oil", start);
        list.teardown();
        assert!(list.tick(start + DELAY).is_none());
        assert_eq!(
            list.complete(ticket, Ok(ResultPage::new(Vec::new(), 0, 1, 10))),
            Completion::Discarded
        );
    }
}
