// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};
use tally_app::{Entity, QueryState};
use tracing::debug;

use crate::debounce::Debouncer;
use crate::sequencer::{Completion, FetchSequencer, RequestTicket};
use crate::store::{MemoryStore, QueryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    Closed,
    OpenWithResults,
    /// Term is non-empty and the latest fetch came back with nothing.
    OpenEmpty,
}

impl DropdownState {
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Where a pointer-down landed relative to the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Input,
    Dropdown,
    Outside,
}

/// Search-as-you-type picker for one referenced entity.
#[derive(Debug)]
pub struct LookupController<T: Entity> {
    input: String,
    store: MemoryStore,
    debounce: Debouncer<String>,
    sequencer: FetchSequencer<Vec<T>>,
    dropdown: DropdownState,
    focused: bool,
    highlighted: Option<usize>,
    selection: Option<T>,
}

impl<T: Entity> LookupController<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            input: String::new(),
            store: MemoryStore::default(),
            debounce: Debouncer::new(delay),
            sequencer: FetchSequencer::new(),
            dropdown: DropdownState::Closed,
            focused: false,
            highlighted: None,
            selection: None,
        }
    }

    /// Updates the visible input at once; the search itself waits for the
    /// debounce. An empty term closes the dropdown without fetching.
    pub fn edit(&mut self, text: &str, now: Instant) {
        self.input = text.to_owned();
        if text.trim().is_empty() {
            self.drop_search();
            return;
        }
        self.debounce.schedule(text.to_owned(), now);
    }

    /// Returns the ticket to fetch once the debounce fires and the term
    /// actually changed.
    pub fn tick(&mut self, now: Instant) -> Option<RequestTicket> {
        let term = self.debounce.poll(now)?;
        if !self.store.set_term(&term) {
            debug!(term = %term, "lookup term unchanged; no fetch");
            return None;
        }
        Some(self.sequencer.issue(self.store.current().clone()))
    }

    pub fn complete(&mut self, ticket: RequestTicket, outcome: Result<Vec<T>>) -> Completion {
        let completion = self.sequencer.complete(ticket, outcome);
        if completion.is_current() {
            self.highlighted = None;
            self.dropdown = self.open_state();
        }
        completion
    }

    /// Focus re-opens only when there is a term and something to show for it.
    pub fn focus(&mut self) {
        self.focused = true;
        if self.dropdown == DropdownState::Closed && self.sequencer.has_outcome() {
            self.dropdown = self.open_state();
        }
    }

    /// Leaving the field with a selection in place drops any half-typed
    /// fragment, so the input never disagrees with what will be submitted.
    pub fn blur(&mut self) {
        self.focused = false;
        if self.selection.is_some() && !self.input.is_empty() {
            debug!(fragment = %self.input, "dropping fragment on blur");
            self.input.clear();
            self.drop_search();
        }
    }

    pub fn pointer_down(&mut self, target: PointerTarget) {
        match target {
            PointerTarget::Input => self.focus(),
            PointerTarget::Dropdown => {}
            PointerTarget::Outside => {
                self.blur();
                self.close();
            }
        }
    }

    pub fn close(&mut self) {
        self.dropdown = DropdownState::Closed;
        self.highlighted = None;
    }

    /// Stores the candidate at `index`, clears the term and closes. Any
    /// in-flight search becomes stale.
    pub fn select(&mut self, index: usize) -> Option<&T> {
        let candidate = self.candidates().get(index)?.clone();
        self.set_selection(candidate);
        self.selection.as_ref()
    }

    pub fn select_highlighted(&mut self) -> Option<&T> {
        let index = self.highlighted?;
        self.select(index)
    }

    /// Seeds the selection directly, as when editing an existing record.
    pub fn set_selection(&mut self, entity: T) {
        debug!(id = %entity.id(), "lookup selection");
        self.selection = Some(entity);
        self.input.clear();
        self.drop_search();
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selection.take().is_some()
    }

    pub fn highlight_next(&mut self) {
        let len = self.candidates().len();
        if len == 0 || !self.is_open() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(index) => (index + 1) % len,
            None => 0,
        });
    }

    pub fn highlight_prev(&mut self) {
        let len = self.candidates().len();
        if len == 0 || !self.is_open() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => len - 1,
            Some(index) => index - 1,
        });
    }

    /// What the input shows: the typed fragment, or the selection's label
    /// once the fragment has been cleared.
    pub fn display_text(&self) -> &str {
        if !self.input.is_empty() {
            return &self.input;
        }
        self.selection.as_ref().map_or("", |entity| entity.label())
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn query(&self) -> &QueryState {
        self.store.current()
    }

    pub fn state(&self) -> DropdownState {
        self.dropdown
    }

    pub fn is_open(&self) -> bool {
        self.dropdown.is_open()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_loading(&self) -> bool {
        self.sequencer.is_loading()
    }

    pub fn remaining_debounce(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    pub fn candidates(&self) -> &[T] {
        self.sequencer.data().map_or(&[], Vec::as_slice)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn selection(&self) -> Option<&T> {
        self.selection.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.sequencer.error()
    }

    /// Cancels the debounce and strands any in-flight fetch. The selection
    /// survives so the owning form can still read it.
    pub fn teardown(&mut self) {
        self.debounce.cancel();
        self.sequencer.invalidate();
        self.close();
    }

    fn drop_search(&mut self) {
        self.debounce.cancel();
        self.sequencer.reset();
        self.store.set_term("");
        self.close();
    }

    fn open_state(&self) -> DropdownState {
        if self.store.current().trimmed_term().is_none() {
            return DropdownState::Closed;
        }
        if self.candidates().is_empty() {
            DropdownState::OpenEmpty
        } else {
            DropdownState::OpenWithResults
        }
    }
}
