// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cell::RefCell;
use std::rc::Rc;
use tally_app::{PageSize, QueryState};
use tracing::debug;
use url::form_urlencoded;

pub const TERM_PARAM: &str = "q";
pub const PAGE_PARAM: &str = "page";
pub const LIMIT_PARAM: &str = "limit";

/// Canonical `{term, page, page_size}` for one list or lookup. Every mutator
/// reports whether the canonical state actually changed, which is what
/// decides whether a fetch is due.
pub trait QueryStore {
    fn current(&self) -> &QueryState;

    fn replace(&mut self, next: QueryState) -> bool;

    fn set_term(&mut self, term: &str) -> bool {
        let next = self.current().with_term(term);
        self.replace(next)
    }

    fn set_page(&mut self, page: u32) -> bool {
        let next = self.current().with_page(page);
        self.replace(next)
    }

    fn set_page_size(&mut self, page_size: PageSize) -> bool {
        let next = self.current().with_page_size(page_size);
        self.replace(next)
    }

    /// Picks up changes made by someone other than this store. Returns true
    /// when the canonical state moved.
    fn sync(&mut self) -> bool {
        false
    }
}

/// State held only in memory; dropped along with the form that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    state: QueryState,
}

impl MemoryStore {
    pub fn new(state: QueryState) -> Self {
        Self { state }
    }
}

impl QueryStore for MemoryStore {
    fn current(&self) -> &QueryState {
        &self.state
    }

    fn replace(&mut self, next: QueryState) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        true
    }
}

/// The navigable location: a path plus ordered query parameters, with a
/// back stack. `revision` moves only on navigation, never on replace, so
/// stores can tell outside navigation apart from their own writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    params: Vec<(String, String)>,
    revision: u64,
    history: Vec<String>,
}

impl Location {
    pub fn parse(href: &str) -> Self {
        let (path, params) = split_href(href);
        Self {
            path,
            params,
            revision: 0,
            history: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn href(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Pushes a new entry, as a followed link or bookmark would.
    pub fn navigate(&mut self, href: &str) {
        self.history.push(self.href());
        let (path, params) = split_href(href);
        self.path = path;
        self.params = params;
        self.revision += 1;
        debug!(href = %self.href(), "navigated");
    }

    pub fn back(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        let (path, params) = split_href(&previous);
        self.path = path;
        self.params = params;
        self.revision += 1;
        true
    }

    /// Rewrites the current entry's parameters in place; history is left
    /// alone.
    pub fn replace_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }
}

fn split_href(href: &str) -> (String, Vec<(String, String)>) {
    let href = href.trim();
    let (path, query) = match href.split_once('?') {
        Some((path, query)) => (path, query),
        None => (href, ""),
    };
    let path = if path.is_empty() { "/" } else { path };
    let params = form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    (path.to_owned(), params)
}

/// Shared handle to the single location owned by the console. The UI is
/// single-threaded, so interior mutability is enough.
#[derive(Debug, Clone)]
pub struct LocationHandle(Rc<RefCell<Location>>);

impl LocationHandle {
    pub fn new(location: Location) -> Self {
        Self(Rc::new(RefCell::new(location)))
    }

    pub fn snapshot(&self) -> Location {
        self.0.borrow().clone()
    }

    pub fn href(&self) -> String {
        self.0.borrow().href()
    }

    pub fn path(&self) -> String {
        self.0.borrow().path().to_owned()
    }

    pub fn revision(&self) -> u64 {
        self.0.borrow().revision()
    }

    pub fn navigate(&self, href: &str) {
        self.0.borrow_mut().navigate(href);
    }

    pub fn back(&self) -> bool {
        self.0.borrow_mut().back()
    }

    fn replace_params(&self, params: Vec<(String, String)>) {
        self.0.borrow_mut().replace_params(params);
    }
}

/// Query state whose canonical copy lives in the location's `q`, `page` and
/// `limit` parameters. Reads happen on mount and on each navigation; writes
/// replace the current entry with all three parameters.
#[derive(Debug)]
pub struct LocationStore {
    location: LocationHandle,
    path: String,
    state: QueryState,
    seen_revision: u64,
}

impl LocationStore {
    pub fn mount(location: LocationHandle, path: &str) -> Self {
        let snapshot = location.snapshot();
        let state = if snapshot.path() == path {
            read_query_state(&snapshot)
        } else {
            QueryState::default()
        };
        Self {
            seen_revision: snapshot.revision(),
            location,
            path: path.to_owned(),
            state,
        }
    }

    fn write_back(&self) {
        if self.location.path() != self.path {
            return;
        }
        self.location.replace_params(query_params(&self.state));
    }
}

impl QueryStore for LocationStore {
    fn current(&self) -> &QueryState {
        &self.state
    }

    fn replace(&mut self, next: QueryState) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        self.write_back();
        true
    }

    fn sync(&mut self) -> bool {
        let snapshot = self.location.snapshot();
        if snapshot.revision() == self.seen_revision {
            return false;
        }
        self.seen_revision = snapshot.revision();
        if snapshot.path() != self.path {
            return false;
        }
        let next = read_query_state(&snapshot);
        if next == self.state {
            return false;
        }
        debug!(path = %self.path, term = next.term(), page = next.page(), "location changed");
        self.state = next;
        true
    }
}

/// Missing or malformed values fall back to page 1 and the default size.
pub fn read_query_state(location: &Location) -> QueryState {
    let term = location.get(TERM_PARAM).unwrap_or_default();
    let page = location
        .get(PAGE_PARAM)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1);
    let page_size = location
        .get(LIMIT_PARAM)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .and_then(PageSize::from_limit)
        .unwrap_or_default();
    QueryState::new(term, page, page_size)
}

/// `q` is omitted when blank; `page` and `limit` are always present.
pub fn query_params(state: &QueryState) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(3);
    if let Some(term) = state.trimmed_term() {
        params.push((TERM_PARAM.to_owned(), term.to_owned()));
    }
    params.push((PAGE_PARAM.to_owned(), state.page().to_string()));
    params.push((LIMIT_PARAM.to_owned(), state.page_size().get().to_string()));
    params
}

pub fn href_for(path: &str, state: &QueryState) -> String {
    let mut location = Location::parse(path);
    location.replace_params(query_params(state));
    location.href()
}
