// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{QueryState, ResultPage};

/// A paginated, searchable backend collection.
pub trait PageSource<T>: Send + Sync {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<T>>;
}

/// The unpaginated "list" variant used by inline lookups: a bounded set of
/// matches that always replaces whatever was shown before.
pub trait LookupSource<T>: Send + Sync {
    fn candidates(&self, term: &str) -> Result<Vec<T>>;
}
