// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Query controllers shared by every list view and inline lookup: a
//! debounced search input, a query store and a sequenced fetch.

pub mod debounce;
pub mod list;
pub mod lookup;
pub mod sale_draft;
pub mod sequencer;
pub mod store;

use std::time::Duration;

pub use debounce::Debouncer;
pub use list::ListController;
pub use lookup::{DropdownState, LookupController, PointerTarget};
pub use sale_draft::{SaleDraft, SaleLookupRequest};
pub use sequencer::{Completion, FetchSequencer, RequestTicket};
pub use store::{Location, LocationHandle, LocationStore, MemoryStore, QueryStore, href_for};

/// Quiet period before a search edit reaches the store.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
