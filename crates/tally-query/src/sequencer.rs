// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tally_app::QueryState;
use tracing::{debug, warn};

/// Binds one issued fetch to the query it was issued for. Only the holder of
/// the most recently issued ticket can change what the controller shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    sequence: u64,
    issued_for: QueryState,
}

impl RequestTicket {
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn query(&self) -> &QueryState {
        &self.issued_for
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// Superseded or invalidated; nothing changed.
    Discarded,
}

impl Completion {
    pub const fn is_current(self) -> bool {
        !matches!(self, Self::Discarded)
    }
}

/// Orders overlapping fetches by a strictly increasing sequence number and
/// applies only the outcome of the latest one.
#[derive(Debug)]
pub struct FetchSequencer<P> {
    last_sequence: u64,
    current: Option<u64>,
    data: Option<P>,
    error: Option<String>,
}

impl<P> Default for FetchSequencer<P> {
    fn default() -> Self {
        Self {
            last_sequence: 0,
            current: None,
            data: None,
            error: None,
        }
    }
}

impl<P> FetchSequencer<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, query: QueryState) -> RequestTicket {
        self.last_sequence += 1;
        self.current = Some(self.last_sequence);
        debug!(
            sequence = self.last_sequence,
            term = query.term(),
            page = query.page(),
            "fetch issued"
        );
        RequestTicket {
            sequence: self.last_sequence,
            issued_for: query,
        }
    }

    /// Applies `outcome` if `ticket` is still current. A failure leaves no
    /// rows behind, so nothing stale is shown next to the error.
    pub fn complete(&mut self, ticket: RequestTicket, outcome: Result<P>) -> Completion {
        if self.current != Some(ticket.sequence) {
            debug!(
                sequence = ticket.sequence,
                latest = self.last_sequence,
                "stale response discarded"
            );
            return Completion::Discarded;
        }
        self.current = None;
        match outcome {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                Completion::Applied
            }
            Err(error) => {
                let message = format!("{error:#}");
                warn!(sequence = ticket.sequence, error = %message, "fetch failed");
                self.data = None;
                self.error = Some(message);
                Completion::Failed
            }
        }
    }

    /// Makes any in-flight ticket permanently stale.
    pub fn invalidate(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Invalidates and forgets the last outcome.
    pub fn reset(&mut self) {
        self.invalidate();
        self.data = None;
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    pub fn data(&self) -> Option<&P> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_outcome(&self) -> bool {
        self.data.is_some() || self.error.is_some()
    }
}
