// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

/// Holds at most one pending effect and releases it once input has been quiet
/// for `delay`. Time comes from the caller's event loop, so nothing can fire
/// after the owner stops polling or drops the scheduler.
#[derive(Debug)]
pub struct Debouncer<E> {
    delay: Duration,
    pending: Option<Pending<E>>,
}

#[derive(Debug)]
struct Pending<E> {
    effect: E,
    deadline: Instant,
}

impl<E> Debouncer<E> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Arms the timer for `effect`, superseding anything still pending.
    /// Returns true when an earlier effect was replaced.
    pub fn schedule(&mut self, effect: E, now: Instant) -> bool {
        let replaced = self.pending.is_some();
        self.pending = Some(Pending {
            effect,
            deadline: now + self.delay,
        });
        replaced
    }

    /// Drops the pending effect without running it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Releases the pending effect once its deadline has passed. Each
    /// scheduled effect is released at most once.
    pub fn poll(&mut self, now: Instant) -> Option<E> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending.take().map(|pending| pending.effect)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left before the pending effect is due; the event loop uses it to
    /// bound its wait.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|pending| pending.deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn effect_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(DELAY);
        debounce.schedule("a", start);

        assert_eq!(debounce.poll(start + Duration::from_millis(299)), None);
        assert_eq!(debounce.poll(start + DELAY), Some("a"));
        assert_eq!(debounce.poll(start + DELAY * 2), None);
    }

    #[test]
    fn rescheduling_replaces_effect_and_restarts_timer() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(DELAY);
        assert!(!debounce.schedule("o", start));
        assert!(debounce.schedule("oi", start + Duration::from_millis(200)));
        assert!(debounce.schedule("oil", start + Duration::from_millis(400)));

        assert_eq!(debounce.poll(start + Duration::from_millis(650)), None);
        assert_eq!(
            debounce.remaining(start + Duration::from_millis(650)),
            Some(Duration::from_millis(50))
        );
        assert_eq!(debounce.poll(start + Duration::from_millis(700)), Some("oil"));
    }

    #[test]
    fn cancel_discards_pending_effect() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(DELAY);
        debounce.schedule(1, start);
        assert!(debounce.cancel());
        assert!(!debounce.cancel());
        assert!(!debounce.is_pending());
        assert_eq!(debounce.poll(start + DELAY * 10), None);
    }
}
