//! Debounced search bookkeeping.
//!
//! Every search issues a ticket from a monotonically increasing generation
//! counter. A search only proceeds once its delay has elapsed with no newer
//! ticket issued, and its response is only applied if it is still the newest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug)]
pub struct SearchCoordinator {
    delay: Duration,
    generation: AtomicU64,
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl SearchCoordinator {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Wait out the debounce delay; `false` when a newer search was issued meanwhile.
    pub async fn settle(&self, ticket: SearchTicket) -> bool {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.is_current(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let coordinator = SearchCoordinator::default();
        let first = coordinator.issue();
        assert!(coordinator.is_current(first));

        let second = coordinator.issue();
        assert!(!coordinator.is_current(first));
        assert!(coordinator.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_delay() {
        let coordinator = SearchCoordinator::default();
        let ticket = coordinator.issue();
        let started = tokio::time::Instant::now();

        assert!(coordinator.settle(ticket).await);
        assert!(started.elapsed() >= DEFAULT_SEARCH_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_reports_superseded_tickets() {
        let coordinator = SearchCoordinator::default();
        let first = coordinator.issue();

        let (settled, ()) = tokio::join!(coordinator.settle(first), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            coordinator.issue();
        });
        assert!(!settled);
    }
}
