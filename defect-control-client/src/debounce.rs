//! Input debouncing
//!
//! Every input event takes a [`Ticket`]. A ticket fires only if no newer
//! ticket was issued during the quiescence delay, and its result is applied
//! only if it is still the newest ticket once the request completes.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use defect_control_client::debounce::Debouncer;
//!
//! # async fn example() {
//! let debouncer = Debouncer::new(Duration::from_millis(300));
//!
//! let applied = debouncer.run(|| async { "results" }).await;
//! assert_eq!(applied, Some("results"));
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Issues debounce tickets
///
/// Clones share the same ticket counter.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    latest: Arc<AtomicU64>,
}

/// One input event's claim on the debounced action
#[derive(Debug, Clone)]
pub struct Ticket {
    id: u64,
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiescence delay
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Quiescence delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Issues a ticket, superseding every earlier one
    pub fn issue(&self) -> Ticket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            id,
            delay: self.delay,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Supersedes every outstanding ticket without issuing a usable one
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Runs `action` once input has settled
    ///
    /// Returns `None` if a newer ticket was issued before the delay elapsed or
    /// before `action` completed.
    pub async fn run<F, Fut, T>(&self, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.issue().run(action).await
    }
}

impl Ticket {
    /// Sequence number, increasing with every issued ticket
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether no newer ticket has been issued
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }

    /// Waits out the delay, then reports whether this ticket is still current
    pub async fn settle(&self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.is_current()
    }

    /// Runs `action` once input has settled, if this ticket is still current
    ///
    /// Lets the caller claim its place in line before the work is scheduled.
    pub async fn run<F, Fut, T>(self, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.settle().await {
            return None;
        }

        let output = action().await;
        self.is_current().then_some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_tickets_supersede() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.issue();
        assert!(first.is_current());

        let second = debouncer.issue();
        assert!(second.id() > first.id());
        assert!(!first.is_current());
        assert!(second.is_current());

        debouncer.cancel();
        assert!(!second.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_input_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let fired = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (i, text) in ["i", "iv", "iva"].into_iter().enumerate() {
            let debouncer = debouncer.clone();
            let fired = Arc::clone(&fired);
            handles.push(tokio::spawn(async move {
                debouncer
                    .run(|| async move {
                        fired.lock().unwrap().push(text);
                        text
                    })
                    .await
            }));

            if i < 2 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(results, vec![None, None, Some("iva")]);
        assert_eq!(*fired.lock().unwrap(), vec!["iva"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_order_decides_winner() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.issue();
        let second = debouncer.issue();

        // Polled in reverse, the later ticket still wins
        let late = tokio::spawn(second.run(|| async { "second" }));
        let early = tokio::spawn(first.run(|| async { "first" }));

        assert_eq!(late.await.unwrap(), Some("second"));
        assert_eq!(early.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_discarded_when_superseded_in_flight() {
        let debouncer = Debouncer::new(Duration::from_millis(300));

        let slow = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move {
                debouncer
                    .run(|| async {
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        "stale"
                    })
                    .await
            })
        };

        // Let the first ticket settle and start its request
        tokio::time::sleep(Duration::from_millis(500)).await;

        let fresh = debouncer.run(|| async { "fresh" }).await;

        assert_eq!(fresh, Some("fresh"));
        assert_eq!(slow.await.unwrap(), None);
    }
}
