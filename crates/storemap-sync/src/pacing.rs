//! Request pacing for upstream services.
//!
//! A [`Pacer`] caps how many calls are in flight at once and spaces groups of
//! calls apart, so the geocoder and inventory API see a few concurrent
//! requests at a time rather than a burst.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

/// Runs work in groups of at most `batch_size` concurrent futures, awaiting
/// each group in full and sleeping `interval` before starting the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    batch_size: usize,
    interval: Duration,
}

impl Pacer {
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            interval,
        }
    }

    /// One call at a time, `interval` apart.
    #[must_use]
    pub fn sequential(interval: Duration) -> Self {
        Self::new(1, interval)
    }

    /// One call at a time with no delay.
    #[must_use]
    pub fn unpaced() -> Self {
        Self::new(1, Duration::ZERO)
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maps every item through `f`, preserving input order in the output.
    ///
    /// No sleep happens after the last group.
    pub async fn run<I, F, Fut, T>(&self, items: I, mut f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut iter = items.into_iter().peekable();
        let mut out = Vec::new();

        loop {
            let batch: Vec<Fut> = iter.by_ref().take(self.batch_size).map(&mut f).collect();
            if batch.is_empty() {
                break;
            }
            out.extend(join_all(batch).await);

            if iter.peek().is_some() && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn zero_batch_size_is_clamped() {
        assert_eq!(Pacer::new(0, Duration::ZERO).batch_size(), 1);
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let pacer = Pacer::new(3, Duration::ZERO);
        let out = pacer.run(1..=7, |n| async move { n * 10 }).await;
        assert_eq!(out, vec![10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn empty_input_produces_nothing() {
        let pacer = Pacer::new(5, Duration::from_secs(60));
        let out: Vec<u32> = pacer.run(Vec::<u32>::new(), |n| async move { n }).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_batch_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pacer = Pacer::new(5, Duration::ZERO);

        pacer
            .run(0..23, |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sleeps_between_groups_only() {
        let pacer = Pacer::new(2, Duration::from_millis(20));
        let started = Instant::now();
        // Three groups: two sleeps.
        pacer.run(0..5, |n| async move { n }).await;
        assert!(started.elapsed() >= Duration::from_millis(40));

        let started = Instant::now();
        pacer.run(0..2, |n| async move { n }).await;
        assert!(
            started.elapsed() < Duration::from_millis(20),
            "a single group must not sleep"
        );
    }
}
