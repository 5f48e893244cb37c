//! Result collection and merging.
//!
//! The collector drains a fixed number of [`LookupReport`]s from the result
//! channel and folds the successful ones into an [`Accumulator`]. Failed
//! reports are handed to a [`CollectorObserver`] and dropped; they never
//! abort the aggregation.

use crate::aggregation::lookup::{LookupOutcome, LookupReport};
use crate::error::{AggregateError, LookupFailure};
use crate::models::DataSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error};

/// Output record an aggregation builds up.
pub trait Accumulator: Default {
    type Item;

    fn absorb(&mut self, item: Self::Item);
}

/// Sees every report the collector drains.
pub trait CollectorObserver: Send + Sync {
    fn found(&self, lookup: &str, source: DataSource, count: usize);

    fn empty(&self, lookup: &str, source: DataSource);

    fn failed(&self, lookup: &str, source: DataSource, failure: &LookupFailure);
}

/// Logs drained reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CollectorObserver for TracingObserver {
    fn found(&self, lookup: &str, source: DataSource, count: usize) {
        debug!(lookup, %source, count, "lookup returned data");
    }

    fn empty(&self, lookup: &str, source: DataSource) {
        debug!(lookup, %source, "lookup found nothing");
    }

    fn failed(&self, lookup: &str, source: DataSource, failure: &LookupFailure) {
        error!(
            lookup,
            %source,
            error = %failure.source,
            "lookup failed: {}",
            failure.stage
        );
    }
}

/// Counts canceled reports on their way to another observer.
pub struct CancelCounter<'a, O: ?Sized> {
    inner: &'a O,
    canceled: AtomicUsize,
}

impl<'a, O: CollectorObserver + ?Sized> CancelCounter<'a, O> {
    pub fn new(inner: &'a O) -> Self {
        Self {
            inner,
            canceled: AtomicUsize::new(0),
        }
    }

    /// Lookups that reported a cancellation instead of a result.
    pub fn canceled(&self) -> usize {
        self.canceled.load(Ordering::Relaxed)
    }
}

impl<O: CollectorObserver + ?Sized> CollectorObserver for CancelCounter<'_, O> {
    fn found(&self, lookup: &str, source: DataSource, count: usize) {
        self.inner.found(lookup, source, count);
    }

    fn empty(&self, lookup: &str, source: DataSource) {
        self.inner.empty(lookup, source);
    }

    fn failed(&self, lookup: &str, source: DataSource, failure: &LookupFailure) {
        if failure.is_canceled() {
            self.canceled.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.failed(lookup, source, failure);
    }
}

/// Drain exactly `expected` reports and merge them.
///
/// Returns an error only if the channel closes early, which means some
/// lookup task vanished without reporting.
pub async fn collect<A, O>(
    rx: &mut UnboundedReceiver<LookupReport<A::Item>>,
    expected: usize,
    observer: &O,
) -> Result<A, AggregateError>
where
    A: Accumulator,
    O: CollectorObserver + ?Sized,
{
    let mut acc = A::default();

    for received in 0..expected {
        let Some(report) = rx.recv().await else {
            return Err(AggregateError::ChannelClosed { expected, received });
        };

        match report.outcome {
            LookupOutcome::Found(items) => {
                observer.found(report.lookup, report.source, items.len());
                for item in items {
                    acc.absorb(item);
                }
            }
            LookupOutcome::Empty => observer.empty(report.lookup, report.source),
            LookupOutcome::Failed(failure) => {
                observer.failed(report.lookup, report.source, &failure)
            }
        }
    }

    Ok(acc)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Remembers what it saw, for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        pub found: Mutex<Vec<(String, usize)>>,
        pub empty: Mutex<Vec<String>>,
        pub failed: Mutex<Vec<(String, String)>>,
    }

    impl RecordingObserver {
        pub fn total(&self) -> usize {
            self.found.lock().unwrap().len()
                + self.empty.lock().unwrap().len()
                + self.failed.lock().unwrap().len()
        }

        pub fn failed_lookups(&self) -> Vec<String> {
            let mut names: Vec<String> = self
                .failed
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect();
            names.sort();
            names
        }
    }

    impl CollectorObserver for RecordingObserver {
        fn found(&self, lookup: &str, _source: DataSource, count: usize) {
            self.found.lock().unwrap().push((lookup.to_string(), count));
        }

        fn empty(&self, lookup: &str, _source: DataSource) {
            self.empty.lock().unwrap().push(lookup.to_string());
        }

        fn failed(&self, lookup: &str, _source: DataSource, failure: &LookupFailure) {
            self.failed
                .lock()
                .unwrap()
                .push((lookup.to_string(), failure.stage.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingObserver;
    use super::*;
    use crate::error::FetchError;
    use tokio::sync::mpsc;

    #[derive(Debug, Default)]
    struct Numbers(Vec<u32>);

    impl Accumulator for Numbers {
        type Item = u32;

        fn absorb(&mut self, item: u32) {
            self.0.push(item);
        }
    }

    fn report(lookup: &'static str, outcome: LookupOutcome<u32>) -> LookupReport<u32> {
        LookupReport {
            lookup,
            source: DataSource::Context,
            outcome,
        }
    }

    #[tokio::test]
    async fn test_collect_merges_and_skips_failures() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(report("a", LookupOutcome::Found(vec![1, 2]))).unwrap();
        tx.send(report(
            "b",
            LookupOutcome::Failed(LookupFailure::new("fetch failed", FetchError::Canceled)),
        ))
        .unwrap();
        tx.send(report("c", LookupOutcome::Empty)).unwrap();
        tx.send(report("d", LookupOutcome::Found(vec![3]))).unwrap();

        let observer = RecordingObserver::default();
        let numbers: Numbers = collect(&mut rx, 4, &observer).await.unwrap();

        assert_eq!(numbers.0, vec![1, 2, 3]);
        assert_eq!(observer.total(), 4);
        assert_eq!(observer.failed_lookups(), vec!["b".to_string()]);
        assert_eq!(observer.empty.lock().unwrap().as_slice(), ["c".to_string()]);
    }

    #[tokio::test]
    async fn test_collect_stops_at_expected_count() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for n in 0..3 {
            tx.send(report("x", LookupOutcome::Found(vec![n]))).unwrap();
        }

        let numbers: Numbers = collect(&mut rx, 2, &TracingObserver).await.unwrap();

        assert_eq!(numbers.0, vec![0, 1]);
        // The third report stays queued.
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_collect_reports_early_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(report("a", LookupOutcome::Empty)).unwrap();
        drop(tx);

        let result: Result<Numbers, _> = collect(&mut rx, 3, &TracingObserver).await;

        match result {
            Err(AggregateError::ChannelClosed { expected, received }) => {
                assert_eq!(expected, 3);
                assert_eq!(received, 1);
            }
            other => panic!("expected ChannelClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_counter_counts_only_cancellations() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(report("a", LookupOutcome::Failed(LookupFailure::canceled()))).unwrap();
        tx.send(report(
            "b",
            LookupOutcome::Failed(LookupFailure::new(
                "fetch failed",
                FetchError::Connect {
                    url: "http://unreachable.invalid".to_string(),
                },
            )),
        ))
        .unwrap();
        tx.send(report("c", LookupOutcome::Found(vec![1]))).unwrap();

        let recorder = RecordingObserver::default();
        let counter = CancelCounter::new(&recorder);
        let numbers: Numbers = collect(&mut rx, 3, &counter).await.unwrap();

        assert_eq!(numbers.0, vec![1]);
        assert_eq!(counter.canceled(), 1);
        assert_eq!(recorder.failed_lookups(), vec!["a", "b"]);
        assert_eq!(recorder.total(), 3);
    }

    #[tokio::test]
    async fn test_collect_zero_expected_returns_empty() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<LookupReport<u32>>();
        let numbers: Numbers = collect(&mut rx, 0, &TracingObserver).await.unwrap();
        assert!(numbers.0.is_empty());
    }
}
