//! Provider lookups and the reports they send to the collector.
//!
//! A [`Lookup`] queries one external source for one address. The aggregator
//! runs every lookup of a [`LookupSet`] as its own task; each task sends
//! exactly one [`LookupReport`] no matter how the lookup ends, including
//! cancellation and panics.

use crate::aggregation::cancel::Cancellation;
use crate::error::{FetchError, LookupFailure};
use crate::models::{Address, DataSource};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// One external data source queried for one address.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Normalized unit the lookup produces.
    type Item: Send + 'static;

    /// Name used in logs, e.g. `"superrare"`.
    fn name(&self) -> &'static str;

    /// Provider the lookup queries.
    fn source(&self) -> DataSource;

    /// Fetch, decode and normalize. Blank items must already be filtered
    /// out; an empty vector means the provider knows nothing about the address.
    async fn lookup(&self, address: &Address) -> Result<Vec<Self::Item>, LookupFailure>;
}

/// Terminal state of one lookup.
#[derive(Debug)]
pub enum LookupOutcome<T> {
    Found(Vec<T>),
    Empty,
    Failed(LookupFailure),
}

impl<T> From<Result<Vec<T>, LookupFailure>> for LookupOutcome<T> {
    fn from(result: Result<Vec<T>, LookupFailure>) -> Self {
        match result {
            Ok(items) if items.is_empty() => LookupOutcome::Empty,
            Ok(items) => LookupOutcome::Found(items),
            Err(failure) => LookupOutcome::Failed(failure),
        }
    }
}

/// What travels on the result channel.
#[derive(Debug)]
pub struct LookupReport<T> {
    pub lookup: &'static str,
    pub source: DataSource,
    pub outcome: LookupOutcome<T>,
}

/// The fixed set of lookups one aggregation launches.
///
/// The same set is used to spawn the tasks and to size the collector's
/// drain, so the two cannot drift apart.
pub struct LookupSet<T> {
    lookups: Vec<Arc<dyn Lookup<Item = T>>>,
}

impl<T: Send + 'static> LookupSet<T> {
    pub fn new() -> Self {
        Self {
            lookups: Vec::new(),
        }
    }

    pub fn with(mut self, lookup: impl Lookup<Item = T> + 'static) -> Self {
        self.lookups.push(Arc::new(lookup));
        self
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.lookups.iter().map(|l| l.name()).collect()
    }

    /// Spawn every lookup. Returns one handle per lookup, in set order.
    pub fn launch(
        &self,
        address: &Address,
        cancel: &Cancellation,
        tx: &UnboundedSender<LookupReport<T>>,
    ) -> Vec<JoinHandle<()>> {
        self.lookups
            .iter()
            .map(|lookup| {
                spawn_lookup(
                    Arc::clone(lookup),
                    address.clone(),
                    cancel.clone(),
                    tx.clone(),
                )
            })
            .collect()
    }
}

impl<T: Send + 'static> Default for LookupSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_lookup<T: Send + 'static>(
    lookup: Arc<dyn Lookup<Item = T>>,
    address: Address,
    mut cancel: Cancellation,
    tx: UnboundedSender<LookupReport<T>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = lookup.name();
        let source = lookup.source();
        debug!(lookup = name, %address, "lookup started");

        let run = AssertUnwindSafe(lookup.lookup(&address)).catch_unwind();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => LookupOutcome::Failed(LookupFailure::canceled()),
            result = run => match result {
                Ok(result) => LookupOutcome::from(result),
                Err(panic) => LookupOutcome::Failed(LookupFailure::new(
                    "lookup panicked",
                    FetchError::Aborted(panic_message(panic.as_ref())),
                )),
            },
        };

        // The receiver is gone only if the caller stopped collecting.
        let _ = tx.send(LookupReport {
            lookup: name,
            source,
            outcome,
        });
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedLookup};
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn run_single(
        lookup: ScriptedLookup<u32>,
        cancel: &Cancellation,
    ) -> LookupReport<u32> {
        let set = LookupSet::new().with(lookup);
        let (tx, mut rx) = mpsc::unbounded_channel();
        set.launch(&Address::from("0xabc"), cancel, &tx);
        drop(tx);
        rx.recv().await.expect("one report per lookup")
    }

    #[test]
    fn test_outcome_from_result() {
        let empty: Result<Vec<u32>, LookupFailure> = Ok(vec![]);
        assert!(matches!(LookupOutcome::from(empty), LookupOutcome::Empty));

        let found: Result<Vec<u32>, LookupFailure> = Ok(vec![1]);
        assert!(matches!(
            LookupOutcome::from(found),
            LookupOutcome::Found(items) if items == vec![1]
        ));

        let failed: Result<Vec<u32>, LookupFailure> = Err(LookupFailure::canceled());
        assert!(matches!(LookupOutcome::from(failed), LookupOutcome::Failed(_)));
    }

    #[test]
    fn test_set_len_matches_registrations() {
        let set = LookupSet::new()
            .with(ScriptedLookup::new("a", DataSource::Context, Script::Items(vec![1u32])))
            .with(ScriptedLookup::new("b", DataSource::Superrare, Script::Items(vec![])));
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["a", "b"]);
        assert!(!set.is_empty());
    }

    #[tokio::test]
    async fn test_report_carries_items() {
        let report = run_single(
            ScriptedLookup::new("ctx", DataSource::Context, Script::Items(vec![7])),
            &Cancellation::never(),
        )
        .await;

        assert_eq!(report.lookup, "ctx");
        assert_eq!(report.source, DataSource::Context);
        assert!(matches!(report.outcome, LookupOutcome::Found(items) if items == vec![7]));
    }

    #[tokio::test]
    async fn test_panic_still_reports() {
        let report = run_single(
            ScriptedLookup::new("boom", DataSource::Rarible, Script::Panic),
            &Cancellation::never(),
        )
        .await;

        match report.outcome {
            LookupOutcome::Failed(failure) => {
                assert_eq!(failure.stage, "lookup panicked");
                assert!(failure.source.to_string().contains("scripted panic in boom"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_hanging_lookup() {
        let cancel = Cancellation::never().with_timeout(Duration::from_secs(2));
        let report = run_single(
            ScriptedLookup::new("slow", DataSource::Foundation, Script::Hang),
            &cancel,
        )
        .await;

        match report.outcome {
            LookupOutcome::Failed(failure) => assert!(failure.is_canceled()),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_lookup() {
        let (handle, cancel) = Cancellation::manual();
        handle.cancel();

        let report = run_single(
            ScriptedLookup::new("ctx", DataSource::Context, Script::Items(vec![1])),
            &cancel,
        )
        .await;

        assert!(matches!(report.outcome, LookupOutcome::Failed(f) if f.is_canceled()));
    }
}
