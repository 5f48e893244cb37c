//! Terminal progress for an aggregation run.

use crate::aggregation::{CollectorObserver, TracingObserver};
use crate::error::LookupFailure;
use crate::models::DataSource;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Advances a progress bar once per drained report and logs through
/// [`TracingObserver`].
pub struct ProgressObserver {
    bar: ProgressBar,
    log: TracingObserver,
}

impl ProgressObserver {
    /// A bar sized to `expected` reports, drawn only when `show` is set.
    pub fn new(label: &str, expected: usize, show: bool) -> Self {
        let bar = if show {
            let pb = ProgressBar::new(expected as u64);
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(expected as u64);
        bar.set_prefix(label.to_string());

        Self {
            bar,
            log: TracingObserver,
        }
    }

    pub fn finish(&self) {
        debug!(reports = self.bar.position(), "progress finished");
        self.bar.finish_and_clear();
    }

    fn tick(&self, lookup: &str) {
        self.bar.set_message(lookup.to_string());
        self.bar.inc(1);
    }
}

impl CollectorObserver for ProgressObserver {
    fn found(&self, lookup: &str, source: DataSource, count: usize) {
        self.log.found(lookup, source, count);
        self.tick(lookup);
    }

    fn empty(&self, lookup: &str, source: DataSource) {
        self.log.empty(lookup, source);
        self.tick(lookup);
    }

    fn failed(&self, lookup: &str, source: DataSource, failure: &LookupFailure) {
        self.log.failed(lookup, source, failure);
        self.tick(lookup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    #[test]
    fn test_every_report_advances() {
        let observer = ProgressObserver::new("identity", 3, false);

        observer.found("context", DataSource::Context, 2);
        observer.empty("superrare", DataSource::Superrare);
        observer.failed(
            "foundation",
            DataSource::Foundation,
            &LookupFailure::new("[foundation] fetch identity failed", FetchError::Canceled),
        );

        assert_eq!(observer.bar.position(), 3);
        observer.finish();
    }
}
