//! Concurrent scatter/gather over provider lookups.

pub mod cancel;
pub mod collector;
pub mod fetcher;
pub mod lookup;

pub use cancel::Cancellation;
pub use collector::{Accumulator, CollectorObserver, TracingObserver};
pub use fetcher::Fetcher;
pub use lookup::Lookup;
