//! Identity and connection aggregators.
//!
//! [`Fetcher`] owns the shared HTTP client and endpoint settings and knows
//! the fixed lookup set of each aggregation kind.

use crate::aggregation::cancel::Cancellation;
use crate::aggregation::collector::{collect, Accumulator, CancelCounter, CollectorObserver};
use crate::aggregation::lookup::LookupSet;
use crate::config::Config;
use crate::error::AggregateError;
use crate::http::HttpClient;
use crate::models::{Address, AggregatedIdentity, ConnectionEntry, ConnectionEntryList, IdentityFragment};
use crate::providers::{ContextLookup, FoundationLookup, RaribleLookup, SuperrareLookup};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct Fetcher {
    http: HttpClient,
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> Result<Self, AggregateError> {
        let http = HttpClient::new(&config.http).map_err(AggregateError::Setup)?;
        Ok(Self { http, config })
    }

    /// Every identity lookup, in launch order.
    pub fn identity_lookups(&self) -> LookupSet<IdentityFragment> {
        let providers = &self.config.providers;
        LookupSet::new()
            .with(ContextLookup::new(self.http.clone(), &providers.context_url))
            .with(SuperrareLookup::new(self.http.clone(), &providers.superrare_url))
            .with(FoundationLookup::new(self.http.clone(), &providers.foundation_url))
    }

    /// Every connection lookup, in launch order.
    pub fn connection_lookups(&self) -> LookupSet<ConnectionEntry> {
        let providers = &self.config.providers;
        LookupSet::new()
            .with(RaribleLookup::followings(
                self.http.clone(),
                &providers.rarible_followings_url,
            ))
            .with(RaribleLookup::followers(
                self.http.clone(),
                &providers.rarible_followers_url,
            ))
    }

    /// Merge every identity provider's view of `address`.
    pub async fn fetch_identity<O>(
        &self,
        address: &Address,
        cancel: &Cancellation,
        observer: &O,
    ) -> Result<AggregatedIdentity, AggregateError>
    where
        O: CollectorObserver + ?Sized,
    {
        let identity: AggregatedIdentity =
            aggregate(&self.identity_lookups(), address, cancel, observer).await?;

        info!(
            %address,
            fragments = identity.fragment_count(),
            ens = identity.ens.as_deref().unwrap_or(""),
            "identity aggregated"
        );
        Ok(identity)
    }

    /// Merge every connection provider's follow edges for `address`.
    pub async fn fetch_connections<O>(
        &self,
        address: &Address,
        cancel: &Cancellation,
        observer: &O,
    ) -> Result<ConnectionEntryList, AggregateError>
    where
        O: CollectorObserver + ?Sized,
    {
        let connections =
            collect_connections(&self.connection_lookups(), address, cancel, observer).await?;

        info!(%address, edges = connections.connections.len(), "connections aggregated");
        Ok(connections)
    }
}

/// Aggregate follow edges, flagging the list when any lookup reported a
/// cancellation instead of its result.
async fn collect_connections<O>(
    lookups: &LookupSet<ConnectionEntry>,
    address: &Address,
    cancel: &Cancellation,
    observer: &O,
) -> Result<ConnectionEntryList, AggregateError>
where
    O: CollectorObserver + ?Sized,
{
    let counter = CancelCounter::new(observer);
    let mut connections: ConnectionEntryList = aggregate(lookups, address, cancel, &counter).await?;

    let canceled = counter.canceled();
    if canceled > 0 {
        warn!(%address, canceled, "connection aggregation canceled before all providers finished");
        connections.error = Some(format!(
            "{canceled} of {} connection providers canceled before reporting",
            lookups.len()
        ));
    }

    Ok(connections)
}

/// Launch every lookup of `lookups`, then drain one report per lookup.
pub async fn aggregate<A, O>(
    lookups: &LookupSet<A::Item>,
    address: &Address,
    cancel: &Cancellation,
    observer: &O,
) -> Result<A, AggregateError>
where
    A: Accumulator,
    A::Item: Send + 'static,
    O: CollectorObserver + ?Sized,
{
    if lookups.is_empty() {
        return Ok(A::default());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    lookups.launch(address, cancel, &tx);
    // Only the lookup tasks hold senders from here on.
    drop(tx);

    collect(&mut rx, lookups.len(), observer).await
}
