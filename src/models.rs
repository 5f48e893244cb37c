//! Data models for the identity indexer.
//!
//! This module contains the normalized fragments every provider lookup
//! produces, the two accumulators the collectors fill, and the report that
//! wraps them for output.

use crate::aggregation::Accumulator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet address being looked up. Opaque: never validated, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form, as used for subgraph entity ids.
    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Provider a fragment or connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataSource {
    Context,
    Superrare,
    Foundation,
    Rarible,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Context => write!(f, "Context"),
            DataSource::Superrare => write!(f, "Superrare"),
            DataSource::Foundation => write!(f, "Foundation"),
            DataSource::Rarible => write!(f, "Rarible"),
        }
    }
}

fn any_filled(fields: &[&str]) -> bool {
    fields.iter().any(|f| !f.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSeaIdentity {
    pub username: String,
    pub homepage: String,
    pub data_source: DataSource,
}

impl OpenSeaIdentity {
    pub fn is_blank(&self) -> bool {
        !any_filled(&[&self.username, &self.homepage])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterIdentity {
    pub handle: String,
    pub data_source: DataSource,
}

impl TwitterIdentity {
    pub fn is_blank(&self) -> bool {
        normalize_twitter_handle(&self.handle).is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperrareIdentity {
    pub username: String,
    pub homepage: String,
    pub location: String,
    pub bio: String,
    pub instagram_link: String,
    pub twitter_link: String,
    pub steemit_link: String,
    pub website: String,
    pub spotify_link: String,
    pub soundcloud_link: String,
    pub data_source: DataSource,
}

impl SuperrareIdentity {
    pub fn is_blank(&self) -> bool {
        !any_filled(&[
            &self.username,
            &self.homepage,
            &self.location,
            &self.bio,
            &self.instagram_link,
            &self.twitter_link,
            &self.steemit_link,
            &self.website,
            &self.spotify_link,
            &self.soundcloud_link,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaribleIdentity {
    pub username: String,
    pub homepage: String,
    pub data_source: DataSource,
}

impl RaribleIdentity {
    pub fn is_blank(&self) -> bool {
        !any_filled(&[&self.username, &self.homepage])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextIdentity {
    pub username: String,
    pub website: String,
    pub follower_count: u64,
    pub data_source: DataSource,
}

impl ContextIdentity {
    pub fn is_blank(&self) -> bool {
        self.follower_count == 0 && !any_filled(&[&self.username, &self.website])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoraIdentity {
    pub username: String,
    pub website: String,
    pub data_source: DataSource,
}

impl ZoraIdentity {
    pub fn is_blank(&self) -> bool {
        !any_filled(&[&self.username, &self.website])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundationIdentity {
    pub username: String,
    pub website: String,
    pub data_source: DataSource,
}

impl FoundationIdentity {
    pub fn is_blank(&self) -> bool {
        !any_filled(&[&self.username, &self.website])
    }
}

/// NFT minted on Foundation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundationNft {
    pub token_ipfs_path: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub last_sale_price_eth: String,
    pub date_minted: String,
}

/// Creator-side sales totals, all in ETH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatorSales {
    pub net_sales_eth: String,
    pub net_sales_pending_eth: String,
    pub net_revenue_eth: String,
    pub net_revenue_pending_eth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub amount_eth: String,
    pub date: String,
}

/// Financial and creator activity from the Foundation subgraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundationSales {
    pub is_admin: bool,
    pub net_revenue_eth: String,
    pub nfts: Vec<FoundationNft>,
    pub creator: CreatorSales,
    pub withdrawals: Vec<Withdrawal>,
    pub data_source: DataSource,
}

impl FoundationSales {
    /// Revenue of "" or any spelling of zero counts as none.
    pub fn is_blank(&self) -> bool {
        let no_revenue = self
            .net_revenue_eth
            .trim()
            .parse::<f64>()
            .map(|v| v == 0.0)
            .unwrap_or(true);

        !self.is_admin && no_revenue && self.nfts.is_empty() && self.withdrawals.is_empty()
    }
}

/// Name resolution result. Merged into the scalar `ens` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsIdentity {
    pub name: String,
    pub data_source: DataSource,
}

/// One normalized piece of identity data, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityFragment {
    OpenSea(OpenSeaIdentity),
    Twitter(TwitterIdentity),
    Superrare(SuperrareIdentity),
    Rarible(RaribleIdentity),
    Context(ContextIdentity),
    Zora(ZoraIdentity),
    Foundation(FoundationIdentity),
    FoundationSales(FoundationSales),
    Ens(EnsIdentity),
}

#[cfg(test)]
impl IdentityFragment {
    pub fn data_source(&self) -> DataSource {
        match self {
            IdentityFragment::OpenSea(f) => f.data_source,
            IdentityFragment::Twitter(f) => f.data_source,
            IdentityFragment::Superrare(f) => f.data_source,
            IdentityFragment::Rarible(f) => f.data_source,
            IdentityFragment::Context(f) => f.data_source,
            IdentityFragment::Zora(f) => f.data_source,
            IdentityFragment::Foundation(f) => f.data_source,
            IdentityFragment::FoundationSales(f) => f.data_source,
            IdentityFragment::Ens(f) => f.data_source,
        }
    }
}

impl IdentityFragment {
    /// True when no semantically meaningful field is set.
    pub fn is_blank(&self) -> bool {
        match self {
            IdentityFragment::OpenSea(f) => f.is_blank(),
            IdentityFragment::Twitter(f) => f.is_blank(),
            IdentityFragment::Superrare(f) => f.is_blank(),
            IdentityFragment::Rarible(f) => f.is_blank(),
            IdentityFragment::Context(f) => f.is_blank(),
            IdentityFragment::Zora(f) => f.is_blank(),
            IdentityFragment::Foundation(f) => f.is_blank(),
            IdentityFragment::FoundationSales(f) => f.is_blank(),
            IdentityFragment::Ens(f) => f.name.trim().is_empty(),
        }
    }
}

/// Merged identity for one address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedIdentity {
    pub opensea: Vec<OpenSeaIdentity>,
    pub twitter: Vec<TwitterIdentity>,
    pub superrare: Vec<SuperrareIdentity>,
    pub rarible: Vec<RaribleIdentity>,
    pub context: Vec<ContextIdentity>,
    pub zora: Vec<ZoraIdentity>,
    pub foundation: Vec<FoundationIdentity>,
    pub foundation_sales: Vec<FoundationSales>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens: Option<String>,
}

impl AggregatedIdentity {
    /// Total number of list fragments, ENS excluded.
    pub fn fragment_count(&self) -> usize {
        self.opensea.len()
            + self.twitter.len()
            + self.superrare.len()
            + self.rarible.len()
            + self.context.len()
            + self.zora.len()
            + self.foundation.len()
            + self.foundation_sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment_count() == 0 && self.ens.is_none()
    }
}

impl Accumulator for AggregatedIdentity {
    type Item = IdentityFragment;

    fn absorb(&mut self, item: IdentityFragment) {
        match item {
            IdentityFragment::OpenSea(f) => self.opensea.push(f),
            IdentityFragment::Twitter(mut f) => {
                f.handle = normalize_twitter_handle(&f.handle);
                self.twitter.push(f);
            }
            IdentityFragment::Superrare(f) => self.superrare.push(f),
            IdentityFragment::Rarible(f) => self.rarible.push(f),
            IdentityFragment::Context(f) => self.context.push(f),
            IdentityFragment::Zora(f) => self.zora.push(f),
            IdentityFragment::Foundation(f) => self.foundation.push(f),
            IdentityFragment::FoundationSales(f) => self.foundation_sales.push(f),
            // At most one real source resolves names, last write wins.
            IdentityFragment::Ens(f) => self.ens = Some(f.name),
        }
    }
}

/// Directed "from follows to on platform" edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub from: String,
    pub to: String,
    pub platform: DataSource,
}

/// Merged follow graph for one address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntryList {
    pub connections: Vec<ConnectionEntry>,
    /// Set when the aggregation was cut short before every provider reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Accumulator for ConnectionEntryList {
    type Item = ConnectionEntry;

    fn absorb(&mut self, item: ConnectionEntry) {
        self.connections.push(item);
    }
}

/// Strip URL prefixes, `@` and trailing path or query from a handle.
pub fn normalize_twitter_handle(raw: &str) -> String {
    let mut handle = raw.trim();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = handle.strip_prefix(scheme) {
            handle = rest;
        }
    }
    if let Some(rest) = handle.strip_prefix("www.") {
        handle = rest;
    }
    for host in ["twitter.com/", "x.com/"] {
        if let Some(rest) = handle.strip_prefix(host) {
            handle = rest;
        }
    }

    let handle = handle.trim_start_matches('@');
    let end = handle.find(['/', '?', '#']).unwrap_or(handle.len());
    handle[..end].to_string()
}

/// Metadata about one indexer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub address: Address,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
    /// Lookups that were launched, by name.
    pub lookups: Vec<String>,
}

/// Everything the indexer found for one address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<AggregatedIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<ConnectionEntryList>,
}
