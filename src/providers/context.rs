//! Context profile resolver.
//!
//! Context aggregates profiles from several marketplaces, so one response
//! can yield fragments of many kinds plus the ENS name.

use crate::aggregation::Lookup;
use crate::error::{LookupFailure, StageExt};
use crate::http::{HttpClient, RequestArgs};
use crate::models::{
    Address, ContextIdentity, DataSource, EnsIdentity, FoundationIdentity, IdentityFragment,
    OpenSeaIdentity, RaribleIdentity, SuperrareIdentity, TwitterIdentity, ZoraIdentity,
};
use crate::providers::{decode, nullable, render_url};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Marketplace contracts Context keys its profile entries by.
pub const SUPERRARE_CONTRACT: &str = "0x41a322b28d0ff354040e2cbc676f0320d8c8850d";
pub const OPENSEA_CONTRACT: &str = "0x495f947276749ce646f68ac8c248420045cb7b5e";
pub const RARIBLE_CONTRACT: &str = "0xd07dc4262bcdbf85190c01c996b4c06a461d2430";
pub const FOUNDATION_CONTRACT: &str = "0x3b3ee1931dc30c1957379fac9aba94d1c48a5405";
pub const ZORA_CONTRACT: &str = "0xabefbc9fd2f806065b4f3c237d4b59d9a97bcac7";
pub const CONTEXT_CONTRACT: &str = "ctx";

/// Profile list key holding linked Twitter accounts.
const TWITTER_PROFILE_KEY: &str = "twitter";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextProfileResponse {
    #[serde(default, deserialize_with = "nullable")]
    follower_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    ens: HashMap<String, String>,
    /// Sorted so repeated runs emit fragments in the same order. A `null`
    /// list reads as empty.
    #[serde(default, deserialize_with = "nullable")]
    profiles: BTreeMap<String, Option<Vec<ContextProfileEntry>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextProfileEntry {
    #[serde(default, deserialize_with = "nullable")]
    contract: String,
    #[serde(default, deserialize_with = "nullable")]
    url: String,
    #[serde(default, deserialize_with = "nullable")]
    website: String,
    #[serde(default, deserialize_with = "nullable")]
    username: String,
}

pub struct ContextLookup {
    http: HttpClient,
    url_template: String,
}

impl ContextLookup {
    pub fn new(http: HttpClient, url_template: &str) -> Self {
        Self {
            http,
            url_template: url_template.to_string(),
        }
    }
}

#[async_trait]
impl Lookup for ContextLookup {
    type Item = IdentityFragment;

    fn name(&self) -> &'static str {
        "context"
    }

    fn source(&self) -> DataSource {
        DataSource::Context
    }

    async fn lookup(&self, address: &Address) -> Result<Vec<IdentityFragment>, LookupFailure> {
        let body = self
            .http
            .send_request(RequestArgs::get(render_url(&self.url_template, address)))
            .await
            .stage("[context] fetch identity failed")?;

        let response: ContextProfileResponse =
            decode(&body, "[context] identity response decode failed")?;

        Ok(normalize(address, response))
    }
}

fn normalize(address: &Address, response: ContextProfileResponse) -> Vec<IdentityFragment> {
    let mut fragments = Vec::new();

    if let Some(name) = ens_name(address, &response.ens) {
        fragments.push(IdentityFragment::Ens(EnsIdentity {
            name: name.to_string(),
            data_source: DataSource::Context,
        }));
    }

    for (key, entries) in &response.profiles {
        for entry in entries.iter().flatten() {
            if let Some(fragment) = map_entry(key, entry, response.follower_count) {
                fragments.push(fragment);
            }
        }
    }

    fragments.retain(|f| !f.is_blank());
    fragments
}

/// Context keys the ENS map by address, not always in the caller's case.
fn ens_name<'a>(address: &Address, ens: &'a HashMap<String, String>) -> Option<&'a str> {
    ens.get(address.as_str())
        .or_else(|| {
            ens.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(address.as_str()))
                .map(|(_, name)| name)
        })
        .map(String::as_str)
}

fn map_entry(key: &str, entry: &ContextProfileEntry, follower_count: u64) -> Option<IdentityFragment> {
    let source = DataSource::Context;
    let username = entry.username.clone();

    let fragment = match entry.contract.to_lowercase().as_str() {
        SUPERRARE_CONTRACT => IdentityFragment::Superrare(SuperrareIdentity {
            username,
            homepage: entry.url.clone(),
            location: String::new(),
            bio: String::new(),
            instagram_link: String::new(),
            twitter_link: String::new(),
            steemit_link: String::new(),
            website: String::new(),
            spotify_link: String::new(),
            soundcloud_link: String::new(),
            data_source: source,
        }),
        OPENSEA_CONTRACT => IdentityFragment::OpenSea(OpenSeaIdentity {
            username,
            homepage: entry.url.clone(),
            data_source: source,
        }),
        RARIBLE_CONTRACT => IdentityFragment::Rarible(RaribleIdentity {
            username,
            homepage: entry.url.clone(),
            data_source: source,
        }),
        FOUNDATION_CONTRACT => IdentityFragment::Foundation(FoundationIdentity {
            username,
            website: entry.website.clone(),
            data_source: source,
        }),
        ZORA_CONTRACT => IdentityFragment::Zora(ZoraIdentity {
            username,
            website: entry.website.clone(),
            data_source: source,
        }),
        CONTEXT_CONTRACT => IdentityFragment::Context(ContextIdentity {
            username,
            website: entry.website.clone(),
            follower_count,
            data_source: source,
        }),
        _ if key.eq_ignore_ascii_case(TWITTER_PROFILE_KEY) => {
            let handle = if username.is_empty() { entry.url.clone() } else { username };
            IdentityFragment::Twitter(TwitterIdentity {
                handle,
                data_source: source,
            })
        }
        _ => return None,
    };

    Some(fragment)
}
