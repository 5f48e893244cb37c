//! Rarible follow graph.
//!
//! Both endpoints return a list of `{ "following": { "owner", "user" } }`
//! records where `owner` follows `user`. Only the first page is read.

use crate::aggregation::Lookup;
use crate::error::{LookupFailure, StageExt};
use crate::http::{HttpClient, RequestArgs};
use crate::models::{Address, ConnectionEntry, DataSource};
use crate::providers::{decode, nullable, render_url};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct RaribleFollowRecord {
    #[serde(default, deserialize_with = "nullable")]
    following: RaribleFollowing,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RaribleFollowing {
    #[serde(deserialize_with = "nullable")]
    owner: String,
    #[serde(deserialize_with = "nullable")]
    user: String,
}

/// Which side of the follow graph a lookup reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Accounts the address follows.
    Followings,
    /// Accounts following the address.
    Followers,
}

pub struct RaribleLookup {
    http: HttpClient,
    url_template: String,
    direction: Direction,
}

impl RaribleLookup {
    pub fn followings(http: HttpClient, url_template: &str) -> Self {
        Self {
            http,
            url_template: url_template.to_string(),
            direction: Direction::Followings,
        }
    }

    pub fn followers(http: HttpClient, url_template: &str) -> Self {
        Self {
            http,
            url_template: url_template.to_string(),
            direction: Direction::Followers,
        }
    }
}

#[async_trait]
impl Lookup for RaribleLookup {
    type Item = ConnectionEntry;

    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Followings => "rarible-followings",
            Direction::Followers => "rarible-followers",
        }
    }

    fn source(&self) -> DataSource {
        DataSource::Rarible
    }

    async fn lookup(&self, address: &Address) -> Result<Vec<ConnectionEntry>, LookupFailure> {
        let (fetch_stage, decode_stage) = match self.direction {
            Direction::Followings => (
                "[rarible] fetch followings failed",
                "[rarible] followings response decode failed",
            ),
            Direction::Followers => (
                "[rarible] fetch followers failed",
                "[rarible] followers response decode failed",
            ),
        };

        let body = self
            .http
            .send_request(RequestArgs::get(render_url(&self.url_template, address)))
            .await
            .stage(fetch_stage)?;

        // `null` body or records read as empty.
        let records: Option<Vec<Option<RaribleFollowRecord>>> = decode(&body, decode_stage)?;

        Ok(records
            .into_iter()
            .flatten()
            .flatten()
            .map(|r| r.following)
            .filter(|f| !f.owner.trim().is_empty() && !f.user.trim().is_empty())
            .map(|f| ConnectionEntry {
                from: f.owner,
                to: f.user,
                platform: DataSource::Rarible,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http() -> HttpClient {
        HttpClient::new(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_followings_become_outgoing_edges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/followings"))
            .and(query_param("owner", "0xme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "following": { "owner": "0xme", "user": "0xa" } },
                { "following": { "owner": "0xme", "user": "" } },
                { "following": null }
            ])))
            .mount(&server)
            .await;

        let lookup = RaribleLookup::followings(
            http(),
            &format!("{}/v4/followings?owner={{address}}", server.uri()),
        );
        let edges = lookup.lookup(&Address::from("0xme")).await.unwrap();

        assert_eq!(lookup.name(), "rarible-followings");
        assert_eq!(
            edges,
            vec![ConnectionEntry {
                from: "0xme".to_string(),
                to: "0xa".to_string(),
                platform: DataSource::Rarible,
            }]
        );
    }

    #[tokio::test]
    async fn test_followers_become_incoming_edges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/followers"))
            .and(query_param("user", "0xme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "following": { "owner": "0xb", "user": "0xme" } }
            ])))
            .mount(&server)
            .await;

        let lookup = RaribleLookup::followers(
            http(),
            &format!("{}/v4/followers?user={{address}}", server.uri()),
        );
        let edges = lookup.lookup(&Address::from("0xme")).await.unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, "0xb");
        assert_eq!(edges[0].to, "0xme");
    }

    #[tokio::test]
    async fn test_null_body_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let lookup = RaribleLookup::followings(http(), &format!("{}/?owner={{address}}", server.uri()));
        let edges = lookup.lookup(&Address::from("0xme")).await.unwrap();

        assert!(edges.is_empty());
    }

    #[tokio::test]
    async fn test_null_record_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                null,
                { "following": { "owner": "0xb", "user": "0xme" } }
            ])))
            .mount(&server)
            .await;

        let lookup = RaribleLookup::followers(http(), &format!("{}/?user={{address}}", server.uri()));
        let edges = lookup.lookup(&Address::from("0xme")).await.unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, "0xb");
    }

    #[tokio::test]
    async fn test_object_body_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "rate limited" })))
            .mount(&server)
            .await;

        let lookup = RaribleLookup::followers(http(), &format!("{}/?user={{address}}", server.uri()));
        let failure = lookup.lookup(&Address::from("0xme")).await.unwrap_err();

        assert_eq!(failure.stage, "[rarible] followers response decode failed");
    }
}
