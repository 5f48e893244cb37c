//! SuperRare user profile API.

use crate::aggregation::Lookup;
use crate::error::{LookupFailure, StageExt};
use crate::http::{HttpClient, RequestArgs};
use crate::models::{Address, DataSource, IdentityFragment, SuperrareIdentity};
use crate::providers::{decode, nullable, render_url};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct SuperrareProfileResponse {
    #[serde(default, deserialize_with = "nullable")]
    result: SuperrareUser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SuperrareUser {
    #[serde(deserialize_with = "nullable")]
    username: String,
    #[serde(deserialize_with = "nullable")]
    location: String,
    #[serde(deserialize_with = "nullable")]
    bio: String,
    #[serde(deserialize_with = "nullable")]
    instagram_link: String,
    #[serde(deserialize_with = "nullable")]
    twitter_link: String,
    #[serde(deserialize_with = "nullable")]
    steemit_link: String,
    #[serde(deserialize_with = "nullable")]
    website: String,
    #[serde(deserialize_with = "nullable")]
    spotify_link: String,
    #[serde(deserialize_with = "nullable")]
    soundcloud_link: String,
}

pub struct SuperrareLookup {
    http: HttpClient,
    url_template: String,
}

impl SuperrareLookup {
    pub fn new(http: HttpClient, url_template: &str) -> Self {
        Self {
            http,
            url_template: url_template.to_string(),
        }
    }
}

#[async_trait]
impl Lookup for SuperrareLookup {
    type Item = IdentityFragment;

    fn name(&self) -> &'static str {
        "superrare"
    }

    fn source(&self) -> DataSource {
        DataSource::Superrare
    }

    async fn lookup(&self, address: &Address) -> Result<Vec<IdentityFragment>, LookupFailure> {
        let body = self
            .http
            .send_request(RequestArgs::get(render_url(&self.url_template, address)))
            .await
            .stage("[superrare] fetch identity failed")?;

        let response: SuperrareProfileResponse =
            decode(&body, "[superrare] identity response decode failed")?;

        let user = response.result;
        let identity = SuperrareIdentity {
            username: user.username,
            homepage: String::new(),
            location: user.location,
            bio: user.bio,
            instagram_link: user.instagram_link,
            twitter_link: user.twitter_link,
            steemit_link: user.steemit_link,
            website: user.website,
            spotify_link: user.spotify_link,
            soundcloud_link: user.soundcloud_link,
            data_source: DataSource::Superrare,
        };

        if identity.is_blank() {
            return Ok(Vec::new());
        }
        Ok(vec![IdentityFragment::Superrare(identity)])
    }
}
