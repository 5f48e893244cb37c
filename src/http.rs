//! Thin HTTP request helper shared by every provider lookup.
//!
//! Applies the per-request timeout and user agent, maps transport failures
//! into [`FetchError`] and hands back the raw body so each lookup can decode
//! it into its own wire shape.

use crate::config::HttpConfig;
use crate::error::FetchError;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP method of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
}

impl RequestArgs {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            body: Some(body),
        }
    }
}

/// Shared outbound client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout_seconds: u64,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            inner,
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Send a request and return the response body.
    ///
    /// Non-2xx responses are errors; the body is included in the error so the
    /// collector log shows what the provider said.
    pub async fn send_request(&self, args: RequestArgs) -> Result<Vec<u8>, FetchError> {
        debug!("{:?} {}", args.method, args.url);

        let mut request = match args.method {
            Method::Get => self.inner.get(&args.url),
            Method::Post => self.inner.post(&args.url),
        };
        request = request.header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &args.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(&args.url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: args.url,
                status: status.as_u16(),
                body,
            });
        }

        // The timeout covers the body too, so a stalled body is a timeout.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(&args.url, e))?;
        Ok(bytes.to_vec())
    }

    fn map_transport_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout_seconds,
            }
        } else if e.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport(e)
        }
    }

    /// POST a GraphQL document as `{"query": "..."}`.
    pub async fn post_graphql(&self, url: &str, query: &str) -> Result<Vec<u8>, FetchError> {
        let body = serde_json::json!({ "query": query });
        self.send_request(RequestArgs::post_json(url, body)).await
    }
}
