use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tracing::{error, info};

use crate::{config::Config, errors::Error, ports::HttpClient, Result};

const MAX_LOGGED_BODY: usize = 300;

/// Creation endpoint reply: `{"status":"success","shortenedUrl":"..."}`.
#[derive(Debug, Deserialize)]
struct CreateReply {
    status: Option<String>,
    #[serde(rename = "shortenedUrl", alias = "short_url", alias = "shortUrl")]
    shortened_url: Option<String>,
}

/// Mints new short links through the shortener's creation endpoint.
pub struct ReShortener {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl ReShortener {
    pub fn new(
        http: Arc<dyn HttpClient>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub fn from_config(http: Arc<dyn HttpClient>, cfg: &Config) -> Self {
        Self::new(
            http,
            cfg.shorten_api_url.clone(),
            cfg.shorten_api_key.clone(),
            cfg.api_timeout,
        )
    }

    /// Create a short link for `destination`.
    ///
    /// Any transport error, non-200 status, unparseable body or non-success
    /// status is an error; callers leave the original link in place.
    pub async fn shorten(&self, destination: &str) -> Result<String> {
        let query = [("api", self.api_key.as_str()), ("url", destination)];
        let resp = self
            .http
            .get(&self.endpoint, &query, self.timeout)
            .await
            .inspect_err(|e| error!(destination, "shorten request failed: {e}"))?;

        let rejected = || {
            let body = truncate(&resp.body, MAX_LOGGED_BODY);
            error!(destination, status = resp.status, body = %body, "shorten api rejected request");
            Error::Api {
                status: resp.status,
                body,
            }
        };

        if resp.status != 200 {
            return Err(rejected());
        }

        let reply: CreateReply = match serde_json::from_str(resp.body.trim()) {
            Ok(reply) => reply,
            Err(e) => {
                let body = truncate(&resp.body, MAX_LOGGED_BODY);
                error!(destination, status = resp.status, body = %body, "shorten reply is not json: {e}");
                return Err(Error::Json(e));
            }
        };

        let succeeded = reply
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("success"));
        match reply.shortened_url.map(|u| u.trim().to_string()) {
            Some(url) if succeeded && !url.is_empty() => {
                info!(destination, short = %url, "created short link");
                Ok(url)
            }
            _ => Err(rejected()),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
