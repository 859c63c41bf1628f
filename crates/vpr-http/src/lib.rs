//! reqwest adapter for the `HttpClient` port.
//!
//! Requests look like a desktop browser (user agent plus accept headers) and
//! follow redirects, so interstitial pages serve the same markup a visitor
//! would see.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, UPGRADE_INSECURE_REQUESTS},
    redirect::Policy,
};
use tracing::debug;

use vpr_core::{
    errors::Error,
    ports::{HttpClient, HttpResponse},
    Result,
};

const MAX_REDIRECTS: usize = 10;

#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
    http: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(browser_headers())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Http(format!("http client build error: {e}")))?;
        Ok(Self { http })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let mut req = self.http.get(url).timeout(timeout);
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {url}: {e}")))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("GET {url}: reading body: {e}")))?;

        debug!(url, status, final_url = %final_url, bytes = body.len(), "fetched");
        Ok(HttpResponse {
            status,
            final_url,
            body,
        })
    }
}
