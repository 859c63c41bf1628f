use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Response of a single GET, after redirects were followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// URL the client landed on once every redirect was followed.
    pub final_url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Hexagonal port for outbound HTTP.
///
/// Every network call the engine makes (lookup API, page fetches, link
/// creation) goes through this trait, so implementations own headers,
/// redirect policy and TLS. Transport failures map to `Error::Http`;
/// non-2xx statuses are returned as responses, not errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse>;
}
