//! Lookup through the shortener's own expand endpoint.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::ports::HttpClient;

use super::is_http_url;

/// Field names the expand endpoint has been seen to use for the destination.
const DESTINATION_FIELDS: &[&str] = &[
    "destination",
    "destinationUrl",
    "destination_url",
    "longUrl",
    "long_url",
    "url",
];

#[derive(Clone, Copy, Debug)]
pub struct ApiLookup<'a> {
    pub endpoint: &'a str,
    pub api_key: &'a str,
    pub timeout: Duration,
}

/// Ask the expand endpoint for the stored destination of `short_link`.
///
/// Tries the exact link first, then the `host/path` form. `None` means
/// "no answer", never an error: the caller falls back to fetching the page.
pub async fn expand(http: &dyn HttpClient, lookup: &ApiLookup<'_>, short_link: &str) -> Option<String> {
    for variant in lookup_variants(short_link) {
        let query = [("api", lookup.api_key), ("url", variant.as_str())];
        let resp = match http.get(lookup.endpoint, &query, lookup.timeout).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(link = short_link, variant = %variant, "expand api request failed: {e}");
                continue;
            }
        };

        if !resp.is_success() {
            debug!(
                link = short_link,
                variant = %variant,
                status = resp.status,
                "expand api returned non-success status"
            );
            continue;
        }

        match parse_destination(&resp.body, short_link) {
            Some(dest) => return Some(dest),
            None => debug!(link = short_link, variant = %variant, "expand api gave no destination"),
        }
    }
    None
}

/// Endpoint `url=` variants, most specific first.
pub fn lookup_variants(short_link: &str) -> Vec<String> {
    let exact = short_link.trim().to_string();
    let mut out = vec![exact.clone()];
    if let Ok(u) = Url::parse(&exact) {
        if let Some(host) = u.host_str() {
            let bare = format!("{host}{}", u.path());
            if bare != exact {
                out.push(bare);
            }
        }
    }
    out
}

/// Pull a destination out of an expand response body.
///
/// JSON bodies must signal success and carry one of the known destination
/// fields; anything else that is a bare URL is accepted as a plain-text
/// answer. The short link echoed back is not a destination.
pub fn parse_destination(body: &str, short_link: &str) -> Option<String> {
    let body = body.trim();
    let candidate = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            if !signals_success(&map) {
                return None;
            }
            DESTINATION_FIELDS
                .iter()
                .find_map(|field| map.get(*field).and_then(Value::as_str))
                .map(|s| s.trim().to_string())?
        }
        Ok(Value::String(s)) => s.trim().to_string(),
        Ok(_) => return None,
        Err(_) => body.to_string(),
    };

    if !is_http_url(&candidate) || candidate == short_link.trim() {
        return None;
    }
    Some(candidate)
}

fn signals_success(map: &Map<String, Value>) -> bool {
    match map.get("status") {
        None => true,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("success") || s.eq_ignore_ascii_case("ok"),
        Some(Value::Bool(b)) => *b,
        Some(_) => false,
    }
}
