//! Destination resolution for short links.
//!
//! Strategies run in decreasing order of confidence: the shortener's own
//! lookup API, then page fetches that follow HTTP redirects and scrape the
//! markup for the next hop. Every hop is bounded by the depth ceiling and a
//! visited set; running out of either is a soft failure that still yields
//! the best URL seen so far.

pub mod api;
pub mod heuristics;

use std::{collections::HashSet, sync::Arc, time::Duration};

use tracing::{debug, info, warn};
use url::Url;

use crate::{classify::DomainSet, config::Config, ports::HttpClient};

use self::{
    api::ApiLookup,
    heuristics::{Finding, HeuristicKind, Hop},
};

/// How a resolution ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// The lookup API returned the destination.
    Api,
    /// The input was not on a shortener domain to begin with.
    NotShortener,
    /// HTTP redirects landed off the shortener domains.
    Redirect,
    /// A markup heuristic produced the destination.
    Heuristic(HeuristicKind),
    /// Depth ceiling hit; `url` is the last hop reached.
    DepthLimit,
    /// A hop pointed back at a URL already fetched.
    Cycle,
    /// The page offered no further hop; `url` is that page.
    GaveUp,
    /// Fetching the page failed; `url` is the page we tried.
    FetchFailed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub via: Resolved,
    /// Page hops taken after the API step.
    pub hops: usize,
}

impl Resolution {
    fn new(url: impl Into<String>, via: Resolved, hops: usize) -> Self {
        Self {
            url: url.into(),
            via,
            hops,
        }
    }

    /// True when `url` is only the best-known URL, not a confirmed destination.
    pub fn is_soft_failure(&self) -> bool {
        matches!(
            self.via,
            Resolved::DepthLimit | Resolved::Cycle | Resolved::GaveUp | Resolved::FetchFailed
        )
    }
}

#[derive(Clone, Debug)]
pub struct ResolverSettings {
    pub expand_api_url: String,
    pub api_key: String,
    pub shorteners: DomainSet,
    pub final_hosts: DomainSet,
    pub max_depth: usize,
    pub fetch_timeout: Duration,
    pub api_timeout: Duration,
}

impl ResolverSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            expand_api_url: cfg.expand_api_url.clone(),
            api_key: cfg.expand_api_key.clone(),
            shorteners: DomainSet::new(&cfg.shortener_domains),
            final_hosts: DomainSet::new(&cfg.final_hosts),
            max_depth: cfg.max_resolve_depth,
            fetch_timeout: cfg.fetch_timeout,
            api_timeout: cfg.api_timeout,
        }
    }
}

/// Resolves one short link at a time. Holds no per-link state, so a single
/// instance can serve concurrent resolutions.
pub struct Resolver {
    http: Arc<dyn HttpClient>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(http: Arc<dyn HttpClient>, settings: ResolverSettings) -> Self {
        Self { http, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// API lookup first; page traversal only when the API has no answer.
    pub async fn resolve(&self, short_link: &str) -> Resolution {
        let lookup = ApiLookup {
            endpoint: &self.settings.expand_api_url,
            api_key: &self.settings.api_key,
            timeout: self.settings.api_timeout,
        };
        if let Some(dest) = api::expand(self.http.as_ref(), &lookup, short_link).await {
            info!(link = short_link, destination = %dest, "resolved via expand api");
            return Resolution::new(dest, Resolved::Api, 0);
        }

        debug!(link = short_link, "expand api had no answer, following page");
        self.follow(short_link).await
    }

    /// Fetch-and-scrape traversal starting at `start`, depth 0.
    pub async fn follow(&self, start: &str) -> Resolution {
        let s = &self.settings;
        let mut current = start.trim().to_string();
        let mut arrived_via = Resolved::NotShortener;
        let mut visited: HashSet<String> = HashSet::new();
        let mut depth = 0usize;

        loop {
            if !s.shorteners.matches(&current) {
                info!(url = %current, depth, "arrived at non-shortener url");
                return Resolution::new(current, arrived_via, depth);
            }
            if depth >= s.max_depth {
                warn!(url = %current, depth, "depth ceiling reached, keeping last url");
                return Resolution::new(current, Resolved::DepthLimit, depth);
            }
            if !visited.insert(visit_key(&current)) {
                warn!(url = %current, depth, "hop revisits a fetched url, stopping");
                return Resolution::new(current, Resolved::Cycle, depth);
            }

            let page = match self.http.get(&current, &[], s.fetch_timeout).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %current, depth, strategy = "redirect", "fetch failed: {e}");
                    return Resolution::new(current, Resolved::FetchFailed, depth);
                }
            };

            if is_http_url(&page.final_url)
                && !same_url(&page.final_url, &current)
                && !s.shorteners.matches(&page.final_url)
            {
                info!(url = %current, landed = %page.final_url, depth, "redirect left shortener domains");
                return Resolution::new(page.final_url, Resolved::Redirect, depth);
            }

            // Redirected onto another shortener page: that page is what gets
            // scraped, so it is the base for relative hops and counts as visited.
            if is_http_url(&page.final_url) && !same_url(&page.final_url, &current) {
                debug!(url = %current, landed = %page.final_url, depth, "redirect stayed on shortener domains");
                current = page.final_url.clone();
                if !visited.insert(visit_key(&current)) {
                    warn!(url = %current, depth, "redirect revisits a fetched url, stopping");
                    return Resolution::new(current, Resolved::Cycle, depth);
                }
            }

            // Scraping is synchronous; the parsed document never crosses an await.
            let finding = heuristics::scan(&page.body, &current, &s.final_hosts);
            match finding {
                None => {
                    warn!(url = %current, depth, status = page.status, "no heuristic matched, giving up");
                    return Resolution::new(current, Resolved::GaveUp, depth);
                }
                Some(Finding {
                    kind,
                    hop: Hop::Direct(url),
                }) => {
                    info!(url = %current, destination = %url, depth, heuristic = ?kind, "direct destination found");
                    return Resolution::new(url, Resolved::Heuristic(kind), depth);
                }
                Some(Finding {
                    kind,
                    hop: Hop::Follow(next),
                }) => {
                    debug!(url = %current, next = %next, depth, heuristic = ?kind, "following hop");
                    current = next;
                    arrived_via = Resolved::Heuristic(kind);
                    depth += 1;
                }
            }
        }
    }
}

/// Absolute http(s) URL with a host and no whitespace.
pub(crate) fn is_http_url(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn visit_key(url: &str) -> String {
    Url::parse(url)
        .map(|mut u| {
            u.set_fragment(None);
            u.to_string()
        })
        .unwrap_or_else(|_| url.to_string())
}
