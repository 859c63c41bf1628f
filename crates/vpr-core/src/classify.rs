use url::Url;

/// A read-only set of host fragments.
///
/// Matching is substring containment against the URL host, so `vplink.in`
/// also matches `www.vplink.in` and mirrors such as `go.vplink.in.net`.
#[derive(Clone, Debug, Default)]
pub struct DomainSet {
    domains: Vec<String>,
}

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Whether the host of `url` contains any configured domain.
    ///
    /// Unparseable URLs and URLs without a host never match.
    pub fn matches(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.matches_host(&host)
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.domains.iter().any(|d| host.contains(d.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
