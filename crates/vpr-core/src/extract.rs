use std::ops::Range;

use regex::Regex;

use crate::{errors::Error, Result};

/// A short link found in message text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateLink {
    pub text: String,
    pub span: Range<usize>,
}

/// Finds short links issued by one shortener host.
///
/// Matches `http(s)://[www.]<host>/<alphanumeric code>`. The host match is
/// case-sensitive, as the shortener itself only issues lowercase links.
#[derive(Clone, Debug)]
pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    pub fn new(shortener_host: &str) -> Result<Self> {
        let host = shortener_host.trim();
        if host.is_empty() {
            return Err(Error::Config("shortener host must not be empty".to_string()));
        }
        let pattern = Regex::new(&format!(
            r"https?://(?:www\.)?{}/[A-Za-z0-9]+",
            regex::escape(host)
        ))
        .map_err(|e| Error::Config(format!("invalid shortener host {host:?}: {e}")))?;
        Ok(Self { pattern })
    }

    /// All matches in text order; duplicates are kept.
    pub fn extract(&self, text: Option<&str>) -> Vec<CandidateLink> {
        let Some(text) = text else {
            return Vec::new();
        };
        self.pattern
            .find_iter(text)
            .map(|m| CandidateLink {
                text: m.as_str().to_string(),
                span: m.range(),
            })
            .collect()
    }
}
