//! Markup and script scraping for interstitial pages.
//!
//! Each heuristic is a pure function over a parsed page. `scan` runs them in
//! `CASCADE` order and stops at the first hit.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::classify::DomainSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicKind {
    SkipLink,
    MetaRefresh,
    DirectAnchor,
    Iframe,
    Script,
    BodyLiteral,
    EscapedUrl,
}

/// What a heuristic found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hop {
    /// Another hop worth fetching.
    Follow(String),
    /// A final-content URL; resolution ends here.
    Direct(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub kind: HeuristicKind,
    pub hop: Hop,
}

/// A fetched page, parsed once and shared by every heuristic.
pub struct Page<'a> {
    pub doc: Html,
    pub body: &'a str,
    pub base: Url,
    pub final_hosts: &'a DomainSet,
}

impl<'a> Page<'a> {
    pub fn parse(body: &'a str, current_url: &str, final_hosts: &'a DomainSet) -> Option<Self> {
        let base = Url::parse(current_url).ok()?;
        Some(Self {
            doc: Html::parse_document(body),
            body,
            base,
            final_hosts,
        })
    }
}

pub type Heuristic = fn(&Page<'_>) -> Option<Hop>;

pub const CASCADE: &[(HeuristicKind, Heuristic)] = &[
    (HeuristicKind::SkipLink, skip_link),
    (HeuristicKind::MetaRefresh, meta_refresh),
    (HeuristicKind::DirectAnchor, direct_anchor),
    (HeuristicKind::Iframe, iframe),
    (HeuristicKind::Script, script_link),
    (HeuristicKind::BodyLiteral, body_literal),
    (HeuristicKind::EscapedUrl, escaped_url),
];

/// Run the cascade over a page body. `None` when nothing matched.
pub fn scan(body: &str, current_url: &str, final_hosts: &DomainSet) -> Option<Finding> {
    let page = Page::parse(body, current_url, final_hosts)?;
    CASCADE
        .iter()
        .find_map(|(kind, heuristic)| heuristic(&page).map(|hop| Finding { kind: *kind, hop }))
}

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static META_REFRESH: LazyLock<Selector> = LazyLock::new(|| selector("meta[http-equiv][content]"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| selector("iframe[src]"));
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| selector("script:not([src])"));

static REFRESH_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?i)url\s*=\s*['"]?\s*([^'"\s;]+)"#));
static URL_LITERAL: LazyLock<Regex> = LazyLock::new(|| regex(r#"https?://[^\s"'<>\\`)]+"#));
static ESCAPED_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"https?:\\/\\/(?:\\/|[^\s"'<>`\\])+"#));
static REDIRECT_CALLS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"location(?:\.href)?\s*=\s*["'`]([^"'`]*)["'`]"#,
        r#"location\.(?:replace|assign)\(\s*["'`]([^"'`]*)["'`]"#,
        r#"window\.open\(\s*["'`]([^"'`]*)["'`]"#,
        r#"\b(?:redirect|fetch)[A-Za-z_]*\s*\(\s*["'`]([^"'`]*)["'`]"#,
    ]
    .into_iter()
    .map(regex)
    .collect()
});

// Static patterns; a failure here is a programming error.
fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

fn regex(s: &str) -> Regex {
    Regex::new(s).expect("static regex")
}

const SKIP_MARKERS: &[&str] = &["skip", "continue", "get-link", "getlink", "get_link", "go-link"];
const SKIP_LABELS: &[&str] = &["skip", "continue", "get link", "go to link"];

fn is_skip_control(a: &ElementRef<'_>) -> bool {
    let el = a.value();
    let marked = |s: &str| {
        let s = s.to_lowercase();
        SKIP_MARKERS.iter().any(|m| s.contains(m))
    };
    if el.id().is_some_and(marked) || el.classes().any(marked) {
        return true;
    }
    let label = a.text().collect::<String>().trim().to_lowercase();
    !label.is_empty() && SKIP_LABELS.iter().any(|l| label.contains(l))
}

pub fn skip_link(page: &Page<'_>) -> Option<Hop> {
    page.doc
        .select(&ANCHOR)
        .filter(is_skip_control)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !is_placeholder(href))
        .find_map(|href| absolutize(&page.base, href))
        .map(Hop::Follow)
}

pub fn meta_refresh(page: &Page<'_>) -> Option<Hop> {
    page.doc
        .select(&META_REFRESH)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|m| m.value().attr("content"))
        .filter_map(|content| REFRESH_URL.captures(content))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|target| !is_placeholder(target))
        .find_map(|target| absolutize(&page.base, target))
        .map(Hop::Follow)
}

pub fn direct_anchor(page: &Page<'_>) -> Option<Hop> {
    page.doc
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| absolutize(&page.base, href))
        .find(|url| page.final_hosts.matches(url))
        .map(Hop::Direct)
}

pub fn iframe(page: &Page<'_>) -> Option<Hop> {
    page.doc
        .select(&IFRAME)
        .filter_map(|f| f.value().attr("src"))
        .filter_map(|src| absolutize(&page.base, src))
        .find(|url| page.final_hosts.matches(url))
        .map(Hop::Direct)
}

/// Inline scripts: a literal final-content URL wins over redirect calls.
pub fn script_link(page: &Page<'_>) -> Option<Hop> {
    let scripts: Vec<String> = page
        .doc
        .select(&SCRIPT)
        .map(|s| s.text().collect::<String>())
        .filter(|s| !s.trim().is_empty())
        .collect();

    if let Some(url) = scripts
        .iter()
        .find_map(|s| final_literal(s, page.final_hosts))
    {
        return Some(Hop::Direct(url));
    }

    REDIRECT_CALLS.iter().find_map(|call| {
        scripts
            .iter()
            .flat_map(|s| call.captures_iter(s))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .filter(|target| !is_placeholder(target))
            .find_map(|target| absolutize(&page.base, &target))
            .map(Hop::Follow)
    })
}

pub fn body_literal(page: &Page<'_>) -> Option<Hop> {
    final_literal(page.body, page.final_hosts).map(Hop::Direct)
}

pub fn escaped_url(page: &Page<'_>) -> Option<Hop> {
    ESCAPED_URL
        .find_iter(page.body)
        .map(|m| m.as_str().replace("\\/", "/"))
        .map(|url| trim_trailing_punctuation(&url).to_string())
        .find(|url| page.final_hosts.matches(url))
        .map(Hop::Follow)
}

fn final_literal(haystack: &str, final_hosts: &DomainSet) -> Option<String> {
    URL_LITERAL
        .find_iter(haystack)
        .map(|m| trim_trailing_punctuation(m.as_str()))
        .find(|url| final_hosts.matches(url))
        .map(str::to_string)
}

fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(&['.', ',', ';', ':', '!', '?', ']', '}'][..])
}

/// `#`, empty and script no-ops are not navigation targets.
pub fn is_placeholder(target: &str) -> bool {
    let t = target.trim().to_lowercase();
    t.is_empty() || t.starts_with('#') || t.starts_with("javascript:") || t == "about:blank"
}

/// Resolve `href` against the origin of `base`. Only http(s) results count.
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let origin_root = base.join("/").ok()?;
    let url = origin_root.join(href).ok()?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
        Some(url.to_string())
    } else {
        None
    }
}
