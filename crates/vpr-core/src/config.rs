use std::{env, fs, io, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_SHORTENER_HOST: &str = "vplink.in";
pub const DEFAULT_API_URL: &str = "https://vplink.in/api";

/// Hosts that hand out redirecting links rather than serving content.
pub const DEFAULT_SHORTENER_DOMAINS: &[&str] = &[
    "vplink.in",
    "gplinks.co",
    "gplinks.in",
    "shrinkme.io",
    "shrinke.me",
    "adrinolinks.in",
    "indianshortner.com",
    "linkvertise.com",
    "ouo.io",
    "ouo.press",
    "exe.io",
    "shorte.st",
    "adf.ly",
    "bit.ly",
    "tinyurl.com",
    "cutt.ly",
];

/// File hosts treated as final content; a link to one of these ends resolution.
pub const DEFAULT_FINAL_HOSTS: &[&str] = &[
    "gofile.io",
    "mega.nz",
    "drive.google.com",
    "mediafire.com",
    "pixeldrain.com",
    "terabox.com",
    "teraboxapp.com",
    "dropbox.com",
    "krakenfiles.com",
    "buzzheavier.com",
    "send.cm",
];

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Typed configuration, loaded once at startup and threaded into every
/// component at construction.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub source_channel_id: i64,
    pub target_channel_id: i64,

    // Shortener service
    pub expand_api_key: String,
    pub shorten_api_key: String,
    pub expand_api_url: String,
    pub shorten_api_url: String,
    pub shortener_host: String,

    // Resolution
    pub shortener_domains: Vec<String>,
    pub final_hosts: Vec<String>,
    pub max_resolve_depth: usize,
    pub fetch_timeout: Duration,
    pub api_timeout: Duration,
    pub link_deadline: Duration,
    pub user_agent: String,

    // Behavior flags
    pub relay_without_links: bool,
}

impl Config {
    /// Load from the process environment, after `config.env` / `.env`.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new("config.env"))?;
        load_dotenv_if_present(Path::new(".env"))?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = required(&get, "TELEGRAM_BOT_TOKEN")?;
        let source_channel_id = required_i64(&get, "SOURCE_CHANNEL_ID")?;
        let target_channel_id = required_i64(&get, "TARGET_CHANNEL_ID")?;
        let expand_api_key = required(&get, "VPLINK_API1_KEY")?;
        let shorten_api_key = required(&get, "VPLINK_API2_KEY")?;

        let expand_api_url = get("VPLINK_EXPAND_API").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let shorten_api_url =
            get("VPLINK_SHORTEN_API").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let shortener_host = get("SHORTENER_HOST")
            .map(|h| h.trim().to_string())
            .unwrap_or_else(|| DEFAULT_SHORTENER_HOST.to_string());

        // The extractor's own host is always a shortener, whatever the list says.
        let mut shortener_domains = parse_csv_lower(get("SHORTENER_DOMAINS"))
            .unwrap_or_else(|| to_strings(DEFAULT_SHORTENER_DOMAINS));
        let own_host = shortener_host.to_lowercase();
        if !shortener_domains.contains(&own_host) {
            shortener_domains.insert(0, own_host);
        }
        let final_hosts =
            parse_csv_lower(get("FINAL_HOSTS")).unwrap_or_else(|| to_strings(DEFAULT_FINAL_HOSTS));

        let max_resolve_depth = parse_or(&get, "MAX_RESOLVE_DEPTH", 10usize)?;
        if max_resolve_depth == 0 {
            return Err(Error::Config(
                "MAX_RESOLVE_DEPTH must be at least 1".to_string(),
            ));
        }
        let fetch_timeout = Duration::from_secs(parse_or(&get, "FETCH_TIMEOUT_SECS", 20u64)?);
        let api_timeout = Duration::from_secs(parse_or(&get, "API_TIMEOUT_SECS", 10u64)?);
        let link_deadline = Duration::from_secs(parse_or(&get, "LINK_DEADLINE_SECS", 120u64)?);
        let user_agent = get("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let relay_without_links = get("RELAY_WITHOUT_LINKS")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            source_channel_id,
            target_channel_id,
            expand_api_key,
            shorten_api_key,
            expand_api_url,
            shorten_api_url,
            shortener_host,
            shortener_domains,
            final_hosts,
            max_resolve_depth,
            fetch_timeout,
            api_timeout,
            link_deadline,
            user_agent,
            relay_without_links,
        })
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn required_i64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<i64> {
    let raw = required(get, key)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{key} must be a numeric chat id, got {raw:?}")))
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}

/// A missing file is fine; an unreadable one is an error.
fn load_dotenv_if_present(path: &Path) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
    Ok(())
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_csv_lower(v: Option<String>) -> Option<Vec<String>> {
    let out = v?
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("SOURCE_CHANNEL_ID", "-1001"),
            ("TARGET_CHANNEL_ID", "-1002"),
            ("VPLINK_API1_KEY", "k1"),
            ("VPLINK_API2_KEY", "k2"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn dotenv_missing_is_ok_but_unreadable_is_io_error() {
        assert!(load_dotenv_if_present(Path::new("definitely-not-here.env")).is_ok());
        // A directory exists but cannot be read as a file.
        let dir = env::temp_dir();
        assert!(matches!(load_dotenv_if_present(&dir), Err(Error::Io(_))));
    }

    #[test]
    fn applies_defaults() {
        let cfg = load(&base_env()).unwrap();
        assert_eq!(cfg.source_channel_id, -1001);
        assert_eq!(cfg.target_channel_id, -1002);
        assert_eq!(cfg.expand_api_url, DEFAULT_API_URL);
        assert_eq!(cfg.shorten_api_url, DEFAULT_API_URL);
        assert_eq!(cfg.max_resolve_depth, 10);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(20));
        assert_eq!(cfg.api_timeout, Duration::from_secs(10));
        assert!(cfg.shortener_domains.contains(&"vplink.in".to_string()));
        assert!(cfg.final_hosts.contains(&"gofile.io".to_string()));
        assert!(!cfg.final_hosts.iter().any(|h| h == "t.me"));
        assert!(!cfg.relay_without_links);
    }

    #[test]
    fn missing_required_key_is_named() {
        let mut env = base_env();
        env.remove("VPLINK_API2_KEY");
        let err = load(&env).unwrap_err().to_string();
        assert!(err.contains("VPLINK_API2_KEY"), "{err}");
    }

    #[test]
    fn rejects_non_numeric_channel() {
        let mut env = base_env();
        env.insert("SOURCE_CHANNEL_ID", "@mychannel");
        assert!(matches!(load(&env), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_zero_depth() {
        let mut env = base_env();
        env.insert("MAX_RESOLVE_DEPTH", "0");
        assert!(matches!(load(&env), Err(Error::Config(_))));
    }

    #[test]
    fn custom_domain_list_keeps_own_host() {
        let mut env = base_env();
        env.insert("SHORTENER_DOMAINS", "Ouo.io, ,bit.ly");
        let cfg = load(&env).unwrap();
        assert_eq!(cfg.shortener_domains, vec!["vplink.in", "ouo.io", "bit.ly"]);
    }

    #[test]
    fn quoted_dotenv_values_are_unquoted() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\""), "\"");
    }
}
