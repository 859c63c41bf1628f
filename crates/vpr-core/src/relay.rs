//! Per-post pipeline: extract, resolve, re-shorten, rewrite, post.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::{ChatId, MessageRef},
    extract::LinkExtractor,
    messaging::{port::MessagingPort, types::ChannelPost},
    ports::HttpClient,
    resolve::{Resolver, ResolverSettings},
    rewrite::RewritePlan,
    shorten::ReShortener,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The post came from a chat other than the source channel.
    ForeignChat,
    /// No short link in the post, and link-less posts are not relayed.
    NoLinks,
    Posted {
        found: usize,
        rewritten: usize,
        message: MessageRef,
    },
    PostFailed {
        found: usize,
        rewritten: usize,
        error: String,
    },
}

/// Stateless across posts; every field is read-only after construction.
pub struct Relay {
    cfg: Arc<Config>,
    extractor: LinkExtractor,
    resolver: Resolver,
    shortener: ReShortener,
}

impl Relay {
    pub fn new(cfg: Arc<Config>, http: Arc<dyn HttpClient>) -> Result<Self> {
        let extractor = LinkExtractor::new(&cfg.shortener_host)?;
        let resolver = Resolver::new(http.clone(), ResolverSettings::from_config(&cfg));
        let shortener = ReShortener::from_config(http, &cfg);
        Ok(Self {
            cfg,
            extractor,
            resolver,
            shortener,
        })
    }

    pub fn accepts(&self, post: &ChannelPost) -> bool {
        post.chat_id.0 == self.cfg.source_channel_id
    }

    /// Handle one inbound post end to end. Never fails: link failures leave
    /// the link as-is and posting failures are reported in the outcome.
    pub async fn handle_post(&self, post: &ChannelPost, messenger: &dyn MessagingPort) -> RelayOutcome {
        if !self.accepts(post) {
            return RelayOutcome::ForeignChat;
        }

        let text = post.body();
        let candidates = self.extractor.extract(Some(text));
        if candidates.is_empty() && !self.cfg.relay_without_links {
            info!(message_id = post.message_id.0, "no short links in post, not relaying");
            return RelayOutcome::NoLinks;
        }
        info!(
            message_id = post.message_id.0,
            found = candidates.len(),
            "relaying post"
        );

        let links: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let plan = self.plan(links).await;
        let rewritten = plan.replaced_count();
        let out = plan.apply(text);
        let found = candidates.len();

        let target = ChatId(self.cfg.target_channel_id);
        match messenger.send_text(target, &out, true).await {
            Ok(message) => {
                info!(found, rewritten, "posted to target channel");
                RelayOutcome::Posted {
                    found,
                    rewritten,
                    message,
                }
            }
            Err(e) => {
                error!(found, rewritten, "posting to target channel failed: {e}");
                RelayOutcome::PostFailed {
                    found,
                    rewritten,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Build a rewrite plan for links in text order, one lookup per distinct link.
    pub async fn plan<'a>(&self, links: impl IntoIterator<Item = &'a str>) -> RewritePlan {
        let mut plan = RewritePlan::new();
        for link in links {
            if plan.contains(link) {
                continue;
            }
            let replacement = match timeout(self.cfg.link_deadline, self.replacement_for(link)).await {
                Ok(replacement) => replacement,
                Err(_) => {
                    warn!(
                        link,
                        deadline_secs = self.cfg.link_deadline.as_secs(),
                        "link processing exceeded deadline, leaving it unchanged"
                    );
                    None
                }
            };
            plan.insert(link, replacement);
        }
        plan
    }

    async fn replacement_for(&self, link: &str) -> Option<String> {
        let resolution = self.resolver.resolve(link).await;
        if resolution.is_soft_failure() {
            // The best-known URL is still re-shortened, even if it is a shortener page.
            warn!(
                link,
                url = %resolution.url,
                via = ?resolution.via,
                hops = resolution.hops,
                "destination not confirmed, re-shortening best-known url"
            );
        } else {
            info!(link, destination = %resolution.url, via = ?resolution.via, "resolved");
        }

        match self.shortener.shorten(&resolution.url).await {
            Ok(short) => Some(short),
            Err(e) => {
                warn!(link, destination = %resolution.url, "no new short link: {e}");
                None
            }
        }
    }
}
