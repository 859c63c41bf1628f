use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between posts to the same chat (channels allow ~20/min).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),     // ~25/sec
            per_chat_min_interval: Duration::from_millis(3050), // ~19.7/min
        }
    }
}

/// Next free slot on one interval schedule.
#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Book the earliest slot and return how long the caller must wait for it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let slot = self.next.max(now);
        self.next = slot + self.interval;
        slot - now
    }
}

#[derive(Debug)]
struct Schedule {
    global: IntervalLimiter,
    per_chat: HashMap<ChatId, IntervalLimiter>,
}

/// MessagingPort decorator that rate-limits outbound posts.
///
/// Bursts of relayed posts (a channel forwarding an album of link posts, say)
/// would otherwise trip Telegram 429s on the target channel.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    schedule: Mutex<Schedule>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            schedule: Mutex::new(Schedule {
                global: IntervalLimiter::new(cfg.global_min_interval),
                per_chat: HashMap::new(),
            }),
        }
    }

    /// Both slots are booked under one lock so concurrent posts queue in order.
    async fn wait_for_slot(&self, chat_id: ChatId) {
        let wait = {
            let mut schedule = self.schedule.lock().await;
            let global_wait = schedule.global.reserve();
            let per_chat_interval = self.cfg.per_chat_min_interval;
            let chat_wait = schedule
                .per_chat
                .entry(chat_id)
                .or_insert_with(|| IntervalLimiter::new(per_chat_interval))
                .reserve();
            global_wait.max(chat_wait)
        };

        if !wait.is_zero() {
            debug!(chat_id = chat_id.0, wait_ms = wait.as_millis() as u64, "throttling post");
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, chat_id: ChatId, text: &str, preview: bool) -> Result<MessageRef> {
        self.wait_for_slot(chat_id).await;
        self.inner.send_text(chat_id, text, preview).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        sent: StdMutex<Vec<(i64, String)>>,
    }

    #[async_trait::async_trait]
    impl MessagingPort for Recorder {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_link_previews: true,
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, chat_id: ChatId, text: &str, _preview: bool) -> Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id.0, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    #[test]
    fn limiter_spaces_reservations() {
        let mut lim = IntervalLimiter::new(Duration::from_secs(60));
        assert!(lim.reserve().is_zero());
        assert!(lim.reserve() > Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn second_post_to_same_chat_waits() {
        let inner = Arc::new(Recorder::default());
        let throttled = ThrottledMessenger::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(0),
                per_chat_min_interval: Duration::from_secs(3),
            },
        );

        let start = Instant::now();
        throttled.send_text(ChatId(-100), "a", true).await.unwrap();
        throttled.send_text(ChatId(-100), "b", true).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(inner.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_chats_do_not_share_a_slot() {
        let inner = Arc::new(Recorder::default());
        let throttled = ThrottledMessenger::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(0),
                per_chat_min_interval: Duration::from_secs(3),
            },
        );

        let start = Instant::now();
        throttled.send_text(ChatId(-100), "a", true).await.unwrap();
        throttled.send_text(ChatId(-200), "b", true).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
