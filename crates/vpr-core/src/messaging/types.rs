use crate::domain::{ChatId, MessageId};

/// Messenger-agnostic inbound post.
///
/// Only what the relay needs; Telegram-specific fields stay in the adapter.
#[derive(Clone, Debug)]
pub struct ChannelPost {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl ChannelPost {
    /// Text body, falling back to the media caption.
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or("")
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_link_previews: bool,
    pub max_message_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_prefers_text_over_caption() {
        let mut post = ChannelPost {
            chat_id: ChatId(-1),
            message_id: MessageId(1),
            text: Some("text".to_string()),
            caption: Some("caption".to_string()),
        };
        assert_eq!(post.body(), "text");

        post.text = None;
        assert_eq!(post.body(), "caption");

        post.caption = None;
        assert_eq!(post.body(), "");
    }
}
