//! Telegram update handlers.
//!
//! Converts teloxide messages into core `ChannelPost`s and hands them to the
//! relay. Relay failures are logged, never surfaced to the dispatcher.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{debug, info, warn};

use vpr_core::{
    domain::{ChatId, MessageId},
    messaging::types::ChannelPost,
    relay::RelayOutcome,
};

use crate::router::AppState;

pub fn to_channel_post(msg: &Message) -> ChannelPost {
    ChannelPost {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
    }
}

/// Channel posts and supergroup messages share one path.
pub async fn handle_post(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let post = to_channel_post(&msg);
    if post.text.is_none() && post.caption.is_none() {
        debug!(chat_id = post.chat_id.0, "ignoring post without text");
        return Ok(());
    }

    match state.relay.handle_post(&post, state.messenger.as_ref()).await {
        RelayOutcome::ForeignChat => {
            debug!(chat_id = post.chat_id.0, "ignoring post from non-source chat");
        }
        RelayOutcome::NoLinks => {}
        RelayOutcome::Posted {
            found, rewritten, ..
        } => {
            info!(
                message_id = post.message_id.0,
                found, rewritten, "relayed post"
            );
        }
        RelayOutcome::PostFailed { error, .. } => {
            warn!(message_id = post.message_id.0, "relay failed: {error}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).expect("valid telegram message")
    }

    #[test]
    fn channel_text_post_maps_to_core_post() {
        let msg = message(serde_json::json!({
            "message_id": 42,
            "date": 1700000000,
            "chat": { "id": -1001234567890i64, "type": "channel", "title": "source" },
            "text": "grab it https://vplink.in/abc"
        }));

        let post = to_channel_post(&msg);
        assert_eq!(post.chat_id, ChatId(-1001234567890));
        assert_eq!(post.message_id, MessageId(42));
        assert_eq!(post.text.as_deref(), Some("grab it https://vplink.in/abc"));
        assert_eq!(post.caption, None);
    }
}
