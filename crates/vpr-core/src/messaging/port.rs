use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound messenger port.
///
/// The relay only ever posts plain text; previews are requested explicitly so
/// adapters don't guess a default.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str, preview: bool) -> Result<MessageRef>;
}
