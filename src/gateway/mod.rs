//! Chat platform collaborator: inbound messages and outbound calls.

use async_trait::async_trait;

use crate::error::GatewayError;

pub mod discord;

pub use discord::{DiscordRest, DiscordSession};

/// A chat message as delivered by the gateway, mentions already rewritten
/// to `@name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub author_id: String,
    pub content: String,
}

/// Outbound operations the bot performs on the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), GatewayError>;

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), GatewayError>;

    async fn reply_to(&self, channel_id: &str, message_id: &str, text: &str) -> Result<(), GatewayError>;
}
