//! Error types shared across the command pipeline.

/// Failure to interpret the arguments of a chat command.
///
/// These never leave the front-end: they are turned into a reaction or a
/// usage hint on the triggering message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("missing argument")]
    MissingArgument,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failure to decode or encode an event envelope.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed envelope: expected exactly one populated field, found {populated}")]
    Malformed { populated: usize },

    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

/// Failure talking to the message bus.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("subscribe to {pattern} failed: {reason}")]
    Subscribe { pattern: String, reason: String },
}

/// Failure talking to the chat gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}
