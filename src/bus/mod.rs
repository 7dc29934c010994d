//! Publish/subscribe transport for event envelopes.
//!
//! Delivery is best effort: nothing is persisted or acknowledged, and a
//! payload published while no subscriber matches is gone.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::BusError;
use crate::event::Event;

pub mod local;
pub mod nats;

pub use local::LocalBus;
pub use nats::NatsBus;

/// Subject patterns the front-end listens on for responses.
pub const RESPONSE_PATTERNS: &[&str] = &["checked.*", "changed.*"];

/// One payload received from the bus.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub subject: String,
    pub payload: Bytes,
}

pub type Subscription = BoxStream<'static, Delivery>;

#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;

    /// Stream of deliveries whose subject matches `pattern`.
    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError>;
}

/// Encode `event` and publish it to `subject`.
pub async fn publish_event(bus: &dyn Bus, subject: &str, event: &Event) -> anyhow::Result<()> {
    let payload = event.encode()?;
    bus.publish(subject, Bytes::from(payload)).await?;
    Ok(())
}

/// Publish a response under its own topic.
pub async fn publish_response(bus: &dyn Bus, event: &Event) -> anyhow::Result<()> {
    let topic = event
        .topic()
        .ok_or_else(|| anyhow::anyhow!("{} is not a response", event.name()))?;
    publish_event(bus, topic, event).await
}

/// NATS-style subject match: `*` matches one token, a trailing `>` matches
/// one or more tokens.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pat = pattern.split('.');
    let mut sub = subject.split('.');
    loop {
        match (pat.next(), sub.next()) {
            (Some(">"), Some(_)) => return pat.next().is_none(),
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_one_token() {
        assert!(subject_matches("checked.*", "checked.karma"));
        assert!(subject_matches("changed.*", "changed.announce"));
        assert!(!subject_matches("checked.*", "checked"));
        assert!(!subject_matches("checked.*", "checked.karma.extra"));
        assert!(!subject_matches("checked.*", "changed.karma"));
    }

    #[test]
    fn literal_and_tail_patterns() {
        assert!(subject_matches("requests", "requests"));
        assert!(!subject_matches("requests", "requests.x"));
        assert!(subject_matches("checked.>", "checked.karma.extra"));
        assert!(!subject_matches("checked.>", "checked"));
    }
}
