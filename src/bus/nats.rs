use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use super::{Bus, Delivery, Subscription};
use crate::config::Config;
use crate::error::BusError;
use crate::logging::{info, obj, v_str, Domain};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Core NATS transport (no JetStream): at-most-once delivery.
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Connect once; an unreachable server is an immediate error.
    pub async fn connect(cfg: &Config, name: &str) -> Result<Self, BusError> {
        let mut options = ConnectOptions::new()
            .name(name)
            .connection_timeout(CONNECT_TIMEOUT);
        if let (Some(user), Some(pass)) = (&cfg.nats_user, &cfg.nats_pass) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&cfg.nats_url)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;

        info(
            Domain::Bus,
            "connected",
            obj(&[("url", v_str(&cfg.nats_url)), ("client", v_str(name))]),
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BusError::Publish { subject: subject.to_string(), reason: e.to_string() })
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|e| BusError::Subscribe { pattern: pattern.to_string(), reason: e.to_string() })?;
        Ok(subscriber
            .map(|msg| Delivery { subject: msg.subject.to_string(), payload: msg.payload })
            .boxed())
    }
}
