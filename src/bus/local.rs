use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use super::{subject_matches, Bus, Delivery, Subscription};
use crate::error::BusError;

struct Subscriber {
    pattern: String,
    tx: mpsc::UnboundedSender<Delivery>,
}

/// In-process bus. Each subscription gets its own unbounded queue.
#[derive(Clone, Default)]
pub struct LocalBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Subscriber>>, String> {
        self.subscribers.lock().map_err(|_| "subscriber table poisoned".to_string())
    }
}

#[async_trait]
impl Bus for LocalBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        let mut subs = self.lock().map_err(|reason| BusError::Publish {
            subject: subject.to_string(),
            reason,
        })?;
        // Dropped subscriptions are pruned as we go.
        subs.retain(|s| {
            if !subject_matches(&s.pattern, subject) {
                return !s.tx.is_closed();
            }
            s.tx
                .send(Delivery { subject: subject.to_string(), payload: payload.clone() })
                .is_ok()
        });
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock()
            .map_err(|reason| BusError::Subscribe { pattern: pattern.to_string(), reason })?
            .push(Subscriber { pattern: pattern.to_string(), tx });
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|d| (d, rx)) }).boxed())
    }
}
