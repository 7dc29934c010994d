//! Chat front-end: turns inbound messages into request events and response
//! events into chat output.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::args::{Command, CommandParser};
use crate::bus::{publish_event, Bus, RESPONSE_PATTERNS};
use crate::error::ArgError;
use crate::event::{
    Event, ReactTo, ReplyTo, RequestBumpKarma, RequestChangeAnnounce, RequestCheckBoard,
    RequestCheckKarma,
};
use crate::gateway::{ChatGateway, InboundMessage};
use crate::logging::{
    debug, info, log_discarded_event, log_rejected_args, log_transport_failure, obj, v_str, Domain,
};
use crate::render::{
    board_text, levels_text, Rendering, ANNOUNCE_USAGE, EMOJI_CONFUSED, LIMIT_USAGE,
};
use crate::router::Kind;
use crate::shutdown::Shutdown;

pub struct Frontend {
    parser: CommandParser,
    gateway: Arc<dyn ChatGateway>,
    bus: Arc<dyn Bus>,
    request_subject: String,
}

impl Frontend {
    pub fn new(
        parser: CommandParser,
        gateway: Arc<dyn ChatGateway>,
        bus: Arc<dyn Bus>,
        request_subject: impl Into<String>,
    ) -> Self {
        Self {
            parser,
            gateway,
            bus,
            request_subject: request_subject.into(),
        }
    }

    /// Build the request for `msg`, or answer bad input directly.
    /// Returns the request that was published, if any.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Option<Event> {
        let command = match self.parser.parse(&msg.content) {
            Ok(command) => command,
            Err((kind, err)) => {
                log_rejected_args(kind.as_str(), &msg.channel_id, &err);
                self.reject(msg, kind, &err).await;
                return None;
            }
        };

        let guild_id = msg.guild_id.clone();
        let reply_to = ReplyTo { channel_id: msg.channel_id.clone() };
        let request = match command {
            Command::Announce(on) => Event::RequestChangeAnnounce(RequestChangeAnnounce {
                react_to: ReactTo {
                    channel_id: msg.channel_id.clone(),
                    message_id: msg.message_id.clone(),
                },
                guild_id,
                no_announce: !on,
            }),
            Command::BumpKarma(subjects) if subjects.is_empty() => return None,
            Command::BumpKarma(subjects) => {
                Event::RequestBumpKarma(RequestBumpKarma { reply_to, guild_id, subjects })
            }
            Command::CheckKarma(names) => {
                Event::RequestCheckKarma(RequestCheckKarma { reply_to, guild_id, names })
            }
            Command::Leaderboard(limit) => {
                Event::RequestCheckLeaderboard(RequestCheckBoard { reply_to, guild_id, limit })
            }
            Command::Loserboard(limit) => {
                Event::RequestCheckLoserboard(RequestCheckBoard { reply_to, guild_id, limit })
            }
        };

        if let Err(err) = publish_event(self.bus.as_ref(), &self.request_subject, &request).await {
            log_transport_failure(Domain::Bus, "publish_request", &err);
            return None;
        }
        debug(
            Domain::Command,
            "request_published",
            obj(&[("kind", v_str(request.name())), ("guild_id", v_str(&msg.guild_id))]),
        );
        Some(request)
    }

    async fn reject(&self, msg: &InboundMessage, kind: Kind, err: &ArgError) {
        match kind {
            Kind::Announce => {
                self.react(&msg.channel_id, &msg.message_id, EMOJI_CONFUSED).await;
                self.reply(&msg.channel_id, &msg.message_id, ANNOUNCE_USAGE).await;
            }
            Kind::Leaderboard | Kind::Loserboard if matches!(err, ArgError::InvalidArgument(_)) => {
                self.send(&msg.channel_id, LIMIT_USAGE).await;
            }
            _ => self.react(&msg.channel_id, &msg.message_id, EMOJI_CONFUSED).await,
        }
    }

    /// Render one response event.
    pub async fn handle_response(&self, event: Event) {
        match Rendering::for_event(event) {
            Some(Rendering::React { channel_id, message_id, emoji }) => {
                self.react(&channel_id, &message_id, emoji).await
            }
            Some(Rendering::Levels { channel_id, entries }) => {
                self.send(&channel_id, &levels_text(&entries)).await
            }
            Some(Rendering::Board { channel_id, entries }) => {
                self.send(&channel_id, &board_text(&entries)).await
            }
            None => {}
        }
    }

    async fn send(&self, channel_id: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(err) = self.gateway.send_message(channel_id, text).await {
            log_transport_failure(Domain::Gateway, "send_message", &err);
        }
    }

    async fn reply(&self, channel_id: &str, message_id: &str, text: &str) {
        if let Err(err) = self.gateway.reply_to(channel_id, message_id, text).await {
            log_transport_failure(Domain::Gateway, "reply_to", &err);
        }
    }

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) {
        if let Err(err) = self.gateway.add_reaction(channel_id, message_id, emoji).await {
            log_transport_failure(Domain::Gateway, "add_reaction", &err);
        }
    }

    /// Handle each inbound message on its own task until shutdown.
    pub async fn run_inbound(self: Arc<Self>, mut inbound: mpsc::Receiver<InboundMessage>, mut shutdown: Shutdown) {
        info(Domain::System, "publisher_started", obj(&[]));
        loop {
            let msg = tokio::select! {
                _ = shutdown.wait() => break,
                msg = inbound.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let frontend = self.clone();
            tokio::spawn(async move {
                frontend.handle_message(&msg).await;
            });
        }
        info(Domain::System, "publisher_stopped", obj(&[]));
    }

    /// Drain response events one at a time until shutdown.
    pub async fn run_responses(&self, mut shutdown: Shutdown) -> anyhow::Result<()> {
        let mut subscriptions = Vec::new();
        for pattern in RESPONSE_PATTERNS {
            subscriptions.push(self.bus.subscribe(pattern).await?);
        }
        let mut responses = stream::select_all(subscriptions);
        info(Domain::System, "consumer_started", obj(&[]));

        loop {
            let delivery = tokio::select! {
                _ = shutdown.wait() => break,
                next = responses.next() => match next {
                    Some(d) => d,
                    None => {
                        info(Domain::Bus, "response_stream_closed", obj(&[]));
                        break;
                    }
                },
            };
            match Event::decode(&delivery.payload) {
                Ok(event) if !event.is_request() => self.handle_response(event).await,
                Ok(event) => log_discarded_event(
                    &delivery.subject,
                    &format!("unexpected request {}", event.name()),
                ),
                Err(err) => log_discarded_event(&delivery.subject, &err),
            }
        }

        info(Domain::System, "consumer_stopped", obj(&[]));
        Ok(())
    }
}
