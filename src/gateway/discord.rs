//! Discord adapter: REST for outbound calls, a gateway WebSocket session for
//! inbound messages.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{ChatGateway, InboundMessage};
use crate::error::GatewayError;
use crate::logging::{debug, info, log_transport_failure, obj, v_str, Domain};
use crate::shutdown::Shutdown;

// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 15);

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;

// =============================================================================
// REST
// =============================================================================

/// Outbound calls over the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    base: String,
    token: String,
}

impl DiscordRest {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
            token: token.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn post_message(&self, channel_id: &str, body: Value) -> Result<(), GatewayError> {
        let url = endpoint(&self.base, &["channels", channel_id, "messages"])?;
        let resp = self
            .client
            .post(url)
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await?;
        check_status(resp).await
    }
}

/// Message body that threads `text` under an existing message.
fn reply_body(message_id: &str, text: &str) -> Value {
    json!({ "content": text, "message_reference": { "message_id": message_id } })
}

/// Build `base/<segments...>`, percent-encoding each segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = Url::parse(base).map_err(|e| GatewayError::Protocol(format!("bad API base: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::Protocol("API base cannot have a path".into()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(resp: reqwest::Response) -> Result<(), GatewayError> {
    if resp.status().is_success() {
        return Ok(());
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Rejected { status, body })
}

#[async_trait]
impl ChatGateway for DiscordRest {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), GatewayError> {
        self.post_message(channel_id, json!({ "content": text })).await
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<(), GatewayError> {
        let url = endpoint(
            &self.base,
            &["channels", channel_id, "messages", message_id, "reactions", emoji, "@me"],
        )?;
        let resp = self
            .client
            .put(url)
            .header("Authorization", self.auth())
            .header("Content-Length", "0")
            .send()
            .await?;
        check_status(resp).await
    }

    async fn reply_to(&self, channel_id: &str, message_id: &str, text: &str) -> Result<(), GatewayError> {
        self.post_message(channel_id, reply_body(message_id, text)).await
    }
}

// =============================================================================
// Gateway payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<i64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct Ready {
    user: User,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    author: User,
    #[serde(default)]
    content: String,
    #[serde(default)]
    mentions: Vec<User>,
}

/// Rewrite `<@id>` and `<@!id>` user mentions to `@username`.
pub fn replace_mentions(content: &str, mentions: &[User]) -> String {
    let mut out = content.to_string();
    for user in mentions {
        let name = format!("@{}", user.username);
        out = out
            .replace(&format!("<@{}>", user.id), &name)
            .replace(&format!("<@!{}>", user.id), &name);
    }
    out
}

/// Keep guild messages from anyone but the bot itself.
fn to_inbound(msg: MessageCreate, bot_id: &str) -> Option<InboundMessage> {
    if msg.author.id == bot_id {
        return None;
    }
    let guild_id = msg.guild_id.filter(|g| !g.is_empty())?;
    let content = replace_mentions(&msg.content, &msg.mentions).trim().to_string();
    Some(InboundMessage {
        guild_id,
        channel_id: msg.channel_id,
        message_id: msg.id,
        author_id: msg.author.id,
        content,
    })
}

fn heartbeat_frame(seq: i64) -> Message {
    let d = if seq < 0 { Value::Null } else { json!(seq) };
    Message::Text(json!({ "op": OP_HEARTBEAT, "d": d }).to_string())
}

fn identify_frame(token: &str) -> Message {
    Message::Text(
        json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": token,
                "intents": INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "popple",
                    "device": "popple",
                },
            },
        })
        .to_string(),
    )
}

// =============================================================================
// Session
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An identified gateway connection. Dropping it stops its background tasks.
pub struct DiscordSession {
    read: SplitStream<WsStream>,
    out: mpsc::UnboundedSender<Message>,
    seq: Arc<AtomicI64>,
    user: User,
    tasks: Vec<JoinHandle<()>>,
}

impl DiscordSession {
    /// Connect, start heartbeating, identify, and wait for READY.
    pub async fn connect(gateway_url: &str, token: &str) -> Result<Self, GatewayError> {
        let (ws, _) = tokio_tungstenite::connect_async(gateway_url).await?;
        let (mut write, mut read) = ws.split();

        let hello: Hello = loop {
            let payload = next_payload(&mut read)
                .await?
                .ok_or_else(|| GatewayError::Protocol("closed before HELLO".into()))?;
            if payload.op == OP_HELLO {
                break serde_json::from_value(payload.d)
                    .map_err(|e| GatewayError::Protocol(format!("bad HELLO: {}", e)))?;
            }
        };

        let (out, mut rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(err) = write.send(msg).await {
                    log_transport_failure(Domain::Gateway, "ws_write", &err);
                    break;
                }
            }
        });

        let seq = Arc::new(AtomicI64::new(-1));
        let interval = Duration::from_millis(hello.heartbeat_interval);
        let first_beat = interval.mul_f64(rand::random::<f64>());
        let beat_out = out.clone();
        let beat_seq = seq.clone();
        let heartbeat = tokio::spawn(async move {
            sleep(first_beat).await;
            loop {
                if beat_out.send(heartbeat_frame(beat_seq.load(Ordering::SeqCst))).is_err() {
                    break;
                }
                sleep(interval).await;
            }
        });

        let tasks = vec![writer, heartbeat];
        let send_identify = out.send(identify_frame(token));
        if send_identify.is_err() {
            tasks.iter().for_each(|t| t.abort());
            return Err(GatewayError::Protocol("writer stopped before IDENTIFY".into()));
        }

        let mut session = Self {
            read,
            out,
            seq,
            user: User { id: String::new(), username: String::new() },
            tasks,
        };

        loop {
            let payload = session
                .next_frame()
                .await?
                .ok_or_else(|| GatewayError::Protocol("closed before READY".into()))?;
            if payload.op == OP_DISPATCH && payload.t.as_deref() == Some("READY") {
                let ready: Ready = serde_json::from_value(payload.d)
                    .map_err(|e| GatewayError::Protocol(format!("bad READY: {}", e)))?;
                session.user = ready.user;
                break;
            }
        }

        info(
            Domain::Gateway,
            "ready",
            obj(&[("user", v_str(&session.user.username)), ("user_id", v_str(&session.user.id))]),
        );
        Ok(session)
    }

    /// The bot's own account.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Next payload, with sequence tracking and control opcodes handled.
    async fn next_frame(&mut self) -> Result<Option<GatewayPayload>, GatewayError> {
        let Some(payload) = next_payload(&mut self.read).await? else {
            return Ok(None);
        };
        if let Some(s) = payload.s {
            self.seq.store(s, Ordering::SeqCst);
        }
        match payload.op {
            OP_HEARTBEAT => {
                let _ = self.out.send(heartbeat_frame(self.seq.load(Ordering::SeqCst)));
            }
            OP_RECONNECT | OP_INVALID_SESSION => {
                return Err(GatewayError::Protocol(format!("session ended by server (op {})", payload.op)));
            }
            _ => {}
        }
        Ok(Some(payload))
    }

    /// Next guild message not authored by the bot. `None` when the
    /// connection closes.
    pub async fn next_message(&mut self) -> Result<Option<InboundMessage>, GatewayError> {
        while let Some(payload) = self.next_frame().await? {
            if payload.op != OP_DISPATCH || payload.t.as_deref() != Some("MESSAGE_CREATE") {
                continue;
            }
            match serde_json::from_value::<MessageCreate>(payload.d) {
                Ok(msg) => {
                    if let Some(inbound) = to_inbound(msg, &self.user.id) {
                        return Ok(Some(inbound));
                    }
                }
                Err(err) => debug(
                    Domain::Gateway,
                    "unparsed_message",
                    obj(&[("msg", v_str(&err.to_string()))]),
                ),
            }
        }
        Ok(None)
    }

    /// Forward inbound messages into `sender` until shutdown or disconnect.
    pub async fn run(mut self, sender: mpsc::Sender<InboundMessage>, mut shutdown: Shutdown) -> Result<(), GatewayError> {
        loop {
            let next = tokio::select! {
                _ = shutdown.wait() => return Ok(()),
                next = self.next_message() => next?,
            };
            let Some(msg) = next else {
                info(Domain::Gateway, "disconnected", obj(&[]));
                return Ok(());
            };
            if sender.send(msg).await.is_err() {
                return Ok(());
            }
        }
    }
}

impl Drop for DiscordSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn next_payload(read: &mut SplitStream<WsStream>) -> Result<Option<GatewayPayload>, GatewayError> {
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<GatewayPayload>(&text) {
                Ok(payload) => return Ok(Some(payload)),
                Err(err) => debug(Domain::Gateway, "bad_frame", obj(&[("msg", v_str(&err.to_string()))])),
            },
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}
