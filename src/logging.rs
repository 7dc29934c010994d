//! Structured JSON-lines logging.
//!
//! Every record is one JSON object on stdout:
//! `{ts, seq, lvl, component, event, msg, <correlation keys>, data}`.
//! When `LOG_DIR` is set the same lines are mirrored to
//! `$LOG_DIR/events.jsonl` (trace/debug go to `trace.jsonl`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_LEVEL").as_deref().unwrap_or("info"))
    }

    fn parse(s: &str) -> Self {
        match s {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "warn" => Level::Warn,
            "error" => Level::Error,
            "fatal" => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Gateway, // Chat session, inbound messages, outbound calls
    Bus,     // Publish / subscribe
    Command, // Routing and argument parsing
    Ledger,  // Karma mutations and queries
    Event,   // Envelope encode / decode
    System,  // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Gateway => "gateway",
            Domain::Bus => "bus",
            Domain::Command => "command",
            Domain::Ledger => "ledger",
            Domain::Event => "event",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domain_listed(domains, self.as_str()),
        }
    }
}

fn domain_listed(list: &str, domain: &str) -> bool {
    list.split(',').any(|d| d.trim() == domain)
}

// =============================================================================
// Sinks
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static FILE_SINK: OnceLock<Option<FileSink>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

struct FileSink {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn open_append(path: PathBuf) -> Option<BufWriter<File>> {
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => Some(BufWriter::new(f)),
        Err(err) => {
            eprintln!("[log] failed to open {}: {}", path.display(), err);
            None
        }
    }
}

fn file_sink() -> Option<&'static FileSink> {
    FILE_SINK
        .get_or_init(|| {
            let dir = PathBuf::from(std::env::var("LOG_DIR").ok()?);
            if let Err(err) = create_dir_all(&dir) {
                eprintln!("[log] failed to create log dir: {}", err);
                return None;
            }
            Some(FileSink {
                events: Mutex::new(open_append(dir.join("events.jsonl"))?),
                trace: Mutex::new(open_append(dir.join("trace.jsonl"))?),
            })
        })
        .as_ref()
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["token", "authorization", "Authorization", "password"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["guild_id", "channel_id", "message_id", "subject", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = render_record(level, domain.as_str(), event, fields);
    if let Some(sink) = file_sink() {
        match level {
            Level::Trace | Level::Debug => write_line(&sink.trace, &line),
            _ => write_line(&sink.events, &line),
        }
    }
    println!("{}", line);
}

fn render_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) -> String {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

pub fn info(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Info, domain, event, fields);
}

pub fn warn(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Warn, domain, event, fields);
}

pub fn error(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Error, domain, event, fields);
}

pub fn debug(domain: Domain, event: &str, fields: Map<String, Value>) {
    log(Level::Debug, domain, event, fields);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

/// A gateway or bus call failed. Logged and dropped; nothing is retried.
pub fn log_transport_failure(domain: Domain, operation: &str, err: &dyn std::fmt::Display) {
    error(
        domain,
        "transport_failure",
        obj(&[("operation", v_str(operation)), ("msg", v_str(&err.to_string()))]),
    );
}

/// An inbound envelope could not be used and was discarded.
pub fn log_discarded_event(subject: &str, err: &dyn std::fmt::Display) {
    warn(
        Domain::Event,
        "discarded",
        obj(&[("subject", v_str(subject)), ("msg", v_str(&err.to_string()))]),
    );
}

pub fn log_karma_changed(guild_id: &str, name: &str, delta: i64, karma: i64) {
    info(
        Domain::Ledger,
        "karma_changed",
        obj(&[
            ("guild_id", v_str(guild_id)),
            ("name", v_str(name)),
            ("delta", v_int(delta)),
            ("karma", v_int(karma)),
        ]),
    );
}

pub fn log_rejected_args(kind: &str, channel_id: &str, err: &dyn std::fmt::Display) {
    debug(
        Domain::Command,
        "rejected_args",
        obj(&[
            ("kind", v_str(kind)),
            ("channel_id", v_str(channel_id)),
            ("msg", v_str(&err.to_string())),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_int(n: i64) -> Value {
    Value::from(n)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_unknown_level_defaults_to_info() {
        assert_eq!(Level::parse("verbose"), Level::Info);
        assert_eq!(Level::parse("warn"), Level::Warn);
    }

    #[test]
    fn test_domain_list() {
        assert!(domain_listed("bus, ledger", "ledger"));
        assert!(!domain_listed("bus,ledger", "gateway"));
    }

    #[test]
    fn test_record_shape() {
        let line = render_record(
            Level::Warn,
            "bus",
            "publish",
            obj(&[
                ("guild_id", v_str("g1")),
                ("msg", v_str("boom")),
                ("token", v_str("secret")),
                ("attempt", v_int(1)),
            ]),
        );
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["lvl"], "WARN");
        assert_eq!(v["component"], "bus");
        assert_eq!(v["guild_id"], "g1");
        assert_eq!(v["msg"], "boom");
        assert_eq!(v["data"]["token"], "[REDACTED]");
        assert_eq!(v["data"]["attempt"], 1);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
