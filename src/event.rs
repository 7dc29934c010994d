//! Request and response events exchanged over the bus.
//!
//! On the wire an event is a JSON object with exactly one populated key
//! naming the variant, e.g. `{"checked_karma": {...}}`. There is no request
//! id: a response carries its reply destination inline.

use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::subject::Subject;

/// Where a reaction acknowledgement goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactTo {
    pub channel_id: String,
    pub message_id: String,
}

/// Where a reply message goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    pub channel_id: String,
}

/// A subject's karma after a mutation or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub karma: i64,
}

impl Entry {
    pub fn new(name: impl Into<String>, karma: i64) -> Self {
        Self { name: name.into(), karma }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestChangeAnnounce {
    pub react_to: ReactTo,
    pub guild_id: String,
    pub no_announce: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBumpKarma {
    pub reply_to: ReplyTo,
    pub guild_id: String,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCheckKarma {
    pub reply_to: ReplyTo,
    pub guild_id: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCheckBoard {
    pub reply_to: ReplyTo,
    pub guild_id: String,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedAnnounce {
    pub react_to: ReactTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedKarma {
    pub reply_to: ReplyTo,
    pub announce: bool,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedKarma {
    pub reply_to: ReplyTo,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedBoard {
    pub reply_to: ReplyTo,
    pub board: Vec<Entry>,
}

/// One request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "Envelope")]
pub enum Event {
    RequestChangeAnnounce(RequestChangeAnnounce),
    RequestBumpKarma(RequestBumpKarma),
    RequestCheckKarma(RequestCheckKarma),
    RequestCheckLeaderboard(RequestCheckBoard),
    RequestCheckLoserboard(RequestCheckBoard),
    ChangedAnnounce(ChangedAnnounce),
    ChangedKarma(ChangedKarma),
    CheckedKarma(CheckedKarma),
    CheckedLeaderboard(CheckedBoard),
    CheckedLoserboard(CheckedBoard),
}

/// Decoding shape: every variant as an optional field. `null` counts as
/// absent, unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct Envelope {
    request_change_announce: Option<RequestChangeAnnounce>,
    request_bump_karma: Option<RequestBumpKarma>,
    request_check_karma: Option<RequestCheckKarma>,
    request_check_leaderboard: Option<RequestCheckBoard>,
    request_check_loserboard: Option<RequestCheckBoard>,
    changed_announce: Option<ChangedAnnounce>,
    changed_karma: Option<ChangedKarma>,
    checked_karma: Option<CheckedKarma>,
    checked_leaderboard: Option<CheckedBoard>,
    checked_loserboard: Option<CheckedBoard>,
}

impl TryFrom<Envelope> for Event {
    type Error = EventError;

    fn try_from(env: Envelope) -> Result<Self, Self::Error> {
        let populated: Vec<Event> = [
            env.request_change_announce.map(Event::RequestChangeAnnounce),
            env.request_bump_karma.map(Event::RequestBumpKarma),
            env.request_check_karma.map(Event::RequestCheckKarma),
            env.request_check_leaderboard.map(Event::RequestCheckLeaderboard),
            env.request_check_loserboard.map(Event::RequestCheckLoserboard),
            env.changed_announce.map(Event::ChangedAnnounce),
            env.changed_karma.map(Event::ChangedKarma),
            env.checked_karma.map(Event::CheckedKarma),
            env.checked_leaderboard.map(Event::CheckedLeaderboard),
            env.checked_loserboard.map(Event::CheckedLoserboard),
        ]
        .into_iter()
        .flatten()
        .collect();

        let count = populated.len();
        let mut populated = populated.into_iter();
        match (populated.next(), count) {
            (Some(event), 1) => Ok(event),
            _ => Err(EventError::Malformed { populated: count }),
        }
    }
}

impl Event {
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Event::RequestChangeAnnounce(_)
                | Event::RequestBumpKarma(_)
                | Event::RequestCheckKarma(_)
                | Event::RequestCheckLeaderboard(_)
                | Event::RequestCheckLoserboard(_)
        )
    }

    /// Topic a response is published under. Requests share a single
    /// configured destination and have no topic.
    pub fn topic(&self) -> Option<&'static str> {
        match self {
            Event::ChangedAnnounce(_) => Some("changed.announce"),
            Event::ChangedKarma(_) => Some("changed.karma"),
            Event::CheckedKarma(_) => Some("checked.karma"),
            Event::CheckedLeaderboard(_) => Some("checked.leaderboard"),
            Event::CheckedLoserboard(_) => Some("checked.loserboard"),
            _ => None,
        }
    }

    /// Wire name of the variant, as used for the envelope key.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RequestChangeAnnounce(_) => "request_change_announce",
            Event::RequestBumpKarma(_) => "request_bump_karma",
            Event::RequestCheckKarma(_) => "request_check_karma",
            Event::RequestCheckLeaderboard(_) => "request_check_leaderboard",
            Event::RequestCheckLoserboard(_) => "request_check_loserboard",
            Event::ChangedAnnounce(_) => "changed_announce",
            Event::ChangedKarma(_) => "changed_karma",
            Event::CheckedKarma(_) => "checked_karma",
            Event::CheckedLeaderboard(_) => "checked_leaderboard",
            Event::CheckedLoserboard(_) => "checked_loserboard",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| EventError::Encode(e.to_string()))
    }

    pub fn decode(payload: &[u8]) -> Result<Self, EventError> {
        // Distinguish cardinality errors from plain syntax errors: serde
        // wraps our TryFrom error into a generic message.
        let env: Envelope = serde_json::from_slice(payload)?;
        Event::try_from(env)
    }
}
