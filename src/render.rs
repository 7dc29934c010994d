//! What to show for a response event, and the text templates for it.

use std::fmt::Write;

use crate::event::{ChangedKarma, CheckedBoard, CheckedKarma, Entry, Event};

/// Reaction acknowledging a completed setting change.
pub const EMOJI_ACK: &str = "✅";
/// Reaction flagging a command the bot could not understand.
pub const EMOJI_CONFUSED: &str = "❓";

pub const ANNOUNCE_USAGE: &str = r#"Valid announce settings are: "on", "off", "yes", "no""#;
pub const LIMIT_USAGE: &str = "The number of entries to list must be a positive non-zero integer";

/// The kind of output a response calls for, with its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    /// One line per subject.
    Levels { channel_id: String, entries: Vec<Entry> },
    /// Ranked listing.
    Board { channel_id: String, entries: Vec<Entry> },
    /// Reaction on the originating message.
    React { channel_id: String, message_id: String, emoji: &'static str },
}

impl Rendering {
    /// `None` for requests and for karma changes the guild asked not to see.
    pub fn for_event(event: Event) -> Option<Self> {
        match event {
            Event::ChangedAnnounce(rsp) => Some(Rendering::React {
                channel_id: rsp.react_to.channel_id,
                message_id: rsp.react_to.message_id,
                emoji: EMOJI_ACK,
            }),
            Event::ChangedKarma(ChangedKarma { announce: false, .. }) => None,
            Event::ChangedKarma(ChangedKarma { reply_to, entries, .. })
            | Event::CheckedKarma(CheckedKarma { reply_to, entries }) => {
                Some(Rendering::Levels { channel_id: reply_to.channel_id, entries })
            }
            Event::CheckedLeaderboard(CheckedBoard { reply_to, board })
            | Event::CheckedLoserboard(CheckedBoard { reply_to, board }) => {
                Some(Rendering::Board { channel_id: reply_to.channel_id, entries: board })
            }
            _ => None,
        }
    }
}

pub fn levels_text(entries: &[Entry]) -> String {
    let lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{} has {} karma.", e.name, e.karma))
        .collect();
    lines.join(" ")
}

pub fn board_text(entries: &[Entry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "* {} has {} karma.", e.name, e.karma);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChangedAnnounce, ReactTo, ReplyTo};

    fn reply() -> ReplyTo {
        ReplyTo { channel_id: "c".into() }
    }

    #[test]
    fn level_and_board_text() {
        let entries = vec![Entry::new("alice", 3), Entry::new("bob", -1)];
        assert_eq!(levels_text(&entries), "alice has 3 karma. bob has -1 karma.");
        assert_eq!(board_text(&entries), "* alice has 3 karma.\n* bob has -1 karma.\n");
        assert_eq!(board_text(&[]), "");
    }

    #[test]
    fn silent_karma_change_renders_nothing() {
        let event = Event::ChangedKarma(ChangedKarma {
            reply_to: reply(),
            announce: false,
            entries: vec![Entry::new("a", 1)],
        });
        assert_eq!(Rendering::for_event(event), None);
    }

    #[test]
    fn announce_change_is_a_reaction() {
        let event = Event::ChangedAnnounce(ChangedAnnounce {
            react_to: ReactTo { channel_id: "c".into(), message_id: "m".into() },
        });
        assert_eq!(
            Rendering::for_event(event),
            Some(Rendering::React { channel_id: "c".into(), message_id: "m".into(), emoji: EMOJI_ACK })
        );
    }

    #[test]
    fn boards_keep_order() {
        let event = Event::CheckedLoserboard(CheckedBoard {
            reply_to: reply(),
            board: vec![Entry::new("z", -4), Entry::new("a", 1)],
        });
        assert_eq!(
            Rendering::for_event(event),
            Some(Rendering::Board {
                channel_id: "c".into(),
                entries: vec![Entry::new("z", -4), Entry::new("a", 1)],
            })
        );
    }
}
