//! Argument parsers for each command kind.

use crate::error::ArgError;
use crate::router::{Kind, Mux};
use crate::subject::{merge_subjects, parse_subjects, resolve_name, Subject};

/// Number of board entries listed when no limit is given.
pub const DEFAULT_BOARD_LIMIT: u32 = 10;

/// A fully parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Announce(bool),
    BumpKarma(Vec<Subject>),
    CheckKarma(Vec<String>),
    Leaderboard(u32),
    Loserboard(u32),
}

/// `on`/`yes` turn announcements on, `off`/`no` turn them off.
pub fn parse_announce_args(body: &str) -> Result<bool, ArgError> {
    let arg = body.trim().to_lowercase();
    if arg.is_empty() {
        return Err(ArgError::MissingArgument);
    }
    if arg.starts_with("on") || arg.starts_with("yes") {
        Ok(true)
    } else if arg.starts_with("off") || arg.starts_with("no") {
        Ok(false)
    } else {
        Err(ArgError::InvalidArgument(format!("{:?} is not an announce setting", body.trim())))
    }
}

/// Net karma changes mentioned in `body`; empty when nothing changes.
pub fn parse_bump_karma_args(body: &str) -> Vec<Subject> {
    merge_subjects(parse_subjects(body))
}

/// Names to look up, in the order given. Duplicates are kept.
pub fn parse_karma_args(body: &str) -> Result<Vec<String>, ArgError> {
    let names: Vec<String> = body
        .split_whitespace()
        .map(|w| resolve_name(w).to_string())
        .collect();
    if names.is_empty() {
        return Err(ArgError::MissingArgument);
    }
    Ok(names)
}

pub fn parse_leaderboard_args(body: &str) -> Result<u32, ArgError> {
    parse_board_limit(body, DEFAULT_BOARD_LIMIT)
}

pub fn parse_loserboard_args(body: &str) -> Result<u32, ArgError> {
    parse_board_limit(body, DEFAULT_BOARD_LIMIT)
}

/// Optional positive limit as the first word of `body`.
pub fn parse_board_limit(body: &str, default: u32) -> Result<u32, ArgError> {
    let Some(arg) = body.split_whitespace().next() else {
        return Ok(default);
    };
    match arg.parse::<i64>() {
        Ok(n) if n > 0 => u32::try_from(n)
            .map_err(|_| ArgError::InvalidArgument(format!("{} is too large", n))),
        _ => Err(ArgError::InvalidArgument(format!(
            "{:?} is not a positive non-zero integer",
            arg
        ))),
    }
}

/// Router plus argument parsing in one step.
#[derive(Debug, Clone)]
pub struct CommandParser {
    mux: Mux,
    default_limit: u32,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            mux: Mux::new(prefix),
            default_limit: DEFAULT_BOARD_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    /// Route `text` and parse its body. The kind is returned on failure too
    /// so the caller can pick the right usage hint.
    pub fn parse(&self, text: &str) -> Result<Command, (Kind, ArgError)> {
        let (kind, body) = self.mux.route(text);
        let with_kind = |e| (kind, e);
        match kind {
            Kind::Announce => parse_announce_args(body).map(Command::Announce).map_err(with_kind),
            Kind::BumpKarma => Ok(Command::BumpKarma(parse_bump_karma_args(body))),
            Kind::Karma => parse_karma_args(body).map(Command::CheckKarma).map_err(with_kind),
            Kind::Leaderboard => parse_board_limit(body, self.default_limit)
                .map(Command::Leaderboard)
                .map_err(with_kind),
            Kind::Loserboard => parse_board_limit(body, self.default_limit)
                .map(Command::Loserboard)
                .map_err(with_kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_accepts_on_and_off_words() {
        assert_eq!(parse_announce_args(" on"), Ok(true));
        assert_eq!(parse_announce_args("YES please"), Ok(true));
        assert_eq!(parse_announce_args(" Off "), Ok(false));
        assert_eq!(parse_announce_args("no"), Ok(false));
    }

    #[test]
    fn announce_rejects_missing_and_unknown() {
        assert_eq!(parse_announce_args("   "), Err(ArgError::MissingArgument));
        assert!(matches!(parse_announce_args(" maybe"), Err(ArgError::InvalidArgument(_))));
    }

    #[test]
    fn karma_args_resolve_mentions_and_keep_duplicates() {
        assert_eq!(
            parse_karma_args(" @alice bob  alice"),
            Ok(vec!["alice".to_string(), "bob".to_string(), "alice".to_string()])
        );
        assert_eq!(parse_karma_args(" "), Err(ArgError::MissingArgument));
    }

    #[test]
    fn board_limit() {
        assert_eq!(parse_leaderboard_args(""), Ok(10));
        assert_eq!(parse_leaderboard_args("3"), Ok(3));
        assert_eq!(parse_loserboard_args(" 25 extra words"), Ok(25));
        assert!(matches!(parse_leaderboard_args("-1"), Err(ArgError::InvalidArgument(_))));
        assert!(matches!(parse_leaderboard_args("0"), Err(ArgError::InvalidArgument(_))));
        assert!(matches!(parse_loserboard_args("ten"), Err(ArgError::InvalidArgument(_))));
        assert!(matches!(
            parse_loserboard_args("99999999999"),
            Err(ArgError::InvalidArgument(_))
        ));
    }

    #[test]
    fn bump_args_merge() {
        assert_eq!(
            parse_bump_karma_args("alice++ @alice++ bob++ bob--"),
            vec![Subject::new("alice", 2)]
        );
    }

    #[test]
    fn parser_combines_route_and_args() {
        let p = CommandParser::new("@popple").with_default_limit(5);
        assert_eq!(p.parse("@popple top"), Ok(Command::Leaderboard(5)));
        assert_eq!(p.parse("@popple bot 2"), Ok(Command::Loserboard(2)));
        assert_eq!(p.parse("@popple announce off"), Ok(Command::Announce(false)));
        assert_eq!(
            p.parse("@popple karma @rust"),
            Ok(Command::CheckKarma(vec!["rust".to_string()]))
        );
        assert_eq!(
            p.parse("rust++"),
            Ok(Command::BumpKarma(vec![Subject::new("rust", 1)]))
        );
        assert_eq!(p.parse("@popple top -3").unwrap_err().0, Kind::Leaderboard);
        assert_eq!(
            p.parse("@popple karma"),
            Err((Kind::Karma, ArgError::MissingArgument))
        );
    }
}
