//! Classification of chat text into command kinds.

/// The command a piece of chat text asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Announce,
    BumpKarma,
    Karma,
    Leaderboard,
    Loserboard,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Announce => "announce",
            Kind::BumpKarma => "bump_karma",
            Kind::Karma => "karma",
            Kind::Leaderboard => "leaderboard",
            Kind::Loserboard => "loserboard",
        }
    }
}

const KEYWORDS: &[(&str, Kind)] = &[
    ("announce", Kind::Announce),
    ("karma", Kind::Karma),
    ("top", Kind::Leaderboard),
    ("bot", Kind::Loserboard),
];

/// Routes text addressed to the bot by its mention prefix.
#[derive(Debug, Clone)]
pub struct Mux {
    prefix: String,
}

impl Mux {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Split `text` into the command kind and its unconsumed body.
    ///
    /// Text without the prefix is a bare karma adjustment and comes back
    /// whole. After the prefix at most one space may precede the keyword,
    /// and the keyword must end the text or be followed by whitespace. The
    /// body of a keyword route is everything after the keyword, leading
    /// whitespace included. An unmatched keyword yields `BumpKarma` with
    /// the prefix-stripped text.
    pub fn route<'a>(&self, text: &'a str) -> (Kind, &'a str) {
        let Some(rest) = text.strip_prefix(self.prefix.as_str()) else {
            return (Kind::BumpKarma, text);
        };

        let candidate = rest.strip_prefix(' ').unwrap_or(rest);
        for (keyword, kind) in KEYWORDS {
            if let Some(body) = candidate.strip_prefix(keyword) {
                if body.is_empty() || body.starts_with(char::is_whitespace) {
                    return (*kind, body);
                }
            }
        }

        (Kind::BumpKarma, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prefix_is_stripped_from_message() {
        let mux = Mux::new("@colt");
        let (kind, body) = mux.route("@colt announce on");
        assert_eq!(kind, Kind::Announce);
        assert_eq!(body, " on");
    }

    #[test]
    fn keyword_routes() {
        assert_eq!(Mux::new("bull").route("bull announce").0, Kind::Announce);
        assert_eq!(Mux::new("goat").route("goat karma").0, Kind::Karma);
        assert_eq!(Mux::new("hare").route("hare top").0, Kind::Leaderboard);
        assert_eq!(Mux::new("mule").route("mule bot").0, Kind::Loserboard);
    }

    #[test]
    fn keyword_directly_after_prefix() {
        let (kind, body) = Mux::new("@colt").route("@colttop 3");
        assert_eq!(kind, Kind::Leaderboard);
        assert_eq!(body, " 3");
    }

    #[test]
    fn the_default_route_is_bump_karma() {
        let (kind, body) = Mux::new("newt").route("wolf seal oxen");
        assert_eq!(kind, Kind::BumpKarma);
        assert_eq!(body, "wolf seal oxen");
    }

    #[test]
    fn unknown_keyword_keeps_prefix_stripped_text() {
        let (kind, body) = Mux::new("@colt").route("@colt rust++");
        assert_eq!(kind, Kind::BumpKarma);
        assert_eq!(body, " rust++");
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        let (kind, body) = Mux::new("@colt").route("@colt topology++");
        assert_eq!(kind, Kind::BumpKarma);
        assert_eq!(body, " topology++");
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        assert_eq!(Mux::new("@colt").route("@Colt top").0, Kind::BumpKarma);
    }

    // Only a single separating space is understood.
    #[test]
    fn extra_whitespace_before_keyword_is_not_a_command() {
        for text in ["oryx  announce", "oryx       karma", "oryx             top", "oryx     bot"] {
            assert_eq!(Mux::new("oryx").route(text).0, Kind::BumpKarma, "{text}");
        }
    }
}
