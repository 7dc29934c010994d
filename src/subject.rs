//! Extraction of karma subjects (`alice++`, `@bob----`) from message text.

use serde::{Deserialize, Serialize};

/// A named subject and the signed karma delta attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub karma: i64,
}

impl Subject {
    pub fn new(name: impl Into<String>, karma: i64) -> Self {
        Self { name: name.into(), karma }
    }
}

// Punctuation that may trail an operator run at the end of a sentence.
const TRAILING_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Resolve a token to its ledger name: `@alice` and `alice` are the same entry.
pub fn resolve_name(token: &str) -> &str {
    match token.strip_prefix('@') {
        Some(rest) if !rest.is_empty() => rest,
        _ => token,
    }
}

/// Scan `text` for subjects, one per occurrence, in the order they appear.
///
/// A whitespace-delimited token counts when it ends in a run of two or more
/// identical `+` or `-` characters. Every pair in the run is worth one point,
/// so `alice++++` is +2 and `alice---` is -1. Names keep their leading `@`;
/// see [`merge_subjects`] for resolution.
pub fn parse_subjects(text: &str) -> Vec<Subject> {
    text.split_whitespace().filter_map(parse_token).collect()
}

fn parse_token(token: &str) -> Option<Subject> {
    let token = token.trim_end_matches(TRAILING_PUNCT);
    let op = token.chars().last()?;
    let sign = match op {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };

    let name = token.trim_end_matches(op);
    let run = token.len() - name.len();
    if run < 2 || name.is_empty() || name.ends_with(['+', '-']) {
        return None;
    }

    Some(Subject::new(name, sign * (run / 2) as i64))
}

/// Collapse occurrences of the same resolved name into one net delta.
///
/// Order of first mention is kept. Names whose deltas cancel out are dropped.
/// Sums saturate at the `i64` bounds; the ledger rejects a balance that
/// would leave them.
pub fn merge_subjects(subjects: impl IntoIterator<Item = Subject>) -> Vec<Subject> {
    let mut merged: Vec<Subject> = Vec::new();
    for s in subjects {
        let name = resolve_name(&s.name);
        match merged.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.karma = existing.karma.saturating_add(s.karma),
            None => merged.push(Subject::new(name, s.karma)),
        }
    }
    merged.retain(|s| s.karma != 0);
    merged
}
