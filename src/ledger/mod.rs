//! Per-guild karma counters.
//!
//! The ledger is the only writer of entries and guild configs. It owns its
//! store outright, so callers that share it across tasks must route all
//! mutations through one worker (see `processor`).

use anyhow::{anyhow, Result};

use crate::event::Entry;
use crate::logging::log_karma_changed;
use crate::subject::{merge_subjects, Subject};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored karma counter. Only non-zero counters are ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KarmaEntry {
    pub guild_id: String,
    pub name: String,
    pub karma: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: String,
    pub no_announce: bool,
}

impl GuildConfig {
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self { guild_id: guild_id.into(), no_announce: false }
    }
}

/// Ranking direction for board queries. Ties are broken by name, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Highest,
    Lowest,
}

/// Narrow persistence interface the ledger needs.
pub trait LedgerStore {
    fn karma(&self, guild_id: &str, name: &str) -> Result<Option<i64>>;
    fn put_karma(&mut self, guild_id: &str, name: &str, karma: i64) -> Result<()>;
    fn delete_karma(&mut self, guild_id: &str, name: &str) -> Result<()>;
    /// Fetch the guild's config, creating the default row on first access.
    fn guild_config(&mut self, guild_id: &str) -> Result<GuildConfig>;
    fn save_guild_config(&mut self, cfg: &GuildConfig) -> Result<()>;
    fn ranked(&self, guild_id: &str, rank: Rank, limit: u32) -> Result<Vec<KarmaEntry>>;

    /// Write a batch of resulting balances for one guild. A zero balance
    /// deletes the entry. Stores that can fail mid-batch override this to
    /// apply all or nothing.
    fn apply(&mut self, guild_id: &str, balances: &[Entry]) -> Result<()> {
        for e in balances {
            if e.karma == 0 {
                self.delete_karma(guild_id, &e.name)?;
            } else {
                self.put_karma(guild_id, &e.name, e.karma)?;
            }
        }
        Ok(())
    }
}

/// Result of applying karma changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bumped {
    /// Whether the guild wants mutation outcomes posted.
    pub announce: bool,
    /// Resulting karma of every subject actually changed, in mention order.
    pub entries: Vec<Entry>,
}

pub struct Ledger<S> {
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply net deltas. Aliases are merged first; a counter that lands on
    /// exactly zero is deleted instead of stored.
    ///
    /// Every resulting balance is computed before anything is written, so a
    /// delta that would overflow rejects the whole bump untouched.
    pub fn bump_karma(&mut self, guild_id: &str, subjects: &[Subject]) -> Result<Bumped> {
        let merged = merge_subjects(subjects.iter().cloned());
        let mut entries = Vec::with_capacity(merged.len());
        for subject in &merged {
            let current = self.store.karma(guild_id, &subject.name)?.unwrap_or(0);
            let karma = current
                .checked_add(subject.karma)
                .ok_or_else(|| anyhow!("karma overflow for {}", subject.name))?;
            entries.push(Entry::new(subject.name.clone(), karma));
        }

        self.store.apply(guild_id, &entries)?;
        for (subject, entry) in merged.iter().zip(&entries) {
            log_karma_changed(guild_id, &entry.name, subject.karma, entry.karma);
        }

        let announce = if entries.is_empty() {
            false
        } else {
            !self.store.guild_config(guild_id)?.no_announce
        };
        Ok(Bumped { announce, entries })
    }

    /// Read-only lookup; absent names report zero.
    pub fn check_karma(&self, guild_id: &str, names: &[String]) -> Result<Vec<Entry>> {
        names
            .iter()
            .map(|name| {
                let karma = self.store.karma(guild_id, name)?.unwrap_or(0);
                Ok(Entry::new(name.clone(), karma))
            })
            .collect()
    }

    pub fn set_announce(&mut self, guild_id: &str, on: bool) -> Result<()> {
        let mut cfg = self.store.guild_config(guild_id)?;
        cfg.no_announce = !on;
        self.store.save_guild_config(&cfg)
    }

    pub fn leaderboard(&self, guild_id: &str, limit: u32) -> Result<Vec<Entry>> {
        self.board(guild_id, Rank::Highest, limit)
    }

    pub fn loserboard(&self, guild_id: &str, limit: u32) -> Result<Vec<Entry>> {
        self.board(guild_id, Rank::Lowest, limit)
    }

    fn board(&self, guild_id: &str, rank: Rank, limit: u32) -> Result<Vec<Entry>> {
        Ok(self
            .store
            .ranked(guild_id, rank, limit)?
            .into_iter()
            .map(|e| Entry::new(e.name, e.karma))
            .collect())
    }
}
