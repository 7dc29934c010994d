use std::collections::{BTreeMap, HashMap};

use anyhow::Result;

use super::{GuildConfig, KarmaEntry, LedgerStore, Rank};

/// Volatile store for tests and single-process runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<(String, String), i64>,
    configs: HashMap<String, GuildConfig>,
    writes: u64,
}

impl MemoryStore {
    /// Number of stored (non-zero) entries across all guilds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry writes and deletes performed so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

fn key(guild_id: &str, name: &str) -> (String, String) {
    (guild_id.to_string(), name.to_string())
}

impl LedgerStore for MemoryStore {
    fn karma(&self, guild_id: &str, name: &str) -> Result<Option<i64>> {
        Ok(self.entries.get(&key(guild_id, name)).copied())
    }

    fn put_karma(&mut self, guild_id: &str, name: &str, karma: i64) -> Result<()> {
        self.writes += 1;
        self.entries.insert(key(guild_id, name), karma);
        Ok(())
    }

    fn delete_karma(&mut self, guild_id: &str, name: &str) -> Result<()> {
        self.writes += 1;
        self.entries.remove(&key(guild_id, name));
        Ok(())
    }

    fn guild_config(&mut self, guild_id: &str) -> Result<GuildConfig> {
        Ok(self
            .configs
            .entry(guild_id.to_string())
            .or_insert_with(|| GuildConfig::new(guild_id))
            .clone())
    }

    fn save_guild_config(&mut self, cfg: &GuildConfig) -> Result<()> {
        self.configs.insert(cfg.guild_id.clone(), cfg.clone());
        Ok(())
    }

    fn ranked(&self, guild_id: &str, rank: Rank, limit: u32) -> Result<Vec<KarmaEntry>> {
        // BTreeMap iteration is already name-ordered within a guild, and the
        // sort is stable, so ties stay name-ascending.
        let mut rows: Vec<KarmaEntry> = self
            .entries
            .iter()
            .filter(|((g, _), _)| g == guild_id)
            .map(|((g, n), k)| KarmaEntry { guild_id: g.clone(), name: n.clone(), karma: *k })
            .collect();
        match rank {
            Rank::Highest => rows.sort_by(|a, b| b.karma.cmp(&a.karma)),
            Rank::Lowest => rows.sort_by(|a, b| a.karma.cmp(&b.karma)),
        }
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
