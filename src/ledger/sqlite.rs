use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::{GuildConfig, KarmaEntry, LedgerStore, Rank};
use crate::event::Entry;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self { conn: Connection::open(path)? };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self { conn: Connection::open_in_memory()? };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS entries (
                guild_id TEXT NOT NULL,
                name TEXT NOT NULL,
                karma INTEGER NOT NULL,
                PRIMARY KEY (guild_id, name)
            );
            CREATE TABLE IF NOT EXISTS guild_configs (
                guild_id TEXT PRIMARY KEY NOT NULL,
                no_announce INTEGER NOT NULL DEFAULT 0
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Stored entry count for a guild.
    pub fn count(&self, guild_id: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE guild_id = ?1",
            params![guild_id],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

fn upsert_entry(conn: &Connection, guild_id: &str, name: &str, karma: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO entries (guild_id, name, karma) VALUES (?1, ?2, ?3)
         ON CONFLICT (guild_id, name) DO UPDATE SET karma = excluded.karma",
        params![guild_id, name, karma],
    )?;
    Ok(())
}

fn delete_entry(conn: &Connection, guild_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM entries WHERE guild_id = ?1 AND name = ?2",
        params![guild_id, name],
    )?;
    Ok(())
}

impl LedgerStore for SqliteStore {
    fn karma(&self, guild_id: &str, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT karma FROM entries WHERE guild_id = ?1 AND name = ?2",
                params![guild_id, name],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn put_karma(&mut self, guild_id: &str, name: &str, karma: i64) -> Result<()> {
        upsert_entry(&self.conn, guild_id, name, karma)
    }

    fn delete_karma(&mut self, guild_id: &str, name: &str) -> Result<()> {
        delete_entry(&self.conn, guild_id, name)
    }

    /// One transaction per batch; dropping it on error rolls back.
    fn apply(&mut self, guild_id: &str, balances: &[Entry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for e in balances {
            if e.karma == 0 {
                delete_entry(&tx, guild_id, &e.name)?;
            } else {
                upsert_entry(&tx, guild_id, &e.name, e.karma)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn guild_config(&mut self, guild_id: &str) -> Result<GuildConfig> {
        self.conn.execute(
            "INSERT OR IGNORE INTO guild_configs (guild_id, no_announce) VALUES (?1, 0)",
            params![guild_id],
        )?;
        let no_announce: bool = self.conn.query_row(
            "SELECT no_announce FROM guild_configs WHERE guild_id = ?1",
            params![guild_id],
            |row| row.get(0),
        )?;
        Ok(GuildConfig { guild_id: guild_id.to_string(), no_announce })
    }

    fn save_guild_config(&mut self, cfg: &GuildConfig) -> Result<()> {
        self.conn.execute(
            "INSERT INTO guild_configs (guild_id, no_announce) VALUES (?1, ?2)
             ON CONFLICT (guild_id) DO UPDATE SET no_announce = excluded.no_announce",
            params![cfg.guild_id, cfg.no_announce],
        )?;
        Ok(())
    }

    fn ranked(&self, guild_id: &str, rank: Rank, limit: u32) -> Result<Vec<KarmaEntry>> {
        let sql = match rank {
            Rank::Highest => {
                "SELECT guild_id, name, karma FROM entries WHERE guild_id = ?1
                 ORDER BY karma DESC, name ASC LIMIT ?2"
            }
            Rank::Lowest => {
                "SELECT guild_id, name, karma FROM entries WHERE guild_id = ?1
                 ORDER BY karma ASC, name ASC LIMIT ?2"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![guild_id, limit], |row| {
                Ok(KarmaEntry {
                    guild_id: row.get(0)?,
                    name: row.get(1)?,
                    karma: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::subject::Subject;

    #[test]
    fn upsert_and_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.put_karma("g", "alice", 1).unwrap();
        store.put_karma("g", "alice", 4).unwrap();
        assert_eq!(store.karma("g", "alice").unwrap(), Some(4));
        store.delete_karma("g", "alice").unwrap();
        assert_eq!(store.karma("g", "alice").unwrap(), None);
        assert_eq!(store.count("g").unwrap(), 0);
    }

    #[test]
    fn guild_config_round_trips() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut cfg = store.guild_config("g").unwrap();
        assert!(!cfg.no_announce);
        cfg.no_announce = true;
        store.save_guild_config(&cfg).unwrap();
        assert!(store.guild_config("g").unwrap().no_announce);
    }

    #[test]
    fn failed_bump_rolls_back_every_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_blocked BEFORE INSERT ON entries
                 WHEN NEW.name = 'blocked'
                 BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
            )
            .unwrap();
        let mut ledger = Ledger::new(store);
        ledger.bump_karma("g", &[Subject::new("kept", 2)]).unwrap();

        let res = ledger.bump_karma(
            "g",
            &[Subject::new("fresh", 1), Subject::new("kept", -2), Subject::new("blocked", 1)],
        );
        assert!(res.is_err());
        assert_eq!(ledger.store().karma("g", "fresh").unwrap(), None);
        assert_eq!(ledger.store().karma("g", "kept").unwrap(), Some(2));
        assert_eq!(ledger.store().count("g").unwrap(), 1);
    }
}
