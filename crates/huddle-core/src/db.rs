// SQLite persistence for fetched league snapshots and small key-value state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::league::LeagueSnapshot;

/// A stored snapshot together with the time it was fetched.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub snapshot: LeagueSnapshot,
    pub fetched_at: DateTime<Utc>,
}

impl StoredSnapshot {
    /// Whether the snapshot is younger than `ttl` at `now`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// SQLite-backed store for league snapshots keyed by (league, season, week).
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

impl SnapshotStore {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                league_id  INTEGER NOT NULL,
                season     INTEGER NOT NULL,
                week       INTEGER NOT NULL,
                fetched_at TEXT NOT NULL,
                payload    TEXT NOT NULL,
                PRIMARY KEY (league_id, season, week)
            );

            CREATE TABLE IF NOT EXISTS league_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Persist a snapshot, replacing any earlier copy for the same week.
    pub fn save_snapshot(&self, snapshot: &LeagueSnapshot, fetched_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn();
        let payload = serde_json::to_string(snapshot).context("failed to serialize snapshot")?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (league_id, season, week, fetched_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.league_id as i64,
                snapshot.season,
                snapshot.current_week,
                fetched_at.to_rfc3339(),
                payload,
            ],
        )
        .context("failed to save snapshot")?;
        Ok(())
    }

    /// Load the snapshot stored for an exact week.
    pub fn load_snapshot(&self, league_id: u64, season: u16, week: u32) -> Result<Option<StoredSnapshot>> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT fetched_at, payload FROM snapshots
                 WHERE league_id = ?1 AND season = ?2 AND week = ?3",
                params![league_id as i64, season, week],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query snapshot")?;

        row.map(|(fetched_at, payload)| decode_row(&fetched_at, &payload))
            .transpose()
    }

    /// Load the most recently fetched snapshot for a league season, whatever
    /// its week.
    pub fn latest_snapshot(&self, league_id: u64, season: u16) -> Result<Option<StoredSnapshot>> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT fetched_at, payload FROM snapshots
                 WHERE league_id = ?1 AND season = ?2
                 ORDER BY fetched_at DESC, week DESC LIMIT 1",
                params![league_id as i64, season],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query latest snapshot")?;

        row.map(|(fetched_at, payload)| decode_row(&fetched_at, &payload))
            .transpose()
    }

    /// Delete stored snapshots older than `cutoff`. Returns the number removed.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM snapshots WHERE fetched_at < ?1",
                params![cutoff.to_rfc3339()],
            )
            .context("failed to prune snapshots")?;
        Ok(removed)
    }

    /// Persist an arbitrary JSON value under `key`.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO league_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM league_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query league state")?;

        json_str
            .map(|s| serde_json::from_str(&s).context("failed to deserialize state value"))
            .transpose()
    }
}

fn decode_row(fetched_at: &str, payload: &str) -> Result<StoredSnapshot> {
    let fetched_at = DateTime::parse_from_rfc3339(fetched_at)
        .context("failed to parse snapshot timestamp")?
        .with_timezone(&Utc);
    let snapshot: LeagueSnapshot =
        serde_json::from_str(payload).context("failed to deserialize snapshot")?;
    Ok(StoredSnapshot {
        snapshot,
        fetched_at,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
