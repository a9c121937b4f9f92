//! SQLite persistence for profiles, emotional memories, chambers and weather.
//!
//! Records are JSON blobs keyed by world:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS emotional_profiles (
//!     world_id   TEXT NOT NULL,
//!     agent_id   TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     PRIMARY KEY (world_id, agent_id)
//! );
//! ```
//!
//! JSON keeps the schema stable while the record types evolve. A reloaded
//! profile keeps its `last_updated`, so decay catches up lazily on first access.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::chamber::ResonanceChamber;
use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::memory::EmotionalMemory;
use crate::state::AgentEmotionalProfile;
use crate::types::{AgentId, WorldId};
use crate::weather::WeatherState;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS emotional_profiles (
        world_id   TEXT NOT NULL,
        agent_id   TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (world_id, agent_id)
    );
    CREATE TABLE IF NOT EXISTS emotional_memories (
        world_id   TEXT NOT NULL,
        memory_id  TEXT NOT NULL,
        agent_id   TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (world_id, memory_id)
    );
    CREATE TABLE IF NOT EXISTS resonance_chambers (
        world_id   TEXT NOT NULL,
        chamber_id TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (world_id, chamber_id)
    );
    CREATE TABLE IF NOT EXISTS weather_states (
        world_id   TEXT PRIMARY KEY,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Handle to an open SQLite database holding affect records.
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) a database at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "affect persistence opened");
        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Save (upsert) one profile under its own world and agent id.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn save_profile(&self, profile: &AgentEmotionalProfile) -> Result<()> {
        let json = serde_json::to_vec(profile)?;
        self.conn.execute(
            "INSERT INTO emotional_profiles (world_id, agent_id, data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(world_id, agent_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![
                profile.world_id.to_string(),
                profile.agent_id.to_string(),
                json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Save many profiles in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error; nothing is written on failure.
    pub fn save_profiles(&self, profiles: &[AgentEmotionalProfile]) -> Result<()> {
        let start = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        for profile in profiles {
            self.save_profile(profile)?;
        }
        tx.commit()?;
        debug!(
            count = profiles.len(),
            elapsed_us = start.elapsed().as_micros(),
            "saved emotional profiles"
        );
        Ok(())
    }

    /// Load one profile.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn load_profile(
        &self,
        world: WorldId,
        agent: AgentId,
    ) -> Result<Option<AgentEmotionalProfile>> {
        let data: Option<Vec<u8>> = self
            .conn
            .prepare_cached(
                "SELECT data FROM emotional_profiles WHERE world_id = ?1 AND agent_id = ?2",
            )?
            .query_row(params![world.to_string(), agent.to_string()], |row| row.get(0))
            .optional()?;
        data.map(|bytes| decode(&bytes)).transpose()
    }

    /// Load every profile of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn load_profiles(&self, world: WorldId) -> Result<Vec<AgentEmotionalProfile>> {
        self.load_all(
            "SELECT data FROM emotional_profiles WHERE world_id = ?1 ORDER BY agent_id",
            world,
        )
    }

    /// Delete one profile. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] on SQLite failures.
    pub fn delete_profile(&self, world: WorldId, agent: AgentId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM emotional_profiles WHERE world_id = ?1 AND agent_id = ?2",
            params![world.to_string(), agent.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Number of profiles stored for a world.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] on SQLite failures.
    pub fn profile_count(&self, world: WorldId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM emotional_profiles WHERE world_id = ?1",
            params![world.to_string()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Memories
    // ------------------------------------------------------------------

    /// Save (upsert) emotional memories in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn save_memories(&self, world: WorldId, memories: &[EmotionalMemory]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO emotional_memories (world_id, memory_id, agent_id, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(world_id, memory_id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at",
            )?;
            for memory in memories {
                stmt.execute(params![
                    world.to_string(),
                    memory.id.to_string(),
                    memory.agent_id.to_string(),
                    serde_json::to_vec(memory)?,
                    now
                ])?;
            }
        }
        tx.commit()?;
        debug!(%world, count = memories.len(), "saved emotional memories");
        Ok(())
    }

    /// Load every emotional memory of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn load_memories(&self, world: WorldId) -> Result<Vec<EmotionalMemory>> {
        self.load_all(
            "SELECT data FROM emotional_memories WHERE world_id = ?1 ORDER BY rowid",
            world,
        )
    }

    // ------------------------------------------------------------------
    // Chambers & weather
    // ------------------------------------------------------------------

    /// Save (upsert) the chambers of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn save_chambers(&self, world: WorldId, chambers: &[ResonanceChamber]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        for chamber in chambers {
            tx.execute(
                "INSERT INTO resonance_chambers (world_id, chamber_id, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(world_id, chamber_id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at",
                params![
                    world.to_string(),
                    chamber.id.to_string(),
                    serde_json::to_vec(chamber)?,
                    now
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the chambers of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn load_chambers(&self, world: WorldId) -> Result<Vec<ResonanceChamber>> {
        self.load_all(
            "SELECT data FROM resonance_chambers WHERE world_id = ?1 ORDER BY rowid",
            world,
        )
    }

    /// Save the weather state of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn save_weather(&self, world: WorldId, weather: &WeatherState) -> Result<()> {
        self.conn.execute(
            "INSERT INTO weather_states (world_id, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(world_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![world.to_string(), encode(weather)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Load the weather state of a world.
    ///
    /// # Errors
    ///
    /// Returns a serialization or database error.
    pub fn load_weather(&self, world: WorldId) -> Result<Option<WeatherState>> {
        let data: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM weather_states WHERE world_id = ?1",
                params![world.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|bytes| decode(&bytes)).transpose()
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Decode every row of a single-column `data` query.
    ///
    /// A row that fails to decode aborts the load with
    /// [`crate::AtmosError::Serialization`].
    fn load_all<T: DeserializeOwned>(&self, sql: &str, world: WorldId) -> Result<Vec<T>> {
        let start = Instant::now();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![world.to_string()], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(decode(&row?)?);
        }
        debug!(
            %world,
            rows = out.len(),
            elapsed_us = start.elapsed().as_micros(),
            "loaded records"
        );
        Ok(out)
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "database backup completed"
        );
        Ok(())
    }

    /// Path of the database file (`:memory:` for in-memory databases).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run SQLite's integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AtmosError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self.conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AtmosConfig;
    use crate::state::AffectModel;
    use crate::types::{Chronotype, Emotion, MemoryId, PersonalityPreset};
    use std::sync::Arc;

    fn engine() -> PersistenceEngine {
        PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("in-memory db")
    }

    fn profile(world: WorldId) -> AgentEmotionalProfile {
        let config = AtmosConfig::default();
        AffectModel::new(Arc::new(config.tables), config.emotion).spawn_profile(
            world,
            AgentId::new(),
            PersonalityPreset::Melancholic,
            Chronotype::NightOwl,
            Utc::now(),
        )
    }

    #[test]
    fn profile_round_trip() {
        let db = engine();
        let world = WorldId::new();
        let p = profile(world);
        db.save_profile(&p).expect("save");
        let loaded = db.load_profile(world, p.agent_id).expect("load").expect("present");
        assert_eq!(loaded, p);
        assert!(db.load_profile(WorldId::new(), p.agent_id).expect("load").is_none());
    }

    #[test]
    fn upsert_overwrites() {
        let db = engine();
        let world = WorldId::new();
        let mut p = profile(world);
        db.save_profile(&p).expect("save");
        p.version = 9;
        db.save_profile(&p).expect("save again");
        assert_eq!(db.profile_count(world).expect("count"), 1);
        assert_eq!(db.load_profile(world, p.agent_id).expect("load").expect("present").version, 9);
    }

    #[test]
    fn worlds_are_isolated() {
        let db = engine();
        let (w1, w2) = (WorldId::new(), WorldId::new());
        db.save_profiles(&[profile(w1), profile(w1)]).expect("save");
        db.save_profile(&profile(w2)).expect("save");
        assert_eq!(db.load_profiles(w1).expect("load").len(), 2);
        assert_eq!(db.load_profiles(w2).expect("load").len(), 1);
    }

    #[test]
    fn delete_profile_works() {
        let db = engine();
        let world = WorldId::new();
        let p = profile(world);
        db.save_profile(&p).expect("save");
        assert!(db.delete_profile(world, p.agent_id).expect("delete"));
        assert!(!db.delete_profile(world, p.agent_id).expect("delete again"));
    }

    #[test]
    fn memories_round_trip() {
        let db = engine();
        let world = WorldId::new();
        let agent = AgentId::new();
        let memories = vec![
            EmotionalMemory::new(agent, MemoryId::new(), Emotion::Fear, 70.0, -50.0, Utc::now()),
            EmotionalMemory::new(agent, MemoryId::new(), Emotion::Joy, 40.0, 60.0, Utc::now()),
        ];
        db.save_memories(world, &memories).expect("save");
        let loaded = db.load_memories(world).expect("load");
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|m| m.agent_id == agent));
    }

    #[test]
    fn corrupt_row_fails_the_load() {
        let db = engine();
        let world = WorldId::new();
        let agent = AgentId::new();
        let good = EmotionalMemory::new(
            agent,
            MemoryId::new(),
            Emotion::Joy,
            40.0,
            60.0,
            Utc::now(),
        );
        db.save_memories(world, &[good]).expect("save");
        db.conn
            .execute(
                "INSERT INTO emotional_memories (world_id, memory_id, agent_id, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    world.to_string(),
                    MemoryId::new().to_string(),
                    agent.to_string(),
                    b"not json".to_vec(),
                    Utc::now().to_rfc3339()
                ],
            )
            .expect("raw insert");

        let err = db.load_memories(world).expect_err("corrupt row surfaces");
        assert!(matches!(err, crate::AtmosError::Serialization(_)));
        assert_eq!(db.load_memories(WorldId::new()).expect("other world").len(), 0);
    }

    #[test]
    fn weather_and_chambers_round_trip() {
        use crate::chamber::{ResonanceChamber, default_templates};
        let db = engine();
        let world = WorldId::new();
        let chambers: Vec<_> =
            default_templates().iter().map(ResonanceChamber::from_template).collect();
        db.save_chambers(world, &chambers).expect("save chambers");
        assert_eq!(db.load_chambers(world).expect("load").len(), chambers.len());
        assert!(db.load_weather(world).expect("load").is_none());
        assert!(db.integrity_check().expect("check"));
    }
}
