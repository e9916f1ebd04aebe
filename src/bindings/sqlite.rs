//! SQLite-backed binding store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{BindingStore, ChannelBoardBinding, Result, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS channel_bindings (
    channel_id TEXT PRIMARY KEY,
    guild_id TEXT NOT NULL,
    board_id TEXT NOT NULL UNIQUE,
    webhook_id TEXT NOT NULL,
    disabled_events TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_bindings_guild ON channel_bindings(guild_id);
"#;

const SELECT_COLUMNS: &str =
    "SELECT channel_id, guild_id, board_id, webhook_id, disabled_events, created_at FROM channel_bindings";

/// Binding store over a single SQLite connection.
///
/// The connection mutex is held only for the duration of one statement.
pub struct SqliteBindingStore {
    conn: Mutex<Connection>,
}

impl SqliteBindingStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("sqlite open: {}", e)))?;
        tracing::debug!("Opened binding store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Backend(format!("sqlite open: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(format!("sqlite init: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".to_string()))?;
        f(&conn)
    }

    fn find_one(&self, column: &str, value: &str) -> Result<Option<ChannelBoardBinding>> {
        let sql = format!("{} WHERE {} = ?1", SELECT_COLUMNS, column);
        self.with_conn(|conn| {
            let raw = conn
                .query_row(&sql, params![value], read_row)
                .optional()
                .map_err(|e| StoreError::Backend(format!("sqlite select: {}", e)))?;
            raw.map(RawBinding::into_binding).transpose()
        })
    }
}

struct RawBinding {
    channel_id: String,
    guild_id: String,
    board_id: String,
    webhook_id: String,
    disabled_events: String,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawBinding> {
    Ok(RawBinding {
        channel_id: row.get(0)?,
        guild_id: row.get(1)?,
        board_id: row.get(2)?,
        webhook_id: row.get(3)?,
        disabled_events: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl RawBinding {
    fn into_binding(self) -> Result<ChannelBoardBinding> {
        let disabled_events: BTreeSet<String> = serde_json::from_str(&self.disabled_events)
            .map_err(|e| StoreError::Backend(format!("decode disabled_events: {}", e)))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Backend(format!("decode created_at: {}", e)))?
            .with_timezone(&chrono::Utc);
        Ok(ChannelBoardBinding {
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            board_id: self.board_id,
            webhook_id: self.webhook_id,
            disabled_events,
            created_at,
        })
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl BindingStore for SqliteBindingStore {
    fn find_by_channel(&self, channel_id: &str) -> Result<Option<ChannelBoardBinding>> {
        self.find_one("channel_id", channel_id)
    }

    fn find_by_board(&self, board_id: &str) -> Result<Option<ChannelBoardBinding>> {
        self.find_one("board_id", board_id)
    }

    fn insert(&self, binding: &ChannelBoardBinding) -> Result<()> {
        let disabled = serde_json::to_string(&binding.disabled_events)
            .map_err(|e| StoreError::Backend(format!("encode disabled_events: {}", e)))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channel_bindings (channel_id, guild_id, board_id, webhook_id, disabled_events, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    binding.channel_id,
                    binding.guild_id,
                    binding.board_id,
                    binding.webhook_id,
                    disabled,
                    binding.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::Conflict(format!(
                        "channel {} or board {} is already bound",
                        binding.channel_id, binding.board_id
                    ))
                } else {
                    StoreError::Backend(format!("sqlite insert binding: {}", e))
                }
            })?;
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<ChannelBoardBinding>> {
        let sql = format!("{} ORDER BY created_at ASC", SELECT_COLUMNS);
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StoreError::Backend(format!("sqlite prepare list: {}", e)))?;
            let rows = stmt
                .query_map([], read_row)
                .map_err(|e| StoreError::Backend(format!("sqlite query list: {}", e)))?;
            let mut out = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| StoreError::Backend(format!("sqlite read row: {}", e)))?;
                out.push(raw.into_binding()?);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_inserted_binding_both_ways() {
        let store = SqliteBindingStore::open_in_memory().unwrap();
        let binding = ChannelBoardBinding::new("c1", "g1", "b1", "w1");
        store.insert(&binding).unwrap();

        let by_channel = store.find_by_channel("c1").unwrap().unwrap();
        assert_eq!(by_channel.board_id, "b1");
        assert_eq!(by_channel.webhook_id, "w1");
        assert!(by_channel.disabled_events.is_empty());

        let by_board = store.find_by_board("b1").unwrap().unwrap();
        assert_eq!(by_board.channel_id, "c1");

        assert!(store.find_by_channel("c2").unwrap().is_none());
        assert!(store.find_by_board("b2").unwrap().is_none());
    }

    #[test]
    fn rejects_second_binding_for_channel() {
        let store = SqliteBindingStore::open_in_memory().unwrap();
        store.insert(&ChannelBoardBinding::new("c1", "g1", "b1", "w1")).unwrap();

        let err = store
            .insert(&ChannelBoardBinding::new("c1", "g1", "b2", "w2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.find_by_channel("c1").unwrap().unwrap().board_id, "b1");
    }

    #[test]
    fn rejects_second_binding_for_board() {
        let store = SqliteBindingStore::open_in_memory().unwrap();
        store.insert(&ChannelBoardBinding::new("c1", "g1", "b1", "w1")).unwrap();

        let err = store
            .insert(&ChannelBoardBinding::new("c2", "g2", "b1", "w2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_by_channel("c2").unwrap().is_none());
    }

    #[test]
    fn persists_disabled_events_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("bindings.db");

        {
            let store = SqliteBindingStore::open(&path).unwrap();
            let mut binding = ChannelBoardBinding::new("c1", "g1", "b1", "w1");
            binding.disabled_events.insert("updateCard".to_string());
            store.insert(&binding).unwrap();
            store.insert(&ChannelBoardBinding::new("c2", "g1", "b2", "w2")).unwrap();
        }

        let store = SqliteBindingStore::open(&path).unwrap();
        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        let first = store.find_by_channel("c1").unwrap().unwrap();
        assert!(first.disabled_events.contains("updateCard"));
    }
}
