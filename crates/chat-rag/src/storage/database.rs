//! SQLite database for durable conversation history

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{ConversationTurn, Role};

use super::ConversationBackend;

/// SQLite-backed conversation log
pub struct ConversationDb {
    conn: Arc<Mutex<Connection>>,
}

impl ConversationDb {
    /// Create or open the database at the given path (`:memory:` is accepted)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::persistence(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::persistence(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Open from a connection string: a file path or `:memory:`
    pub fn open(database: &str) -> Result<Self> {
        if database.trim() == ":memory:" {
            Self::in_memory()
        } else {
            Self::new(database)
        }
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversation_turns_session
                ON conversation_turns(session_id, id);
        "#,
        )
        .map_err(|e| Error::persistence(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("Conversation database migrations complete");
        Ok(())
    }

    /// Number of stored turns for a session
    pub fn count(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversation_turns WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ConversationBackend for ConversationDb {
    fn append(&self, turns: &[ConversationTurn]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO conversation_turns (session_id, role, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for turn in turns {
                stmt.execute(params![
                    turn.session_id,
                    turn.role.as_str(),
                    turn.text,
                    turn.timestamp.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, role, text, created_at FROM conversation_turns WHERE session_id = ?1 ORDER BY id ASC",
        )?;

        let turns = stmt
            .query_map(params![session_id], row_to_turn)?
            .filter_map(|row| match row {
                Ok(turn) => turn,
                Err(e) => {
                    tracing::warn!("Skipping unreadable conversation row: {}", e);
                    None
                }
            })
            .collect();

        Ok(turns)
    }

    fn clear(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM conversation_turns WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(deleted)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// Rows with an unknown role are skipped rather than failing the whole load
fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<Option<ConversationTurn>> {
    let session_id: String = row.get(0)?;
    let role: String = row.get(1)?;
    let text: String = row.get(2)?;
    let created_at: String = row.get(3)?;

    let Some(role) = Role::parse(&role) else {
        return Ok(None);
    };

    Ok(Some(ConversationTurn {
        session_id,
        role,
        text,
        timestamp: DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_load_in_order() {
        let db = ConversationDb::in_memory().unwrap();

        db.append(&[
            ConversationTurn::user("s1", "What is a noun?"),
            ConversationTurn::assistant("s1", "A person, place or thing."),
        ])
        .unwrap();
        db.append(&[ConversationTurn::user("s2", "Other session")]).unwrap();

        let turns = db.load("s1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "A person, place or thing.");
        assert_eq!(db.count("s2").unwrap(), 1);
    }

    #[test]
    fn test_clear_is_session_scoped() {
        let db = ConversationDb::in_memory().unwrap();
        db.append(&[ConversationTurn::user("s1", "one")]).unwrap();
        db.append(&[ConversationTurn::user("s2", "two")]).unwrap();

        assert_eq!(db.clear("s1").unwrap(), 1);
        assert!(db.load("s1").unwrap().is_empty());
        assert_eq!(db.load("s2").unwrap().len(), 1);
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");

        {
            let db = ConversationDb::new(&path).unwrap();
            db.append(&[ConversationTurn::user("s1", "persisted")]).unwrap();
        }

        let reopened = ConversationDb::new(&path).unwrap();
        assert_eq!(reopened.load("s1").unwrap()[0].text, "persisted");
    }
}
