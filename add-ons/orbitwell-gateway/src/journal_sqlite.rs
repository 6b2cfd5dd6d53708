//! Wellness journal: local SQLite store.
//!
//! One table, `journal_entries`. Each call opens its own connection, so the store is
//! cheap to clone and safe to move into `spawn_blocking`.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct JournalSqlite {
    db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JournalEntry {
    pub id: i64,
    pub content: String,
    /// SQLite `CURRENT_TIMESTAMP` (UTC, `YYYY-MM-DD HH:MM:SS`).
    pub created_at: String,
}

impl JournalSqlite {
    pub fn new(db_path: PathBuf) -> Result<Self, rusqlite::Error> {
        let this = Self { db_path };
        this.init()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    fn init(&self) -> Result<(), rusqlite::Error> {
        if let Some(parent) = self.db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS journal_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_journal_created_at ON journal_entries(created_at);
            "#,
        )?;
        Ok(())
    }

    /// All entries, newest first.
    pub fn list(&self) -> Result<Vec<JournalEntry>, rusqlite::Error> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, created_at FROM journal_entries ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(JournalEntry {
                id: r.get(0)?,
                content: r.get(1)?,
                created_at: r.get(2)?,
            })
        })?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Insert `content` (caller trims and rejects blanks) and return the stored row.
    pub fn insert(&self, content: &str) -> Result<JournalEntry, rusqlite::Error> {
        let conn = self.open()?;
        conn.execute("INSERT INTO journal_entries (content) VALUES (?1)", params![content])?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, content, created_at FROM journal_entries WHERE id = ?1",
            params![id],
            |r| {
                Ok(JournalEntry {
                    id: r.get(0)?,
                    content: r.get(1)?,
                    created_at: r.get(2)?,
                })
            },
        )
    }

    /// Delete by id. `false` when no such entry existed.
    pub fn delete(&self, id: i64) -> Result<bool, rusqlite::Error> {
        let conn = self.open()?;
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM journal_entries WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }
        conn.execute("DELETE FROM journal_entries WHERE id = ?1", params![id])?;
        Ok(true)
    }
}
