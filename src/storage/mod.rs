use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::error::PersistenceError;

mod schema;

/// Durable string store the reminder list is persisted through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: String,
    pub reminder_id: String,
    pub body: String,
    pub fire_at: i64,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn read_value(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading stored value {key}"))
        })
    }

    pub fn write_value(&self, key: &str, value: &str) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("writing stored value {key}"))?;
            Ok(())
        })
    }

    pub fn insert_notification(&self, record: &NotificationRecord) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO scheduled_notifications (id, reminder_id, body, fire_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.reminder_id,
                    record.body,
                    record.fire_at,
                    record.created_at
                ],
            )
            .context("inserting scheduled notification")?;
            Ok(())
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_notification(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM scheduled_notifications WHERE id = ?1",
                    params![id],
                )
                .context("deleting scheduled notification")?;
            Ok(removed > 0)
        })
    }

    pub fn list_notifications(&self) -> Result<Vec<NotificationRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, reminder_id, body, fire_at, created_at
                 FROM scheduled_notifications
                 ORDER BY fire_at ASC, created_at ASC",
            )?;
            let records = stmt
                .query_map([], |row| {
                    Ok(NotificationRecord {
                        id: row.get(0)?,
                        reminder_id: row.get(1)?,
                        body: row.get(2)?,
                        fire_at: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }
}

impl KeyValueStore for StorageHandle {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.read_value(key)
            .map_err(|err| PersistenceError::Backend(format!("{err:#}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.write_value(key, value)
            .map_err(|err| PersistenceError::Backend(format!("{err:#}")))
    }
}

pub fn init(storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = &storage.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "storage ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}
