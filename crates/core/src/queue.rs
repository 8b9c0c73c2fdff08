// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO store for pending outbound requests.
//!
//! Requests live in a single SQLite table keyed by an `AUTOINCREMENT` id, so
//! ascending id order is enqueue order and ids are never reused. The database
//! runs with `synchronous = FULL`: once [`QueueStore::append`] returns, the row
//! survives a crash.
//!
//! The connection is guarded by a mutex, so every operation is serialized no
//! matter how many threads share the store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::{NewRequest, PendingRequest, RequestId, RequestKind};

/// SQL schema for the request queue.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    payload BLOB NOT NULL,
    enqueued_at TEXT NOT NULL,
    attempt INTEGER NOT NULL DEFAULT 0
);
"#;

const SELECT_COLUMNS: &str = "SELECT id, kind, payload, enqueued_at, attempt FROM pending_requests";

/// Durable queue of [`PendingRequest`]s.
pub struct QueueStore {
    conn: Mutex<Connection>,
}

impl QueueStore {
    /// Open (or create) the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(QueueStore {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory queue (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(QueueStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied SQLite
        // statement behind, so the connection is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request. The row is committed before this returns.
    pub fn append(&self, request: &NewRequest) -> Result<RequestId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO pending_requests (kind, payload, enqueued_at, attempt)
             VALUES (?1, ?2, ?3, 0)",
            params![
                request.kind.as_str(),
                request.payload,
                request.enqueued_at.to_rfc3339()
            ],
        )?;
        let id = RequestId(conn.last_insert_rowid());
        debug!(id = %id, kind = %request.kind, "appended request");
        Ok(id)
    }

    /// The oldest request still in the queue, if any.
    pub fn peek_oldest(&self) -> Result<Option<PendingRequest>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY id ASC LIMIT 1"),
                [],
                read_row,
            )
            .optional()?;
        row.map(RawRow::into_request).transpose()
    }

    /// All queued requests in FIFO order.
    pub fn pending(&self) -> Result<Vec<PendingRequest>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_request).collect()
    }

    /// Remove a request. Removing an id that is already gone is not an error.
    pub fn remove(&self, id: RequestId) -> Result<()> {
        let removed = self
            .conn()
            .execute("DELETE FROM pending_requests WHERE id = ?1", [id.0])?;
        if removed == 0 {
            debug!(id = %id, "remove: request already gone");
        }
        Ok(())
    }

    /// Record a failed delivery attempt and return the new attempt count.
    pub fn record_failure(&self, id: RequestId) -> Result<u32> {
        let conn = self.conn();
        conn.execute(
            "UPDATE pending_requests SET attempt = attempt + 1 WHERE id = ?1",
            [id.0],
        )?;
        let attempt: i64 = conn.query_row(
            "SELECT attempt FROM pending_requests WHERE id = ?1",
            [id.0],
            |row| row.get(0),
        )?;
        u32::try_from(attempt)
            .map_err(|_| Error::CorruptedData(format!("invalid attempt count {attempt}")))
    }

    /// Number of queued requests.
    pub fn len(&self) -> Result<usize> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM pending_requests", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every queued request. Reset hook for tests and `reset()`.
    pub fn clear_all(&self) -> Result<()> {
        self.conn().execute("DELETE FROM pending_requests", [])?;
        Ok(())
    }
}

/// Row as stored, before kind and timestamp are validated.
struct RawRow {
    id: i64,
    kind: String,
    payload: Vec<u8>,
    enqueued_at: String,
    attempt: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        payload: row.get(2)?,
        enqueued_at: row.get(3)?,
        attempt: row.get(4)?,
    })
}

impl RawRow {
    fn into_request(self) -> Result<PendingRequest> {
        let kind: RequestKind = self.kind.parse()?;
        let enqueued_at = DateTime::parse_from_rfc3339(&self.enqueued_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                Error::CorruptedData(format!(
                    "invalid timestamp '{}' for request {}",
                    self.enqueued_at, self.id
                ))
            })?;
        let attempt = u32::try_from(self.attempt).map_err(|_| {
            Error::CorruptedData(format!(
                "invalid attempt count {} for request {}",
                self.attempt, self.id
            ))
        })?;

        Ok(PendingRequest {
            id: RequestId(self.id),
            kind,
            payload: self.payload,
            enqueued_at,
            attempt,
        })
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
