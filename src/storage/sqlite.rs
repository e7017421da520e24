//! SQLite-backed call store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, ToSql};

use crate::config::schema::MAX_LIST_LIMIT;
use crate::storage::record::{CallRecord, NewCallRecord};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS requests (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
  request TEXT,
  response TEXT,
  url_path TEXT,
  duration_ms INTEGER
);

CREATE INDEX IF NOT EXISTS requests_timestamp_idx ON requests(timestamp DESC, id DESC);
"#;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("record {id} has unreadable timestamp `{raw}`")]
    InvalidTimestamp { id: i64, raw: String },
}

/// Append-only store of call records.
///
/// Cheap to clone; every operation opens its own connection on the blocking
/// pool, so concurrent handlers never share a connection.
#[derive(Debug, Clone)]
pub struct CallStore {
    db_path: PathBuf,
}

impl CallStore {
    /// Open the database, creating the schema if needed.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        let conn = open_connection(&store.db_path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %store.db_path.display(), "Call store ready");
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Append a record, returning its id.
    pub async fn insert(&self, record: NewCallRecord) -> Result<i64, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || insert_blocking(&db_path, &record)).await?
    }

    /// Most recent records first, at most `limit` (capped at 1000).
    pub async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
        let db_path = self.db_path.clone();
        let limit = limit.min(MAX_LIST_LIMIT);
        tokio::task::spawn_blocking(move || recent_blocking(&db_path, limit)).await?
    }

    /// Point lookup by id.
    pub async fn get(&self, id: i64) -> Result<Option<CallRecord>, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || get_blocking(&db_path, id)).await?
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))?;
            Ok::<_, StoreError>(u64::try_from(count).unwrap_or_default())
        })
        .await?
    }
}

fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Binds a body as TEXT when it is UTF-8 and as BLOB otherwise.
struct BodyColumn<'a>(&'a [u8]);

impl ToSql for BodyColumn<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match std::str::from_utf8(self.0) {
            Ok(text) => ValueRef::Text(text.as_bytes()),
            Err(_) => ValueRef::Blob(self.0),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Reads a body column back as raw bytes, whatever its storage class.
struct StoredBody(Vec<u8>);

impl FromSql for StoredBody {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(Self(bytes.to_vec())),
            ValueRef::Null => Ok(Self(Vec::new())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

fn insert_blocking(path: &Path, record: &NewCallRecord) -> Result<i64, StoreError> {
    let conn = open_connection(path)?;
    conn.execute(
        "INSERT INTO requests (request, response, url_path, duration_ms) VALUES (?1, ?2, ?3, ?4)",
        params![
            BodyColumn(&record.request_body),
            BodyColumn(&record.response_body),
            record.url_path,
            record.duration_ms,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

struct RawRow {
    id: i64,
    timestamp: String,
    url_path: Option<String>,
    duration_ms: Option<i64>,
    request: StoredBody,
    response: StoredBody,
}

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, url_path, duration_ms, request, response FROM requests";

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        url_path: row.get(2)?,
        duration_ms: row.get(3)?,
        request: row.get(4)?,
        response: row.get(5)?,
    })
}

impl TryFrom<RawRow> for CallRecord {
    type Error = StoreError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| StoreError::InvalidTimestamp {
            id: raw.id,
            raw: raw.timestamp.clone(),
        })?;
        Ok(Self {
            id: raw.id,
            timestamp,
            url_path: raw.url_path.unwrap_or_default(),
            duration_ms: raw.duration_ms.unwrap_or_default(),
            request_body: raw.request.0,
            response_body: raw.response.0,
        })
    }
}

/// Accepts both `CURRENT_TIMESTAMP` output and the millisecond default.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .ok()
        })
}

fn recent_blocking(path: &Path, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
    let conn = open_connection(path)?;
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1"
    ))?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![limit], raw_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(CallRecord::try_from(row?)?);
    }
    Ok(records)
}

fn get_blocking(path: &Path, id: i64) -> Result<Option<CallRecord>, StoreError> {
    let conn = open_connection(path)?;
    let raw = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            raw_row,
        )
        .optional()?;
    raw.map(CallRecord::try_from).transpose()
}
