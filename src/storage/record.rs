//! Call record types.

use chrono::{DateTime, Utc};

/// One forwarded call as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub url_path: String,
    pub duration_ms: i64,
    pub request_body: Vec<u8>,
    /// Backend body after transport decoding.
    pub response_body: Vec<u8>,
}

/// A call record before the store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallRecord {
    pub url_path: String,
    pub duration_ms: i64,
    pub request_body: Vec<u8>,
    pub response_body: Vec<u8>,
}
