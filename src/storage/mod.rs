//! Persistence for captured calls.
//!
//! One row per forwarded call in the `requests` table. Rows are appended once
//! and never updated or deleted by the gateway.

pub mod record;
pub mod sqlite;

pub use record::{CallRecord, NewCallRecord};
pub use sqlite::{CallStore, StoreError};
