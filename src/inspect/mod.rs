//! Read-only views over captured calls.
//!
//! `GET /_list` shows the most recent records, `GET /_show/{id}` one record
//! parsed as a chat completion. Neither path ever reaches the backend.

pub mod handlers;
pub mod payload;
pub mod render;
