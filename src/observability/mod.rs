//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → advisory.rs (failures of side-channel work, logged and dropped)
//!
//! Consumers:
//!     → Log aggregation (stdout, text or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every request gets a span carrying a generated request ID; the ID is
//!   never written into forwarded headers
//! - Metrics are cheap (atomic increments) and no-ops when disabled

pub mod advisory;
pub mod logging;
pub mod metrics;
