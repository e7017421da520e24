//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load config → Validate → Logging → Metrics
//!         → Open call store → Resolve credentials → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGINT, SIGTERM or trigger() → Stop accepting → Drain in-flight calls → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic only arrives once the store exists

pub mod shutdown;

pub use shutdown::Shutdown;
