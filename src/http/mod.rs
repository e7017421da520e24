//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing span, reserved-path routing)
//!     → /_list, /_show/{id}, /favicon.ico → inspect
//!     → anything else → forward.rs
//!           → backend (one attempt)
//!           → capture: codec + storage (advisory)
//!           → raw backend response to the client
//! ```

pub mod error;
pub mod forward;
pub mod server;

pub use error::GatewayError;
pub use forward::Forwarder;
pub use server::{AppState, GatewayServer};
