//! Capture subsystem.
//!
//! # Data Flow
//! ```text
//! backend response body (raw, possibly gzip)
//!     → returned to the caller untouched
//!     → codec.rs decode_for_storage (declared Content-Encoding)
//!     → storage (one call record)
//!
//! stored body
//!     → codec.rs decode_for_display (gzip signature sniffing)
//!     → inspection views
//! ```
//!
//! `credentials.rs` holds the auth headers injected into every forwarded
//! request.

pub mod codec;
pub mod credentials;

pub use codec::DecodeError;
pub use credentials::Credentials;
