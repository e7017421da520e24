//! Completion capture gateway library.

pub mod capture;
pub mod config;
pub mod http;
pub mod inspect;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use storage::CallStore;
