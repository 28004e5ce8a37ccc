//! The canned-response test server.
//!
//! One listener, one accept loop that serves connections strictly one after
//! another, and a registry of responses the test fills in.

mod response;
mod config;
mod error;
mod handler;
mod registry;
mod tls;
mod client;
mod http_server;

// Re-export public items
pub use response::{HttpResponse, StatusCode, SERVER_NAME};
pub use config::{BIND_ATTEMPTS, BIND_RETRY_DELAY, HTTP_PORT, HTTPS_PORT, ServerConfig};
pub use error::Error;
pub use handler::SHUTDOWN_PATH;
pub(crate) use handler::{Outcome, handle_connection};
pub use registry::{CannedResponse, ResponseRegistry};
pub use tls::TlsCredential;
pub use http_server::{ServerState, TestWebServer};
