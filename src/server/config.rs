//! Server configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::server::tls::TlsCredential;

/// Well-known port of the plaintext server.
pub const HTTP_PORT: u16 = 4444;

/// Well-known port of the TLS server.
pub const HTTPS_PORT: u16 = 4445;

/// How many times binding the listener is attempted before giving up.
pub const BIND_ATTEMPTS: u32 = 3;

/// Pause between bind attempts, long enough for a previous instance's
/// socket to be released.
pub const BIND_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Test server configuration. Fixed once the server is constructed.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Serve HTTPS instead of plain HTTP.
    pub use_tls: bool,
    /// The address to bind to.
    pub host: IpAddr,
    /// The port to bind to. `0` picks an ephemeral port.
    pub port: u16,
    /// Certificate and key presented in TLS mode.
    pub credential: TlsCredential,
    /// Upper bound on the TLS handshake plus reading one request.
    pub read_timeout: Duration,
    /// Largest request (head and body) the server will read.
    pub max_request_size: usize,
}

impl ServerConfig {
    /// Plain HTTP on [`HTTP_PORT`].
    pub fn plaintext() -> Self {
        Self::default()
    }

    /// HTTPS on [`HTTPS_PORT`] with the embedded test credential.
    pub fn tls() -> Self {
        Self {
            use_tls: true,
            port: HTTPS_PORT,
            ..Self::default()
        }
    }

    /// Plain or TLS defaults, as selected by `use_tls`.
    pub fn for_mode(use_tls: bool) -> Self {
        if use_tls {
            Self::tls()
        } else {
            Self::plaintext()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_credential(mut self, credential: TlsCredential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    /// `http` or `https`.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            use_tls: false,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: HTTP_PORT,
            credential: TlsCredential::embedded(),
            read_timeout: Duration::from_secs(10),
            max_request_size: 64 * 1024,
        }
    }
}
