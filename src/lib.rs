//! A minimal, deterministic HTTP/HTTPS server for tests.
//!
//! Register canned responses by path, point the code under test at the
//! returned URIs, and shut the server down when done. Requests are served
//! one at a time over HTTP/1.0 and every connection is closed after its
//! response, so what a test observes never depends on scheduling.
//!
//! # Features
//!
//! - Exact-path response registry with raw, base64 and JSON bodies
//! - Ordered, verbatim response headers plus `Date`, `Server` and `Content-Length`
//! - Generated `404 Not Found` page for unregistered paths
//! - HTTPS with an embedded self-signed test certificate
//! - Race-free shutdown through a request to the server's own `/shutdown`
//!
//! # Examples
//!
//! ```no_run
//! use canned_http::TestWebServer;
//!
//! # async fn demo() -> Result<(), canned_http::ServerError> {
//! let mut server = TestWebServer::new(false).await?;
//!
//! let uri = server
//!     .set_response("/hello", "hi there", vec![("X-Test".to_string(), "1".to_string())])
//!     .await;
//! assert_eq!(uri, "http://localhost:4444/hello");
//!
//! // An unregistered path answers 404 with a small HTML page.
//! let _missing = format!("{}/missing", server.base_uri());
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The request parser is usable on its own:
//!
//! ```
//! use canned_http::{parse_request, Method};
//!
//! let request = parse_request(b"GET /index.html?x=1 HTTP/1.0\r\n\r\n").unwrap();
//! assert_eq!(request.method, Method::GET);
//! assert_eq!(request.path, "/index.html");
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    CannedResponse, Error as ServerError, HttpResponse, ResponseRegistry, SHUTDOWN_PATH, ServerConfig, ServerState,
    StatusCode, TestWebServer, TlsCredential,
};
