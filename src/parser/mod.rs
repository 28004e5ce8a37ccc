//! HTTP request parser.
//!
//! Only what a canned-response server needs: the request line, the header
//! block and enough framing to find where the head ends and how long the
//! body is.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::{HttpRequest, find_head_end, parse_request, resolve_path};
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;
