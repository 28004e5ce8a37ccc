//! HTTP request parsing and representation.

use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target exactly as it appeared on the request line
    pub target: String,
    /// The path component of the target, without query or fragment
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers, in the order they were received
    pub headers: Vec<(String, String)>,
    /// Whatever body bytes arrived together with the head
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    ///
    /// Fails if `target` does not resolve to a path, see [`resolve_path`].
    pub fn new(
        method: Method,
        target: impl Into<String>,
        version: HttpVersion,
        headers: Vec<(String, String)>,
    ) -> Result<Self, Error> {
        let target = target.into();
        let path = resolve_path(&target)?;

        Ok(Self {
            method,
            target,
            path,
            version,
            headers,
            body: Vec::new(),
        })
    }

    /// Get the first value of a header, compared case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The announced body length; zero when there is no `Content-Length`.
    pub fn content_length(&self) -> Result<usize, Error> {
        match self.get_header("Content-Length") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string())),
            None => Ok(0),
        }
    }
}

/// Reduce a request target to its path component.
///
/// Origin-form (`/a/b?x#y`) and absolute-form (`http://host:1/a/b?x`) targets
/// both resolve to `/a/b`; an absolute-form target without a path resolves
/// to `/`. The asterisk-form used by `OPTIONS *` is kept as `*`.
pub fn resolve_path(target: &str) -> Result<String, Error> {
    let without_fragment = target.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();

    if without_query.starts_with('/') || without_query == "*" {
        return Ok(without_query.to_string());
    }

    if let Some((scheme, rest)) = without_query.split_once("://") {
        if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return Ok(match rest.find('/') {
                Some(start) => rest[start..].to_string(),
                None => "/".to_string(),
            });
        }
    }

    Err(Error::InvalidPath(target.to_string()))
}

/// Find the end of the request head.
///
/// Returns the offset just past the blank line that terminates the header
/// block. Bare `\n` line endings are accepted.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    for (i, byte) in buf.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        if buf[i + 1..].starts_with(b"\r\n") {
            return Some(i + 3);
        }
        if buf[i + 1..].starts_with(b"\n") {
            return Some(i + 2);
        }
    }
    None
}

/// Parse an HTTP request from a byte slice.
///
/// The slice holds the request head and optionally some body bytes. When no
/// blank line is found the whole slice is treated as the head.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let (head, body) = match find_head_end(input) {
        Some(end) => input.split_at(end),
        None => (input, &[][..]),
    };

    let head = std::str::from_utf8(head)
        .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;

    let mut lines = head.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;
    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = Vec::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeaderFormat(line.to_string()));
        }

        headers.push((name.to_string(), value.trim().to_string()));
    }

    let mut request = HttpRequest::new(method, parts[1], version, headers)?;
    request.body = body.to_vec();
    Ok(request)
}
