//! HTTP response types and utilities.

use std::time::SystemTime;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!("canned-http/", env!("CARGO_PKG_VERSION"));

/// Status codes the server can send, with their reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    MovedTemporarily = 302,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::MovedTemporarily => "Moved Temporarily",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
        }
    }

    /// The numeric code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// The HTML page the server generates for this status, if any.
    ///
    /// Only redirect and error statuses get a page; a `200` carries whatever
    /// body was registered for it.
    pub fn error_page(&self) -> Option<String> {
        match self {
            StatusCode::Ok => None,
            _ => {
                let reason = self.reason_phrase();
                Some(format!(
                    "<html><head><title>{reason}</title></head><body>{reason}</body></html>"
                ))
            }
        }
    }
}

/// Represents an HTTP response on the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers, written in this order
    pub headers: Vec<(String, String)>,
    /// The response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response carrying the default `Date` and `Server`
    /// headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![
                ("Date".to_string(), httpdate::fmt_http_date(SystemTime::now())),
                ("Server".to_string(), SERVER_NAME.to_string()),
            ],
            body: Vec::new(),
        }
        .with_body_bytes(Vec::new())
    }

    /// A response with the generated page for `status`, if it has one.
    pub fn generated(status: StatusCode) -> Self {
        let response = Self::new(status);
        match status.error_page() {
            Some(page) => response
                .with_content_type("text/html")
                .with_body_string(page),
            None => response,
        }
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes, keeping `Content-Length` in step.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let content_length = self.body.len().to_string();
        match self
            .headers
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        {
            Some((_, value)) => *value = content_length,
            None => self.headers.push(("Content-Length".to_string(), content_length)),
        }
        self
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append several headers in order.
    pub fn with_headers<'a>(mut self, headers: impl IntoIterator<Item = &'a (String, String)>) -> Self {
        self.headers.extend(headers.into_iter().cloned());
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Get the first value of a header, compared case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert the response to bytes. The status line is always HTTP/1.0.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        let status_line = format!(
            "HTTP/1.0 {} {}\r\n",
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        bytes.extend_from_slice(status_line.as_bytes());

        for (name, value) in &self.headers {
            let header_line = format!("{name}: {value}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }

        // Add the empty line that separates headers from body
        bytes.extend_from_slice(b"\r\n");

        bytes.extend_from_slice(&self.body);

        bytes
    }
}
