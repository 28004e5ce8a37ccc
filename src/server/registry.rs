//! Path-to-response table consulted by the connection handler.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::server::error::Error;

/// A canned response: the body and the extra headers to send with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

impl CannedResponse {
    pub fn new(body: impl Into<Vec<u8>>, headers: Vec<(String, String)>) -> Self {
        Self {
            body: body.into(),
            headers,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Headers in registration order, duplicates included.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Maps exact request paths to canned responses.
///
/// Keys are compared verbatim: no prefix or pattern matching, and no
/// normalisation beyond what the request parser does to the target.
#[derive(Debug)]
pub struct ResponseRegistry {
    base_uri: String,
    responses: RwLock<HashMap<String, CannedResponse>>,
}

impl ResponseRegistry {
    /// Create an empty registry whose URIs are resolved against `base_uri`
    /// (`scheme://host:port`, no trailing slash).
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            responses: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The URI a client must request to reach `path`.
    pub fn uri_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_uri)
    }

    /// Store `body` and `headers` for `path`, replacing any previous entry.
    pub async fn set(&self, path: impl Into<String>, body: impl Into<Vec<u8>>, headers: Vec<(String, String)>) -> String {
        let path = path.into();
        let response = CannedResponse::new(body, headers);
        debug!("Registering {len} byte response for {path}", len = response.body.len());

        let uri = self.uri_for(&path);
        self.responses.write().await.insert(path, response);
        uri
    }

    /// Like [`set`](Self::set), with a base64-encoded body.
    ///
    /// Line breaks and other ASCII whitespace in `encoded` are ignored. On
    /// invalid input nothing is stored.
    pub async fn set_encoded(
        &self,
        path: impl Into<String>,
        encoded: &str,
        headers: Vec<(String, String)>,
    ) -> Result<String, Error> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let body = STANDARD.decode(compact)?;
        Ok(self.set(path, body, headers).await)
    }

    /// Serialize `value` as the JSON body for `path`.
    ///
    /// `Content-Type: application/json` goes ahead of the caller's headers.
    pub async fn set_json<T: Serialize>(
        &self,
        path: impl Into<String>,
        value: &T,
        headers: Vec<(String, String)>,
    ) -> Result<String, Error> {
        let body = serde_json::to_vec(value)?;
        let mut all_headers = Vec::with_capacity(headers.len() + 1);
        all_headers.push(("Content-Type".to_string(), "application/json".to_string()));
        all_headers.extend(headers);
        Ok(self.set(path, body, all_headers).await)
    }

    pub async fn get(&self, path: &str) -> Option<CannedResponse> {
        self.responses.read().await.get(path).cloned()
    }

    /// Remove the entry for `path`, returning it.
    pub async fn remove(&self, path: &str) -> Option<CannedResponse> {
        self.responses.write().await.remove(path)
    }

    pub async fn len(&self) -> usize {
        self.responses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.responses.read().await.is_empty()
    }
}
