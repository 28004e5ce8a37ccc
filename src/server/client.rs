//! Minimal HTTP/1.0 client used to talk to our own server.
//!
//! Issues a single `GET`, reads until the server closes, and parses the
//! reply. TLS connections trust any certificate, so this stays crate-private.

use std::net::SocketAddr;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::parser::find_head_end;
use crate::server::error::Error;
use crate::server::tls;

/// Where a request goes, split out of a `scheme://host:port/path` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub tls: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    pub fn parse(uri: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidUri(uri.to_string());

        let (scheme, rest) = uri.split_once("://").ok_or_else(invalid)?;
        let tls = match scheme {
            "http" => false,
            "https" => true,
            _ => return Err(invalid()),
        };

        let (authority, path) = match rest.find('/') {
            Some(start) => rest.split_at(start),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (authority, if tls { 443 } else { 80 }),
        };
        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            tls,
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// A parsed response as the client saw it.
#[derive(Debug, Clone)]
pub(crate) struct ClientResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ClientResponse {
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        let malformed = |what: &str| Error::MalformedResponse(what.to_string());

        let head_end = find_head_end(raw).ok_or_else(|| malformed("no header terminator"))?;
        let head = std::str::from_utf8(&raw[..head_end]).map_err(|_| malformed("head is not UTF-8"))?;
        let mut lines = head.lines();

        let status_line = lines.next().ok_or_else(|| malformed("empty"))?;
        let mut parts = status_line.splitn(3, ' ');
        let _version = parts.next();
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| malformed(status_line))?;
        let reason = parts.next().unwrap_or_default().to_string();

        let headers = lines
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            status,
            reason,
            headers,
            body: raw[head_end..].to_vec(),
        })
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `GET` the given URI.
#[cfg(test)]
pub(crate) async fn get(uri: &str) -> Result<ClientResponse, Error> {
    let target = Target::parse(uri)?;
    let socket = TcpStream::connect((target.host.as_str(), target.port)).await?;
    exchange_over(socket, &target).await
}

/// `GET` `target.path` from `addr`, using `target.host` for `Host` and SNI.
pub(crate) async fn get_from(addr: SocketAddr, target: &Target) -> Result<ClientResponse, Error> {
    let socket = TcpStream::connect(addr).await?;
    exchange_over(socket, target).await
}

async fn exchange_over(socket: TcpStream, target: &Target) -> Result<ClientResponse, Error> {
    if target.tls {
        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| Error::InvalidUri(target.host.clone()))?;
        let mut stream = tls::permissive_connector()?.connect(server_name, socket).await?;
        exchange(&mut stream, target).await
    } else {
        let mut socket = socket;
        exchange(&mut socket, target).await
    }
}

async fn exchange<S>(stream: &mut S, target: &Target) -> Result<ClientResponse, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "GET {path} HTTP/1.0\r\nHost: {host}:{port}\r\nConnection: close\r\n\r\n",
        path = target.path,
        host = target.host,
        port = target.port
    );
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    ClientResponse::parse(&raw)
}
