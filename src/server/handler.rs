//! Serves exactly one request on an accepted connection.

use log::{info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::parser::{Error as ParserError, HttpRequest, find_head_end, parse_request};
use crate::server::error::Error;
use crate::server::registry::ResponseRegistry;
use crate::server::response::{HttpResponse, StatusCode};

/// Requesting this path answers `200 OK` and stops the accept loop.
pub const SHUTDOWN_PATH: &str = "/shutdown";

const READ_CHUNK_SIZE: usize = 4096;

/// What the accept loop should do after a connection has been served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Keep accepting.
    Served,
    /// The request was for [`SHUTDOWN_PATH`]; stop accepting.
    Shutdown,
}

/// Read one request from `stream`, answer it and close the write side.
///
/// Errors leave the connection unanswered; the caller drops it. A shutdown
/// request whose response cannot be written still yields
/// [`Outcome::Shutdown`].
pub(crate) async fn handle_connection<S>(
    stream: &mut S,
    registry: &ResponseRegistry,
    max_request_size: usize,
) -> Result<Outcome, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = read_request(stream, max_request_size).await?;
    info!("{method}: {target}", method = request.method, target = request.target);

    let (response, outcome) = respond(&request, registry).await;
    info!(
        "{code} ({reason})",
        code = response.status.as_u16(),
        reason = response.status.reason_phrase()
    );

    match write_response(stream, &response).await {
        Ok(()) => Ok(outcome),
        Err(e) if outcome == Outcome::Shutdown => {
            warn!("Could not answer shutdown request: {e}");
            Ok(outcome)
        }
        Err(e) => Err(e),
    }
}

/// Build the response for `request`. Reads the registry once.
async fn respond(request: &HttpRequest, registry: &ResponseRegistry) -> (HttpResponse, Outcome) {
    if request.path == SHUTDOWN_PATH {
        return (HttpResponse::new(StatusCode::Ok), Outcome::Shutdown);
    }

    let response = match registry.get(&request.path).await {
        Some(canned) => HttpResponse::new(StatusCode::Ok)
            .with_body_bytes(canned.body())
            .with_headers(canned.headers()),
        None => HttpResponse::generated(StatusCode::NotFound),
    };
    (response, Outcome::Served)
}

/// Read the request head and any body announced by `Content-Length`.
///
/// A peer that closes after a partial head gets that head parsed as-is.
async fn read_request<S>(stream: &mut S, max_request_size: usize) -> Result<HttpRequest, Error>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    let head_end = loop {
        if let Some(end) = find_head_end(&buf) {
            break end;
        }
        if buf.len() > max_request_size {
            return Err(Error::RequestTooLarge(max_request_size));
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Err(ParserError::EmptyRequest.into());
            }
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let mut request = parse_request(&buf[..head_end])?;

    // Content-Length is peer-controlled, so the sum may not fit in a usize.
    let body_len = request.content_length()?;
    head_end
        .checked_add(body_len)
        .filter(|total| *total <= max_request_size)
        .ok_or(Error::RequestTooLarge(max_request_size))?;

    let mut body = buf.split_off(head_end);
    while body.len() < body_len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(body_len);
    request.body = body;

    Ok(request)
}

async fn write_response<S>(stream: &mut S, response: &HttpResponse) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    // HTTP/1.0: closing is the end-of-body marker, and for TLS this sends
    // close_notify.
    stream.shutdown().await?;
    Ok(())
}
