//! Test server lifecycle: binding, the serial accept loop, and the
//! self-request shutdown.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::server::client::{self, Target};
use crate::server::config::{BIND_ATTEMPTS, BIND_RETRY_DELAY, ServerConfig};
use crate::server::error::Error;
use crate::server::handler::{Outcome, SHUTDOWN_PATH, handle_connection};
use crate::server::registry::ResponseRegistry;
use crate::server::tls;

/// Lifecycle of a [`TestWebServer`]. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ServerState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerState::Starting,
            1 => ServerState::Running,
            2 => ServerState::ShuttingDown,
            _ => ServerState::Stopped,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ServerState::Starting as u8))
    }

    fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `next` unless the state is already past it.
    fn advance(&self, next: ServerState) {
        self.0.fetch_max(next as u8, Ordering::SeqCst);
    }
}

/// A local HTTP or HTTPS server answering with canned responses.
///
/// The handle owns the server: keep at most one alive per port and call
/// [`shutdown`](Self::shutdown) before creating the next one. Dropping a
/// running server aborts its accept loop.
///
/// ```no_run
/// # async fn demo() -> Result<(), canned_http::ServerError> {
/// use canned_http::TestWebServer;
///
/// let mut server = TestWebServer::new(false).await?;
/// let uri = server
///     .set_response("/hello", "hi there", vec![("X-Test".into(), "1".into())])
///     .await;
/// // ... point the code under test at `uri` ...
/// server.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct TestWebServer {
    config: ServerConfig,
    local_addr: SocketAddr,
    registry: Arc<ResponseRegistry>,
    state: Arc<StateCell>,
    accept_loop: Option<JoinHandle<()>>,
}

impl TestWebServer {
    /// Start a server on the well-known plaintext or TLS port.
    pub async fn new(use_tls: bool) -> Result<Self, Error> {
        Self::with_config(ServerConfig::for_mode(use_tls)).await
    }

    /// Start a server with the given configuration.
    ///
    /// The listener is bound before this returns, so requests issued right
    /// afterwards are queued rather than refused.
    pub async fn with_config(config: ServerConfig) -> Result<Self, Error> {
        let state = Arc::new(StateCell::new());

        let acceptor = if config.use_tls {
            Some(tls::server_acceptor(&config.credential)?)
        } else {
            None
        };

        let listener = bind_with_retry(SocketAddr::new(config.host, config.port)).await?;
        let local_addr = listener.local_addr()?;
        let base_uri = format!(
            "{scheme}://{host}:{port}",
            scheme = config.scheme(),
            host = uri_host(local_addr.ip()),
            port = local_addr.port()
        );
        info!("Test server listening on {base_uri}");

        let registry = Arc::new(ResponseRegistry::new(base_uri));
        state.advance(ServerState::Running);

        let accept_loop = AcceptLoop {
            listener,
            acceptor,
            registry: registry.clone(),
            state: state.clone(),
            read_timeout: config.read_timeout,
            max_request_size: config.max_request_size,
        };
        let accept_loop = tokio::spawn(accept_loop.run());

        Ok(Self {
            config,
            local_addr,
            registry,
            state,
            accept_loop: Some(accept_loop),
        })
    }

    /// Serve `body` with `headers` at `path`. Returns the URI to request.
    pub async fn set_response(
        &self,
        path: impl Into<String>,
        body: impl Into<Vec<u8>>,
        headers: Vec<(String, String)>,
    ) -> String {
        self.registry.set(path, body, headers).await
    }

    /// Serve the base64-decoded `encoded` body at `path`.
    ///
    /// Fails with [`Error::DecodingError`] and stores nothing if `encoded`
    /// is not valid base64.
    pub async fn set_response_base64(
        &self,
        path: impl Into<String>,
        encoded: &str,
        headers: Vec<(String, String)>,
    ) -> Result<String, Error> {
        self.registry.set_encoded(path, encoded, headers).await
    }

    /// Serve `value` as JSON at `path`.
    pub async fn set_response_json<T: Serialize>(
        &self,
        path: impl Into<String>,
        value: &T,
        headers: Vec<(String, String)>,
    ) -> Result<String, Error> {
        self.registry.set_json(path, value, headers).await
    }

    /// `scheme://host:port` of the bound listener.
    pub fn base_uri(&self) -> &str {
        self.registry.base_uri()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    pub fn is_tls(&self) -> bool {
        self.config.use_tls
    }

    /// Stop the server and wait until its port is released.
    ///
    /// Sends `GET /shutdown` to the server itself so the accept loop wakes up
    /// through its normal accept path, then joins the loop task. Calling this
    /// again after it succeeded is a no-op. If a client already requested
    /// `/shutdown`, only the join is performed.
    ///
    /// On error the server is in an unknown state.
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        let Some(accept_loop) = self.accept_loop.take() else {
            debug!("Test server on {addr} already stopped", addr = self.local_addr);
            return Ok(());
        };

        if self.state.get() == ServerState::Running {
            if let Err(e) = self.request_shutdown().await {
                if self.state.get() < ServerState::ShuttingDown {
                    self.accept_loop = Some(accept_loop);
                    return Err(e);
                }
                debug!("Shutdown request overtaken by another shutdown: {e}");
            }
        }

        accept_loop.await?;
        info!("Test server on {addr} shut down", addr = self.local_addr);
        Ok(())
    }

    async fn request_shutdown(&self) -> Result<(), Error> {
        let target = Target {
            tls: self.config.use_tls,
            host: "localhost".to_string(),
            port: self.local_addr.port(),
            path: SHUTDOWN_PATH.to_string(),
        };
        let response = client::get_from(connect_addr(self.local_addr), &target).await?;
        if response.status != 200 {
            return Err(Error::ShutdownError(format!(
                "server answered {status} {reason}",
                status = response.status,
                reason = response.reason
            )));
        }
        debug!(
            "Shutdown acknowledged with {headers} headers and {len} body bytes",
            headers = response.headers.len(),
            len = response.body.len()
        );
        Ok(())
    }
}

impl Drop for TestWebServer {
    fn drop(&mut self) {
        if let Some(accept_loop) = self.accept_loop.take() {
            warn!(
                "Test server on {addr} dropped without shutdown, aborting accept loop",
                addr = self.local_addr
            );
            accept_loop.abort();
        }
    }
}

/// Bind `addr`, retrying while a previous listener may still hold it.
async fn bind_with_retry(addr: SocketAddr) -> Result<TcpListener, Error> {
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt >= BIND_ATTEMPTS => {
                return Err(Error::BindError {
                    addr,
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => {
                warn!("Bind attempt {attempt} on {addr} failed: {e}");
                attempt += 1;
                tokio::time::sleep(BIND_RETRY_DELAY).await;
            }
        }
    }
}

fn uri_host(ip: IpAddr) -> String {
    if ip.is_loopback() || ip.is_unspecified() {
        "localhost".to_string()
    } else {
        match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        }
    }
}

/// Wildcard binds are reached through loopback.
fn connect_addr(local_addr: SocketAddr) -> SocketAddr {
    match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local_addr.port()),
        _ => local_addr,
    }
}

/// Everything the accept loop task owns.
pub(crate) struct AcceptLoop {
    pub(crate) listener: TcpListener,
    pub(crate) acceptor: Option<TlsAcceptor>,
    pub(crate) registry: Arc<ResponseRegistry>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) read_timeout: Duration,
    pub(crate) max_request_size: usize,
}

impl AcceptLoop {
    /// Accept and serve connections one at a time until a shutdown request
    /// has been answered.
    async fn run(self) {
        let addr = self.listener.local_addr().ok();

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        error!("Critical error accepting connection, shutting down");
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            debug!("Accepted connection from {peer}");

            match self.serve(socket).await {
                Ok(Outcome::Served) => {}
                Ok(Outcome::Shutdown) => {
                    info!("Shutdown requested by {peer}");
                    self.state.advance(ServerState::ShuttingDown);
                    break;
                }
                Err(e) => warn!("Dropping connection from {peer}: {e}"),
            }
        }

        self.state.advance(ServerState::ShuttingDown);
        drop(self.listener);
        self.state.advance(ServerState::Stopped);
        match addr {
            Some(addr) => info!("Test server on {addr} stopped"),
            None => info!("Test server stopped"),
        }
    }

    /// Serve one connection, giving up after `read_timeout`.
    pub(crate) async fn serve(&self, socket: TcpStream) -> Result<Outcome, Error> {
        tokio::time::timeout(self.read_timeout, self.serve_unbounded(socket))
            .await
            .map_err(|_| Error::Timeout(self.read_timeout))?
    }

    async fn serve_unbounded(&self, socket: TcpStream) -> Result<Outcome, Error> {
        match &self.acceptor {
            Some(acceptor) => {
                let mut stream = acceptor.accept(socket).await?;
                handle_connection(&mut stream, &self.registry, self.max_request_size).await
            }
            None => {
                let mut socket = socket;
                handle_connection(&mut socket, &self.registry, self.max_request_size).await
            }
        }
    }
}
