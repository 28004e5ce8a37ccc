//! Serve a couple of canned responses until Ctrl+C.
//!
//! Run with `cargo run --example canned_server`, then try
//! `curl -i http://localhost:4444/hello` and `curl -i http://localhost:4444/missing`.

use canned_http::{ServerError, TestWebServer};
use log::info;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut server = TestWebServer::new(false).await?;

    let hello = server
        .set_response(
            "/hello",
            "hi there\n",
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-Test".to_string(), "1".to_string()),
            ],
        )
        .await;
    let pixel = server
        .set_response_base64(
            "/pixel.gif",
            "R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==",
            vec![("Content-Type".to_string(), "image/gif".to_string())],
        )
        .await?;

    info!("Try {hello} or {pixel}; Ctrl+C or {base}/shutdown stops the server", base = server.base_uri());

    tokio::select! {
        _ = signal::ctrl_c() => info!("Received Ctrl+C"),
        _ = wait_until_stopped(&server) => info!("Stopped by a client request"),
    }

    server.shutdown().await
}

async fn wait_until_stopped(server: &TestWebServer) {
    while server.state() == canned_http::ServerState::Running {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}
