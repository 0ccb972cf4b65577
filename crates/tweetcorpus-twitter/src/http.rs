//! HTTP plumbing: async reqwest behind a blocking facade.
//!
//! The fetch loop is strictly sequential, so requests are driven to
//! completion on a small shared runtime instead of making the loop async.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("tweetcorpus/", env!("CARGO_PKG_VERSION"));

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Run a future to completion on the shared runtime.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    SHARED_RUNTIME.handle().block_on(future)
}

/// Build an HTTP client with a whole-request timeout.
pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Error text without the request URL, so tokens in query strings or
/// endpoints never reach the logs.
pub fn describe(e: reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else {
        "request"
    };
    format!("{kind}: {}", e.without_url())
}
