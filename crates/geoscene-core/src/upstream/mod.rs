//! HTTP implementations of the external collaborators.
//!
//! Both clients are reconnected lazily from plain endpoint descriptors and
//! bound by explicit timeouts. Network errors are sanitized into coarse
//! categories before they reach logs or callers.

pub mod assembler;
pub mod lister;

pub use assembler::HttpSceneSource;
pub use lister::HttpRecordLister;

/// Sanitizes a network error into a coarse category string.
///
/// Endpoint URLs and upstream response details stay out of error text.
pub(crate) fn sanitize_network_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        "connection refused or unreachable".to_string()
    } else if error.is_timeout() {
        "connection timed out".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else if error.is_body() {
        "response body error".to_string()
    } else if error.is_decode() {
        "response decode error".to_string()
    } else {
        "network error".to_string()
    }
}

/// Builds the shared `reqwest` client both collaborators use.
pub(crate) fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .connect_timeout(std::time::Duration::from_secs(5))
        .use_rustls_tls()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("geoscene/", env!("CARGO_PKG_VERSION")))
        .tcp_nodelay(true)
        .build()
}
