//! Outbound HTTP client construction.

use std::time::Duration;

/// Build the client used for health probes and replays.
///
/// Every request made through it is bounded by `timeout`. Environment proxy
/// settings are ignored: the relay talks to one fixed backend directly.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .no_proxy()
        .build()
}
