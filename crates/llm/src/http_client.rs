//! HTTP Client Factory
//!
//! Builds the reqwest clients used by the providers, with the request
//! timeout and optional proxy applied.

use std::time::Duration;

use survey_designer_core::proxy::ProxyConfig;

use crate::types::{LlmError, LlmResult};

/// Connection attempts give up well before the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` with the given timeout and proxy.
///
/// - `Some(proxy)` -> configure proxy on the client
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Duration,
) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout));

    match proxy {
        Some(cfg) => {
            let mut p = reqwest::Proxy::all(cfg.url()).map_err(|e| LlmError::InvalidRequest {
                message: format!("invalid proxy {}: {}", cfg.url(), e),
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    builder.build().map_err(|e| LlmError::Other {
        message: format!("failed to build HTTP client: {}", e),
    })
}
