use reqwest::blocking::{Client, Response};
use tracing::{debug, warn};

use crate::error::{Result, ToolError};

/// Builds the blocking client shared by all calls of one integration run.
pub fn client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Passes a successful response through; any other status stops the
/// integration.
pub fn require(provider: &'static str, resource: &str, response: Response) -> Result<Response> {
    let status = response.status();
    debug!(provider, resource, %status, url = %response.url(), "response received");
    if status.is_success() {
        return Ok(response);
    }
    Err(ToolError::UnexpectedStatus {
        provider,
        resource: resource.to_string(),
        status: status.as_u16(),
    })
}

/// Passes a successful response through; any other status is logged and
/// yields `None` so the caller can move on to the next item.
pub fn skip_on_failure(provider: &'static str, resource: &str, response: Response) -> Option<Response> {
    let status = response.status();
    debug!(provider, resource, %status, url = %response.url(), "response received");
    if status.is_success() {
        return Some(response);
    }
    warn!(provider, resource, status = status.as_u16(), "request failed, skipping");
    None
}
