//! Shared HTTP plumbing for webhook sinks

use std::time::Duration;

use contracts::SinkDeliveryError;
use reqwest::RequestBuilder;
use serde::Serialize;

use crate::error::DispatcherError;

/// Build the client shared by every webhook sink
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, DispatcherError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("butler-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DispatcherError::sink_creation("http", e.to_string()))
}

/// Send `body` as JSON; any non-2xx status is a failure
pub(crate) async fn post_json<T>(request: RequestBuilder, body: &T) -> Result<(), SinkDeliveryError>
where
    T: Serialize + ?Sized,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| SinkDeliveryError::transport(e.without_url()))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkDeliveryError::Status {
            status: status.as_u16(),
        })
    }
}
