//! Transports that carry control requests to the device

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{Endpoint, Response};
use crate::config::DeviceConfig;
use crate::{AcquisitionError, Result};

/// Request/response exchange with the device's control surface.
///
/// Implementations move bytes and decode the envelope; they never interpret
/// the device status code and never retry. Failures are either
/// [`Network`](AcquisitionError::Network) or
/// [`Decode`](AcquisitionError::Decode).
#[async_trait::async_trait]
pub trait ControlTransport: Send + Sync + 'static {
    /// Read-only query of `endpoint`.
    async fn get(&self, endpoint: Endpoint) -> Result<Response>;

    /// Write `payload` to `endpoint`.
    async fn put(&self, endpoint: Endpoint, payload: &Value) -> Result<Response>;
}

/// HTTP transport for the NIC SDK REST interface.
///
/// Queries are `GET {base}{path}`; configuration is a `PUT` whose form field
/// `data` holds the JSON-encoded payload.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        // The device sits on the local network; never route it through a proxy.
        let client =
            reqwest::Client::builder().timeout(timeout).no_proxy().build().map_err(|e| {
                AcquisitionError::network_with_source("creating control HTTP client", e)
            })?;

        Ok(Self { client, base_url: config.api_base_url() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn decode(endpoint: Endpoint, response: reqwest::Response) -> Result<Response> {
        let http_status = response.status();
        trace!(endpoint = endpoint.label(), %http_status, "Control response received");

        response.json::<Response>().await.map_err(|e| {
            if e.is_decode() {
                AcquisitionError::decode(
                    endpoint.label(),
                    format!("HTTP {http_status}: invalid envelope: {e}"),
                )
            } else {
                AcquisitionError::network_with_source(
                    format!("reading {} response", endpoint.label()),
                    e,
                )
            }
        })
    }
}

#[async_trait::async_trait]
impl ControlTransport for HttpTransport {
    async fn get(&self, endpoint: Endpoint) -> Result<Response> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            AcquisitionError::network_with_source(format!("GET {}", endpoint.label()), e)
        })?;

        Self::decode(endpoint, response).await
    }

    async fn put(&self, endpoint: Endpoint, payload: &Value) -> Result<Response> {
        let url = self.url(endpoint);
        let data = payload.to_string();
        debug!("PUT {} data={}", url, data);

        let response =
            self.client.put(&url).form(&[("data", data)]).send().await.map_err(|e| {
                AcquisitionError::network_with_source(format!("PUT {}", endpoint.label()), e)
            })?;

        Self::decode(endpoint, response).await
    }
}
