//! Thin control client that classifies device responses

use serde::Serialize;
use tracing::{info, warn};

use super::{ControlTransport, Endpoint, Response};
use crate::{AcquisitionError, Result};

/// Pass-through over a [`ControlTransport`] that reports each device message
/// and separates refused commands from transport failures.
///
/// Stateless and non-retrying: every failure goes straight back to the caller.
#[derive(Debug, Clone)]
pub struct ControlClient<T> {
    transport: T,
}

impl<T: ControlTransport> ControlClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Query a read-only endpoint.
    ///
    /// The device status code is reported but not judged; a response without
    /// a status block is accepted.
    pub async fn query(&self, endpoint: Endpoint) -> Result<Response> {
        let response = self.transport.get(endpoint).await?;

        match &response.status {
            Some(status) => {
                info!("Response from {} command: {}", endpoint.label(), status.message)
            }
            None => info!("Response from {} command: success", endpoint.label()),
        }

        Ok(response)
    }

    /// Write `payload` to a configuration endpoint.
    ///
    /// A well-formed response whose status code is non-zero becomes
    /// [`DeviceRejected`](AcquisitionError::DeviceRejected); a response with
    /// no status block is a [`Decode`](AcquisitionError::Decode) failure.
    pub async fn configure<P>(&self, endpoint: Endpoint, payload: &P) -> Result<Response>
    where
        P: Serialize + Sync,
    {
        let payload = serde_json::to_value(payload).map_err(|e| {
            AcquisitionError::decode(endpoint.label(), format!("unencodable payload: {e}"))
        })?;

        let response = self.transport.put(endpoint, &payload).await?;

        let Some(status) = &response.status else {
            return Err(AcquisitionError::decode(endpoint.label(), "response has no status"));
        };

        info!("Response from {} command: {}", endpoint.label(), status.message);

        if status.status_code != 0 {
            warn!("Command failed: {}", status.message);
            return Err(AcquisitionError::device_rejected(
                endpoint.path_or_root(),
                status.status_code,
                status.message.clone(),
            ));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::AcquisitionCommand;
    use crate::test_utils::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn configure_accepts_zero_status() {
        let transport = MockTransport::new(4000);
        let client = ControlClient::new(transport.clone());

        let response = client.configure(Endpoint::Acquisition, &AcquisitionCommand::START).await;
        assert!(response.is_ok());
        assert_eq!(transport.put_payloads(Endpoint::Acquisition), vec![json!({"state": 1})]);
    }

    #[tokio::test]
    async fn configure_classifies_nonzero_status_as_rejection() {
        let transport = MockTransport::new(4000).reject(Endpoint::Setup, 5, "bad stacks");
        let client = ControlClient::new(transport);

        match client.configure(Endpoint::Setup, &json!({})).await {
            Err(AcquisitionError::DeviceRejected { endpoint, status_code, message }) => {
                assert_eq!(endpoint, "/nic/setup");
                assert_eq!(status_code, 5);
                assert_eq!(message, "bad stacks");
            }
            other => panic!("Expected DeviceRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn query_does_not_judge_status() {
        let transport = MockTransport::new(4000).reject(Endpoint::Version, 9, "odd");
        let client = ControlClient::new(transport);

        let response = client.query(Endpoint::Version).await.unwrap();
        assert_eq!(response.status_code(), Some(9));
    }

    #[tokio::test]
    async fn configure_without_status_is_decode_error() {
        let transport = MockTransport::new(4000).respond(Endpoint::Power, Response::default());
        let client = ControlClient::new(transport);

        let result = client.configure(Endpoint::Power, &json!({"state": 2})).await;
        assert!(matches!(result, Err(AcquisitionError::Decode { .. })));
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let transport = MockTransport::new(4000).fail(Endpoint::Power);
        let client = ControlClient::new(transport.clone());

        let result = client.configure(Endpoint::Power, &json!({"state": 2})).await;
        assert!(matches!(result, Err(AcquisitionError::Network { .. })));
        assert_eq!(transport.put_count(Endpoint::Power), 1);
    }
}
