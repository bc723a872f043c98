//! Bounded-timeout HTTP client for the peer node.

use crate::error::{ApiError, DaemonError, DaemonResult};
use async_trait::async_trait;
use drowse_types::HeartbeatSignal;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Shared-secret header name, matched by the auth middleware on both ends.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Successful exchange with the peer.
#[derive(Debug, Clone, Serialize)]
pub struct PeerResponse {
    pub status_code: u16,
    pub json: Value,
    pub text: String,
    pub url: String,
}

/// Seam for talking to the peer, so the orchestrator and heartbeat
/// emitter can be exercised without a network.
#[async_trait]
pub trait PeerGateway: Send + Sync {
    async fn get(&self, path: &str) -> Result<PeerResponse, ApiError>;

    async fn post_heartbeat(&self, signal: &HeartbeatSignal) -> Result<PeerResponse, ApiError>;
}

/// HTTP client for the peer with the shared secret attached and an
/// explicit per-request timeout. A timeout or connection error maps to
/// `ApiError::PeerTimeout`; a reachable peer answering with an error
/// status maps to `ApiError::Network`. Suspend forwarding relies on the
/// two staying distinct.
pub struct PeerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PeerClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> DaemonResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DaemonError::Server(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub async fn get(&self, path: &str) -> Result<PeerResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        info!(url = %url, "Making request to peer");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(map_send_error)?;

        Self::finish(response).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<PeerResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;

        Self::finish(response).await
    }

    async fn finish(response: reqwest::Response) -> Result<PeerResponse, ApiError> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::Network {
                message: format!("Peer responded with error code {}", status.as_u16()),
                details: json!({ "response": text, "url": url }),
            });
        }

        let parsed = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(PeerResponse {
            status_code: status.as_u16(),
            json: parsed,
            text,
            url,
        })
    }
}

#[async_trait]
impl PeerGateway for PeerClient {
    async fn get(&self, path: &str) -> Result<PeerResponse, ApiError> {
        PeerClient::get(self, path).await
    }

    async fn post_heartbeat(&self, signal: &HeartbeatSignal) -> Result<PeerResponse, ApiError> {
        self.post_json("/waker/heartbeat", signal).await
    }
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() || e.is_connect() {
        ApiError::PeerTimeout
    } else {
        ApiError::Network {
            message: format!("Failed to communicate with peer: {}", e),
            details: json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_peer_maps_to_timeout() {
        // Reserved TEST-NET-1 address; nothing should answer.
        let client = PeerClient::new(
            "http://192.0.2.1:1".to_string(),
            "secret".to_string(),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = client.get("/sleeper/suspend").await.unwrap_err();
        assert!(matches!(err, ApiError::PeerTimeout));
    }
}
