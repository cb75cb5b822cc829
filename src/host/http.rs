//! HTTP transport implementation
//!
//! Posts reports to the backend's signed RPC endpoint and unload blobs to
//! the beacon endpoint.

use async_trait::async_trait;
use tracing::debug;

use super::traits::{ReportTransport, SignalReport};
use crate::{Error, Result};

/// HTTP report transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    /// Signed RPC endpoint
    rpc_url: String,
    /// Unload beacon endpoint
    beacon_url: String,
}

impl HttpTransport {
    /// Create a new HTTP transport for the given endpoints
    pub fn new<S: Into<String>>(rpc_url: S, beacon_url: S) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            beacon_url: beacon_url.into(),
        })
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    async fn send_report(&self, payload: &SignalReport) -> Result<()> {
        debug!("Posting {:?} report to {}", payload.signaltype, self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("RPC request failed: {}", e)))?;

        // Any non-exceptional return is success; surface HTTP errors so the
        // caller can log them, nothing more.
        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "RPC returned status {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn send_beacon(&self, payload: &SignalReport) -> Result<()> {
        debug!("Posting unload beacon to {}", self.beacon_url);

        // Beacons ship as a single opaque blob, matching sendBeacon semantics.
        let body = serde_json::to_string(payload)?;

        self.client
            .post(&self.beacon_url)
            .header("content-type", "text/plain;charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Beacon request failed: {}", e)))?;

        Ok(())
    }
}
