//! Provenance metadata for the identification backend
//!
//! Only the C4C backend publishes the GBIF dataset DOI its model was trained
//! on. The lookup is decorative: any failure degrades to "no metadata".

use crate::adapters::with_path_segment;
use crate::models::BackendFormat;
use crate::services::http_transport::Transport;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DOI_RESOLVER: &str = "https://doi.org/";

/// C4C `/status` payload; other fields are ignored
#[derive(Debug, Deserialize)]
struct StatusResponse {
    gbif_doi: String,
}

/// Best-effort provenance lookup
#[derive(Clone)]
pub struct MetadataFetcher {
    transport: Arc<dyn Transport>,
}

impl MetadataFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// DOI link of the dataset behind the backend's model
    ///
    /// Returns `None` immediately, without I/O, for backends other than C4C.
    pub async fn provenance_url(
        &self,
        api_url: &Url,
        backend_format: BackendFormat,
    ) -> Option<String> {
        if backend_format != BackendFormat::C4c {
            return None;
        }

        let status_url = with_path_segment(api_url, "status").ok()?;
        let raw = match self.transport.get(&status_url).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Provenance lookup failed");
                return None;
            }
        };

        if raw.status != 200 {
            debug!(status = raw.status, "Provenance lookup returned non-200 status");
            return None;
        }

        match serde_json::from_str::<StatusResponse>(&raw.body) {
            Ok(status) if !status.gbif_doi.trim().is_empty() => {
                Some(format!("{}{}", DOI_RESOLVER, status.gbif_doi.trim()))
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Provenance response not understood");
                None
            }
        }
    }

    /// [`Self::provenance_url`] abandoned as soon as `token` is cancelled
    ///
    /// A result that arrives after cancellation is discarded.
    pub async fn provenance_url_until_cancelled(
        &self,
        api_url: &Url,
        backend_format: BackendFormat,
        token: &CancellationToken,
    ) -> Option<String> {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Provenance lookup cancelled");
                None
            }
            url = self.provenance_url(api_url, backend_format) => {
                if token.is_cancelled() { None } else { url }
            }
        }
    }
}
