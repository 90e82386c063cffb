//! Species list served by the backend's `/taxa` endpoint

use crate::adapters::with_path_segment;
use crate::models::Species;
use crate::services::http_transport::Transport;
use reqwest::Url;
use std::sync::Arc;
use tracing::{info, warn};

/// Client for the list of species a backend can recognize
#[derive(Clone)]
pub struct SpeciesListClient {
    transport: Arc<dyn Transport>,
}

impl SpeciesListClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch `<api_url>/taxa`
    ///
    /// # Errors
    /// Returns a user-visible message prefixed with
    /// `Failed to load species list:`.
    pub async fn fetch(&self, api_url: &Url) -> Result<Vec<Species>, String> {
        let fail = |detail: String| format!("Failed to load species list: {}", detail);

        let url = with_path_segment(api_url, "taxa").map_err(|e| fail(e.to_string()))?;
        let raw = self.transport.get(&url).await.map_err(|e| {
            warn!(error = %e, "Species list request failed");
            fail(e.to_string())
        })?;

        if raw.status != 200 {
            warn!(status = raw.status, "Species list request rejected");
            return Err(fail(raw.status_text()));
        }

        let species: Vec<Species> =
            serde_json::from_str(&raw.body).map_err(|e| fail(e.to_string()))?;
        info!(count = species.len(), "Species list loaded");
        Ok(species)
    }
}
