//! Identify dispatcher
//!
//! Single entry point for one identification exchange: pick the adapter for
//! the configured backend, build the request, perform exactly one network
//! exchange and delegate parsing. Every failure mode collapses into a
//! human-readable message; callers only ever see success or failure(message).

use crate::adapters::AdapterRegistry;
use crate::models::{BackendFormat, ImageAsset, ResultBatch};
use crate::services::http_transport::Transport;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one identify exchange: a result batch or a user-visible message
pub type IdentifyOutcome = Result<ResultBatch, String>;

/// Default language tag when none is configured
pub const DEFAULT_LANG: &str = "en";

/// Identify dispatcher
pub struct IdentifyDispatcher {
    transport: Arc<dyn Transport>,
    registry: AdapterRegistry,
    lang: String,
}

impl IdentifyDispatcher {
    /// Dispatcher over all built-in adapters
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: AdapterRegistry::default(),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    /// Replace the adapter table
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Language tag sent to backends that localize names
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Run one identification
    ///
    /// # Returns
    /// - `Ok(ResultBatch)` on success (possibly with zero candidates)
    /// - `Err(message)` for request construction, transport, HTTP, backend
    ///   or parse failures. Transport failures read `"Error: <message>"`.
    pub async fn identify(
        &self,
        images: &[ImageAsset],
        api_url: &Url,
        api_key: Option<&str>,
        backend_format: BackendFormat,
    ) -> IdentifyOutcome {
        let adapter = self.registry.resolve(backend_format);

        let request = adapter
            .build_request(images, api_url, api_key, &self.lang)
            .map_err(|e| {
                warn!(backend = %backend_format, error = %e, "Failed to build identify request");
                e.to_string()
            })?;

        debug!(
            backend = %backend_format,
            image_count = images.len(),
            url = %request.url.path(),
            "Sending identify request"
        );

        let raw = match self.transport.send(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(backend = %backend_format, error = %e, "Identify request failed");
                return Err(format!("Error: {}", e));
            }
        };

        match adapter.parse_response(&raw, api_url) {
            Ok(batch) => {
                info!(
                    backend = %backend_format,
                    results = batch.len(),
                    top_score = batch.best().map(|r| r.score).unwrap_or_default(),
                    "Identification successful"
                );
                Ok(batch)
            }
            Err(e) => {
                warn!(
                    backend = %backend_format,
                    status = raw.status,
                    error = %e,
                    "Identification failed"
                );
                Err(e.to_string())
            }
        }
    }
}
