//! Backend adapters
//!
//! Each supported backend protocol has one adapter implementing
//! [`BackendAdapter`]: a pure translation from images to an outgoing
//! multipart request, and from a raw response to a [`ResultBatch`].
//! Adapters perform no I/O; the identify dispatcher owns the network
//! exchange.
//!
//! Adapters are looked up through an [`AdapterRegistry`] keyed by
//! [`BackendFormat`]. Adding a backend means registering a new adapter.

pub mod c4c;
pub mod carpeso;
pub mod plantnet;

pub use c4c::C4cAdapter;
pub use carpeso::CarpesoAdapter;
pub use plantnet::PlantNetAdapter;

use crate::error::AdapterError;
use crate::models::{BackendFormat, ImageAsset, ResultBatch};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// GBIF species page prefix shared by PlantNet and C4C
pub(crate) const GBIF_SPECIES_URL: &str = "https://www.gbif.org/species/";

// ============================================================================
// Request / response values
// ============================================================================

/// One multipart form field
#[derive(Debug, Clone)]
pub enum FormField {
    Text { name: &'static str, value: String },
    Image { name: &'static str, image: ImageAsset },
}

impl FormField {
    pub fn name(&self) -> &'static str {
        match self {
            FormField::Text { name, .. } | FormField::Image { name, .. } => *name,
        }
    }
}

/// Outgoing identify request, ready for a transport to send as multipart POST
#[derive(Debug, Clone)]
pub struct IdentifyRequest {
    pub url: Url,
    pub fields: Vec<FormField>,
}

impl IdentifyRequest {
    /// Values of all text fields with the given name, in form order
    pub fn text_values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|field| match field {
                FormField::Text { name: n, value } if *n == name => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Images attached under the given field name, in form order
    pub fn images(&self, name: &str) -> Vec<&ImageAsset> {
        self.fields
            .iter()
            .filter_map(|field| match field {
                FormField::Image { name: n, image } if *n == name => Some(image),
                _ => None,
            })
            .collect()
    }

    /// First value of a query parameter
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Raw HTTP exchange result handed to an adapter for parsing
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Reason phrase, e.g. `Internal Server Error`
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// 200 OK with the given JSON body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, "OK", body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status code and reason phrase, e.g. `500 Internal Server Error`
    pub fn status_text(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }

    /// Error reported by the backend's own convention
    pub(crate) fn backend_error(&self, message: String) -> AdapterError {
        AdapterError::Backend {
            status: (!self.is_success()).then(|| self.status_text()),
            message,
        }
    }

    pub(crate) fn http_error(&self) -> AdapterError {
        AdapterError::Http {
            status: self.status,
            reason: self.reason.clone(),
        }
    }
}

// ============================================================================
// Adapter trait and registry
// ============================================================================

/// Translation between one backend's wire format and the result model
pub trait BackendAdapter: Send + Sync {
    /// Format this adapter implements
    fn format(&self) -> BackendFormat;

    /// Build the multipart submission for `images`
    ///
    /// `api_key` is attached as the `api-key` query parameter when non-blank.
    /// `lang` is the client language tag for backends that localize names.
    fn build_request(
        &self,
        images: &[ImageAsset],
        api_url: &Url,
        api_key: Option<&str>,
        lang: &str,
    ) -> Result<IdentifyRequest, AdapterError>;

    /// Parse a raw response into a result batch
    ///
    /// `api_url` is the configured endpoint, used by backends returning
    /// relative image paths.
    fn parse_response(
        &self,
        raw: &RawResponse,
        api_url: &Url,
    ) -> Result<ResultBatch, AdapterError>;
}

/// Capability table mapping each backend format to its adapter
///
/// Lookups for a format without a registered adapter resolve to the
/// PlantNet adapter.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<BackendFormat, Arc<dyn BackendAdapter>>,
    fallback: Arc<dyn BackendAdapter>,
}

impl AdapterRegistry {
    /// Registry with only the PlantNet fallback
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
            fallback: Arc::new(PlantNetAdapter),
        }
    }

    /// Register (or replace) the adapter for its format
    ///
    /// Returns the previously registered adapter, if any.
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) -> Option<Arc<dyn BackendAdapter>> {
        self.adapters.insert(adapter.format(), adapter)
    }

    /// Adapter for `format`, falling back to PlantNet
    pub fn resolve(&self, format: BackendFormat) -> Arc<dyn BackendAdapter> {
        match self.adapters.get(&format) {
            Some(adapter) => Arc::clone(adapter),
            None => {
                tracing::warn!(
                    backend = %format,
                    "No adapter registered for backend, using PlantNet"
                );
                Arc::clone(&self.fallback)
            }
        }
    }

    pub fn is_registered(&self, format: BackendFormat) -> bool {
        self.adapters.contains_key(&format)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PlantNetAdapter));
        registry.register(Arc::new(C4cAdapter));
        registry.register(Arc::new(CarpesoAdapter));
        registry
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Append `lang` and, when non-blank, `api-key` query parameters
pub(crate) fn append_common_query(url: &mut Url, api_key: Option<&str>, lang: &str) {
    let mut pairs = url.query_pairs_mut();
    pairs.append_pair("lang", lang);
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        pairs.append_pair("api-key", key);
    }
}

/// `url` with one more path segment, ignoring a trailing slash
///
/// `https://host/api/` + `identify` gives `https://host/api/identify`.
pub fn with_path_segment(url: &Url, segment: &str) -> Result<Url, AdapterError> {
    let mut joined = url.clone();
    joined
        .path_segments_mut()
        .map_err(|_| AdapterError::InvalidUrl(url.to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(joined)
}

/// Decode a response body into a backend envelope
///
/// Bodies that are not valid JSON for the envelope are reported as HTTP
/// failures when the status was not 2xx, and as parse failures otherwise.
pub(crate) fn decode_body<T: DeserializeOwned>(
    backend: &'static str,
    raw: &RawResponse,
) -> Result<T, AdapterError> {
    serde_json::from_str(&raw.body).map_err(|e| {
        if raw.is_success() {
            AdapterError::Parse {
                backend,
                detail: e.to_string(),
            }
        } else {
            raw.http_error()
        }
    })
}

/// GBIF species page for an id delivered as JSON string or number
pub(crate) fn gbif_species_url(id: &serde_json::Value) -> Option<String> {
    let id = match id {
        serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("{}{}", GBIF_SPECIES_URL, id))
}
