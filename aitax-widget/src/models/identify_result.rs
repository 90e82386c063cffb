//! Normalized, backend-independent identification results
//!
//! Every adapter produces exactly these types; the presentation layer never
//! sees a backend wire type.

use serde::{Deserialize, Serialize};

/// Maximum number of evidence images kept per candidate
pub const MAX_RESULT_IMAGES: usize = 3;

/// Evidence image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

/// One candidate taxon match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResult {
    /// Relative confidence (0.0 to 1.0)
    pub score: f64,
    pub taxon_name: Option<String>,
    pub author: Option<String>,
    pub family: Option<String>,
    /// Vernacular names; only the first is used for primary display
    pub common_names: Vec<String>,
    /// Up to [`MAX_RESULT_IMAGES`] evidence images
    pub images: Vec<ImageRef>,
    pub gbif_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Backend-specific supplementary text (e.g. nutritional value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_text: Option<String>,
    /// Whether the presentation layer must format `taxon_name` itself
    pub format_taxon_name: bool,
}

impl IdentifyResult {
    /// Score as a whole percentage, e.g. `0.926` -> `93`
    pub fn score_percent(&self) -> u32 {
        crate::utils::round(self.score * 100.0, 0).clamp(0.0, 100.0) as u32
    }

    /// Name shown as the primary vernacular label
    pub fn primary_common_name(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }
}

/// Normalized response to one identify submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBatch {
    /// Backend-computed aggregate summary (Carpeso nutrition only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<String>,
    /// Candidates in backend order (already sorted by score, descending)
    pub results: Vec<IdentifyResult>,
}

impl ResultBatch {
    pub fn new(results: Vec<IdentifyResult>) -> Self {
        Self {
            overall_score: None,
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Highest ranked candidate
    pub fn best(&self) -> Option<&IdentifyResult> {
        self.results.first()
    }
}
