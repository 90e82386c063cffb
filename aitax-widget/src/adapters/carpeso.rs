//! Carpeso fodder classifier adapter
//!
//! Request: one `image=<file>` per image posted to `api_url` with
//! `lang=..[&api-key=..]`.
//!
//! Success nests candidates under `results.details` beside an aggregate
//! `results.nutrition` value. Errors use `{"status": "error"}`. Image paths
//! are relative to the service origin, which is the API URL without its
//! `classify` segment.

use super::{
    append_common_query, decode_body, BackendAdapter, FormField, IdentifyRequest, RawResponse,
};
use crate::error::AdapterError;
use crate::models::{
    BackendFormat, IdentifyResult, ImageAsset, ImageRef, ResultBatch, MAX_RESULT_IMAGES,
};
use crate::utils::round;
use reqwest::Url;
use serde::Deserialize;

const BACKEND: &str = "Carpeso";
const ERROR_STATUS: &str = "error";
const CLASSIFY_SEGMENT: &str = "classify";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    /// Decoded only once `status` rules out an error reply
    #[serde(default)]
    results: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CarpesoResults {
    nutrition: f64,
    details: Vec<CarpesoRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CarpesoRecord {
    name: String,
    #[serde(default)]
    authorship: Option<String>,
    #[serde(default)]
    vernacular_name: Option<String>,
    score: f64,
    #[serde(default)]
    nutrition: Option<f64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    images: Vec<CarpesoImage>,
}

#[derive(Debug, Deserialize)]
struct CarpesoImage {
    url: String,
}

/// Envelope narrowed on the `status` discriminant
#[derive(Debug)]
enum CarpesoReply {
    Failure(String),
    Success(CarpesoResults),
}

impl TryFrom<Envelope> for CarpesoReply {
    type Error = String;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match (envelope.status, envelope.results) {
            (Some(status), _) if status == ERROR_STATUS => Ok(CarpesoReply::Failure(status)),
            (_, Some(results)) => serde_json::from_value(results)
                .map(CarpesoReply::Success)
                .map_err(|e| e.to_string()),
            (_, None) => Err("missing `results` object".to_string()),
        }
    }
}

/// Origin that relative image paths are resolved against
fn image_origin(api_url: &Url) -> String {
    let mut base = api_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.as_str()
        .replacen(CLASSIFY_SEGMENT, "", 1)
        .trim_end_matches('/')
        .to_string()
}

fn resolve_image_url(origin: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}/{}", origin, path.trim_start_matches('/'))
    }
}

fn to_result(record: CarpesoRecord, origin: &str) -> IdentifyResult {
    let images = record
        .images
        .iter()
        .take(MAX_RESULT_IMAGES)
        .map(|image| {
            let url = resolve_image_url(origin, &image.url);
            ImageRef {
                alt: format!("{} {}", record.name, url),
                url,
            }
        })
        .collect();

    IdentifyResult {
        score: record.score,
        taxon_name: Some(record.name),
        author: record.authorship,
        family: None,
        common_names: record.vernacular_name.into_iter().collect(),
        images,
        gbif_url: None,
        url: record.url.filter(|u| !u.is_empty()),
        additional_text: record
            .nutrition
            .filter(|n| *n != 0.0)
            .map(|n| format!("Nutrition : {} ufl/kg MS", n)),
        format_taxon_name: true,
    }
}

/// Carpeso adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct CarpesoAdapter;

impl BackendAdapter for CarpesoAdapter {
    fn format(&self) -> BackendFormat {
        BackendFormat::Carpeso
    }

    fn build_request(
        &self,
        images: &[ImageAsset],
        api_url: &Url,
        api_key: Option<&str>,
        lang: &str,
    ) -> Result<IdentifyRequest, AdapterError> {
        let fields = images
            .iter()
            .map(|image| FormField::Image {
                name: "image",
                image: image.clone(),
            })
            .collect();

        let mut url = api_url.clone();
        append_common_query(&mut url, api_key, lang);

        Ok(IdentifyRequest { url, fields })
    }

    fn parse_response(
        &self,
        raw: &RawResponse,
        api_url: &Url,
    ) -> Result<ResultBatch, AdapterError> {
        let envelope: Envelope = decode_body(BACKEND, raw)?;
        let reply = CarpesoReply::try_from(envelope).map_err(|detail| {
            if raw.is_success() {
                AdapterError::Parse {
                    backend: BACKEND,
                    detail,
                }
            } else {
                raw.http_error()
            }
        })?;

        let results = match reply {
            CarpesoReply::Failure(status) => return Err(raw.backend_error(status)),
            CarpesoReply::Success(_) if !raw.is_success() => return Err(raw.http_error()),
            CarpesoReply::Success(results) => results,
        };

        let origin = image_origin(api_url);
        Ok(ResultBatch {
            overall_score: Some(format!(
                "Valeur nutritive estimée : {} ufl/kg MS",
                round(results.nutrition, 2)
            )),
            results: results
                .details
                .into_iter()
                .map(|record| to_result(record, &origin))
                .collect(),
        })
    }
}
