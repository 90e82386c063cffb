//! Pl@ntNet identify API adapter
//!
//! Request: one `organs=auto` + `images=<file>` pair per image, query
//! `include-related-images=true&lang=..[&api-key=..]`.
//!
//! Errors are signalled with an `error` field next to a `message` string;
//! success carries a top-level `results` array.

use super::{
    append_common_query, decode_body, gbif_species_url, BackendAdapter, FormField,
    IdentifyRequest, RawResponse,
};
use crate::error::AdapterError;
use crate::models::{
    BackendFormat, IdentifyResult, ImageAsset, ImageRef, ResultBatch, MAX_RESULT_IMAGES,
};
use reqwest::Url;
use serde::Deserialize;

const BACKEND: &str = "PlantNet";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    /// Decoded only once `error` rules out an error reply
    #[serde(default)]
    results: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlantNetRecord {
    score: f64,
    species: PlantNetSpecies,
    #[serde(default)]
    gbif: Option<GbifRef>,
    #[serde(default)]
    images: Vec<PlantNetImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlantNetSpecies {
    #[serde(default)]
    scientific_name_without_author: Option<String>,
    #[serde(default)]
    scientific_name_authorship: Option<String>,
    #[serde(default)]
    family: Option<TaxonRef>,
    #[serde(default)]
    common_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxonRef {
    #[serde(default)]
    scientific_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GbifRef {
    #[serde(default)]
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PlantNetImage {
    #[serde(default)]
    citation: String,
    #[serde(default)]
    date: Option<ImageDate>,
    url: ImageUrls,
}

#[derive(Debug, Deserialize)]
struct ImageDate {
    #[serde(default)]
    string: String,
}

/// Original, medium and small renditions; the medium one is displayed
#[derive(Debug, Deserialize)]
struct ImageUrls {
    m: String,
}

/// Envelope narrowed on the `error` discriminant
#[derive(Debug)]
enum PlantNetReply {
    Failure(String),
    Success(Vec<PlantNetRecord>),
}

impl TryFrom<Envelope> for PlantNetReply {
    type Error = String;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.error {
            Some(error) if !error.is_null() => {
                let message = envelope
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| match error {
                        serde_json::Value::String(s) if !s.is_empty() => s,
                        serde_json::Value::String(_) => "error".to_string(),
                        other => other.to_string(),
                    });
                Ok(PlantNetReply::Failure(message))
            }
            _ => match envelope.results {
                Some(results) => serde_json::from_value(results)
                    .map(PlantNetReply::Success)
                    .map_err(|e| e.to_string()),
                None => Err("missing `results` array".to_string()),
            },
        }
    }
}

fn to_result(record: PlantNetRecord) -> IdentifyResult {
    let images = record
        .images
        .into_iter()
        .take(MAX_RESULT_IMAGES)
        .map(|image| ImageRef {
            alt: format!(
                "{} - {}",
                image.citation,
                image.date.map(|d| d.string).unwrap_or_default()
            ),
            url: image.url.m,
        })
        .collect();

    IdentifyResult {
        score: record.score,
        taxon_name: record.species.scientific_name_without_author,
        author: record.species.scientific_name_authorship,
        family: record.species.family.and_then(|f| f.scientific_name),
        common_names: record.species.common_names,
        images,
        gbif_url: record.gbif.and_then(|g| gbif_species_url(&g.id)),
        url: None,
        additional_text: None,
        format_taxon_name: true,
    }
}

/// Pl@ntNet adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct PlantNetAdapter;

impl BackendAdapter for PlantNetAdapter {
    fn format(&self) -> BackendFormat {
        BackendFormat::Plantnet
    }

    fn build_request(
        &self,
        images: &[ImageAsset],
        api_url: &Url,
        api_key: Option<&str>,
        lang: &str,
    ) -> Result<IdentifyRequest, AdapterError> {
        let mut fields = Vec::with_capacity(images.len() * 2);
        for image in images {
            fields.push(FormField::Text {
                name: "organs",
                value: "auto".to_string(),
            });
            fields.push(FormField::Image {
                name: "images",
                image: image.clone(),
            });
        }

        let mut url = api_url.clone();
        url.query_pairs_mut()
            .append_pair("include-related-images", "true");
        append_common_query(&mut url, api_key, lang);

        Ok(IdentifyRequest { url, fields })
    }

    fn parse_response(
        &self,
        raw: &RawResponse,
        _api_url: &Url,
    ) -> Result<ResultBatch, AdapterError> {
        let envelope: Envelope = decode_body(BACKEND, raw)?;
        let reply = PlantNetReply::try_from(envelope).map_err(|detail| {
            if raw.is_success() {
                AdapterError::Parse {
                    backend: BACKEND,
                    detail,
                }
            } else {
                raw.http_error()
            }
        })?;

        match reply {
            PlantNetReply::Failure(message) => Err(raw.backend_error(message)),
            PlantNetReply::Success(_) if !raw.is_success() => Err(raw.http_error()),
            PlantNetReply::Success(records) => Ok(ResultBatch::new(
                records.into_iter().map(to_result).collect(),
            )),
        }
    }
}
