//! Cos4Cloud (C4C) AI taxonomist adapter
//!
//! Request: `info=true` followed by one `image=<file>` per image, posted to
//! `<api_url>/identify?lang=..[&api-key=..]`.
//!
//! Errors are signalled by `{"status": "error"}` with no message; the
//! literal status is reported to the user.

use super::{
    append_common_query, decode_body, gbif_species_url, with_path_segment, BackendAdapter,
    FormField, IdentifyRequest, RawResponse,
};
use crate::error::AdapterError;
use crate::models::{
    BackendFormat, IdentifyResult, ImageAsset, ImageRef, ResultBatch, MAX_RESULT_IMAGES,
};
use reqwest::Url;
use serde::Deserialize;

const BACKEND: &str = "C4C";
const ERROR_STATUS: &str = "error";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    /// Decoded only once `status` rules out an error reply
    #[serde(default)]
    results: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct C4cRecord {
    #[serde(default)]
    name: Option<String>,
    score: f64,
    #[serde(rename = "gbif_id", default)]
    gbif_id: serde_json::Value,
    #[serde(default)]
    authorship: Option<String>,
    #[serde(default)]
    vernacular_name: Option<String>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    images: Vec<C4cImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct C4cImage {
    url: String,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    rights_holder: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
}

/// Envelope narrowed on the `status` discriminant
#[derive(Debug)]
enum C4cReply {
    Failure(String),
    Success(Vec<C4cRecord>),
}

impl TryFrom<Envelope> for C4cReply {
    type Error = String;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match (envelope.status, envelope.results) {
            (Some(status), _) if status == ERROR_STATUS => Ok(C4cReply::Failure(status)),
            (_, Some(results)) => serde_json::from_value(results)
                .map(C4cReply::Success)
                .map_err(|e| e.to_string()),
            (Some(status), None) => Err(format!("unexpected status `{}` without results", status)),
            (None, None) => Err("missing `results` array".to_string()),
        }
    }
}

fn image_alt(image: &C4cImage) -> String {
    let publisher = image
        .publisher
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{} - ", p))
        .unwrap_or_default();
    format!(
        "{}{} - {}",
        publisher,
        image.rights_holder.as_deref().unwrap_or_default(),
        image.license.as_deref().unwrap_or_default()
    )
}

fn to_result(record: C4cRecord) -> IdentifyResult {
    let images = record
        .images
        .iter()
        .take(MAX_RESULT_IMAGES)
        .map(|image| ImageRef {
            url: image.url.clone(),
            alt: image_alt(image),
        })
        .collect();

    IdentifyResult {
        score: record.score,
        taxon_name: record.name,
        author: record.authorship,
        family: record.family,
        common_names: record.vernacular_name.into_iter().collect(),
        images,
        gbif_url: gbif_species_url(&record.gbif_id),
        url: None,
        additional_text: None,
        format_taxon_name: true,
    }
}

/// Cos4Cloud adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct C4cAdapter;

impl BackendAdapter for C4cAdapter {
    fn format(&self) -> BackendFormat {
        BackendFormat::C4c
    }

    fn build_request(
        &self,
        images: &[ImageAsset],
        api_url: &Url,
        api_key: Option<&str>,
        lang: &str,
    ) -> Result<IdentifyRequest, AdapterError> {
        let mut fields = Vec::with_capacity(images.len() + 1);
        fields.push(FormField::Text {
            name: "info",
            value: "true".to_string(),
        });
        fields.extend(images.iter().map(|image| FormField::Image {
            name: "image",
            image: image.clone(),
        }));

        let mut url = with_path_segment(api_url, "identify")?;
        append_common_query(&mut url, api_key, lang);

        Ok(IdentifyRequest { url, fields })
    }

    fn parse_response(
        &self,
        raw: &RawResponse,
        _api_url: &Url,
    ) -> Result<ResultBatch, AdapterError> {
        let envelope: Envelope = decode_body(BACKEND, raw)?;
        let reply = C4cReply::try_from(envelope).map_err(|detail| {
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
            C4cReply::Failure(status) => Err(raw.backend_error(status)),
            C4cReply::Success(_) if !raw.is_success() => Err(raw.http_error()),
            C4cReply::Success(records) => Ok(ResultBatch::new(
                records.into_iter().map(to_result).collect(),
            )),
        }
    }
}
