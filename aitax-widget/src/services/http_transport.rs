//! HTTP transport
//!
//! The only place network I/O happens. The [`Transport`] trait is the seam
//! between the dispatcher/fetchers and the network, so the core can be
//! driven by an in-memory transport in tests.

use crate::adapters::{FormField, IdentifyRequest, RawResponse};
use crate::error::TransportError;
use crate::models::ImageAsset;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::time::Duration;

const USER_AGENT: &str = concat!("aitax/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Network exchange used by the identify dispatcher and metadata fetchers
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST an identify request as multipart form data
    async fn send(&self, request: IdentifyRequest) -> Result<RawResponse, TransportError>;

    /// Plain GET
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (custom timeouts, proxies)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn into_raw(response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status();
        let body = response.text().await?;

        Ok(RawResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body,
        ))
    }
}

fn image_part(image: &ImageAsset) -> Part {
    let part = Part::bytes(image.data().to_vec()).file_name(image.name().to_string());
    match part.mime_str(image.mime_type()) {
        Ok(part) => part,
        Err(e) => {
            tracing::warn!(
                image = image.name(),
                mime_type = image.mime_type(),
                error = %e,
                "Invalid image MIME type, sending part without content type"
            );
            Part::bytes(image.data().to_vec()).file_name(image.name().to_string())
        }
    }
}

fn build_form(fields: Vec<FormField>) -> Form {
    fields.into_iter().fold(Form::new(), |form, field| match field {
        FormField::Text { name, value } => form.text(name, value),
        FormField::Image { name, image } => form.part(name, image_part(&image)),
    })
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: IdentifyRequest) -> Result<RawResponse, TransportError> {
        let form = build_form(request.fields);
        let response = self
            .client
            .post(request.url)
            .multipart(form)
            .send()
            .await?;

        Self::into_raw(response).await
    }

    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        Self::into_raw(response).await
    }
}
