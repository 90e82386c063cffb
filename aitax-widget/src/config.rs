//! Configuration resolution for aitax-widget
//!
//! Each setting is resolved with priority CLI → ENV → TOML → built-in
//! default. Blank values are treated as absent at every tier.

use crate::models::BackendFormat;
use crate::services::DEFAULT_LANG;
use aitax_common::config::TomlConfig;
use aitax_common::{Error, Result};
use reqwest::Url;
use tracing::{debug, info};

/// Built-in backend endpoint
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Built-in image cap per identification
pub const DEFAULT_MAX_IMAGES: usize = 5;

pub const ENV_API_URL: &str = "AITAX_API_URL";
pub const ENV_API_KEY: &str = "AITAX_API_KEY";
pub const ENV_BACKEND: &str = "AITAX_BACKEND";
pub const ENV_MAX_IMAGES: &str = "AITAX_MAX_IMAGES";
pub const ENV_LANG: &str = "AITAX_LANG";

/// Configuration of one widget instance
///
/// Immutable once the widget is constructed.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Backend endpoint
    pub api_url: Url,
    /// Passed as the `api-key` query parameter when set
    pub api_key: Option<String>,
    pub backend_format: BackendFormat,
    /// Maximum images per identification (always > 0)
    pub max_images: usize,
    /// Client language tag, e.g. `fr`
    pub lang: String,
}

impl WidgetConfig {
    /// Configuration with built-in defaults for everything but the endpoint
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_key: None,
            backend_format: BackendFormat::default(),
            max_images: DEFAULT_MAX_IMAGES,
            lang: DEFAULT_LANG.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = is_valid_key(&key).then_some(key);
        self
    }

    pub fn with_backend(mut self, backend_format: BackendFormat) -> Self {
        self.backend_format = backend_format;
        self
    }

    /// Set the image cap; values below 1 are raised to 1
    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images.max(1);
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub backend_format: Option<String>,
    pub max_images: Option<usize>,
    pub lang: Option<String>,
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// First valid value among CLI, environment and TOML, with its source
fn pick(
    setting: &str,
    cli: Option<&String>,
    env_name: &str,
    toml: Option<&String>,
) -> Option<String> {
    let env_value = std::env::var(env_name).ok();
    let candidates = [
        ("command line", cli.cloned()),
        ("environment", env_value),
        ("TOML", toml.cloned()),
    ];

    candidates
        .into_iter()
        .find_map(|(source, value)| value.filter(|v| is_valid_key(v)).map(|v| (source, v)))
        .map(|(source, value)| {
            debug!(setting, source, "Resolved setting");
            value
        })
}

/// Parse and validate the backend endpoint
pub fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "API URL must use http or https, got '{}'",
            other
        ))),
    }
}

/// Language tag from a POSIX locale such as `fr_FR.UTF-8`
///
/// Returns `None` for the `C`/`POSIX` locales and unparseable values.
pub fn lang_from_locale(locale: &str) -> Option<String> {
    let lang = locale
        .split(['_', '.', '@', '-'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match lang.as_str() {
        "" | "c" | "posix" => None,
        l if l.len() <= 3 && l.chars().all(|c| c.is_ascii_alphabetic()) => Some(lang),
        _ => None,
    }
}

/// Client language from the process locale, defaulting to `en`
pub fn detect_lang() -> String {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|locale| lang_from_locale(&locale))
        .unwrap_or_else(|| DEFAULT_LANG.to_string())
}

/// `AITAX_MAX_IMAGES`, when set to a non-blank value
fn env_max_images() -> Result<Option<usize>> {
    match std::env::var(ENV_MAX_IMAGES).ok().filter(|v| is_valid_key(v)) {
        Some(value) => value.trim().parse::<usize>().map(Some).map_err(|e| {
            Error::Config(format!("Invalid {} '{}': {}", ENV_MAX_IMAGES, value, e))
        }),
        None => Ok(None),
    }
}

/// Resolve the widget configuration from all tiers
///
/// # Errors
/// Returns `Error::Config` for an invalid API URL, a non-numeric
/// `AITAX_MAX_IMAGES` not overridden on the command line, or a
/// `max_images` of zero.
pub fn resolve_config(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Result<WidgetConfig> {
    let api_url = pick(
        "api_url",
        overrides.api_url.as_ref(),
        ENV_API_URL,
        toml_config.api_url.as_ref(),
    )
    .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = parse_api_url(&api_url)?;

    let api_key = pick(
        "api_key",
        overrides.api_key.as_ref(),
        ENV_API_KEY,
        toml_config.api_key.as_ref(),
    );

    let backend_format = pick(
        "backend_format",
        overrides.backend_format.as_ref(),
        ENV_BACKEND,
        toml_config.backend_format.as_ref(),
    )
    .map(|name| BackendFormat::from_name(&name))
    .unwrap_or_default();

    let max_images = match overrides.max_images {
        Some(value) => value,
        None => env_max_images()?
            .or(toml_config.max_images)
            .unwrap_or(DEFAULT_MAX_IMAGES),
    };
    if max_images == 0 {
        return Err(Error::Config("max_images must be at least 1".to_string()));
    }

    let lang = pick(
        "lang",
        overrides.lang.as_ref(),
        ENV_LANG,
        toml_config.lang.as_ref(),
    )
    .unwrap_or_else(detect_lang);

    info!(
        api_url = %api_url,
        backend = %backend_format,
        max_images,
        lang = %lang,
        api_key = api_key.is_some(),
        "Widget configuration resolved"
    );

    Ok(WidgetConfig {
        api_url,
        api_key,
        backend_format,
        max_images,
        lang,
    })
}
