//! Backend wire format selector

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identification backend protocol
///
/// Chosen once per widget instance; determines which adapter pair is used
/// for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum BackendFormat {
    /// Pl@ntNet identify API
    #[default]
    Plantnet,
    /// Cos4Cloud AI taxonomist
    C4c,
    /// Carpeso fodder classifier
    Carpeso,
}

impl BackendFormat {
    /// All supported formats
    pub const ALL: [BackendFormat; 3] = [
        BackendFormat::Plantnet,
        BackendFormat::C4c,
        BackendFormat::Carpeso,
    ];

    /// Wire name used in configuration (`pn`, `c4c`, `carp`)
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendFormat::Plantnet => "pn",
            BackendFormat::C4c => "c4c",
            BackendFormat::Carpeso => "carp",
        }
    }

    /// Parse a configured format name
    ///
    /// Unrecognized names fall back to [`BackendFormat::Plantnet`] with a
    /// warning instead of failing.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pn" | "plantnet" => BackendFormat::Plantnet,
            "c4c" => BackendFormat::C4c,
            "carp" | "carpeso" => BackendFormat::Carpeso,
            other => {
                tracing::warn!(
                    backend = other,
                    "Unrecognized backend format, falling back to PlantNet"
                );
                BackendFormat::Plantnet
            }
        }
    }
}

impl fmt::Display for BackendFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BackendFormat {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<&str> for BackendFormat {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<BackendFormat> for &'static str {
    fn from(format: BackendFormat) -> Self {
        format.as_str()
    }
}
