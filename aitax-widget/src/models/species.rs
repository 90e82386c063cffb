//! Species list entries served by the backend's `/taxa` endpoint

use serde::{Deserialize, Serialize};

/// One species known to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub species_id: String,
    /// Taxonomic rank, currently always `SPECIES`
    pub rank: String,
    #[serde(default)]
    pub authorship: String,
    #[serde(rename = "vernacularName", default)]
    pub vernacular_name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub genus: String,
    #[serde(default)]
    pub family: String,
}

impl Species {
    /// Case-insensitive match on scientific or vernacular name
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.vernacular_name.to_lowercase().contains(&query)
    }
}
