//! Network-facing services
//!
//! - `http_transport`: the `Transport` seam and its reqwest implementation
//! - `identify_dispatcher`: one identify exchange, normalized
//! - `metadata_fetcher`: best-effort backend provenance
//! - `species_list`: species known to the backend

pub mod http_transport;
pub mod identify_dispatcher;
pub mod metadata_fetcher;
pub mod species_list;

pub use http_transport::{ReqwestTransport, Transport};
pub use identify_dispatcher::{IdentifyDispatcher, IdentifyOutcome, DEFAULT_LANG};
pub use metadata_fetcher::MetadataFetcher;
pub use species_list::SpeciesListClient;
