//! # AI Taxonomist Common Library
//!
//! Shared code for the AI Taxonomist crates including:
//! - Common error type
//! - TOML bootstrap configuration
//! - Widget event types and EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
