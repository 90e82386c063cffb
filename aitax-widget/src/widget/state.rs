//! Identification lifecycle state

use crate::models::ResultBatch;
use serde::{Deserialize, Serialize};

/// Lifecycle of one identification
///
/// Exactly one variant is current. A result batch and an error message can
/// never coexist: each lives in its own variant and the whole value is
/// replaced on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum IdentifyState {
    /// No images selected, nothing submitted
    Idle,
    /// One identify exchange is in flight
    Loading,
    /// Last exchange produced a batch (possibly empty)
    Loaded(ResultBatch),
    /// Last exchange failed with a user-visible message
    Error(String),
}

impl IdentifyState {
    /// Fresh initial state
    pub fn initial() -> Self {
        IdentifyState::Idle
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, IdentifyState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, IdentifyState::Loading)
    }

    pub fn batch(&self) -> Option<&ResultBatch> {
        match self {
            IdentifyState::Loaded(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            IdentifyState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Lowercase variant name for logs
    pub fn name(&self) -> &'static str {
        match self {
            IdentifyState::Idle => "idle",
            IdentifyState::Loading => "loading",
            IdentifyState::Loaded(_) => "loaded",
            IdentifyState::Error(_) => "error",
        }
    }
}

impl Default for IdentifyState {
    fn default() -> Self {
        Self::initial()
    }
}
