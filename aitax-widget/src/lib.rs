//! aitax-widget library interface
//!
//! Client core of the AI taxonomist plant identification widget: backend
//! adapters, identify dispatcher, identification state machine and
//! metadata lookup.

pub mod adapters;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod widget;

pub use crate::config::WidgetConfig;
pub use crate::error::{AdapterError, TransportError};
pub use crate::models::{BackendFormat, IdentifyResult, ImageAsset, ResultBatch};
pub use crate::services::{IdentifyDispatcher, IdentifyOutcome};
pub use crate::widget::{IdentificationWidget, IdentifyState, WidgetSession};
