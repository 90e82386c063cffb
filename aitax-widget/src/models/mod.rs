//! Data models for the identification widget
//!
//! Backend-independent result model plus the inputs the core receives from
//! its collaborators (images, backend selector).

pub mod backend_format;
pub mod identify_result;
pub mod image_asset;
pub mod species;

pub use backend_format::BackendFormat;
pub use identify_result::{IdentifyResult, ImageRef, ResultBatch, MAX_RESULT_IMAGES};
pub use image_asset::{ImageAsset, SUPPORTED_IMAGE_TYPES};
pub use species::Species;
