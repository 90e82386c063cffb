//! Test Helper Utilities
//!
//! Shared utilities for testing aitax-widget

#![allow(dead_code)]

pub mod log_capture;
pub mod mock_backend;
pub mod scripted_transport;

pub use log_capture::{capture_logs, LogCapture};
pub use mock_backend::{MockBackend, MockReply, RecordedRequest};
pub use scripted_transport::ScriptedTransport;

use aitax_widget::models::ImageAsset;

/// Minimal JPEG header, enough for MIME sniffing
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00];

/// PNG signature
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub fn jpeg(name: &str) -> ImageAsset {
    ImageAsset::new(name, "image/jpeg", JPEG_BYTES.to_vec())
}

/// `count` JPEG images named `photo_1.jpg`, `photo_2.jpg`, ...
pub fn photos(count: usize) -> Vec<ImageAsset> {
    (1..=count).map(|i| jpeg(&format!("photo_{}.jpg", i))).collect()
}

pub fn names(images: &[ImageAsset]) -> Vec<String> {
    images.iter().map(|i| i.name().to_string()).collect()
}
