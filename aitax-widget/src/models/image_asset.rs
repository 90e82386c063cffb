//! Image blobs supplied by the file-capture collaborator

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// MIME types accepted by the image picker
pub const SUPPORTED_IMAGE_TYPES: [&str; 3] = ["image/jpg", "image/jpeg", "image/png"];

/// Opaque image blob with a name and MIME type
///
/// Bytes are shared, so cloning an asset (e.g. into a submission snapshot)
/// does not copy the image data.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    name: String,
    mime_type: String,
    data: Arc<[u8]>,
}

impl ImageAsset {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Load an image from disk, sniffing its MIME type from the content
    ///
    /// Falls back to `application/octet-stream` when the content type cannot
    /// be determined; callers decide whether to keep such files.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = infer::get(&data)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(name, mime_type, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the picker accepts this MIME type
    pub fn is_supported(&self) -> bool {
        SUPPORTED_IMAGE_TYPES.contains(&self.mime_type.as_str())
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}
