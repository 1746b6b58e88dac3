//! Local preview of the photo attached to a report. Never touches the network.

use std::path::{Path, PathBuf};

use bytesize::ByteSize;

/// Longest edge of the preview thumbnail, in pixels.
pub const THUMBNAIL_EDGE: u32 = 320;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a supported image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("preview task failed: {0}")]
    Join(String),
}

/// Image bytes as they will be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImagePreview {
    pub attachment: Attachment,
    /// Full image dimensions.
    pub width: u32,
    pub height: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Thumbnail as RGBA8.
    pub pixels: Vec<u8>,
}

impl ImagePreview {
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, PreviewError> {
        let filename = filename.into();
        let decoded = image::load_from_memory(&bytes)?;
        let (width, height) = (decoded.width(), decoded.height());
        let thumbnail = decoded.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgba8();
        let (thumbnail_width, thumbnail_height) = thumbnail.dimensions();

        Ok(Self {
            attachment: Attachment {
                mime: detected_mime(&bytes).unwrap_or_else(|| mime_for(&filename)).to_string(),
                filename,
                bytes,
            },
            width,
            height,
            thumbnail_width,
            thumbnail_height,
            pixels: thumbnail.into_raw(),
        })
    }

    pub fn size_label(&self) -> String {
        ByteSize::b(self.attachment.bytes.len() as u64).to_string()
    }

    pub fn caption(&self) -> String {
        format!(
            "{} ({}x{}, {})",
            self.attachment.filename,
            self.width,
            self.height,
            self.size_label()
        )
    }
}

/// Reads and decodes `path` off the UI thread.
pub async fn load_preview(path: PathBuf) -> Result<ImagePreview, PreviewError> {
    let bytes = tokio::fs::read(&path).await.map_err(|source| PreviewError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let filename = file_name(&path);
    tokio::task::spawn_blocking(move || ImagePreview::from_bytes(filename, bytes))
        .await
        .map_err(|err| PreviewError::Join(err.to_string()))?
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// MIME type of the format `image` recognises in `bytes`.
fn detected_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

/// MIME type from the file extension; JPEG when unknown.
pub fn mime_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".bmp") {
        "image/bmp"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
