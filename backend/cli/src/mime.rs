//! Image MIME type detection by file extension, for labeling the payload
//! sent to vision providers.

use std::path::Path;

/// Detect the MIME type of an image file; `None` for non-image extensions.
pub fn detect_image_mime(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png"          => Some("image/png"),
        "gif"          => Some("image/gif"),
        "webp"         => Some("image/webp"),
        "bmp"          => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}
