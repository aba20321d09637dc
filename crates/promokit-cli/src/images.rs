//! Reads local image files for upload.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use promokit_core::ImageFile;

/// MIME type from the file extension. Unknown extensions map to
/// `application/octet-stream`, which the image filter then rejects.
pub(crate) fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

pub(crate) fn read_image(path: &Path) -> anyhow::Result<ImageFile> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(ImageFile::new(name, guess_content_type(path), data))
}

pub(crate) fn read_images(paths: &[PathBuf]) -> anyhow::Result<Vec<ImageFile>> {
    paths.iter().map(|p| read_image(p)).collect()
}
