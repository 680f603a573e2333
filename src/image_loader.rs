//! # Snapshot Loading
//!
//! Loads a rendered document image from a file path, a data URI, or a raw
//! base64 string. PNG and JPEG are accepted; anything else is a
//! precondition failure, since there is no document to export.

use image::RgbaImage;

use crate::error::{ExportError, Result};

/// Load and decode a snapshot from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` data URI
/// - File path (absolute or relative), read from disk
/// - Raw base64-encoded image data
pub fn load_snapshot(src: &str) -> Result<RgbaImage> {
    let raw_bytes = read_source_bytes(src)?;
    decode_snapshot_bytes(&raw_bytes)
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>> {
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| ExportError::Precondition("invalid data URI: missing comma".into()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Anything that exists on disk is a path. Base64 strings may contain
    // '/', so the existence check comes before the fallback.
    let path = std::path::Path::new(src);
    if path.exists() {
        return std::fs::read(path).map_err(|e| {
            ExportError::Precondition(format!("failed to read snapshot '{}': {}", src, e))
        });
    }
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return Err(ExportError::Precondition(format!(
            "snapshot file '{}' does not exist",
            src
        )));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| ExportError::Precondition(format!("base64 decode error: {}", e)))
}

/// Detect the format from magic bytes and decode to RGBA.
fn decode_snapshot_bytes(data: &[u8]) -> Result<RgbaImage> {
    if data.len() < 4 {
        return Err(ExportError::Precondition("snapshot data too short".into()));
    }
    if !is_jpeg(data) && !is_png(data) {
        return Err(ExportError::Precondition(
            "unsupported snapshot format (expected JPEG or PNG)".into(),
        ));
    }

    let img = image::load_from_memory(data)
        .map_err(|e| ExportError::Precondition(format!("failed to decode snapshot: {}", e)))?;
    Ok(img.to_rgba8())
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}
