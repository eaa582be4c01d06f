pub const JPEG: &str = "image/jpeg";

/// Sniff the container format from magic bytes. Returns `None` for anything
/// that is not a still image format we know how to hand to a vision model.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(JPEG),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => {
            tracing::debug!(
                "Unrecognized image format (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            None
        }
    }
}

pub fn is_jpeg(bytes: &[u8]) -> bool {
    detect_image_mime(bytes) == Some(JPEG)
}
