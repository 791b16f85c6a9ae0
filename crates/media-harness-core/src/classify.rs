//! Extension → modality classification.
//!
//! Fixed lookup tables; anything not listed is treated as text.

use crate::models::MediaType;

const IMAGE_TYPES: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const AUDIO_TYPES: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];
const VIDEO_TYPES: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "mkv"];

/// Extension used when a filename has none.
pub const DEFAULT_EXTENSION: &str = "txt";

/// Map a file extension to its [`MediaType`].
///
/// Case-insensitive; a leading `.` is ignored. Unknown extensions
/// default to [`MediaType::Text`].
///
/// ```rust
/// use media_harness_core::classify::media_type_for_extension;
/// use media_harness_core::MediaType;
///
/// assert_eq!(media_type_for_extension("PNG"), MediaType::Image);
/// assert_eq!(media_type_for_extension(".mkv"), MediaType::Video);
/// assert_eq!(media_type_for_extension("docx"), MediaType::Text);
/// ```
pub fn media_type_for_extension(extension: &str) -> MediaType {
    let ext = normalize_extension(extension);
    let ext = ext.as_str();
    if IMAGE_TYPES.contains(&ext) {
        MediaType::Image
    } else if AUDIO_TYPES.contains(&ext) {
        MediaType::Audio
    } else if VIDEO_TYPES.contains(&ext) {
        MediaType::Video
    } else {
        MediaType::Text
    }
}

/// Infer the extension of a filename: the text after the last `.`,
/// lower-cased, or [`DEFAULT_EXTENSION`] when there is none.
pub fn extension_of(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Lower-case an extension and strip a leading dot.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_classifies() {
        for ext in IMAGE_TYPES {
            assert_eq!(media_type_for_extension(ext), MediaType::Image);
        }
        for ext in AUDIO_TYPES {
            assert_eq!(media_type_for_extension(ext), MediaType::Audio);
        }
        for ext in VIDEO_TYPES {
            assert_eq!(media_type_for_extension(ext), MediaType::Video);
        }
    }

    #[test]
    fn unknown_and_empty_default_to_text() {
        assert_eq!(media_type_for_extension("md"), MediaType::Text);
        assert_eq!(media_type_for_extension(""), MediaType::Text);
        assert_eq!(media_type_for_extension("tiff"), MediaType::Text);
    }

    #[test]
    fn extension_of_takes_last_segment() {
        assert_eq!(extension_of("clip.final.MP4"), "mp4");
        assert_eq!(extension_of("/tmp/upload/notes.txt"), "txt");
    }

    #[test]
    fn extension_of_defaults_when_missing() {
        assert_eq!(extension_of("README"), "txt");
        assert_eq!(extension_of("trailing."), "txt");
        assert_eq!(extension_of("dir.d/README"), "txt");
    }
}
