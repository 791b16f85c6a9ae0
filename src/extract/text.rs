use media_harness_core::Features;

use super::{Extraction, SourceFile};

/// Text files are stored verbatim. Invalid UTF-8 is replaced, not rejected.
pub fn extract_text(bytes: &[u8], source: &SourceFile) -> Extraction {
    let mut features = Features::new();
    features.insert("size".into(), source.size_kb().into());
    features.insert("format".into(), source.extension.clone().into());

    Extraction {
        content: String::from_utf8_lossy(bytes).into_owned(),
        extracted_text: String::new(),
        features,
        degradation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn text_is_kept_verbatim() {
        let source = SourceFile {
            path: PathBuf::from("notes.md"),
            filename: "notes.md".to_string(),
            extension: "md".to_string(),
            size_bytes: 2048,
        };
        let extraction = extract_text(b"# Title\n\nbody \xff", &source);
        assert_eq!(extraction.content, "# Title\n\nbody \u{fffd}");
        assert_eq!(extraction.features["format"], "md");
        assert_eq!(extraction.features["size"], 2);
        assert!(!extraction.is_degraded());
    }
}
