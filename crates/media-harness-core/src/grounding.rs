//! Grounding-context assembly.
//!
//! Turns a ranked, already-truncated list of documents into the single
//! context block handed to the generation provider. Each modality gets its
//! own header and body; text documents pass through verbatim.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Document, MediaType};

fn coordinate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[at \([^\]]*\)\]").expect("valid coordinate regex"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Strip `[at (...)]` coordinate annotations, collapse whitespace, trim.
///
/// Iterates to a fixed point: removing one annotation or collapsing a
/// newline can expose another annotation, and the result must contain
/// none, so `clean(clean(x)) == clean(x)`.
///
/// ```rust
/// use media_harness_core::grounding::clean_extracted_text;
///
/// let raw = "Total [at (10,20) (50,20) (50,30) (10,30)]   due\n today";
/// assert_eq!(clean_extracted_text(raw), "Total due today");
/// ```
pub fn clean_extracted_text(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = coordinate_pattern().replace_all(&current, "");
        let collapsed = whitespace_pattern().replace_all(&stripped, " ");
        let next = collapsed.trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Lines of a video document's content that carry a frame timestamp:
/// they begin with `[` and contain `s]`.
pub fn key_moment_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| line.starts_with('[') && line.contains("s]"))
        .collect()
}

/// Format one document for the grounding block.
pub fn format_document(doc: &Document) -> String {
    match doc.media_type {
        MediaType::Video => {
            let mut block = format!("[Video: {}]\n", doc.filename);
            if !doc.extracted_text.is_empty() {
                block.push_str(&format!(
                    "Transcription: {}\n",
                    clean_extracted_text(&doc.extracted_text)
                ));
            }
            let moments: Vec<String> = key_moment_lines(&doc.content)
                .into_iter()
                .map(clean_extracted_text)
                .collect();
            if !moments.is_empty() {
                block.push_str(&format!("Key moments:\n{}\n", moments.join("\n")));
            }
            block
        }
        MediaType::Audio => {
            let mut block = format!("[Audio: {}]\n", doc.filename);
            if !doc.extracted_text.is_empty() {
                block.push_str(&format!(
                    "Transcription: {}\n",
                    clean_extracted_text(&doc.extracted_text)
                ));
            }
            block
        }
        MediaType::Image => {
            let mut block = format!("[Image: {}]\n", doc.filename);
            if !doc.extracted_text.is_empty() {
                block.push_str(&format!(
                    "Content: {}\n",
                    clean_extracted_text(&doc.extracted_text)
                ));
            }
            block
        }
        MediaType::Text => doc.content.clone(),
    }
}

/// Concatenate formatted documents, separated by a blank line, in the
/// order given.
pub fn build_context(docs: &[Document]) -> String {
    docs.iter()
        .map(format_document)
        .collect::<Vec<_>>()
        .join("\n\n")
}
