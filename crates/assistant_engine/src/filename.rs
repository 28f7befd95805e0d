use assistant_core::DocumentExport;
use sha2::{Digest, Sha256};

const MAX_STEM_CHARS: usize = 80;

/// Windows-safe, deterministic download name:
/// `{sanitized_title}--{short_hash(body)}.{ext}`, where `ext` follows the
/// document's title/body heuristic.
pub fn export_filename(document: &DocumentExport) -> String {
    let sanitized = sanitize_title(&document.title);
    let hash = short_hash(&document.body);
    format!("{sanitized}--{hash}.{}", document.file_extension())
}

fn sanitize_title(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut stem: String = compacted
        .trim_matches(&['_', '.'][..])
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        stem = "canvas".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::BodyFormat;

    fn doc(title: &str, body: &str) -> DocumentExport {
        DocumentExport::new(title, body, BodyFormat::Text)
    }

    #[test]
    fn name_is_sanitized_and_hash_suffixed() {
        let name = export_filename(&doc("Q3: report/draft?", "body"));
        assert!(name.starts_with("Q3_report_draft--"), "{name}");
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), "Q3_report_draft--".len() + 8 + ".txt".len());
    }

    #[test]
    fn same_document_gives_same_name() {
        let a = export_filename(&doc("Notes", "same"));
        let b = export_filename(&doc("Notes", "same"));
        let c = export_filename(&doc("Notes", "different"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn reserved_and_empty_titles_are_adjusted() {
        assert!(export_filename(&doc("CON", "x")).starts_with("CON_--"));
        assert!(export_filename(&doc("???", "x")).starts_with("canvas--"));
    }

    #[test]
    fn long_titles_are_cut_on_char_boundaries() {
        let title = "é".repeat(120);
        let name = export_filename(&doc(&title, "x"));
        let stem = name.split("--").next().unwrap_or_default();
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn extension_follows_document_heuristic() {
        assert!(export_filename(&doc("Build Script", "print(1)")).ends_with(".py"));
        assert!(export_filename(&DocumentExport::new("Page", "<p>x</p>", BodyFormat::Html))
            .ends_with(".html"));
    }
}
