//! Documents exposed by canvas cards for copy and download.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Text,
    Markdown,
    Html,
}

/// Extracted or generated content a canvas card offers to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExport {
    pub title: String,
    pub body: String,
    pub format: BodyFormat,
}

impl DocumentExport {
    pub fn new(title: impl Into<String>, body: impl Into<String>, format: BodyFormat) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            format,
        }
    }

    /// True when the body should be treated as markup.
    pub fn is_markup(&self) -> bool {
        self.format == BodyFormat::Html || self.body.trim_start().starts_with('<')
    }

    /// Download extension: `.html` for markup, `.py` / `.json` when the title
    /// names a script or JSON document, `.txt` otherwise.
    pub fn file_extension(&self) -> &'static str {
        if self.is_markup() {
            return "html";
        }
        let words: Vec<String> = self
            .title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();
        if words.iter().any(|word| word == "script") {
            "py"
        } else if words.iter().any(|word| word == "json") {
            "json"
        } else {
            "txt"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BodyFormat, DocumentExport};

    fn doc(title: &str, body: &str) -> DocumentExport {
        DocumentExport::new(title, body, BodyFormat::Text)
    }

    #[test]
    fn extension_follows_title_and_body() {
        assert_eq!(doc("Scraper Script", "print(1)").file_extension(), "py");
        assert_eq!(doc("Config JSON", "{}").file_extension(), "json");
        assert_eq!(doc("Meeting notes", "hello").file_extension(), "txt");
        assert_eq!(doc("Script", "<div>markup</div>").file_extension(), "html");
        assert_eq!(
            DocumentExport::new("Page", "plain", BodyFormat::Html).file_extension(),
            "html"
        );
    }

    #[test]
    fn words_match_whole_tokens_only() {
        assert_eq!(doc("Transcripts", "x").file_extension(), "txt");
        assert_eq!(doc("jsonl dump", "x").file_extension(), "txt");
    }
}
