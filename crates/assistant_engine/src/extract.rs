use scraper::{Html, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "head", "template", "noscript"];

/// Readable plain text of an HTML fragment, one line per block element.
/// Used as the plain half of a rich clipboard write.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_TAGS.contains(&element.name()) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    matches!(ancestor.value(), Node::Element(element) if HIDDEN_TAGS.contains(&element.name()))
                });
                if hidden {
                    continue;
                }
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !out.is_empty() && !out.ends_with(&[' ', '\n'][..]) {
                            out.push(' ');
                        }
                    } else {
                        out.push(c);
                    }
                }
            }
            _ => {}
        }
    }

    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<title>` of a full document, if any.
pub fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = scraper::Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blocks_become_lines_and_inline_text_joins() {
        let html = "<h1>Report</h1><p>Total is <b>12</b>\n   units.</p><ul><li>one</li><li>two</li></ul>";
        assert_eq!(html_to_text(html), "Report\nTotal is 12 units.\none\ntwo");
    }

    #[test]
    fn scripts_and_styles_are_skipped() {
        let html = "<style>p{color:red}</style><p>visible</p><script>alert(1)</script>";
        assert_eq!(html_to_text(html), "visible");
    }

    #[test]
    fn title_is_read_from_full_documents() {
        let html = "<html><head><title> Example Domain </title></head><body>x</body></html>";
        assert_eq!(document_title(html).as_deref(), Some("Example Domain"));
        assert_eq!(document_title("<p>none</p>"), None);
    }
}
