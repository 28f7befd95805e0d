//! Synthesis voice selection and speech text preparation.

use serde::{Deserialize, Serialize};

/// One entry of the platform voice catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    pub name: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub is_default: bool,
}

impl VoiceDescriptor {
    pub fn new(name: impl Into<String>, lang: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            is_default,
        }
    }
}

/// Keyword lists steering [`select_voice`]. Keywords match whole words of
/// the voice name, case-insensitively, so "male" never matches "Female".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePreferences {
    pub excluded_keywords: Vec<String>,
    pub preferred_keywords: Vec<String>,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        let owned = |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            excluded_keywords: owned(&[
                "male", "man", "david", "mark", "george", "james", "guy", "daniel", "alex",
                "fred", "ryan", "thomas", "eric", "roger", "brian", "christopher",
            ]),
            preferred_keywords: owned(&[
                "female", "woman", "zira", "hazel", "susan", "samantha", "aria", "jenny",
                "victoria", "karen", "moira", "tessa", "serena", "libby", "sonia",
            ]),
        }
    }
}

/// Picks one voice index, or `None` for an empty catalog.
///
/// Voices matching an excluded keyword are skipped. Among the rest the
/// first preferred-keyword match wins, then the platform default, then the
/// first remaining voice. If every voice is excluded the first catalog entry
/// is used.
pub fn select_voice(voices: &[VoiceDescriptor], prefs: &VoicePreferences) -> Option<usize> {
    if voices.is_empty() {
        return None;
    }
    let candidates: Vec<usize> = (0..voices.len())
        .filter(|&i| !matches_any(&voices[i].name, &prefs.excluded_keywords))
        .collect();

    candidates
        .iter()
        .copied()
        .find(|&i| matches_any(&voices[i].name, &prefs.preferred_keywords))
        .or_else(|| candidates.iter().copied().find(|&i| voices[i].is_default))
        .or_else(|| candidates.first().copied())
        .or(Some(0))
}

fn matches_any(name: &str, keywords: &[String]) -> bool {
    let words = tokenize(name);
    keywords.iter().any(|keyword| {
        let needle = tokenize(keyword);
        !needle.is_empty() && words.windows(needle.len()).any(|window| window == needle.as_slice())
    })
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Strips markdown the synthesizer would read aloud: fenced code blocks,
/// heading and list markers, emphasis and inline-code characters.
pub fn speech_text(markdown: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let line = trimmed.trim_start_matches('#').trim_start();
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);
        let cleaned: String = line.chars().filter(|c| !matches!(*c, '*' | '`' | '_')).collect();
        if !cleaned.trim().is_empty() {
            out.push(cleaned.trim().to_string());
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[(&str, bool)]) -> Vec<VoiceDescriptor> {
        names
            .iter()
            .map(|(name, is_default)| VoiceDescriptor::new(*name, "en-US", *is_default))
            .collect()
    }

    #[test]
    fn female_keyword_beats_default() {
        let voices = catalog(&[
            ("Microsoft David - English", true),
            ("Google UK English Male", false),
            ("Google US English", false),
            ("Microsoft Zira - English", false),
        ]);
        assert_eq!(select_voice(&voices, &VoicePreferences::default()), Some(3));
    }

    #[test]
    fn default_wins_without_keyword_match() {
        let voices = catalog(&[("Voice A", false), ("Voice B", true), ("Voice C", false)]);
        assert_eq!(select_voice(&voices, &VoicePreferences::default()), Some(1));
    }

    #[test]
    fn excluded_default_falls_through_to_first_remaining() {
        let voices = catalog(&[("Daniel", true), ("Voice B", false)]);
        assert_eq!(select_voice(&voices, &VoicePreferences::default()), Some(1));
    }

    #[test]
    fn all_excluded_falls_back_to_first_entry() {
        let voices = catalog(&[("Alex", false), ("Fred", true)]);
        assert_eq!(select_voice(&voices, &VoicePreferences::default()), Some(0));
    }

    #[test]
    fn empty_catalog_has_no_voice() {
        assert_eq!(select_voice(&[], &VoicePreferences::default()), None);
    }

    #[test]
    fn female_is_not_excluded_by_male_keyword() {
        let voices = catalog(&[("Google UK English Female", false)]);
        assert!(!matches_any(&voices[0].name, &VoicePreferences::default().excluded_keywords));
    }

    #[test]
    fn speech_text_drops_markdown_noise() {
        let text = "# Title\nSome **bold** and `code`.\n```rust\nfn main() {}\n```\n- item";
        assert_eq!(speech_text(text), "Title\nSome bold and code.\nitem");
    }
}
