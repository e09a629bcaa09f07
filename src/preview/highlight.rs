//! Syntax highlighting for fenced code blocks in the preview

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const DARK_THEME: &str = "base16-ocean.dark";
const LIGHT_THEME: &str = "InspiredGitHub";

/// A run of text with one foreground color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub text: String,
    pub color: [u8; 3],
}

pub type HighlightedLine = Vec<HighlightSpan>;

/// Owns the loaded syntax definitions and the active theme
pub struct CodeHighlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl CodeHighlighter {
    pub fn new(dark: bool) -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let mut themes = ThemeSet::load_defaults();
        let name = if dark { DARK_THEME } else { LIGHT_THEME };
        let theme = themes.themes.remove(name).unwrap_or_default();
        Self { syntaxes, theme }
    }

    /// Highlight `source`, falling back to plain text for unknown languages
    pub fn highlight(&self, language: Option<&str>, source: &str) -> Vec<HighlightedLine> {
        let syntax = language
            .and_then(|lang| self.syntaxes.find_syntax_by_token(lang))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(source) {
            let spans = match highlighter.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => ranges
                    .into_iter()
                    .map(|(style, text)| HighlightSpan {
                        text: text.trim_end_matches(['\n', '\r']).to_string(),
                        color: [style.foreground.r, style.foreground.g, style.foreground.b],
                    })
                    .filter(|span| !span.text.is_empty())
                    .collect(),
                Err(e) => {
                    log::debug!("highlighting failed, using plain text: {}", e);
                    vec![HighlightSpan {
                        text: line.trim_end_matches(['\n', '\r']).to_string(),
                        color: [0x80, 0x80, 0x80],
                    }]
                }
            };
            lines.push(spans);
        }
        lines
    }
}

impl std::fmt::Debug for CodeHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeHighlighter")
            .field("theme", &self.theme.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_language_is_split_into_spans() {
        let highlighter = CodeHighlighter::new(true);
        let lines = highlighter.highlight(Some("rust"), "fn main() {}\nlet x = 1;\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].len() > 1);
        let text: String = lines[0].iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "fn main() {}");
    }

    #[test]
    fn test_unknown_language_keeps_text() {
        let highlighter = CodeHighlighter::new(false);
        let lines = highlighter.highlight(Some("no-such-lang"), "a b c");
        let text: String = lines[0].iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "a b c");
    }
}
