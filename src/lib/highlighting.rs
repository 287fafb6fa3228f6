//! Syntax highlighting module using syntect.
//!
//! Produces inline-styled `<span>` markup for the contents of fenced code blocks, so the
//! colours survive into the printed PDF without any external stylesheet.

use lazy_static::lazy_static;
use log::debug;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Theme used when the configured one does not exist.
pub const FALLBACK_THEME: &str = "InspiredGitHub";

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
}

/// Maps common fence labels that syntect does not know by name or extension.
fn language_alias(language: &str) -> &str {
    match language {
        "shell" | "zsh" | "console" | "shell-session" => "bash",
        "yml" => "yaml",
        "golang" => "go",
        "c++" => "cpp",
        "py3" | "python3" => "python",
        "rs" => "rust",
        "jsonc" => "json",
        other => other,
    }
}

fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let language = language.trim().to_lowercase();
    if language.is_empty() {
        return None;
    }
    SYNTAX_SET.find_syntax_by_token(language_alias(&language))
}

fn find_theme(name: &str) -> Option<&'static Theme> {
    THEME_SET
        .themes
        .get(name)
        .or_else(|| THEME_SET.themes.get(FALLBACK_THEME))
        .or_else(|| THEME_SET.themes.values().next())
}

/// Highlights `code` as `language` and returns HTML spans with inline colours.
///
/// The result is meant to sit inside `<pre><code>`; it carries no wrapper element and no
/// background colour. Returns `None` when the language is unknown, so the caller can
/// fall back to plain escaped text.
///
/// # Examples
///
/// ```
/// use md2pdf::highlighting::highlight_to_html;
///
/// let html = highlight_to_html("fn main() {}\n", "rust", "InspiredGitHub").unwrap();
/// assert!(html.contains("<span"));
/// assert!(html.contains("main"));
///
/// assert!(highlight_to_html("whatever", "no-such-language", "InspiredGitHub").is_none());
/// ```
pub fn highlight_to_html(code: &str, language: &str, theme_name: &str) -> Option<String> {
    let syntax = find_syntax(language)?;
    let theme = find_theme(theme_name)?;

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut html = String::with_capacity(code.len() * 4);
    for line in LinesWithEndings::from(code) {
        let regions = match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(regions) => regions,
            Err(e) => {
                debug!("Highlighting '{}' failed: {}", language, e);
                return None;
            }
        };
        match styled_line_to_highlighted_html(&regions, IncludeBackground::No) {
            Ok(spans) => html.push_str(&spans),
            Err(e) => {
                debug!("Highlighting '{}' failed: {}", language, e);
                return None;
            }
        }
    }
    Some(html)
}

/// Names of the bundled themes, sorted.
pub fn available_themes() -> Vec<String> {
    let mut themes: Vec<String> = THEME_SET.themes.keys().cloned().collect();
    themes.sort();
    themes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages_are_highlighted() {
        for language in ["rust", "Python", "js", "bash", "sh", "shell", "yml", "c++"] {
            assert!(
                highlight_to_html("x = 1\n", language, FALLBACK_THEME).is_some(),
                "expected '{}' to be recognised",
                language
            );
        }
    }

    #[test]
    fn test_unknown_or_empty_language_is_none() {
        assert!(highlight_to_html("x", "", FALLBACK_THEME).is_none());
        assert!(highlight_to_html("x", "definitely-not-a-language", FALLBACK_THEME).is_none());
    }

    #[test]
    fn test_highlighted_output_escapes_markup() {
        let html = highlight_to_html("let s = \"<b>&</b>\";\n", "rust", FALLBACK_THEME).unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("&amp;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let fallback = highlight_to_html("fn a() {}\n", "rust", FALLBACK_THEME).unwrap();
        let unknown = highlight_to_html("fn a() {}\n", "rust", "No Such Theme").unwrap();
        assert_eq!(fallback, unknown);
    }

    #[test]
    fn test_no_background_colour_is_emitted() {
        let html = highlight_to_html("fn a() {}\n", "rust", FALLBACK_THEME).unwrap();
        assert!(!html.contains("background-color"));
    }

    #[test]
    fn test_available_themes_contains_fallback() {
        let themes = available_themes();
        assert!(themes.iter().any(|t| t == FALLBACK_THEME));
        let mut sorted = themes.clone();
        sorted.sort();
        assert_eq!(themes, sorted);
    }
}
