//! Markdown to HTML fragment rendering.
//!
//! Parsing is done by pulldown-cmark. This module only decides which extensions are
//! enabled, what happens to raw HTML embedded in the document, and how code blocks are
//! emitted when syntax highlighting is turned on.

use crate::config::{HighlightSettings, MarkdownSettings};
use crate::highlighting;
use log::debug;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Escapes the five characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Parser options for the given settings.
pub fn parser_options(settings: &MarkdownSettings) -> Options {
    let mut options = Options::empty();
    if settings.tables {
        options.insert(Options::ENABLE_TABLES);
    }
    if settings.strikethrough {
        options.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if settings.tasklists {
        options.insert(Options::ENABLE_TASKLISTS);
    }
    if settings.footnotes {
        options.insert(Options::ENABLE_FOOTNOTES);
    }
    if settings.smart_punctuation {
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
    }
    options
}

/// Code block being collected while highlighting is enabled.
struct PendingCode {
    language: String,
    text: String,
}

/// Renders Markdown into an HTML fragment suitable for a document `<body>`.
///
/// # Example
/// ```rust
/// use md2pdf::config::{HighlightSettings, MarkdownSettings};
/// use md2pdf::markdown::render_fragment;
///
/// let html = render_fragment(
///     "# Hello\n\nWorld",
///     &MarkdownSettings::default(),
///     &HighlightSettings::default(),
/// );
/// assert!(html.contains("<h1>Hello</h1>"));
/// assert!(html.contains("<p>World</p>"));
/// ```
pub fn render_fragment(
    markdown: &str,
    settings: &MarkdownSettings,
    highlight: &HighlightSettings,
) -> String {
    let parser = Parser::new_ext(markdown, parser_options(settings));

    let mut events: Vec<Event> = Vec::new();
    let mut pending: Option<PendingCode> = None;

    for event in parser {
        if pending.is_some() {
            match event {
                Event::Text(text) => {
                    if let Some(code) = pending.as_mut() {
                        code.text.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(code) = pending.take() {
                        events.push(Event::Html(CowStr::from(highlighted_block(
                            &code.language,
                            &code.text,
                            &highlight.theme,
                        ))));
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) if highlight.enabled => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                pending = Some(PendingCode {
                    language,
                    text: String::new(),
                });
            }
            Event::Start(Tag::HtmlBlock) if !settings.raw_html => {
                events.push(Event::Html(CowStr::Borrowed("<p>")));
            }
            Event::End(TagEnd::HtmlBlock) if !settings.raw_html => {
                events.push(Event::Html(CowStr::Borrowed("</p>\n")));
            }
            Event::Html(raw) | Event::InlineHtml(raw) if !settings.raw_html => {
                events.push(Event::Text(raw));
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Emits a complete `<pre><code>` block, coloured when the language is known.
fn highlighted_block(language: &str, code: &str, theme: &str) -> String {
    let body = match highlighting::highlight_to_html(code, language, theme) {
        Some(spans) => spans,
        None => {
            if !language.is_empty() {
                debug!("No syntax for '{}', leaving code block plain", language);
            }
            escape_html(code)
        }
    };
    if language.is_empty() {
        format!("<pre><code>{}</code></pre>\n", body)
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(language),
            body
        )
    }
}

/// Returns the plain text of the first level-1 heading, if any.
///
/// The document is parsed with the same extensions as the body, so inline markup such
/// as strikethrough never leaks into the title as literal markers.
///
/// # Example
/// ```rust
/// use md2pdf::config::MarkdownSettings;
/// use md2pdf::markdown::extract_title;
///
/// let settings = MarkdownSettings::default();
/// assert_eq!(extract_title("intro\n\n# The *Real* Title\n", &settings), Some("The Real Title".to_string()));
/// assert_eq!(extract_title("## Only a subsection", &settings), None);
/// ```
pub fn extract_title(markdown: &str, settings: &MarkdownSettings) -> Option<String> {
    let mut in_title = false;
    let mut title = String::new();

    for event in Parser::new_ext(markdown, parser_options(settings)) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_title = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let title = title.trim();
                return if title.is_empty() {
                    None
                } else {
                    Some(title.to_string())
                };
            }
            Event::Text(text) | Event::Code(text) if in_title => title.push_str(&text),
            Event::SoftBreak | Event::HardBreak if in_title => title.push(' '),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        render_fragment(
            markdown,
            &MarkdownSettings::default(),
            &HighlightSettings::default(),
        )
    }

    fn render_highlighted(markdown: &str) -> String {
        render_fragment(
            markdown,
            &MarkdownSettings::default(),
            &HighlightSettings {
                enabled: true,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_heading_and_paragraph() {
        let html = render("# Hello\n\nWorld");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
    }

    #[test]
    fn test_fenced_code_block_renders_in_pre_code() {
        let html = render("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"));
    }

    #[test]
    fn test_inline_code_and_emphasis() {
        let html = render("Use `cargo` with *care* and **force**, see [docs](https://docs.rs).");
        assert!(html.contains("<code>cargo</code>"));
        assert!(html.contains("<em>care</em>"));
        assert!(html.contains("<strong>force</strong>"));
        assert!(html.contains("<a href=\"https://docs.rs\">docs</a>"));
    }

    #[test]
    fn test_tables_and_strikethrough_enabled_by_default() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_extensions_can_be_disabled() {
        let settings = MarkdownSettings {
            tables: false,
            strikethrough: false,
            ..Default::default()
        };
        let html = render_fragment(
            "| a | b |\n|---|---|\n\n~~kept~~",
            &settings,
            &HighlightSettings::default(),
        );
        assert!(!html.contains("<table>"));
        assert!(!html.contains("<del>"));
    }

    #[test]
    fn test_tasklists_when_enabled() {
        let settings = MarkdownSettings {
            tasklists: true,
            ..Default::default()
        };
        let html = render_fragment("- [x] done\n- [ ] todo", &settings, &HighlightSettings::default());
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_raw_html_is_escaped_by_default() {
        let html = render("<div class=\"x\">block</div>\n\ntext with <span>inline</span>");
        assert!(!html.contains("<div class"));
        assert!(html.contains("&lt;div class="));
        assert!(html.contains("&gt;block&lt;/div&gt;"));
        assert!(html.contains("&lt;span&gt;inline&lt;/span&gt;"));
        assert!(html.starts_with("<p>"));
    }

    #[test]
    fn test_raw_html_passes_through_when_allowed() {
        let settings = MarkdownSettings {
            raw_html: true,
            ..Default::default()
        };
        let html = render_fragment(
            "<div class=\"x\">block</div>\n",
            &settings,
            &HighlightSettings::default(),
        );
        assert!(html.contains("<div class=\"x\">block</div>"));
    }

    #[test]
    fn test_highlighted_code_block_keeps_pre_code_wrapper() {
        let html = render_highlighted("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("<span style="));
        assert!(html.contains("</code></pre>"));
    }

    #[test]
    fn test_highlighting_unknown_language_is_escaped_text() {
        let html = render_highlighted("```nosuchlang\n<tag> & more\n```\n");
        assert!(html.contains("<pre><code class=\"language-nosuchlang\">&lt;tag&gt; &amp; more\n</code></pre>"));
    }

    #[test]
    fn test_highlighting_indented_block() {
        let html = render_highlighted("para\n\n    let x = 1;\n");
        assert!(html.contains("<pre><code>let x = 1;\n</code></pre>"));
    }

    #[test]
    fn test_highlighting_uses_first_word_of_info_string() {
        let html = render_highlighted("```python title=\"demo\"\nprint(1)\n```\n");
        assert!(html.contains("class=\"language-python\""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_extract_title() {
        let settings = MarkdownSettings::default();
        assert_eq!(extract_title("# Hello\n\nWorld", &settings), Some("Hello".to_string()));
        assert_eq!(
            extract_title("## Sub\n\n# Main `code` title\n\n# Second", &settings),
            Some("Main code title".to_string())
        );
        assert_eq!(extract_title("no headings here", &settings), None);
        assert_eq!(extract_title("#\n", &settings), None);
    }

    #[test]
    fn test_extract_title_follows_enabled_extensions() {
        let settings = MarkdownSettings::default();
        assert_eq!(
            extract_title("# ~~Old~~ New\n", &settings),
            Some("Old New".to_string())
        );

        let plain = MarkdownSettings {
            strikethrough: false,
            ..MarkdownSettings::default()
        };
        assert_eq!(
            extract_title("# ~~Old~~ New\n", &plain),
            Some("~~Old~~ New".to_string())
        );
    }

    #[test]
    fn test_empty_markdown_renders_empty_fragment() {
        assert_eq!(render(""), "");
    }
}
