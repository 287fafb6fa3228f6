//! The HTML document wrapped around every rendered fragment.
//!
//! The skeleton, the built-in stylesheet and the page readiness script live in `assets/`
//! and are compiled into the binary. Every document carries the UTF-8 charset
//! declaration and the built-in style rules; a user stylesheet can only be added after
//! them.

use crate::markdown::escape_html;
use log::error;
use rust_embed::RustEmbed;
use std::borrow::Cow;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Built-in stylesheet applied to every document.
pub const BASE_STYLESHEET: &str = "base.css";
/// Script evaluated in the page before printing; resolves once the page has settled.
pub const SETTLE_SCRIPT: &str = "settle.js";
const TEMPLATE: &str = "template.html";

/// Returns an embedded asset as text.
pub fn asset(name: &str) -> Cow<'static, str> {
    match Assets::get(name) {
        Some(file) => match file.data {
            Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
            Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        },
        None => {
            error!("Embedded asset '{}' is missing", name);
            Cow::Borrowed("")
        }
    }
}

/// The variable parts of a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    /// Plain text, escaped on insertion.
    pub title: String,
    /// Directory URL relative links and images resolve against.
    pub base_href: Option<String>,
    /// CSS appended after the built-in rules.
    pub extra_css: Option<String>,
}

/// Substitutes `{{name}}` placeholders in a single pass.
///
/// Replacement values are never rescanned, so content that happens to contain a
/// placeholder is inserted verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Wraps an HTML fragment into the complete document.
///
/// # Example
/// ```rust
/// use md2pdf::template::{compose, DocumentParts};
///
/// let html = compose("<h1>Hi</h1>", &DocumentParts {
///     title: "Hi & bye".to_string(),
///     ..Default::default()
/// });
/// assert!(html.starts_with("<!DOCTYPE html>"));
/// assert!(html.contains("<meta charset=\"utf-8\" />"));
/// assert!(html.contains("<title>Hi &amp; bye</title>"));
/// assert!(html.contains("<body><h1>Hi</h1></body>"));
/// ```
pub fn compose(fragment: &str, parts: &DocumentParts) -> String {
    let title = escape_html(&parts.title);
    let head = match &parts.base_href {
        Some(href) => format!("    <base href=\"{}\" />\n", escape_html(href)),
        None => String::new(),
    };
    let extra_style = match &parts.extra_css {
        // A stray closing tag would end the style element early.
        Some(css) => format!("    <style>\n{}\n    </style>\n", css.replace("</style", "<\\/style")),
        None => String::new(),
    };
    let style = asset(BASE_STYLESHEET);
    let template = asset(TEMPLATE);

    fill(
        &template,
        &[
            ("title", title.as_str()),
            ("head", head.as_str()),
            ("style", style.as_ref()),
            ("extra_style", extra_style.as_str()),
            ("body", fragment),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXED_RULES: [&str; 3] = [
        "body { font-family: sans-serif; line-height: 1.6; padding: 2rem; }",
        "code { background: #f4f4f4; padding: 0.2rem 0.4rem; border-radius: 4px; }",
        "pre { background: #f4f4f4; padding: 1rem; overflow: auto; }",
    ];

    #[test]
    fn test_fixed_rules_and_charset_always_present() {
        for fragment in ["", "<p>x</p>", "<style>body{}</style>"] {
            let html = compose(fragment, &DocumentParts::default());
            assert!(html.contains("<meta charset=\"utf-8\" />"));
            for rule in FIXED_RULES {
                assert!(html.contains(rule), "missing rule: {}", rule);
            }
        }
    }

    #[test]
    fn test_extra_css_follows_builtin_rules() {
        let html = compose(
            "",
            &DocumentParts {
                extra_css: Some("body { font-family: serif; }".to_string()),
                ..Default::default()
            },
        );
        let builtin = html.find(FIXED_RULES[0]).unwrap();
        let extra = html.find("font-family: serif").unwrap();
        assert!(builtin < extra);
    }

    #[test]
    fn test_extra_css_cannot_close_style_element() {
        let html = compose(
            "",
            &DocumentParts {
                extra_css: Some("</style><script>alert(1)</script>".to_string()),
                ..Default::default()
            },
        );
        assert!(!html.contains("</style><script>"));
    }

    #[test]
    fn test_base_href_is_emitted_when_set() {
        let html = compose(
            "",
            &DocumentParts {
                base_href: Some("file:///tmp/docs/".to_string()),
                ..Default::default()
            },
        );
        assert!(html.contains("<base href=\"file:///tmp/docs/\" />"));
        assert!(!compose("", &DocumentParts::default()).contains("<base"));
    }

    #[test]
    fn test_placeholders_in_content_are_not_expanded() {
        let html = compose(
            "<p>{{style}} and {{title}}</p>",
            &DocumentParts {
                title: "{{body}}".to_string(),
                ..Default::default()
            },
        );
        assert!(html.contains("<p>{{style}} and {{title}}</p>"));
        assert!(html.contains("<title>{{body}}</title>"));
    }

    #[test]
    fn test_fill_keeps_unknown_and_unterminated_placeholders() {
        assert_eq!(fill("a {{x}} b {{y}}", &[("x", "1")]), "a 1 b {{y}}");
        assert_eq!(fill("open {{never", &[]), "open {{never");
    }

    #[test]
    fn test_settle_script_is_embedded() {
        assert!(asset(SETTLE_SCRIPT).contains("document.fonts"));
    }
}
