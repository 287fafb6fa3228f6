//! Configuration module for page layout, Markdown rendering and browser launch.
//!
//! This module handles loading and parsing of the conversion configuration from TOML files.
//! Every setting has a default, and the defaults reproduce the classic output: an A4 page,
//! 20mm margins on all four sides, CommonMark with tables and strikethrough, raw HTML
//! escaped, no syntax highlighting and a sandboxed headless browser.
//!
//! # Configuration Structure
//!
//! The configuration uses TOML format with one section per concern:
//! - `page` selects the paper format, orientation, background printing and scale
//! - `margin` sets the page margins (numbers are millimetres, strings may carry a unit)
//! - `document` sets the document title and an optional extra stylesheet
//! - `markdown` toggles parser extensions and the raw HTML policy
//! - `highlight` enables syntax highlighting of fenced code blocks
//! - `browser` points at a specific Chromium executable and tunes its launch
//!
//! # Configuration Example
//!
//! ```toml
//! [page]
//! format = "letter"
//! landscape = true
//!
//! [margin]
//! top = "1in"
//! bottom = "1in"
//! left = 15
//! right = 15
//!
//! [highlight]
//! enabled = true
//! theme = "base16-ocean.light"
//! ```
//!
//! Unknown keys are ignored and invalid values fall back to their defaults, so a
//! partially wrong file never prevents a conversion.

use crate::page::{CssLength, Margins, PageFormat, PdfLayout};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::Value;

/// File name looked up in the working directory and in the user config directory.
pub const CONFIG_FILE_NAME: &str = "md2pdfrc.toml";

/// Configuration source for the conversion settings.
/// Determines where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use default built-in configuration
    Default,
    /// Load configuration from a file path
    File(&'a Path),
    /// Use an in-memory TOML configuration string
    Embedded(&'a str),
}

/// Document-level settings that end up in the HTML head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSettings {
    /// Explicit `<title>`. When unset the first level-1 heading is used.
    pub title: Option<String>,
    /// Stylesheet appended after the built-in rules.
    pub stylesheet: Option<PathBuf>,
}

/// Parser extensions and raw HTML policy.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownSettings {
    pub tables: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub footnotes: bool,
    pub smart_punctuation: bool,
    /// Pass raw HTML through instead of escaping it.
    pub raw_html: bool,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            tasklists: false,
            footnotes: false,
            smart_punctuation: false,
            raw_html: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSettings {
    pub enabled: bool,
    pub theme: String,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            theme: "InspiredGitHub".to_string(),
        }
    }
}

/// Headless browser launch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Chromium executable. Auto-detected when `None`.
    pub path: Option<PathBuf>,
    pub sandbox: bool,
    /// How long the browser may stay idle before the connection is dropped.
    pub timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            path: None,
            sandbox: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// The complete set of conversion settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionConfig {
    pub layout: PdfLayout,
    pub document: DocumentSettings,
    pub markdown: MarkdownSettings,
    pub highlight: HighlightSettings,
    pub browser: BrowserSettings,
}

fn get_bool(section: Option<&Value>, key: &str, default: bool) -> bool {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

fn get_string(section: Option<&Value>, key: &str) -> Option<String> {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a number that may have been written as an integer or a float.
fn get_number(section: Option<&Value>, key: &str) -> Option<f64> {
    let value = section.and_then(|s| s.get(key))?;
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

/// Parses a single margin value.
///
/// Numbers are millimetres; strings go through [`CssLength`] and may carry
/// `mm`, `cm`, `in` or `px`. Anything else keeps the default.
fn parse_length(value: Option<&Value>, default: CssLength) -> CssLength {
    let Some(value) = value else {
        return default;
    };
    if let Some(s) = value.as_str() {
        return s.parse().unwrap_or_else(|e| {
            warn!("Ignoring margin: {}", e);
            default
        });
    }
    match value.as_float().or_else(|| value.as_integer().map(|i| i as f64)) {
        Some(mm) if mm.is_finite() && mm >= 0.0 => CssLength::Millimetres(mm),
        _ => default,
    }
}

fn parse_margins(value: Option<&Value>, default: Margins) -> Margins {
    let Some(margin) = value else {
        return default;
    };
    Margins {
        top: parse_length(margin.get("top"), default.top),
        right: parse_length(margin.get("right"), default.right),
        bottom: parse_length(margin.get("bottom"), default.bottom),
        left: parse_length(margin.get("left"), default.left),
    }
}

fn parse_layout(config: &Value, default: PdfLayout) -> PdfLayout {
    let page = config.get("page");
    let format = match get_string(page, "format") {
        Some(name) => name.parse::<PageFormat>().unwrap_or_else(|e| {
            warn!("{}, using {}", e, default.format);
            default.format
        }),
        None => default.format,
    };
    let scale = match get_number(page, "scale") {
        // Chromium rejects scales outside this range.
        Some(s) if (0.1..=2.0).contains(&s) => s,
        Some(s) => {
            warn!("Ignoring page scale {} (must be between 0.1 and 2.0)", s);
            default.scale
        }
        None => default.scale,
    };

    PdfLayout {
        format,
        landscape: get_bool(page, "landscape", default.landscape),
        margins: parse_margins(config.get("margin"), default.margins),
        print_background: get_bool(page, "print_background", default.print_background),
        scale,
    }
}

fn parse_browser(value: Option<&Value>, default: BrowserSettings) -> BrowserSettings {
    let timeout = match value.and_then(|b| b.get("timeout")).and_then(|v| v.as_integer()) {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        _ => default.timeout,
    };
    BrowserSettings {
        path: get_string(value, "path").map(PathBuf::from).or(default.path),
        sandbox: get_bool(value, "sandbox", default.sandbox),
        timeout,
    }
}

/// Parses a TOML configuration string and returns a complete ConversionConfig.
///
/// Works with both in-memory strings and runtime-loaded files. Sections and keys that
/// are missing keep their default values; a string that is not valid TOML yields the
/// default configuration.
///
/// # Example
/// ```rust
/// use md2pdf::config::parse_config_string;
/// use md2pdf::page::PageFormat;
///
/// let config = parse_config_string(r#"
/// [page]
/// format = "letter"
///
/// [highlight]
/// enabled = true
/// "#);
/// assert_eq!(config.layout.format, PageFormat::Letter);
/// assert!(config.highlight.enabled);
/// assert!(config.markdown.tables);
/// ```
pub fn parse_config_string(config_str: &str) -> ConversionConfig {
    let config: Value = match toml::from_str(config_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("Invalid configuration, using defaults: {}", e);
            return ConversionConfig::default();
        }
    };

    let defaults = ConversionConfig::default();
    let document = config.get("document");
    let markdown = config.get("markdown");
    let highlight = config.get("highlight");

    ConversionConfig {
        layout: parse_layout(&config, defaults.layout),
        document: DocumentSettings {
            title: get_string(document, "title"),
            stylesheet: get_string(document, "stylesheet").map(PathBuf::from),
        },
        markdown: MarkdownSettings {
            tables: get_bool(markdown, "tables", defaults.markdown.tables),
            strikethrough: get_bool(markdown, "strikethrough", defaults.markdown.strikethrough),
            tasklists: get_bool(markdown, "tasklists", defaults.markdown.tasklists),
            footnotes: get_bool(markdown, "footnotes", defaults.markdown.footnotes),
            smart_punctuation: get_bool(
                markdown,
                "smart_punctuation",
                defaults.markdown.smart_punctuation,
            ),
            raw_html: get_bool(markdown, "raw_html", defaults.markdown.raw_html),
        },
        highlight: HighlightSettings {
            enabled: get_bool(highlight, "enabled", defaults.highlight.enabled),
            theme: get_string(highlight, "theme").unwrap_or(defaults.highlight.theme),
        },
        browser: parse_browser(config.get("browser"), defaults.browser),
    }
}

/// Loads and parses the configuration based on the provided source.
///
/// A file that cannot be read falls back to the defaults with a warning.
///
/// # Examples
/// ```rust
/// use md2pdf::config::{ConfigSource, load_config_from_source};
/// use std::path::Path;
///
/// let config = load_config_from_source(ConfigSource::Default);
/// assert!(!config.highlight.enabled);
///
/// let config = load_config_from_source(ConfigSource::File(Path::new("missing.toml")));
/// assert!(config.browser.sandbox);
///
/// let config = load_config_from_source(ConfigSource::Embedded("[page]\nlandscape = true"));
/// assert!(config.layout.landscape);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> ConversionConfig {
    match source {
        ConfigSource::Default => ConversionConfig::default(),
        ConfigSource::File(path) => match fs::read_to_string(path) {
            Ok(s) => {
                debug!("Loaded configuration from {}", path.display());
                parse_config_string(&s)
            }
            Err(e) => {
                warn!(
                    "Could not read configuration {}: {}, using defaults",
                    path.display(),
                    e
                );
                ConversionConfig::default()
            }
        },
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Locations searched for a configuration file when none is given explicitly,
/// in priority order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("md2pdf").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Returns the default configuration as a commented TOML document.
///
/// Parsing the returned string yields [`ConversionConfig::default`].
pub fn default_config_toml() -> String {
    let defaults = ConversionConfig::default();
    let layout = &defaults.layout;
    format!(
        r#"# md2pdf configuration
# Save as {file} in the working directory or in <config dir>/md2pdf/.

[page]
# letter, legal, tabloid, ledger, a0 .. a6
format = "{format}"
landscape = {landscape}
print_background = {background}
scale = {scale:.1}

# Numbers are millimetres; strings may use mm, cm, in or px.
[margin]
top = "{top}"
right = "{right}"
bottom = "{bottom}"
left = "{left}"

[document]
# Defaults to the first level-1 heading.
title = ""
# Extra CSS appended after the built-in rules.
stylesheet = ""

[markdown]
tables = {tables}
strikethrough = {strikethrough}
tasklists = {tasklists}
footnotes = {footnotes}
smart_punctuation = {smart}
# Pass raw HTML through instead of escaping it.
raw_html = {raw_html}

[highlight]
enabled = {hl_enabled}
theme = "{theme}"

[browser]
# Chromium executable; auto-detected when empty.
path = ""
sandbox = {sandbox}
# Seconds the browser may stay idle.
timeout = {timeout}
"#,
        file = CONFIG_FILE_NAME,
        format = layout.format,
        landscape = layout.landscape,
        background = layout.print_background,
        scale = layout.scale,
        top = layout.margins.top,
        right = layout.margins.right,
        bottom = layout.margins.bottom,
        left = layout.margins.left,
        tables = defaults.markdown.tables,
        strikethrough = defaults.markdown.strikethrough,
        tasklists = defaults.markdown.tasklists,
        footnotes = defaults.markdown.footnotes,
        smart = defaults.markdown.smart_punctuation,
        raw_html = defaults.markdown.raw_html,
        hl_enabled = defaults.highlight.enabled,
        theme = defaults.highlight.theme,
        sandbox = defaults.browser.sandbox,
        timeout = defaults.browser.timeout.as_secs(),
    )
}
