//! The md2pdf library converts Markdown documents into PDF files by rendering them to HTML
//! and printing that HTML with a headless Chromium.
//!
//! The Markdown grammar is handled by pulldown-cmark and the layout, pagination and PDF
//! encoding by the browser. This crate wires the two together: it wraps the rendered
//! fragment in a fixed HTML template, drives a short-lived browser session to print it,
//! and writes the result.
//!
//! Converting a file with the default settings (A4, 20mm margins):
//! ```rust,no_run
//! use md2pdf::config::ConversionConfig;
//! use std::error::Error;
//! use std::path::Path;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     md2pdf::convert_file(Path::new("README.md"), Path::new("README.pdf"), &ConversionConfig::default())?;
//!     Ok(())
//! }
//! ```
//!
//! Settings can be loaded from a TOML file (see [`config`]):
//! ```rust,no_run
//! use md2pdf::config::{load_config_from_source, ConfigSource};
//! use std::error::Error;
//! use std::path::Path;
//!
//! fn example_with_config() -> Result<(), Box<dyn Error>> {
//!     let config = load_config_from_source(ConfigSource::File(Path::new("md2pdfrc.toml")));
//!     let pdf = md2pdf::parse_into_bytes("# Hello\n\nWorld", &config)?;
//!     std::fs::write("hello.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! The HTML stage is available on its own, without any browser:
//! ```rust
//! use md2pdf::config::ConversionConfig;
//!
//! let html = md2pdf::render_html_document("# Hello\n\nWorld", None, &ConversionConfig::default());
//! assert!(html.contains("<meta charset=\"utf-8\" />"));
//! assert!(html.contains("<h1>Hello</h1>"));
//! assert!(html.contains("<title>Hello</title>"));
//! ```
//!
//! ## Conversion Flow
//! ```text
//! +-----------+     +--------------+     +---------------+     +-----------+
//! | Markdown  | --> | HTML         | --> | Headless      | --> | PDF file  |
//! | file      |     | fragment +   |     | Chromium      |     | (written  |
//! |           |     | template     |     | print-to-PDF  |     |  at end)  |
//! +-----------+     +--------------+     +---------------+     +-----------+
//! ```

pub mod config;
pub mod highlighting;
pub mod markdown;
pub mod page;
pub mod render;
pub mod template;

use config::ConversionConfig;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use template::DocumentParts;

/// Represents errors that can occur during the markdown-to-pdf conversion process.
#[derive(Debug)]
pub enum MdpError {
    /// The input file does not exist
    InputNotFound { path: PathBuf },
    /// Indicates an I/O error outside of PDF output
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
    /// Indicates an invalid configuration value
    ConfigError { message: String, suggestion: String },
    /// The browser could not be started or could not open a page
    BrowserError { message: String, suggestion: String },
    /// Indicates an error while loading, printing or saving the PDF
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
}

impl Error for MdpError {}
impl fmt::Display for MdpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MdpError::InputNotFound { path } => {
                write!(f, "Input file '{}' not found.", path.display())
            }
            MdpError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "File Error: {}", message)?;
                write!(f, "\n📁 Path: {}", path)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            MdpError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "Configuration Error: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            MdpError::BrowserError {
                message,
                suggestion,
            } => {
                write!(f, "Browser Error: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            MdpError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(hint) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", hint)?;
                }
                Ok(())
            }
        }
    }
}

impl MdpError {
    /// Creates a simple PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        MdpError::PdfError {
            message: message.into(),
            path: None,
            suggestion: None,
        }
    }

    /// Creates a browser error with the generic installation hint
    pub fn browser_error(message: impl Into<String>) -> Self {
        MdpError::BrowserError {
            message: message.into(),
            suggestion: "Check that Chrome or Chromium is installed and can start headless"
                .to_string(),
        }
    }

    /// Creates a configuration error
    pub fn config_error(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        MdpError::ConfigError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Renders Markdown into the complete HTML document that gets printed.
///
/// `base_dir` is the directory relative links and images are resolved against,
/// normally the directory of the input file. The title comes from the configuration,
/// then from the first level-1 heading.
pub fn render_html_document(
    markdown: &str,
    base_dir: Option<&Path>,
    config: &ConversionConfig,
) -> String {
    let fragment = markdown::render_fragment(markdown, &config.markdown, &config.highlight);
    debug!("Rendered {} bytes of Markdown into {} bytes of HTML", markdown.len(), fragment.len());

    let title = config
        .document
        .title
        .clone()
        .or_else(|| markdown::extract_title(markdown, &config.markdown))
        .unwrap_or_default();

    let base_href = base_dir.and_then(|dir| match url::Url::from_directory_path(dir) {
        Ok(url) => Some(url.to_string()),
        Err(_) => {
            warn!("Cannot resolve relative resources against {}", dir.display());
            None
        }
    });

    let extra_css = config.document.stylesheet.as_ref().and_then(|path| {
        match fs::read_to_string(path) {
            Ok(css) => Some(css),
            Err(e) => {
                warn!("Ignoring stylesheet {}: {}", path.display(), e);
                None
            }
        }
    });

    template::compose(
        &fragment,
        &DocumentParts {
            title,
            base_href,
            extra_css,
        },
    )
}

/// Prints a complete HTML document to PDF and returns the bytes.
pub fn html_into_bytes(html: &str, config: &ConversionConfig) -> Result<Vec<u8>, MdpError> {
    render::html_to_pdf(html, &config.layout, &config.browser)
}

fn check_output_dir(path: &Path) -> Result<(), MdpError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(MdpError::IoError {
                message: "Output directory does not exist".to_string(),
                path: parent.display().to_string(),
                suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
            });
        }
    }
    Ok(())
}

/// Prints a complete HTML document to PDF and writes it to `path`, replacing any
/// existing file.
///
/// Nothing is written unless the browser produced the whole PDF.
pub fn html_into_file(html: &str, path: &Path, config: &ConversionConfig) -> Result<(), MdpError> {
    check_output_dir(path)?;
    let bytes = html_into_bytes(html, config)?;

    fs::write(path, &bytes).map_err(|e| MdpError::PdfError {
        message: e.to_string(),
        path: Some(path.display().to_string()),
        suggestion: Some(match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                "Check that you have write permissions for this location".to_string()
            }
            std::io::ErrorKind::NotFound => "Make sure the output directory exists".to_string(),
            _ => "Try a different output path or check available disk space".to_string(),
        }),
    })?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Converts a Markdown string to PDF bytes.
///
/// Relative links and images resolve against the current working directory.
pub fn parse_into_bytes(markdown: &str, config: &ConversionConfig) -> Result<Vec<u8>, MdpError> {
    let html = render_html_document(markdown, current_dir().as_deref(), config);
    html_into_bytes(&html, config)
}

/// Converts a Markdown string to a PDF file.
pub fn parse_into_file(
    markdown: &str,
    path: &Path,
    config: &ConversionConfig,
) -> Result<(), MdpError> {
    let html = render_html_document(markdown, current_dir().as_deref(), config);
    html_into_file(&html, path, config)
}

fn current_dir() -> Option<PathBuf> {
    std::env::current_dir().ok()
}

/// Reads the Markdown document at `input`.
///
/// A missing file is reported as [`MdpError::InputNotFound`].
pub fn read_markdown(input: &Path) -> Result<String, MdpError> {
    if !input.exists() {
        return Err(MdpError::InputNotFound {
            path: input.to_path_buf(),
        });
    }
    fs::read_to_string(input).map_err(|e| MdpError::IoError {
        message: format!("Could not read input: {}", e),
        path: input.display().to_string(),
        suggestion: if e.kind() == std::io::ErrorKind::InvalidData {
            "The input must be UTF-8 encoded text".to_string()
        } else {
            "Check that the file is readable".to_string()
        },
    })
}

/// Directory the document's relative resources resolve against.
fn document_dir(input: &Path) -> Option<PathBuf> {
    let absolute = fs::canonicalize(input).ok()?;
    absolute.parent().map(Path::to_path_buf)
}

/// Reads the Markdown file at `input` and renders the HTML document for it.
///
/// Relative resources resolve against the file's directory. Without a configured
/// title or a level-1 heading, the file stem becomes the title.
pub fn render_file_html(input: &Path, config: &ConversionConfig) -> Result<String, MdpError> {
    let markdown = read_markdown(input)?;
    debug!("Read {} bytes from {}", markdown.len(), input.display());

    if config.document.title.is_none() && markdown::extract_title(&markdown, &config.markdown).is_none() {
        let mut config = config.clone();
        config.document.title = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        return Ok(render_html_document(&markdown, document_dir(input).as_deref(), &config));
    }
    Ok(render_html_document(&markdown, document_dir(input).as_deref(), config))
}

/// Converts the Markdown file at `input` into a PDF at `output`.
///
/// The input must exist; it is checked before anything else happens, so a missing
/// input never creates an output file.
///
/// # Example
/// ```rust,no_run
/// use md2pdf::config::ConversionConfig;
/// use md2pdf::MdpError;
/// use std::path::Path;
///
/// match md2pdf::convert_file(Path::new("notes.md"), Path::new("notes.pdf"), &ConversionConfig::default()) {
///     Ok(()) => println!("done"),
///     Err(MdpError::InputNotFound { path }) => eprintln!("no such file: {}", path.display()),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
pub fn convert_file(input: &Path, output: &Path, config: &ConversionConfig) -> Result<(), MdpError> {
    let html = render_file_html(input, config)?;
    html_into_file(&html, output, config)
}
