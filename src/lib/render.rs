//! Headless Chromium rendering session.
//!
//! A [`RenderSession`] owns the browser process, the single tab used for printing and the
//! temporary HTML file that tab displays. Everything is released when the session is
//! dropped, whichever way the conversion ends.

use crate::config::BrowserSettings;
use crate::page::PdfLayout;
use crate::template::{asset, SETTLE_SCRIPT};
use crate::MdpError;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use url::Url;

/// Returns the Chromium executable that would be launched for these settings.
///
/// A configured path must exist; otherwise the usual install locations and `PATH`
/// are searched.
pub fn find_browser(settings: &BrowserSettings) -> Option<PathBuf> {
    match &settings.path {
        Some(path) if path.exists() => Some(path.clone()),
        Some(_) => None,
        None => headless_chrome::browser::default_executable().ok(),
    }
}

/// Whether a browser can be launched with these settings.
///
/// With the `fetch` feature and no configured path, a missing local install is not fatal
/// because the launch downloads a Chromium build.
pub fn browser_available(settings: &BrowserSettings) -> bool {
    find_browser(settings).is_some() || (cfg!(feature = "fetch") && settings.path.is_none())
}

/// A running headless browser with one tab.
///
/// Fields drop in declaration order: the tab handle and page file go first, then the
/// `Browser`, whose own drop terminates the process.
pub struct RenderSession {
    tab: Arc<Tab>,
    page: Option<NamedTempFile>,
    browser: Browser,
}

impl RenderSession {
    /// Launches the browser and opens the tab used for printing.
    pub fn launch(settings: &BrowserSettings) -> Result<Self, MdpError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(settings.sandbox)
            .path(settings.path.clone())
            .idle_browser_timeout(settings.timeout)
            .build()
            .map_err(|e| MdpError::browser_error(format!("invalid launch options: {}", e)))?;

        debug!(
            "Launching headless browser ({})",
            settings
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detected".to_string())
        );
        let browser = Browser::new(options).map_err(|e| MdpError::BrowserError {
            message: format!("could not launch browser: {}", e),
            suggestion: if browser_available(settings) {
                "If running as root or inside a container, try --no-sandbox".to_string()
            } else {
                "Install Chrome or Chromium, or point [browser] path / --browser at the executable"
                    .to_string()
            },
        })?;

        let tab = browser
            .new_tab()
            .map_err(|e| MdpError::browser_error(format!("could not open a page: {}", e)))?;
        tab.set_default_timeout(settings.timeout);

        info!("Rendering session started");
        Ok(Self {
            tab,
            page: None,
            browser,
        })
    }

    /// Loads a complete HTML document and waits until it has settled.
    ///
    /// The document is written to a temporary file and opened through its `file://`
    /// URL. Settling means the load event has fired, every image has loaded or failed
    /// and web fonts are ready.
    pub fn load_html(&mut self, html: &str) -> Result<(), MdpError> {
        let mut page = tempfile::Builder::new()
            .prefix("md2pdf-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| MdpError::pdf_error(format!("could not create page file: {}", e)))?;
        page.write_all(html.as_bytes())
            .and_then(|_| page.flush())
            .map_err(|e| MdpError::pdf_error(format!("could not write page file: {}", e)))?;

        let url = Url::from_file_path(page.path())
            .map_err(|_| MdpError::pdf_error("page file path is not absolute"))?;
        // Keep the file alive for as long as the tab may read from it.
        self.page = Some(page);

        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| MdpError::pdf_error(format!("could not load document: {}", e)))?;

        self.wait_until_settled()
    }

    fn wait_until_settled(&self) -> Result<(), MdpError> {
        let result = self
            .tab
            .evaluate(&asset(SETTLE_SCRIPT), true)
            .map_err(|e| MdpError::pdf_error(format!("document did not settle: {}", e)))?;
        match result.value.as_ref().and_then(|v| v.as_bool()) {
            Some(true) => debug!("Document settled"),
            _ => warn!("Readiness check returned no result, printing anyway"),
        }
        Ok(())
    }

    /// Prints the loaded document and returns the PDF bytes.
    pub fn print_pdf(&self, layout: &PdfLayout) -> Result<Vec<u8>, MdpError> {
        debug!(
            "Printing {} {} with margins {} {} {} {}",
            layout.format,
            if layout.landscape { "landscape" } else { "portrait" },
            layout.margins.top,
            layout.margins.right,
            layout.margins.bottom,
            layout.margins.left
        );
        let bytes = self
            .tab
            .print_to_pdf(Some(layout.to_print_options()))
            .map_err(|e| MdpError::pdf_error(format!("printing failed: {}", e)))?;
        info!("Printed {} bytes of PDF", bytes.len());
        Ok(bytes)
    }

    /// Browser version string as reported over DevTools.
    pub fn version(&self) -> Option<String> {
        self.browser.get_version().ok().map(|v| v.product)
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            debug!("Closing tab failed: {}", e);
        }
        debug!("Rendering session closed");
    }
}

/// Runs one complete render: launch, load, print, release.
///
/// The session is dropped before this returns, on success and on every error path.
pub fn html_to_pdf(
    html: &str,
    layout: &PdfLayout,
    settings: &BrowserSettings,
) -> Result<Vec<u8>, MdpError> {
    let mut session = RenderSession::launch(settings)?;
    if let Some(version) = session.version() {
        debug!("Browser: {}", version);
    }
    session.load_html(html)?;
    session.print_pdf(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_browser_with_missing_configured_path() {
        let settings = BrowserSettings {
            path: Some(PathBuf::from("/definitely/not/a/browser")),
            ..Default::default()
        };
        assert_eq!(find_browser(&settings), None);
        assert!(!browser_available(&settings));
    }

    #[test]
    fn test_find_browser_with_existing_configured_path() {
        let file = NamedTempFile::new().unwrap();
        let settings = BrowserSettings {
            path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(find_browser(&settings), Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_browser_available_honours_fetch_feature() {
        let settings = BrowserSettings::default();
        if cfg!(feature = "fetch") {
            assert!(browser_available(&settings));
        } else {
            assert_eq!(browser_available(&settings), find_browser(&settings).is_some());
        }

        // An explicit path is never downloaded.
        let settings = BrowserSettings {
            path: Some(PathBuf::from("/definitely/not/a/browser")),
            ..Default::default()
        };
        assert!(!browser_available(&settings));
    }

    #[test]
    fn test_launch_with_missing_browser_is_browser_error() {
        let settings = BrowserSettings {
            path: Some(PathBuf::from("/definitely/not/a/browser")),
            ..Default::default()
        };
        match RenderSession::launch(&settings) {
            Err(MdpError::BrowserError { suggestion, .. }) => {
                assert!(suggestion.contains("Install Chrome"));
            }
            Err(other) => panic!("expected BrowserError, got {}", other),
            Ok(_) => panic!("launch should fail without a browser"),
        }
    }
}
