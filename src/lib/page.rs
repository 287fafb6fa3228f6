//! Page geometry for the printed document.
//!
//! The browser print API takes paper sizes and margins in inches. This module
//! owns the named paper formats, the CSS-like lengths accepted in the
//! configuration (`"20mm"`, `"1in"`, `"2.5cm"`, `"96px"` or a bare number of
//! millimetres), and the translation of both into print options.

use headless_chrome::types::PrintToPdfOptions;
use std::fmt;
use std::str::FromStr;

const MM_PER_INCH: f64 = 25.4;
const CSS_PX_PER_INCH: f64 = 96.0;

/// Named paper formats, with the same dimensions browsers use for `@page size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    /// Width and height in inches, portrait orientation.
    pub fn size_inches(&self) -> (f64, f64) {
        match self {
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
            PageFormat::Ledger => (17.0, 11.0),
            PageFormat::A0 => (33.1, 46.8),
            PageFormat::A1 => (23.4, 33.1),
            PageFormat::A2 => (16.54, 23.4),
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::A6 => (4.13, 5.83),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageFormat::Letter => "letter",
            PageFormat::Legal => "legal",
            PageFormat::Tabloid => "tabloid",
            PageFormat::Ledger => "ledger",
            PageFormat::A0 => "a0",
            PageFormat::A1 => "a1",
            PageFormat::A2 => "a2",
            PageFormat::A3 => "a3",
            PageFormat::A4 => "a4",
            PageFormat::A5 => "a5",
            PageFormat::A6 => "a6",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(PageFormat::Letter),
            "legal" => Ok(PageFormat::Legal),
            "tabloid" => Ok(PageFormat::Tabloid),
            "ledger" => Ok(PageFormat::Ledger),
            "a0" => Ok(PageFormat::A0),
            "a1" => Ok(PageFormat::A1),
            "a2" => Ok(PageFormat::A2),
            "a3" => Ok(PageFormat::A3),
            "a4" => Ok(PageFormat::A4),
            "a5" => Ok(PageFormat::A5),
            "a6" => Ok(PageFormat::A6),
            other => Err(format!(
                "unknown page format '{}' (expected letter, legal, tabloid, ledger or a0-a6)",
                other
            )),
        }
    }
}

/// A length as written in the configuration, kept in its original unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
    Millimetres(f64),
    Centimetres(f64),
    Inches(f64),
    Pixels(f64),
}

impl CssLength {
    pub fn to_inches(&self) -> f64 {
        match *self {
            CssLength::Millimetres(v) => v / MM_PER_INCH,
            CssLength::Centimetres(v) => v * 10.0 / MM_PER_INCH,
            CssLength::Inches(v) => v,
            CssLength::Pixels(v) => v / CSS_PX_PER_INCH,
        }
    }
}

impl Default for CssLength {
    fn default() -> Self {
        CssLength::Millimetres(20.0)
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CssLength::Millimetres(v) => write!(f, "{}mm", v),
            CssLength::Centimetres(v) => write!(f, "{}cm", v),
            CssLength::Inches(v) => write!(f, "{}in", v),
            CssLength::Pixels(v) => write!(f, "{}px", v),
        }
    }
}

impl FromStr for CssLength {
    type Err = String;

    /// A bare number is taken as millimetres.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (number, build): (&str, fn(f64) -> CssLength) = if let Some(n) = s.strip_suffix("mm") {
            (n, CssLength::Millimetres)
        } else if let Some(n) = s.strip_suffix("cm") {
            (n, CssLength::Centimetres)
        } else if let Some(n) = s.strip_suffix("in") {
            (n, CssLength::Inches)
        } else if let Some(n) = s.strip_suffix("px") {
            (n, CssLength::Pixels)
        } else {
            (s.as_str(), CssLength::Millimetres)
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid length '{}'", s))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("length must be a non-negative number, got '{}'", s));
        }
        Ok(build(value))
    }
}

/// Page margins. All four default to 20mm.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub top: CssLength,
    pub right: CssLength,
    pub bottom: CssLength,
    pub left: CssLength,
}

/// Everything the browser needs to know to lay out printed pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    pub format: PageFormat,
    pub landscape: bool,
    pub margins: Margins,
    pub print_background: bool,
    pub scale: f64,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            landscape: false,
            margins: Margins::default(),
            print_background: false,
            scale: 1.0,
        }
    }
}

impl PdfLayout {
    /// Builds the DevTools `Page.printToPDF` parameters.
    ///
    /// Paper size is always given in portrait dimensions; the `landscape`
    /// flag tells the browser to rotate it.
    pub fn to_print_options(&self) -> PrintToPdfOptions {
        let (width, height) = self.format.size_inches();
        PrintToPdfOptions {
            landscape: Some(self.landscape),
            display_header_footer: Some(false),
            print_background: Some(self.print_background),
            scale: Some(self.scale),
            paper_width: Some(width),
            paper_height: Some(height),
            margin_top: Some(self.margins.top.to_inches()),
            margin_bottom: Some(self.margins.bottom.to_inches()),
            margin_left: Some(self.margins.left.to_inches()),
            margin_right: Some(self.margins.right.to_inches()),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_page_format_parsing_is_case_insensitive() {
        assert_eq!("A4".parse::<PageFormat>(), Ok(PageFormat::A4));
        assert_eq!(" letter ".parse::<PageFormat>(), Ok(PageFormat::Letter));
        assert_eq!("LEGAL".parse::<PageFormat>(), Ok(PageFormat::Legal));
        assert!("b5".parse::<PageFormat>().is_err());
    }

    #[test]
    fn test_page_format_display_round_trips() {
        for format in [PageFormat::A3, PageFormat::A4, PageFormat::Tabloid] {
            assert_eq!(format.to_string().parse::<PageFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_css_length_units() {
        assert!(approx("20mm".parse::<CssLength>().unwrap().to_inches(), 20.0 / 25.4));
        assert!(approx("2cm".parse::<CssLength>().unwrap().to_inches(), 20.0 / 25.4));
        assert!(approx("1in".parse::<CssLength>().unwrap().to_inches(), 1.0));
        assert!(approx("96px".parse::<CssLength>().unwrap().to_inches(), 1.0));
        assert_eq!("12.5".parse::<CssLength>(), Ok(CssLength::Millimetres(12.5)));
    }

    #[test]
    fn test_css_length_rejects_garbage() {
        assert!("wide".parse::<CssLength>().is_err());
        assert!("-3mm".parse::<CssLength>().is_err());
        assert!("mm".parse::<CssLength>().is_err());
    }

    #[test]
    fn test_default_layout_is_a4_with_20mm_margins() {
        let options = PdfLayout::default().to_print_options();
        assert_eq!(options.paper_width, Some(8.27));
        assert_eq!(options.paper_height, Some(11.7));
        for margin in [
            options.margin_top,
            options.margin_right,
            options.margin_bottom,
            options.margin_left,
        ] {
            assert!(approx(margin.unwrap(), 20.0 / 25.4));
        }
        assert_eq!(options.landscape, Some(false));
        assert_eq!(options.print_background, Some(false));
    }

    #[test]
    fn test_landscape_keeps_portrait_paper_size() {
        let layout = PdfLayout {
            landscape: true,
            ..Default::default()
        };
        let options = layout.to_print_options();
        assert_eq!(options.landscape, Some(true));
        assert_eq!(options.paper_width, Some(8.27));
    }
}
