use clap::{Arg, ArgMatches, Command};
use log::{debug, info};
use md2pdf::config::{self, ConfigSource, ConversionConfig};
use md2pdf::page::PageFormat;
use md2pdf::MdpError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum AppError {
    InputNotFound(PathBuf),
    ConversionError(MdpError),
    HtmlWriteError(PathBuf, std::io::Error),
}

impl From<MdpError> for AppError {
    fn from(e: MdpError) -> Self {
        match e {
            MdpError::InputNotFound { path } => AppError::InputNotFound(path),
            other => AppError::ConversionError(other),
        }
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // No output except errors
    Normal,  // Standard output
    Verbose, // Detailed output
}

fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Get the configuration file to load, if any.
///
/// Priority order:
/// 1. If `--config` is explicitly provided, use that file
/// 2. If `md2pdfrc.toml` exists in the current directory, use it
/// 3. If `md2pdfrc.toml` exists in the user config directory, use it
/// 4. Otherwise use the default configuration
fn get_config_path(matches: &ArgMatches) -> Option<PathBuf> {
    if let Some(config_file) = matches.get_one::<String>("config") {
        return Some(PathBuf::from(config_file));
    }
    config::config_search_paths()
        .into_iter()
        .find(|path| path.exists())
}

/// Applies command-line overrides on top of the loaded configuration.
fn apply_overrides(config: &mut ConversionConfig, matches: &ArgMatches) -> Result<(), AppError> {
    if let Some(format) = matches.get_one::<String>("format") {
        config.layout.format = format.parse::<PageFormat>().map_err(|e| {
            AppError::ConversionError(MdpError::config_error(
                e,
                "Use one of letter, legal, tabloid, ledger, a0, a1, a2, a3, a4, a5, a6",
            ))
        })?;
    }
    if matches.get_flag("landscape") {
        config.layout.landscape = true;
    }
    if let Some(browser) = matches.get_one::<String>("browser") {
        config.browser.path = Some(PathBuf::from(browser));
    }
    if matches.get_flag("no-sandbox") {
        config.browser.sandbox = false;
    }
    Ok(())
}

fn load_config(matches: &ArgMatches) -> Result<ConversionConfig, AppError> {
    let mut config = match get_config_path(matches) {
        Some(path) => {
            debug!("Using configuration {}", path.display());
            config::load_config_from_source(ConfigSource::File(&path))
        }
        None => config::load_config_from_source(ConfigSource::Default),
    };
    apply_overrides(&mut config, matches)?;
    Ok(config)
}

fn print_file_size(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.2} MB", size_kb / 1024.0);
        }
    }
}

fn run(input: &Path, output: &Path, matches: &ArgMatches) -> Result<(), AppError> {
    // Checked before configuration so a missing input is always reported as such.
    if !input.exists() {
        return Err(AppError::InputNotFound(input.to_path_buf()));
    }

    let verbosity = get_verbosity(matches);
    let dry_run = matches.get_flag("dry-run");
    let config = load_config(matches)?;

    let html = md2pdf::render_file_html(input, &config)?;

    if let Some(html_path) = matches.get_one::<String>("emit-html") {
        let html_path = PathBuf::from(html_path);
        fs::write(&html_path, &html).map_err(|e| AppError::HtmlWriteError(html_path.clone(), e))?;
        info!("Wrote intermediate HTML to {}", html_path.display());
    }

    if dry_run {
        if verbosity != Verbosity::Quiet {
            println!(
                "Dry-run complete: rendered {} bytes of HTML. No PDF generated.",
                html.len()
            );
            if !md2pdf::render::browser_available(&config.browser) {
                println!("Warning: no Chrome or Chromium executable was found.");
            }
        }
        return Ok(());
    }

    if verbosity == Verbosity::Verbose {
        info!(
            "Generating PDF: {} {}",
            config.layout.format,
            if config.layout.landscape { "landscape" } else { "portrait" }
        );
    }

    md2pdf::html_into_file(&html, output, &config)?;

    if verbosity != Verbosity::Quiet {
        println!("Success: Generated {}", output.display());
        if verbosity == Verbosity::Verbose {
            print_file_size(output);
        }
    }
    Ok(())
}

/// A positional argument, with an empty string treated as absent.
fn positional<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    matches.get_one::<String>(id).filter(|value| !value.is_empty())
}

fn build_cli() -> Command {
    Command::new("md2pdf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert a Markdown file to PDF using headless Chrome")
        .after_help(
            "EXAMPLES:\n  \
            md2pdf README.md README.pdf\n  \
            md2pdf notes.md notes.pdf --format letter --landscape\n  \
            md2pdf doc.md doc.pdf --dry-run --emit-html doc.html\n  \
            md2pdf doc.md doc.pdf --no-sandbox --browser /usr/bin/chromium\n",
        )
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Markdown file to convert"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .help("Path of the PDF file to write (overwritten if it exists)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to configuration file (TOML format). Auto-detects md2pdfrc.toml if not specified"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Page format: letter, legal, tabloid, ledger, a0-a6 (default: a4)"),
        )
        .arg(
            Arg::new("landscape")
                .long("landscape")
                .help("Print in landscape orientation")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("browser")
                .long("browser")
                .value_name("PATH")
                .help("Chrome or Chromium executable to use"),
        )
        .arg(
            Arg::new("no-sandbox")
                .long("no-sandbox")
                .help("Launch the browser without its sandbox (needed as root in most containers)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("emit-html")
                .long("emit-html")
                .value_name("HTML_PATH")
                .help("Also write the intermediate HTML document to this path"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Render the HTML without launching a browser or writing a PDF")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show detailed output including page layout and file size")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("list-themes")
                .long("list-themes")
                .help("List syntax highlighting themes and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("get-default-configuration")
                .long("get-default-configuration")
                .help("Print a default md2pdfrc.toml to stdout and exit")
                .action(clap::ArgAction::SetTrue),
        )
}

fn main() {
    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    // RUST_LOG still wins over the flag-derived level.
    let default_level = if get_verbosity(&matches) == Verbosity::Verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    if matches.get_flag("list-themes") {
        for theme in md2pdf::highlighting::available_themes() {
            println!("{}", theme);
        }
        process::exit(0);
    }

    if matches.get_flag("get-default-configuration") {
        println!("{}", config::default_config_toml());
        process::exit(0);
    }

    let (Some(input), Some(output)) = (
        positional(&matches, "input"),
        positional(&matches, "output"),
    ) else {
        println!("{}", cmd.render_usage());
        println!("Run 'md2pdf --help' for all options.");
        process::exit(0);
    };

    if let Err(e) = run(Path::new(input), Path::new(output), &matches) {
        match e {
            AppError::InputNotFound(path) => {
                eprintln!("Error: Input file '{}' not found.", path.display())
            }
            AppError::ConversionError(e) => eprintln!("Conversion failed: {}", e),
            AppError::HtmlWriteError(path, e) => eprintln!(
                "Conversion failed: could not write HTML to {}: {}",
                path.display(),
                e
            ),
        }
        process::exit(1);
    }
}
