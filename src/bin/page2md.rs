//! Command-line host: convert a saved HTML page to Markdown

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;
use tracing::debug;

use page2md::charset::decode_html;
use page2md::content::{PageDocument, PageSnapshot};
use page2md::error::{ConversionError, SettingsError};
use page2md::filename::{PAGE_FALLBACK, SELECTION_FALLBACK, generate_filename};
use page2md::pipeline::{Target, render};
use page2md::settings::{JsonFileStorage, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "page2md")]
#[command(about = "Convert a web page, or part of it, to clean Markdown")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Saved HTML page to convert
    #[arg(required_unless_present = "reset_settings")]
    html_file: Option<PathBuf>,

    /// Address the page was saved from
    #[arg(long, default_value = "about:blank")]
    url: String,

    /// Convert only the first element matching this CSS selector, as a selection
    #[arg(long, value_name = "CSS")]
    selection: Option<String>,

    /// Content-Type the page was served with, used to pick its charset
    #[arg(long)]
    content_type: Option<String>,

    /// JSON settings file
    #[arg(long, env = "PAGE2MD_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Omit the title and source lines
    #[arg(long)]
    no_metadata: bool,

    /// Write the result into this directory instead of stdout
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,

    /// Overwrite the settings file with defaults and exit
    #[arg(long, requires = "settings")]
    reset_settings: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Usage(String),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` is given
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let store = cli
        .settings
        .as_ref()
        .map(|path| SettingsStore::new(JsonFileStorage::new(path)));

    if cli.reset_settings {
        if let Some(store) = &store {
            store.reset()?;
            eprintln!("Settings reset to defaults: {}", store.storage().path().display());
        }
        return Ok(());
    }

    let settings = store
        .as_ref()
        .map(SettingsStore::load)
        .unwrap_or_default();

    let html_file = cli
        .html_file
        .as_ref()
        .ok_or_else(|| CliError::Usage("missing HTML file".to_string()))?;
    let bytes = std::fs::read(html_file)?;
    let html = decode_html(&bytes, cli.content_type.as_deref())?;

    let mut snapshot = PageSnapshot::new(html.into_owned(), cli.url.as_str());
    let target = match &cli.selection {
        Some(selector) => {
            let page = PageDocument::from_snapshot(&snapshot);
            if let Some(selected) = page.capture_selection(selector) {
                snapshot = snapshot.with_selection(selected);
            } else {
                debug!(selector = %selector, "Selection selector matched nothing");
            }
            Target::Selection
        }
        None => Target::Page,
    };

    let rendered = render(target, &snapshot, &settings, !cli.no_metadata)?;

    match &cli.save {
        Some(dir) => {
            let fallback = match target {
                Target::Page => PAGE_FALLBACK,
                Target::Selection => SELECTION_FALLBACK,
            };
            let filename = generate_filename(&rendered.title, fallback);
            let path = save_markdown(dir, &filename, &rendered.markdown)?;
            eprintln!("Saved {}", path.display());
        }
        None => println!("{}", rendered.markdown),
    }

    Ok(())
}

fn save_markdown(dir: &Path, filename: &str, markdown: &str) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, markdown)?;
    Ok(path)
}
