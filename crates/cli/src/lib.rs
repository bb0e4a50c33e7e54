use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use doc_model::{Annotation, PageIndex, Settings};
use pdf_engine::{default_engine, OpenSource, PdfEngine};
use serde::Serialize;
use simplelog::{Config, LevelFilter, WriteLogger};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;
use viewer_core::PageView;

pub mod script;

const LOG_ENV: &str = "PAGEMARK_LOG";
const DATA_DIR_ENV: &str = "PAGEMARK_DATA_DIR";

#[derive(Debug, Parser)]
#[command(name = "pagemark-cli")]
#[command(about = "Annotate PDF pages with marker strokes and highlights")]
pub struct Cli {
    /// Increase log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Replay recorded input over a page and write the composed PNG.
    Annotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON array of events to replay.
        #[arg(long)]
        script: Option<PathBuf>,
        /// 1-based page to start on.
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Settings file to use instead of the stored settings.
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Store the settings in effect for later runs.
        #[arg(long)]
        save_settings: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct AnnotateOutput<'a> {
    output: String,
    page_index: PageIndex,
    page_count: u32,
    stale: bool,
    annotations: &'a [Annotation],
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Annotate { file, script, page, output, settings, save_settings } => {
            run_annotate(&AnnotateArgs {
                file: &file,
                script: script.as_deref(),
                page,
                output: output.as_deref(),
                settings: settings.as_deref(),
                save_settings,
            })
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => std::env::var(LOG_ENV)
            .ok()
            .and_then(|value| value.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    WriteLogger::init(level, Config::default(), std::io::stderr())
        .context("failed to initialize logging")
}

fn run_info(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = engine.page_size(handle, 0)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput { path: file.display().to_string(), page_count, first_page_size_pt };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    engine.close(handle)?;

    Ok(())
}

struct AnnotateArgs<'a> {
    file: &'a Path,
    script: Option<&'a Path>,
    page: u32,
    output: Option<&'a Path>,
    settings: Option<&'a Path>,
    save_settings: bool,
}

fn run_annotate(args: &AnnotateArgs<'_>) -> Result<()> {
    ensure_file_exists(args.file)?;

    if args.page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let settings = resolve_settings(args.settings)?;
    if args.save_settings {
        let storage = open_storage()?;
        storage.save_settings(&settings).context("failed to save settings")?;
        log::info!("settings stored in {}", storage.settings_path().display());
    }

    let events = match args.script {
        Some(path) => script::load_script(path)?,
        None => Vec::new(),
    };

    let mut view = PageView::new(default_engine(), &settings);
    view.load(args.file).context("failed to open PDF")?;

    let start = args.page - 1;
    if start >= view.page_count() {
        anyhow::bail!("--page {} is past the last page ({})", args.page, view.page_count());
    }
    view.go_to_page(start).context("failed to render start page")?;

    script::replay(&mut view, &events);

    let surface = view.compose().context("no page bitmap to compose")?;
    if surface.stale {
        log::warn!("page {} failed to render, writing page {}", view.current_page(), surface.page);
    }

    let output = args
        .output
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_annotated_output(args.file, surface.page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    surface
        .image
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    let payload = AnnotateOutput {
        output: output.display().to_string(),
        page_index: view.current_page(),
        page_count: view.page_count(),
        stale: surface.stale,
        annotations: view.annotations(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn resolve_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return storage::load_settings_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()));
    }

    match open_storage() {
        Ok(storage) => storage.load_settings().context("failed to load stored settings"),
        Err(err) => {
            log::warn!("{err:#}, using default settings");
            Ok(Settings::default())
        }
    }
}

fn open_storage() -> Result<Storage> {
    if let Some(root) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(Storage::with_root(PathBuf::from(root)));
    }

    Storage::from_default_project().context("failed to locate settings directory")
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_annotated_output(file: &Path, page: PageIndex) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{}-annotated.png", page + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotated_output_sits_next_to_input() {
        let output = default_annotated_output(Path::new("/tmp/docs/report.pdf"), 2);
        assert_eq!(output, PathBuf::from("/tmp/docs/report-page-3-annotated.png"));
    }

    #[test]
    fn verbose_flag_is_repeatable() {
        let cli = Cli::parse_from(["pagemark-cli", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
    }
}
