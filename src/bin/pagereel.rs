use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pagereel::{
    BatchDriver, BatchSummary, CancelToken, DEFAULT_PANEL_PADDING, Fps, PanelMode,
    PipelineConfig, PopplerRasterizer, ReelError, Resolution, TextMode,
};

#[derive(Parser, Debug)]
#[command(
    name = "pagereel",
    version,
    about = "Turn PDF pages into short vertical videos over a background clip"
)]
struct Cli {
    /// Input PDF.
    pdf: PathBuf,

    /// Background video (not needed with --screenshots-only).
    video: Option<PathBuf>,

    /// Output directory for clips.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First page (1-based, inclusive).
    #[arg(short, long)]
    start: Option<u32>,

    /// Last page (1-based, inclusive).
    #[arg(short, long)]
    end: Option<u32>,

    /// Clip duration in seconds.
    #[arg(short, long)]
    duration: Option<f64>,

    /// Output size as WIDTHxHEIGHT.
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Output frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Page rasterization DPI.
    #[arg(long)]
    dpi: Option<u32>,

    /// Fraction of page height cut from the top.
    #[arg(long)]
    margin_top: Option<f64>,

    /// Fraction of page height cut from the bottom.
    #[arg(long)]
    margin_bottom: Option<f64>,

    /// Fraction of page width cut from the left.
    #[arg(long)]
    margin_left: Option<f64>,

    /// Fraction of page width cut from the right.
    #[arg(long)]
    margin_right: Option<f64>,

    /// Share of the frame the page content may fill, in (0, 1].
    #[arg(long)]
    scale: Option<f64>,

    /// Backdrop opacity, in [0, 1].
    #[arg(long)]
    bg_opacity: Option<f64>,

    /// Contrast factor (1.0 = unchanged).
    #[arg(long)]
    contrast: Option<f64>,

    /// How page pixels are drawn.
    #[arg(long, value_enum)]
    text_mode: Option<TextModeArg>,

    /// Backdrop extent.
    #[arg(long, value_enum)]
    panel: Option<PanelArg>,

    /// Padding around the content for `--panel padded`, in pixels.
    #[arg(long)]
    panel_padding: Option<u32>,

    /// Only write page screenshots, no videos.
    #[arg(long)]
    screenshots_only: bool,

    /// Directory for page screenshots.
    #[arg(long)]
    screenshots_dir: Option<PathBuf>,

    /// Pages processed in parallel.
    #[arg(long)]
    workers: Option<usize>,

    /// Frames composited per parallel batch.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Memory the decoded background may use, in MiB.
    #[arg(long)]
    max_background_mb: Option<u64>,

    /// JSON config file; explicit flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep existing clips instead of replacing them.
    #[arg(long)]
    no_overwrite: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TextModeArg {
    Inverted,
    Original,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PanelArg {
    Full,
    Padded,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("failed to initialize logging: {e:#}");
    }

    match run(cli) {
        Ok(summary) => {
            print_summary(&summary);
            if summary.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "pagereel=debug"
    } else {
        "pagereel=info"
    };
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter)
        .try_init()?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<BatchSummary> {
    let cfg = build_config(&cli)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, stopping after in-flight frames");
        on_interrupt.cancel();
    })
    .context("failed to set Ctrl+C handler")?;

    let rasterizer = PopplerRasterizer::default();
    let driver = BatchDriver::new(&rasterizer, cfg).with_cancel(cancel);
    let summary = driver
        .run(&cli.pdf, cli.video.as_deref(), cli.start, cli.end)
        .map_err(|e| match e {
            ReelError::Cancelled => anyhow::anyhow!("interrupted"),
            e => anyhow::Error::new(e),
        })?;
    Ok(summary)
}

fn build_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = &cli.output {
        cfg.output_dir = v.clone();
    }
    if let Some(v) = cli.duration {
        cfg.duration_sec = v;
    }
    if let Some(v) = cli.resolution {
        cfg.resolution = v;
    }
    if let Some(v) = cli.fps {
        cfg.fps = Fps::new(v, 1)?;
    }
    if let Some(v) = cli.dpi {
        cfg.dpi = v;
    }
    if let Some(v) = cli.margin_top {
        cfg.margins.top = v;
    }
    if let Some(v) = cli.margin_bottom {
        cfg.margins.bottom = v;
    }
    if let Some(v) = cli.margin_left {
        cfg.margins.left = v;
    }
    if let Some(v) = cli.margin_right {
        cfg.margins.right = v;
    }
    if let Some(v) = cli.scale {
        cfg.style.scale = v;
    }
    if let Some(v) = cli.bg_opacity {
        cfg.style.bg_opacity = v;
    }
    if let Some(v) = cli.contrast {
        cfg.style.contrast = v;
    }
    if let Some(v) = cli.text_mode {
        cfg.style.text_mode = match v {
            TextModeArg::Inverted => TextMode::Inverted,
            TextModeArg::Original => TextMode::Original,
        };
    }
    match (cli.panel, cli.panel_padding) {
        (Some(PanelArg::Full), _) => cfg.style.panel = PanelMode::FullFrame,
        (Some(PanelArg::Padded), padding) => {
            cfg.style.panel = PanelMode::Padded {
                padding: padding.unwrap_or(DEFAULT_PANEL_PADDING),
            }
        }
        (None, Some(padding)) => cfg.style.panel = PanelMode::Padded { padding },
        (None, None) => {}
    }
    if cli.screenshots_only {
        cfg.screenshots_only = true;
    }
    if let Some(v) = &cli.screenshots_dir {
        cfg.screenshots_dir = Some(v.clone());
    }
    if let Some(v) = cli.workers {
        cfg.workers = v;
    }
    if let Some(v) = cli.chunk_size {
        cfg.chunk_size = v;
    }
    if let Some(v) = cli.max_background_mb {
        cfg.max_background_mb = v;
    }
    if cli.no_overwrite {
        cfg.overwrite = false;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn print_summary(summary: &BatchSummary) {
    for out in &summary.succeeded {
        if let Some(clip) = &out.clip {
            println!(
                "page {}: {} ({}, {:.2}s)",
                out.page,
                clip.path.display(),
                clip.resolution,
                clip.duration_sec
            );
        }
        if let Some(shot) = &out.screenshot {
            println!("page {}: {}", out.page, shot.display());
        }
    }
    for skipped in &summary.skipped {
        println!("page {}: skipped: {}", skipped.page, skipped.error);
    }
    println!(
        "{} succeeded, {} skipped",
        summary.succeeded.len(),
        summary.skipped.len()
    );
}
