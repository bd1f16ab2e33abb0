//! linework: turn a photograph into a printable coloring page.
//!
//! Reads an image file, runs the line-art pipeline and writes the page in
//! the format implied by the output extension. Per-stage diagnostics go to
//! stderr (or stdout as JSON with `--json`).
//!
//! # Usage
//!
//! ```text
//! linework [OPTIONS] <INPUT> --output <OUTPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use linework_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use linework_pipeline::{Bitmap, Extraction, Method, ProcessingOptions, StagedResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Convert photos into black-on-white coloring pages.
#[derive(Parser)]
#[command(name = "linework", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Where to write the coloring page; the extension picks the format.
    #[arg(short, long)]
    output: PathBuf,

    /// Line extraction method: contours, canny, sobel, laplacian,
    /// adaptive, sketch, watercolor, anime, cartoon or `find_edges`.
    /// Unknown names fall back to contours.
    #[arg(long, default_value_t = ProcessingOptions::DEFAULT_METHOD.to_string())]
    method: String,

    /// Skip contrast enhancement.
    #[arg(long)]
    no_enhance: bool,

    /// Skip smoothing and the noise-area filter.
    #[arg(long)]
    no_denoise: bool,

    /// Outline thickness (1-3).
    #[arg(long, default_value_t = ProcessingOptions::DEFAULT_OUTLINE_THICKNESS)]
    thickness: u8,

    /// Regions enclosing this many pixels or fewer are dropped (10-50).
    #[arg(long, default_value_t = ProcessingOptions::DEFAULT_MIN_NOISE_AREA)]
    min_noise_area: u32,

    /// Full processing options as a JSON string.
    ///
    /// When provided, the individual option flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Also write the resized, preprocessed and extracted intermediates
    /// as PNG files into this directory.
    #[arg(long)]
    stages_dir: Option<PathBuf>,

    /// Print diagnostics as JSON on stdout instead of a report on stderr.
    #[arg(long)]
    json: bool,

    /// Number of runs for averaging stage timings.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Log pipeline stages at debug level.
    #[arg(short, long)]
    verbose: bool,
}

/// Build [`ProcessingOptions`] from CLI arguments, clamped into range.
///
/// If `--config-json` is provided it is parsed directly and the
/// individual flags are ignored.
fn options_from_cli(cli: &Cli) -> Result<ProcessingOptions> {
    let options = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).context("parsing --config-json")?
    } else {
        ProcessingOptions {
            method: Method::from_name(&cli.method),
            enhance_quality: !cli.no_enhance,
            remove_noise: !cli.no_denoise,
            outline_thickness: cli.thickness,
            min_noise_area: cli.min_noise_area,
        }
    };
    Ok(options.clamped())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "linework=debug,linework_pipeline=debug"
    } else {
        "linework=warn,linework_pipeline=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = options_from_cli(cli)?;
    let known = Method::ALL
        .iter()
        .any(|m| m.name().eq_ignore_ascii_case(cli.method.trim()));
    if cli.config_json.is_none() && !known {
        tracing::warn!(method = %cli.method, "unknown method, using contours");
    }

    let decoded = image::open(&cli.input)
        .with_context(|| format!("decoding {}", cli.input.display()))?;
    let bitmap = Bitmap::from_dynamic(decoded);
    tracing::info!(
        input = %cli.input.display(),
        width = bitmap.width(),
        height = bitmap.height(),
        channels = bitmap.channels(),
        ?options,
        "loaded"
    );

    let mut first: Option<StagedResult> = None;
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }
        let (staged, diagnostics) = linework_pipeline::diagnostics::process_with_diagnostics(
            bitmap.clone(),
            &options,
            &StdClock,
        )
        .context("processing image")?;

        if cli.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .context("serializing diagnostics")?;
            println!("{json}");
        } else {
            eprintln!("{}", diagnostics.report());
        }

        if first.is_none() {
            first = Some(staged);
        }
        all_diagnostics.push(diagnostics);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    let Some(staged) = first else {
        anyhow::bail!("no runs were performed");
    };

    if let Some(ref dir) = cli.stages_dir {
        write_stages(&staged, dir)?;
    }

    staged
        .output
        .into_dynamic()
        .save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    eprintln!("Coloring page written to {}", cli.output.display());

    Ok(())
}

/// Save the intermediates of one run as PNG files in `dir`.
fn write_stages(staged: &StagedResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let extraction = match &staged.extraction {
        Extraction::Mask(mask) => Bitmap::Gray(mask.clone()),
        Extraction::Color(rgb) => Bitmap::Rgb(rgb.clone()),
    };
    let stages = [
        ("1-resized.png", staged.working.clone()),
        ("2-preprocessed.png", staged.preprocessed.clone()),
        ("3-extracted.png", extraction),
    ];
    for (name, bitmap) in stages {
        let path = dir.join(name);
        bitmap
            .into_dynamic()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "stage written");
    }
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated timings across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    if all_diagnostics.is_empty() {
        return;
    }

    eprintln!();
    eprintln!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    eprintln!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    eprintln!();
    eprintln!("{:<16} {:>12}", "Stage", "Mean (ms)");
    eprintln!("{}", "-".repeat(32));
    let names = all_diagnostics[0].stages().map(|(name, _)| name);
    for (index, name) in names.into_iter().enumerate() {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        eprintln!("{name:<16} {stage_mean:>10.3}ms");
    }
}
