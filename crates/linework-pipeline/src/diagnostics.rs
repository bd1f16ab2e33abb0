//! Pipeline diagnostics: timing and pixel counts for each stage.
//!
//! The core never reads the system clock itself. Callers inject a
//! [`Clock`] into [`process_with_diagnostics`]; the CLI backs it with
//! `std::time::Instant`, tests use a fake that advances on demand.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::Method;
use crate::pipeline::Pipeline;
use crate::types::{Bitmap, Dimensions, Extraction, PipelineError, ProcessingOptions, StagedResult};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration must be finite and non-negative"))
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Guardrail resize.
    pub resize: StageDiagnostics,
    /// Contrast enhancement and smoothing.
    pub preprocess: StageDiagnostics,
    /// Line extraction.
    pub extract: StageDiagnostics,
    /// Noise filter, cleanup, thickening and inversion.
    pub postprocess: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Guardrail resize metrics.
    Resize {
        /// Dimensions as supplied.
        from: Dimensions,
        /// Working dimensions.
        to: Dimensions,
        /// Whether the input was shrunk.
        applied: bool,
    },
    /// Preprocessing metrics.
    Preprocess {
        /// Contrast enhancement ran.
        contrast: bool,
        /// Smoothing ran.
        smoothing: bool,
        /// Channels of the preprocessed image.
        channels: u8,
    },
    /// Line extraction metrics.
    Extract {
        /// Extractor used.
        method: Method,
        /// Channels of the extraction (3 only for color methods).
        channels: u8,
        /// Line pixels in the raw mask; `None` for color output.
        foreground_pixels: Option<u64>,
    },
    /// Postprocessing metrics.
    Postprocess {
        /// The extraction was already final and skipped every step.
        bypassed: bool,
        /// Line pixels entering postprocessing.
        foreground_before: Option<u64>,
        /// Black pixels in the finished page.
        line_pixels_after: Option<u64>,
    },
}

/// High-level summary for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output pixel count.
    pub pixel_count: u64,
    /// Channels of the output.
    pub channels: u8,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Output: {}x{} ({} pixels, {} channel(s))",
            self.summary.width, self.summary.height, self.summary.pixel_count, self.summary.channels,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());
        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }

    /// Stage names paired with their diagnostics, in execution order.
    #[must_use]
    pub const fn stages(&self) -> [(&'static str, &StageDiagnostics); 4] {
        [
            ("Resize", &self.resize),
            ("Preprocess", &self.preprocess),
            ("Extract", &self.extract),
            ("Postprocess", &self.postprocess),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_count(count: Option<u64>) -> String {
    count.map_or_else(|| "-".to_owned(), |c| c.to_string())
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Resize { from, to, applied } => {
            if *applied {
                format!("{}x{} -> {}x{}", from.width, from.height, to.width, to.height)
            } else {
                format!("{}x{} (unchanged)", from.width, from.height)
            }
        }
        StageMetrics::Preprocess {
            contrast,
            smoothing,
            channels,
        } => format!("contrast={contrast} smoothing={smoothing} channels={channels}"),
        StageMetrics::Extract {
            method,
            channels,
            foreground_pixels,
        } => format!(
            "{method} channels={channels} lines={}",
            format_count(*foreground_pixels)
        ),
        StageMetrics::Postprocess {
            bypassed,
            foreground_before,
            line_pixels_after,
        } => {
            if *bypassed {
                "bypassed".to_owned()
            } else {
                format!(
                    "lines {} -> {}",
                    format_count(*foreground_before),
                    format_count(*line_pixels_after)
                )
            }
        }
    }
}

/// Count black pixels on a finished page.
fn count_line_pixels(page: &Bitmap) -> Option<u64> {
    match page {
        Bitmap::Gray(gray) => Some(gray.pixels().map(|p| u64::from(p.0[0] == 0)).sum()),
        Bitmap::Rgb(_) => None,
    }
}

fn mask_foreground(extraction: &Extraction) -> Option<u64> {
    match extraction {
        Extraction::Mask(mask) => Some(crate::edge::count_foreground(mask)),
        Extraction::Color(_) => None,
    }
}

/// Run the pipeline, timing each stage with `clock`.
///
/// Produces exactly the same [`StagedResult`] as
/// [`process_staged`](crate::process_staged).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the buffer is zero-area or
/// malformed.
pub fn process_with_diagnostics<C: Clock>(
    bitmap: Bitmap,
    options: &ProcessingOptions,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let run_start = clock.now();

    let start = clock.now();
    let resized = Pipeline::new(bitmap, *options).validate()?.resize();
    let resize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Resize {
            from: resized.source_dimensions(),
            to: resized.working().dimensions(),
            applied: resized.applied(),
        },
    };

    let start = clock.now();
    let preprocessed = resized.preprocess();
    let plan = preprocessed.plan();
    let preprocess = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Preprocess {
            contrast: plan.contrast,
            smoothing: plan.smoothing,
            channels: preprocessed.preprocessed().channels(),
        },
    };

    let start = clock.now();
    let extracted = preprocessed.extract();
    let extract_duration = clock.elapsed(&start);
    let foreground = mask_foreground(extracted.extraction());
    let extract = StageDiagnostics {
        duration: extract_duration,
        metrics: StageMetrics::Extract {
            method: options.method,
            channels: extracted.extraction().channels(),
            foreground_pixels: foreground,
        },
    };

    let start = clock.now();
    let finished = extracted.postprocess();
    let postprocess_duration = clock.elapsed(&start);
    let staged = finished.into_result();
    let postprocess = StageDiagnostics {
        duration: postprocess_duration,
        metrics: StageMetrics::Postprocess {
            bypassed: foreground.is_none(),
            foreground_before: foreground,
            line_pixels_after: count_line_pixels(&staged.output),
        },
    };

    let total_duration = clock.elapsed(&run_start);
    let Dimensions { width, height } = staged.output.dimensions();
    let summary = PipelineSummary {
        width,
        height,
        pixel_count: u64::from(width) * u64::from(height),
        channels: staged.output.channels(),
    };

    Ok((
        staged,
        PipelineDiagnostics {
            resize,
            preprocess,
            extract,
            postprocess,
            total_duration,
            summary,
        },
    ))
}
