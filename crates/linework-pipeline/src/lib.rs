//! linework-pipeline: pure photo-to-coloring-page pipeline (sans-IO).
//!
//! Converts an in-memory raster into black line art on a white page:
//! guardrail resize -> contrast enhancement -> smoothing -> line
//! extraction (pluggable method) -> noise filter -> cleanup -> thicken ->
//! invert.
//!
//! This crate has **no I/O**. It takes a decoded [`Bitmap`] and returns a
//! new one; decoding, encoding and the filesystem live in the `linework`
//! CLI. Every call allocates its own buffers and touches no global state,
//! so concurrent calls are safe.

pub mod blur;
pub mod contour;
pub mod contrast;
pub mod diagnostics;
pub mod downsample;
pub mod edge;
pub mod extract;
pub mod grayscale;
pub mod morphology;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod threshold;
pub mod types;

pub use extract::{LineExtractor, Method};
pub use pipeline::Pipeline;
pub use types::{
    Bitmap, Dimensions, Extraction, PipelineError, ProcessingOptions, StagedResult,
};

/// Turn a photograph into a coloring page.
///
/// The output has the input's dimensions unless the guardrail resize
/// shrank it (longer side capped at [`downsample::MAX_DIMENSION`]). It is
/// single-channel, black lines on white, for every method except
/// [`Method::Cartoon`], which yields a 3-channel color image.
///
/// # Pipeline steps
///
/// 1. Validate the buffer
/// 2. Guardrail resize
/// 3. Contrast enhancement and smoothing, as the method requires
/// 4. Line extraction
/// 5. Noise filter, cleanup, thickening and inversion
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] if the buffer is zero-area or
/// its sample count disagrees with its dimensions.
pub fn process(bitmap: Bitmap, options: &ProcessingOptions) -> Result<Bitmap, PipelineError> {
    Ok(run(bitmap, options)?.into_output())
}

/// Like [`process`], but keeps every intermediate buffer.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    bitmap: Bitmap,
    options: &ProcessingOptions,
) -> Result<StagedResult, PipelineError> {
    Ok(run(bitmap, options)?.into_result())
}

fn run(
    bitmap: Bitmap,
    options: &ProcessingOptions,
) -> Result<pipeline::Finished, PipelineError> {
    Ok(Pipeline::new(bitmap, *options)
        .validate()?
        .resize()
        .preprocess()
        .extract()
        .postprocess())
}
