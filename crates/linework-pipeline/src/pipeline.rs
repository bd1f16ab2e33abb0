//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`], which runs everything in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use linework_pipeline::{Bitmap, Pipeline, PipelineError, ProcessingOptions};
//! # fn run(bitmap: Bitmap) -> Result<(), PipelineError> {
//! let staged = Pipeline::new(bitmap, ProcessingOptions::default())
//!     .validate()?
//!     .resize()
//!     .preprocess()
//!     .extract()
//!     .postprocess()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! the intermediates computed so far. Only validation can fail; every
//! later stage is total over a valid buffer.

use crate::extract::LineExtractor;
use crate::preprocess::PreprocessPlan;
use crate::types::{
    Bitmap, Dimensions, Extraction, PipelineError, ProcessingOptions, StagedResult,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before the input has been checked.
///
/// Call [`validate`](Self::validate) to advance.
#[must_use = "pipeline stages are consumed by advancing: call .validate() to continue"]
pub struct Pending {
    options: ProcessingOptions,
    source: Bitmap,
}

impl Pending {
    /// The bitmap as supplied.
    #[must_use]
    pub const fn source(&self) -> &Bitmap {
        &self.source
    }

    /// Reject zero-area or malformed buffers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if the buffer cannot be
    /// processed.
    pub fn validate(self) -> Result<Validated, PipelineError> {
        self.source.validate()?;
        Ok(Validated {
            options: self.options,
            source: self.source,
        })
    }
}

// ───────────────────────── Stage 1: Validated ────────────────────────

/// Pipeline state after validation.
#[must_use = "pipeline stages are consumed by advancing: call .resize() to continue"]
pub struct Validated {
    options: ProcessingOptions,
    source: Bitmap,
}

impl Validated {
    /// Apply the guardrail resize.
    pub fn resize(self) -> Resized {
        let source_dimensions = self.source.dimensions();
        let (working, applied) = crate::downsample::guardrail_resize(&self.source);
        tracing::debug!(
            from = ?source_dimensions,
            to = ?working.dimensions(),
            applied,
            "resize"
        );
        Resized {
            options: self.options,
            source_dimensions,
            working,
            applied,
        }
    }
}

// ───────────────────────── Stage 2: Resized ──────────────────────────

/// Pipeline state after the guardrail resize.
#[must_use = "pipeline stages are consumed by advancing: call .preprocess() to continue"]
pub struct Resized {
    options: ProcessingOptions,
    source_dimensions: Dimensions,
    working: Bitmap,
    applied: bool,
}

impl Resized {
    /// The working image.
    #[must_use]
    pub const fn working(&self) -> &Bitmap {
        &self.working
    }

    /// Whether the input was shrunk.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.applied
    }

    /// Dimensions of the bitmap as supplied.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source_dimensions
    }

    /// Run the preprocessing steps the selected method asks for.
    pub fn preprocess(self) -> Preprocessed {
        let plan = self
            .options
            .method
            .plan(self.options.enhance_quality, self.options.remove_noise);
        let preprocessed = crate::preprocess::preprocess(&self.working, plan);
        tracing::debug!(
            contrast = plan.contrast,
            smoothing = plan.smoothing,
            channels = preprocessed.channels(),
            "preprocess"
        );
        Preprocessed {
            options: self.options,
            source_dimensions: self.source_dimensions,
            applied: self.applied,
            working: self.working,
            plan,
            preprocessed,
        }
    }
}

// ───────────────────────── Stage 3: Preprocessed ─────────────────────

/// Pipeline state after contrast enhancement and smoothing.
#[must_use = "pipeline stages are consumed by advancing: call .extract() to continue"]
pub struct Preprocessed {
    options: ProcessingOptions,
    source_dimensions: Dimensions,
    applied: bool,
    working: Bitmap,
    plan: PreprocessPlan,
    preprocessed: Bitmap,
}

impl Preprocessed {
    /// The preprocessed image.
    #[must_use]
    pub const fn preprocessed(&self) -> &Bitmap {
        &self.preprocessed
    }

    /// The steps that ran.
    #[must_use]
    pub const fn plan(&self) -> PreprocessPlan {
        self.plan
    }

    /// Run the selected line extractor.
    pub fn extract(self) -> Extracted {
        let method = self.options.method;
        let extraction = method.extract(
            &self.preprocessed,
            &self.working,
            self.options.remove_noise,
        );
        let foreground = match &extraction {
            Extraction::Mask(mask) => Some(crate::edge::count_foreground(mask)),
            Extraction::Color(_) => None,
        };
        tracing::debug!(%method, channels = extraction.channels(), ?foreground, "extract");
        Extracted {
            options: self.options,
            source_dimensions: self.source_dimensions,
            applied: self.applied,
            working: self.working,
            preprocessed: self.preprocessed,
            extraction,
        }
    }
}

// ───────────────────────── Stage 4: Extracted ────────────────────────

/// Pipeline state after line extraction.
#[must_use = "pipeline stages are consumed by advancing: call .postprocess() to continue"]
pub struct Extracted {
    options: ProcessingOptions,
    source_dimensions: Dimensions,
    applied: bool,
    working: Bitmap,
    preprocessed: Bitmap,
    extraction: Extraction,
}

impl Extracted {
    /// The raw extractor output.
    #[must_use]
    pub const fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    /// Clean up, thicken and invert the mask.
    pub fn postprocess(self) -> Finished {
        let output = crate::postprocess::postprocess(&self.extraction, &self.options);
        tracing::debug!(
            bypassed = matches!(self.extraction, Extraction::Color(_)),
            thickness = self.options.outline_thickness,
            "postprocess"
        );
        Finished {
            source_dimensions: self.source_dimensions,
            applied: self.applied,
            working: self.working,
            preprocessed: self.preprocessed,
            extraction: self.extraction,
            output,
        }
    }
}

// ───────────────────────── Stage 5: Finished ─────────────────────────

/// Pipeline state once the coloring page is ready.
#[must_use = "call .into_output() or .into_result() to take the result"]
pub struct Finished {
    source_dimensions: Dimensions,
    applied: bool,
    working: Bitmap,
    preprocessed: Bitmap,
    extraction: Extraction,
    output: Bitmap,
}

impl Finished {
    /// The finished coloring page.
    #[must_use]
    pub const fn output(&self) -> &Bitmap {
        &self.output
    }

    /// Consume the pipeline and return only the coloring page.
    #[must_use]
    pub fn into_output(self) -> Bitmap {
        self.output
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            source_dimensions: self.source_dimensions,
            resized: self.applied,
            working: self.working,
            preprocessed: self.preprocessed,
            extraction: self.extraction,
            output: self.output,
        }
    }
}

/// Incremental coloring page pipeline.
///
/// Created via [`Pipeline::new`], which stores the bitmap and options
/// without doing any work. Stage methods consume the current state and
/// return the next, so stages cannot be skipped or reordered.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from a bitmap and options.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(bitmap: Bitmap, options: ProcessingOptions) -> Pending {
        Pending {
            options,
            source: bitmap,
        }
    }
}
