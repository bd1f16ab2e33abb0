//! Preprocessing stage: contrast enhancement, then edge-preserving
//! smoothing.
//!
//! Each extractor states which of the two steps it needs through a
//! [`PreprocessPlan`], so the shared "enhance, then smooth" sequence lives
//! in one place instead of being repeated per method. A disabled step is a
//! pass-through. The output always has the dimensions and channel count of
//! the input.

use crate::types::Bitmap;

/// Which preprocessing steps to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreprocessPlan {
    /// Localized histogram equalization (see [`crate::contrast`]).
    pub contrast: bool,
    /// Bilateral smoothing (see [`crate::blur::smooth`]).
    pub smoothing: bool,
}

impl PreprocessPlan {
    /// The plan implied by the user-facing flags alone.
    #[must_use]
    pub const fn from_flags(enhance_quality: bool, remove_noise: bool) -> Self {
        Self {
            contrast: enhance_quality,
            smoothing: remove_noise,
        }
    }

    /// `true` when neither step runs.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        !self.contrast && !self.smoothing
    }
}

/// Run the planned steps on `bitmap`, returning a new buffer.
#[must_use = "returns the preprocessed bitmap"]
pub fn preprocess(bitmap: &Bitmap, plan: PreprocessPlan) -> Bitmap {
    let enhanced = if plan.contrast {
        crate::contrast::enhance_contrast(bitmap)
    } else {
        bitmap.clone()
    };
    if plan.smoothing {
        crate::blur::smooth(&enhanced)
    } else {
        enhanced
    }
}
