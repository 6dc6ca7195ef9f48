use serde::{Deserialize, Serialize};

/// One cross-validation evaluation, as emitted by `train_sgd`.
///
/// When a progress channel is configured with [`SgdParams::progress`], the
/// driver sends one `CvStats` per evaluation.  Together they make up the
/// cross-validation error curve of a run.
///
/// [`SgdParams::progress`]: crate::train::SgdParams::progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvStats {
    /// 0-based training iteration after which the evaluation ran.
    pub iteration: usize,
    /// Index of the slice that was tested.
    pub slice: usize,
    /// Mean squared error over the slice.
    pub cv_error: f64,
    /// Lowest error seen so far by the best-model tracker, if it has
    /// recorded anything yet.
    pub best_error: Option<f64>,
}
