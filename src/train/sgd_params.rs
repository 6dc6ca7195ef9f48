use std::fs;
use std::path::Path;
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::data::{ExampleSet, ShuffleMode};
use crate::error::{NetError, Result};
use crate::train::cv_stats::CvStats;

/// Settings for a `train_sgd` run.
///
/// Built with [`SgdParams::new`] or [`SgdParams::per_example`] and refined
/// through the chained setters.  Nothing is checked until training starts;
/// see [`SgdParams::validate`].
///
/// # Fields
/// - `eta`                 — learning rate
/// - `iterations`          — number of single-example presentations
/// - `n_slices`            — cross-validation slices; 0 disables CV
/// - `n_per_slice`         — examples per slice
/// - `cv_interval`         — iterations between CV evaluations
/// - `cv_shuffle`          — reshuffle the CV examples after every full cycle
/// - `shuffle_mode`        — how the training examples are reshuffled
/// - `select_best_with_cv` — judge the best network by CV error rather than
///                           by training error
/// - `store_best`          — keep a snapshot of the best network and finish
///                           with it loaded
/// - `init_range`          — initial weights in `[-r, r]`; `None` uses the
///                           fan-in heuristic
/// - `seed`                — seed for the network's generator
/// - `progress_tx`         — optional sink for per-evaluation `CvStats`; a
///                           dropped receiver is ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdParams {
    pub eta: f64,
    pub iterations: usize,
    #[serde(default)]
    pub n_slices: usize,
    #[serde(default)]
    pub n_per_slice: usize,
    #[serde(default = "default_cv_interval")]
    pub cv_interval: usize,
    #[serde(default = "default_true")]
    pub cv_shuffle: bool,
    #[serde(default)]
    pub shuffle_mode: ShuffleMode,
    #[serde(default)]
    pub select_best_with_cv: bool,
    #[serde(default)]
    pub store_best: bool,
    #[serde(default)]
    pub init_range: Option<f64>,
    #[serde(default)]
    pub seed: u64,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<CvStats>>,
}

fn default_cv_interval() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl SgdParams {
    /// Parameters for `iterations` presentations at learning rate `eta`,
    /// with no cross-validation.
    pub fn new(eta: f64, iterations: usize) -> Self {
        SgdParams {
            eta,
            iterations,
            n_slices: 0,
            n_per_slice: 0,
            cv_interval: default_cv_interval(),
            cv_shuffle: true,
            shuffle_mode: ShuffleMode::default(),
            select_best_with_cv: false,
            store_best: false,
            init_range: None,
            seed: 0,
            progress_tx: None,
        }
    }

    /// Like [`SgdParams::new`] but counts in passes: `iterations_per_example`
    /// presentations for every example in `examples`.
    pub fn per_example(eta: f64, examples: &ExampleSet<'_>, iterations_per_example: usize) -> Self {
        SgdParams::new(eta, examples.count() * iterations_per_example)
    }

    /// Holds out `floor(count * proportion)` examples from the end of
    /// `examples` for cross-validation, split into `slices` slices and
    /// evaluated `cv_count` times over the run.  Selects the best network
    /// by CV error.
    ///
    /// Set `iterations` before calling this; the evaluation interval is
    /// derived from it.
    pub fn cross_validation(
        mut self,
        examples: &ExampleSet<'_>,
        proportion: f64,
        cv_count: usize,
        slices: usize,
        shuffle: bool,
    ) -> Self {
        let n_cv = (examples.count() as f64 * proportion).floor() as usize;
        if slices == 0 {
            // Leaves the slice count at zero so training reports it.
            self.n_slices = 0;
            self.n_per_slice = n_cv;
        } else {
            self.n_slices = slices;
            self.n_per_slice = n_cv / slices;
        }
        self.cv_interval = if cv_count == 0 { 0 } else { self.iterations / cv_count };
        self.cv_shuffle = shuffle;
        self.select_best_with_cv = true;
        self
    }

    /// Sets the slice geometry and evaluation interval directly.
    pub fn cross_validation_raw(
        mut self,
        slices: usize,
        per_slice: usize,
        interval: usize,
    ) -> Self {
        self.n_slices = slices;
        self.n_per_slice = per_slice;
        self.cv_interval = interval;
        self
    }

    pub fn store_best(mut self) -> Self {
        self.store_best = true;
        self
    }

    pub fn select_best_with_cv(mut self, enabled: bool) -> Self {
        self.select_best_with_cv = enabled;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn shuffle(mut self, mode: ShuffleMode) -> Self {
        self.shuffle_mode = mode;
        self
    }

    pub fn init_range(mut self, range: f64) -> Self {
        self.init_range = Some(range);
        self
    }

    pub fn progress(mut self, tx: mpsc::Sender<CvStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Total number of held-out examples.
    pub fn cv_example_count(&self) -> usize {
        self.n_slices * self.n_per_slice
    }

    /// Checks the parameters against a set of `count` examples.
    pub fn validate(&self, count: usize) -> Result<()> {
        let n_cv = self.cv_example_count();
        if n_cv >= count {
            return Err(NetError::Range(format!(
                "{} cross-validation examples leave none of {} for training",
                n_cv, count
            )));
        }
        if (self.n_slices == 0) != (self.n_per_slice == 0) {
            return Err(NetError::Config(format!(
                "cross-validation needs a non-zero slice count and size (slices={}, per slice={})",
                self.n_slices, self.n_per_slice
            )));
        }
        if self.select_best_with_cv && n_cv == 0 {
            return Err(NetError::Config(
                "best network selected by cross-validation, but none is set up".into(),
            ));
        }
        if n_cv > 0 && self.cv_interval == 0 {
            return Err(NetError::Config("cross-validation interval is zero".into()));
        }
        Ok(())
    }

    /// Writes the parameters as pretty-printed JSON.  The progress channel
    /// is not saved.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| NetError::Format(format!("cannot serialise training parameters: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<SgdParams> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| NetError::Config(format!("bad training parameters: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(count: usize) -> ExampleSet<'static> {
        ExampleSet::new(count, 1, 1, 1).unwrap()
    }

    #[test]
    fn defaults() {
        let p = SgdParams::new(0.1, 50);
        assert_eq!(p.cv_interval, 1);
        assert!(p.cv_shuffle);
        assert_eq!(p.shuffle_mode, ShuffleMode::Stride);
        assert!(!p.store_best && !p.select_best_with_cv);
        assert_eq!(p.init_range, None);
        assert_eq!(p.cv_example_count(), 0);
        assert!(p.validate(1).is_ok());
    }

    #[test]
    fn per_example_counts_passes() {
        assert_eq!(SgdParams::per_example(0.1, &set(8), 100).iterations, 800);
    }

    #[test]
    fn cross_validation_geometry() {
        let p = SgdParams::new(1.0, 10_000).cross_validation(&set(1000), 0.5, 1000, 10, false);
        assert_eq!((p.n_slices, p.n_per_slice), (10, 50));
        assert_eq!(p.cv_interval, 10);
        assert!(p.select_best_with_cv);
        assert!(!p.cv_shuffle);
        assert!(p.validate(1000).is_ok());
    }

    #[test]
    fn validation_errors() {
        let e = set(10);
        let p = SgdParams::new(0.1, 100).cross_validation_raw(2, 5, 1);
        assert!(matches!(p.validate(e.count()), Err(NetError::Range(_))));

        let p = SgdParams::new(0.1, 100).cross_validation(&e, 0.5, 10, 0, true);
        assert!(matches!(p.validate(e.count()), Err(NetError::Config(_))));

        let p = SgdParams::new(0.1, 100).select_best_with_cv(true);
        assert!(matches!(p.validate(e.count()), Err(NetError::Config(_))));

        let p = SgdParams::new(0.1, 100).cross_validation(&e, 0.5, 0, 1, true);
        assert_eq!(p.cv_interval, 0);
        assert!(matches!(p.validate(e.count()), Err(NetError::Config(_))));
    }

    #[test]
    fn json_round_trip() {
        let path = std::env::temp_dir().join(format!("uesmann-params-{}.json", std::process::id()));
        let p = SgdParams::new(0.25, 1234)
            .cross_validation_raw(3, 4, 7)
            .shuffle(ShuffleMode::Alternate)
            .init_range(0.5)
            .seed(99)
            .store_best();
        p.save_json(&path).unwrap();
        let back = SgdParams::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.eta, 0.25);
        assert_eq!(back.iterations, 1234);
        assert_eq!((back.n_slices, back.n_per_slice, back.cv_interval), (3, 4, 7));
        assert_eq!(back.shuffle_mode, ShuffleMode::Alternate);
        assert_eq!(back.init_range, Some(0.5));
        assert_eq!(back.seed, 99);
        assert!(back.store_best);
        assert!(back.progress_tx.is_none());
    }

    #[test]
    fn missing_json_fields_take_defaults() {
        let p: SgdParams = serde_json::from_str(r#"{"eta": 0.5, "iterations": 10}"#).unwrap();
        assert_eq!(p.cv_interval, 1);
        assert!(p.cv_shuffle);
        assert_eq!(p.shuffle_mode, ShuffleMode::Stride);
    }
}
