pub mod cv_stats;
pub mod loop_fn;
pub mod sgd_params;

pub use cv_stats::CvStats;
pub use loop_fn::{accuracy, train_sgd};
pub use sgd_params::SgdParams;
