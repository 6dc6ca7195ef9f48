pub mod example_set;
pub mod images;

pub use example_set::{alternate, ExampleSet, ShuffleMode};
pub use images::{IdxImages, LabelledImages};
