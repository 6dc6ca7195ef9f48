pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod train;

// Convenience re-exports
pub use data::{ExampleSet, IdxImages, LabelledImages, ShuffleMode};
pub use error::{NetError, Result};
pub use layers::dense::DenseLayers;
pub use loss::mse::MseLoss;
pub use network::{
    load_net, make_net, make_net_for, save_net, HInputNet, Net, NetType, OutputBlendingNet,
    PlainNet, UesNet,
};
pub use train::{train_sgd, CvStats, SgdParams};
