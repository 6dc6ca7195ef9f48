pub mod dense;

pub use dense::DenseLayers;
