use rand::rngs::StdRng;

use crate::data::ExampleSet;
use crate::error::Result;
use crate::loss::MseLoss;
use crate::network::net_type::NetType;
use crate::train::{train_sgd, SgdParams};

/// The contract every network architecture satisfies.
///
/// A network holds its own parameters, its own modulator `h` and its own
/// random number generator, so independent instances never share state.
pub trait Net {
    fn net_type(&self) -> NetType;

    /// Loads the input layer ahead of a forward pass.
    fn set_inputs(&mut self, inputs: &[f64]);

    /// Runs one forward pass over whatever the input layer holds.
    fn update(&mut self);

    /// The output layer as left by the last forward pass.
    fn outputs(&self) -> &[f64];

    /// Sets the inputs, runs a forward pass and returns the outputs.
    fn run(&mut self, inputs: &[f64]) -> &[f64] {
        self.set_inputs(inputs);
        self.update();
        self.outputs()
    }

    /// Sets the modulator.  Unmodulated networks ignore it.
    fn set_h(&mut self, _h: f64) {}

    fn h(&self) -> f64 {
        0.0
    }

    fn layer_count(&self) -> usize;

    fn layer_size(&self, n: usize) -> usize;

    fn input_count(&self) -> usize {
        self.layer_size(0)
    }

    fn output_count(&self) -> usize {
        self.layer_size(self.layer_count() - 1)
    }

    /// Number of scalars `save` produces.
    fn data_size(&self) -> usize;

    /// Flattens every parameter into one buffer of `data_size()` values.
    fn save(&self) -> Vec<f64>;

    /// Restores parameters from a buffer written by `save` on a network of
    /// the same type and topology.
    fn load(&mut self, params: &[f64]) -> Result<()>;

    /// Mean squared error over `count` examples from `start`, averaged over
    /// examples and outputs.  Each example's `h` is applied before it runs.
    fn test(&mut self, examples: &ExampleSet<'_>, start: usize, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for n in start..start + count {
            self.set_h(examples.h(n));
            let out = self.run(&examples.inputs(n));
            total += MseLoss::sum_squared(out, &examples.outputs(n));
        }
        total / (count * examples.output_count()) as f64
    }

    /// `test` over the whole set.
    fn test_all(&mut self, examples: &ExampleSet<'_>) -> f64 {
        self.test(examples, 0, examples.count())
    }

    /// The generator used for weight initialisation and shuffling.
    fn rng(&mut self) -> &mut StdRng;

    /// Training hook: randomises all parameters within `[-r, r]`, with `r`
    /// the given range or the fan-in heuristic when `None`.
    fn init_weights(&mut self, range: Option<f64>);

    /// Training hook: one gradient step over `num` examples from `start`.
    /// Returns the training error for the batch.
    fn train_batch(
        &mut self,
        examples: &ExampleSet<'_>,
        start: usize,
        num: usize,
        eta: f64,
    ) -> Result<f64>;

    /// Trains by stochastic gradient descent; see [`train_sgd`].
    fn train_sgd(&mut self, examples: &ExampleSet<'_>, params: &SgdParams) -> Result<f64> {
        train_sgd(self, examples, params)
    }
}
