use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::ExampleSet;
use crate::error::Result;
use crate::layers::DenseLayers;
use crate::network::net_type::NetType;
use crate::network::network::Net;

/// The plain back-propagation network: dense sigmoid layers, no modulation.
pub struct PlainNet {
    layers: DenseLayers,
    rng: StdRng,
}

impl PlainNet {
    /// Builds a network with the given layer sizes, input layer first.
    /// Parameters start at zero; training initialises them.
    pub fn new(sizes: &[usize]) -> Result<PlainNet> {
        Ok(PlainNet {
            layers: DenseLayers::new(sizes)?,
            rng: StdRng::seed_from_u64(0),
        })
    }

    pub fn layers(&self) -> &DenseLayers {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut DenseLayers {
        &mut self.layers
    }
}

impl Net for PlainNet {
    fn net_type(&self) -> NetType {
        NetType::Plain
    }

    fn set_inputs(&mut self, inputs: &[f64]) {
        let n = self.layers.layer_size(0);
        self.layers.set_inputs(&inputs[..n]);
    }

    fn update(&mut self) {
        self.layers.feed_forward(1.0);
    }

    fn outputs(&self) -> &[f64] {
        self.layers.outputs()
    }

    fn layer_count(&self) -> usize {
        self.layers.layer_count()
    }

    fn layer_size(&self, n: usize) -> usize {
        self.layers.layer_size(n)
    }

    fn data_size(&self) -> usize {
        self.layers.data_size()
    }

    fn save(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.data_size());
        self.layers.write_params(&mut out);
        out
    }

    fn load(&mut self, params: &[f64]) -> Result<()> {
        self.layers.read_params(params)
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn init_weights(&mut self, range: Option<f64>) {
        self.layers.init_weights(range, &mut self.rng);
    }

    fn train_batch(
        &mut self,
        examples: &ExampleSet<'_>,
        start: usize,
        num: usize,
        eta: f64,
    ) -> Result<f64> {
        Ok(self.layers.train_batch(examples, start, num, eta, |layers, inputs, _h| {
            layers.set_inputs(inputs);
            1.0
        }))
    }
}
