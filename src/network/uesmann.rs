use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::ExampleSet;
use crate::error::Result;
use crate::layers::DenseLayers;
use crate::network::net_type::NetType;
use crate::network::network::Net;

/// UESMANN: the plain topology, with every weighted sum (not the biases)
/// scaled by `h + 1`.  At `h = 0` the weights act at nominal strength, at
/// `h = 1` they are doubled.
pub struct UesNet {
    layers: DenseLayers,
    rng: StdRng,
    modulator: f64,
}

impl UesNet {
    pub fn new(sizes: &[usize]) -> Result<UesNet> {
        Ok(UesNet {
            layers: DenseLayers::new(sizes)?,
            rng: StdRng::seed_from_u64(0),
            modulator: 0.0,
        })
    }

    pub fn layers(&self) -> &DenseLayers {
        &self.layers
    }
}

impl Net for UesNet {
    fn net_type(&self) -> NetType {
        NetType::Uesmann
    }

    fn set_inputs(&mut self, inputs: &[f64]) {
        let n = self.layers.layer_size(0);
        self.layers.set_inputs(&inputs[..n]);
    }

    fn update(&mut self) {
        self.layers.feed_forward(self.modulator + 1.0);
    }

    fn outputs(&self) -> &[f64] {
        self.layers.outputs()
    }

    fn set_h(&mut self, h: f64) {
        self.modulator = h;
    }

    fn h(&self) -> f64 {
        self.modulator
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
        let err = self.layers.train_batch(examples, start, num, eta, |layers, inputs, h| {
            layers.set_inputs(inputs);
            h + 1.0
        });
        if num > 0 {
            self.modulator = examples.h(start + num - 1);
        }
        Ok(err)
    }
}
