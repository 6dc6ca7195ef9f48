use rand::rngs::StdRng;

use crate::data::ExampleSet;
use crate::error::Result;
use crate::network::net_type::NetType;
use crate::network::network::Net;
use crate::network::plain::PlainNet;

/// A plain network with one hidden extra input carrying the modulator.
///
/// The wrapped network's input layer is one node wider than the caller
/// sees: `layer_size(0)` reports the visible inputs only, and every forward
/// pass writes the current `h` into the extra node.
pub struct HInputNet {
    net: PlainNet,
    modulator: f64,
}

impl HInputNet {
    /// `sizes[0]` is the number of visible inputs.
    pub fn new(sizes: &[usize]) -> Result<HInputNet> {
        let mut inner = sizes.to_vec();
        if let Some(first) = inner.first_mut() {
            *first += 1;
        }
        Ok(HInputNet {
            net: PlainNet::new(&inner)?,
            modulator: 0.0,
        })
    }

    /// The wrapped network, modulator input included.
    pub fn inner(&self) -> &PlainNet {
        &self.net
    }

    fn visible_inputs(&self) -> usize {
        self.net.layer_size(0) - 1
    }
}

impl Net for HInputNet {
    fn net_type(&self) -> NetType {
        NetType::HInput
    }

    fn set_inputs(&mut self, inputs: &[f64]) {
        let n = self.visible_inputs();
        let h = self.modulator;
        let layers = self.net.layers_mut();
        layers.set_inputs(&inputs[..n]);
        layers.set_input(n, h);
    }

    fn update(&mut self) {
        self.net.update();
    }

    fn outputs(&self) -> &[f64] {
        self.net.outputs()
    }

    fn set_h(&mut self, h: f64) {
        self.modulator = h;
    }

    fn h(&self) -> f64 {
        self.modulator
    }

    fn layer_count(&self) -> usize {
        self.net.layer_count()
    }

    fn layer_size(&self, n: usize) -> usize {
        if n == 0 {
            self.visible_inputs()
        } else {
            self.net.layer_size(n)
        }
    }

    fn data_size(&self) -> usize {
        self.net.data_size()
    }

    fn save(&self) -> Vec<f64> {
        self.net.save()
    }

    fn load(&mut self, params: &[f64]) -> Result<()> {
        self.net.load(params)
    }

    fn rng(&mut self) -> &mut StdRng {
        self.net.rng()
    }

    fn init_weights(&mut self, range: Option<f64>) {
        self.net.init_weights(range);
    }

    fn train_batch(
        &mut self,
        examples: &ExampleSet<'_>,
        start: usize,
        num: usize,
        eta: f64,
    ) -> Result<f64> {
        let n = self.visible_inputs();
        let err = self.net.layers_mut().train_batch(examples, start, num, eta, |layers, inputs, h| {
            layers.set_inputs(&inputs[..n]);
            layers.set_input(n, h);
            1.0
        });
        if num > 0 {
            self.modulator = examples.h(start + num - 1);
        }
        Ok(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_modulator_input() {
        let net = HInputNet::new(&[2, 3, 1]).unwrap();
        assert_eq!(net.layer_size(0), 2);
        assert_eq!(net.input_count(), 2);
        assert_eq!(net.inner().layer_size(0), 3);
        assert_eq!(net.data_size(), 3 * 4 + 1 * 4);
    }

    #[test]
    fn modulator_reaches_last_input() {
        // 3-1 inner net where only the hidden input has a weight
        let mut net = HInputNet::new(&[2, 1]).unwrap();
        net.load(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        net.set_h(0.0);
        assert_eq!(net.run(&[5.0, 5.0])[0], 0.5);
        net.set_h(2.0);
        assert_eq!(net.run(&[5.0, 5.0])[0], crate::activation::sigmoid(2.0));
    }
}
