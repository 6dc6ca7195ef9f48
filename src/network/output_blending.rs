use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::ExampleSet;
use crate::error::{NetError, Result};
use crate::network::net_type::NetType;
use crate::network::network::Net;
use crate::network::plain::PlainNet;

/// Two plain networks of the same topology whose outputs are blended:
/// `h · out1 + (1 − h) · out0`.
///
/// Training presents one example at a time and trains only one of the
/// pair: network 0 when the example's `h < 0.5`, network 1 otherwise.
///
/// The reported training error is smoothed over the two functions: the
/// first presentation reports its own error, a presentation at `h < 0.5`
/// repeats the last reported value, and one at `h ≥ 0.5` reports (and keeps)
/// the mean of its error and the last value.  This assumes the presented
/// sequence alternates between the two levels; with any other order the
/// value is only loosely a two-function mean.
pub struct OutputBlendingNet {
    net0: PlainNet,
    net1: PlainNet,
    modulator: f64,
    blended: Vec<f64>,
    last_error: Option<f64>,
    rng: StdRng,
}

impl OutputBlendingNet {
    pub fn new(sizes: &[usize]) -> Result<OutputBlendingNet> {
        let net0 = PlainNet::new(sizes)?;
        let net1 = PlainNet::new(sizes)?;
        let blended = vec![0.0; net0.output_count()];
        Ok(OutputBlendingNet {
            net0,
            net1,
            modulator: 0.0,
            blended,
            last_error: None,
            rng: StdRng::seed_from_u64(0),
        })
    }

    /// The network trained on `h < 0.5` examples.
    pub fn low(&self) -> &PlainNet {
        &self.net0
    }

    /// The network trained on `h ≥ 0.5` examples.
    pub fn high(&self) -> &PlainNet {
        &self.net1
    }
}

impl Net for OutputBlendingNet {
    fn net_type(&self) -> NetType {
        NetType::OutputBlending
    }

    fn set_inputs(&mut self, inputs: &[f64]) {
        self.net0.set_inputs(inputs);
        self.net1.set_inputs(inputs);
    }

    fn update(&mut self) {
        self.net0.update();
        self.net1.update();
        let h = self.modulator;
        let (o0, o1) = (self.net0.outputs(), self.net1.outputs());
        for ((out, &a), &b) in self.blended.iter_mut().zip(o0).zip(o1) {
            *out = h * b + (1.0 - h) * a;
        }
    }

    fn outputs(&self) -> &[f64] {
        &self.blended
    }

    fn set_h(&mut self, h: f64) {
        self.modulator = h;
    }

    fn h(&self) -> f64 {
        self.modulator
    }

    fn layer_count(&self) -> usize {
        self.net0.layer_count()
    }

    fn layer_size(&self, n: usize) -> usize {
        self.net0.layer_size(n)
    }

    fn data_size(&self) -> usize {
        self.net0.data_size() * 2
    }

    fn save(&self) -> Vec<f64> {
        let mut out = self.net0.save();
        out.extend(self.net1.save());
        out
    }

    fn load(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.data_size() {
            return Err(NetError::Format(format!(
                "expected {} parameters, got {}",
                self.data_size(),
                params.len()
            )));
        }
        let (p0, p1) = params.split_at(self.net0.data_size());
        self.net0.load(p0)?;
        self.net1.load(p1)
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn init_weights(&mut self, range: Option<f64>) {
        self.net0.layers_mut().init_weights(range, &mut self.rng);
        self.net1.layers_mut().init_weights(range, &mut self.rng);
        self.last_error = None;
    }

    fn train_batch(
        &mut self,
        examples: &ExampleSet<'_>,
        start: usize,
        num: usize,
        eta: f64,
    ) -> Result<f64> {
        if num != 1 {
            return Err(NetError::Unsupported(format!(
                "output blending trains one example at a time, got a batch of {}",
                num
            )));
        }
        let low = examples.h(start) < 0.5;
        let net = if low { &mut self.net0 } else { &mut self.net1 };
        let e = net.train_batch(examples, start, 1, eta)?;

        let reported = match self.last_error {
            None => e,
            Some(last) if low => last,
            Some(last) => (e + last) * 0.5,
        };
        self.last_error = Some(reported);
        Ok(reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_set() -> ExampleSet<'static> {
        let mut e = ExampleSet::new(2, 1, 1, 2).unwrap();
        e.set_example(0, &[1.0], &[0.0], 0.0);
        e.set_example(1, &[1.0], &[1.0], 1.0);
        e
    }

    #[test]
    fn blends_by_modulator() {
        let mut net = OutputBlendingNet::new(&[1, 1]).unwrap();
        // net0 bias 0 weight 0 -> 0.5; net1 bias 2 weight 0 -> σ(2)
        net.load(&[0.0, 0.0, 2.0, 0.0]).unwrap();
        let s2 = crate::activation::sigmoid(2.0);
        net.set_h(0.0);
        assert_eq!(net.run(&[1.0])[0], 0.5);
        net.set_h(1.0);
        assert_eq!(net.run(&[1.0])[0], s2);
        net.set_h(0.25);
        assert_eq!(net.run(&[1.0])[0], 0.25 * s2 + 0.75 * 0.5);
    }

    #[test]
    fn rejects_batches() {
        let e = two_level_set();
        let mut net = OutputBlendingNet::new(&[1, 1]).unwrap();
        assert!(matches!(net.train_batch(&e, 0, 2, 0.1), Err(NetError::Unsupported(_))));
    }

    #[test]
    fn trains_only_the_matching_network() {
        let e = two_level_set();
        let mut net = OutputBlendingNet::new(&[1, 2, 1]).unwrap();
        net.init_weights(None);
        let high_before = net.high().save();
        let low_before = net.low().save();

        net.train_batch(&e, 0, 1, 0.5).unwrap();
        assert_ne!(net.low().save(), low_before);
        assert_eq!(net.high().save(), high_before);

        let low_after = net.low().save();
        net.train_batch(&e, 1, 1, 0.5).unwrap();
        assert_eq!(net.low().save(), low_after);
        assert_ne!(net.high().save(), high_before);
    }

    #[test]
    fn error_is_two_step_mean() {
        let e = two_level_set();
        let mut net = OutputBlendingNet::new(&[1, 1]).unwrap();
        net.init_weights(None);

        // reference errors: what each sub-network reports on its own
        let mut low = PlainNet::new(&[1, 1]).unwrap();
        let mut high = PlainNet::new(&[1, 1]).unwrap();
        low.load(&net.low().save()).unwrap();
        high.load(&net.high().save()).unwrap();

        let e0 = low.train_batch(&e, 0, 1, 0.5).unwrap();
        let r0 = net.train_batch(&e, 0, 1, 0.5).unwrap();
        assert_eq!(r0, e0);

        let e1 = high.train_batch(&e, 1, 1, 0.5).unwrap();
        let r1 = net.train_batch(&e, 1, 1, 0.5).unwrap();
        assert_eq!(r1, (e1 + e0) * 0.5);

        // a following h<0.5 presentation repeats the last mean
        let r2 = net.train_batch(&e, 0, 1, 0.5).unwrap();
        assert_eq!(r2, r1);
    }
}
