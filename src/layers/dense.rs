use rand::Rng;

use crate::activation::{sigmoid, sigmoid_slope};
use crate::data::ExampleSet;
use crate::error::{NetError, Result};
use crate::loss::MseLoss;

/// A stack of fully-connected sigmoid layers with everything needed to run
/// and back-propagate through them.
///
/// Layer 0 is the input layer and carries no parameters.  Each other layer
/// `l` has a bias per node and a weight buffer of `largest × largest` cells,
/// where `largest` is the size of the biggest layer; the weight from node
/// `from` of layer `l-1` to node `to` of layer `l` lives at
/// `to + largest * from`.  Cells outside the real shape stay zero.
///
/// Every pass takes a `scale` applied to the weighted sum (never the bias).
/// Unmodulated networks pass `1.0`.
#[derive(Debug, Clone)]
pub struct DenseLayers {
    sizes: Vec<usize>,
    largest: usize,
    weights: Vec<Vec<f64>>,
    biases: Vec<Vec<f64>>,
    outputs: Vec<Vec<f64>>,
    errors: Vec<Vec<f64>>,
    grad_weights: Vec<Vec<f64>>,
    grad_biases: Vec<Vec<f64>>,
}

impl DenseLayers {
    /// Allocates zeroed layers.  Needs at least an input and an output
    /// layer, none of them empty.
    pub fn new(sizes: &[usize]) -> Result<DenseLayers> {
        if sizes.len() < 2 || sizes.contains(&0) {
            return Err(NetError::Config(format!(
                "a network needs at least two non-empty layers, got {:?}",
                sizes
            )));
        }
        let largest = sizes.iter().copied().max().unwrap_or(0);
        // Two square f64 buffers per layer must stay addressable.
        let square = largest
            .checked_mul(largest)
            .filter(|cells| cells.checked_mul(sizes.len() * 16).is_some())
            .ok_or_else(|| {
                NetError::Config(format!("layer of {} nodes is too large", largest))
            })?;
        let per_layer = |f: &dyn Fn(usize) -> usize| -> Vec<Vec<f64>> {
            sizes.iter().map(|&n| vec![0.0; f(n)]).collect()
        };

        Ok(DenseLayers {
            sizes: sizes.to_vec(),
            largest,
            weights: per_layer(&|_| square),
            biases: per_layer(&|n| n),
            outputs: per_layer(&|n| n),
            errors: per_layer(&|n| n),
            grad_weights: per_layer(&|_| square),
            grad_biases: per_layer(&|n| n),
        })
    }

    pub fn layer_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn layer_size(&self, n: usize) -> usize {
        self.sizes[n]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    fn output_layer(&self) -> usize {
        self.sizes.len() - 1
    }

    /// Copies `inputs` into the first `inputs.len()` input nodes.
    pub fn set_inputs(&mut self, inputs: &[f64]) {
        self.outputs[0][..inputs.len()].copy_from_slice(inputs);
    }

    pub fn set_input(&mut self, n: usize, value: f64) {
        self.outputs[0][n] = value;
    }

    pub fn outputs(&self) -> &[f64] {
        &self.outputs[self.output_layer()]
    }

    pub fn weight(&self, layer: usize, to: usize, from: usize) -> f64 {
        self.weights[layer][to + self.largest * from]
    }

    pub fn bias(&self, layer: usize, node: usize) -> f64 {
        self.biases[layer][node]
    }

    /// Forward pass: `out = σ(bias + scale · Σ w·in)` for every layer past
    /// the input.
    pub fn feed_forward(&mut self, scale: f64) {
        let largest = self.largest;
        for l in 1..self.sizes.len() {
            let w = &self.weights[l];
            let b = &self.biases[l];
            let (before, after) = self.outputs.split_at_mut(l);
            let prev = &before[l - 1];
            for (j, out) in after[0].iter_mut().enumerate() {
                let v: f64 = prev.iter().enumerate()
                    .map(|(k, &x)| w[j + largest * k] * x)
                    .sum();
                *out = sigmoid(v * scale + b[j]);
            }
        }
    }

    /// Fills the per-node error terms for the example last fed forward.
    ///
    /// Output layer: `o(1−o)(o−target)`.  Hidden layer `l`, node `j`:
    /// `scale · o_j(1−o_j) · Σ_i err_{l+1,i} · w_{l+1,i,j}`.
    pub fn compute_errors(&mut self, target: &[f64], scale: f64) {
        let ol = self.output_layer();
        for ((e, &o), &t) in self.errors[ol].iter_mut().zip(&self.outputs[ol]).zip(target) {
            *e = sigmoid_slope(o) * (o - t);
        }

        let largest = self.largest;
        for l in (1..ol).rev() {
            let w = &self.weights[l + 1];
            let (before, after) = self.errors.split_at_mut(l + 1);
            let next = &after[0];
            for (j, e) in before[l].iter_mut().enumerate() {
                let sum: f64 = next.iter().enumerate()
                    .map(|(i, &d)| d * w[i + largest * j])
                    .sum();
                *e = sum * scale * sigmoid_slope(self.outputs[l][j]);
            }
        }
    }

    pub fn zero_gradients(&mut self) {
        for g in self.grad_weights.iter_mut().chain(self.grad_biases.iter_mut()) {
            g.iter_mut().for_each(|x| *x = 0.0);
        }
    }

    /// Adds this example's gradients (`err_i · out_j`, `err_i`) to the
    /// running sums.
    pub fn accumulate_gradients(&mut self) {
        let largest = self.largest;
        for l in 1..self.sizes.len() {
            let errors = &self.errors[l];
            let prev = &self.outputs[l - 1];
            let gw = &mut self.grad_weights[l];
            for (i, &e) in errors.iter().enumerate() {
                for (j, &o) in prev.iter().enumerate() {
                    gw[i + largest * j] += e * o;
                }
                self.grad_biases[l][i] += e;
            }
        }
    }

    /// Applies the mean of the accumulated gradients over `num` examples:
    /// weights move by `eta · mean · scale`, biases by `eta · mean`.
    pub fn apply_gradients(&mut self, eta: f64, num: usize, scale: f64) {
        let factor = 1.0 / num as f64;
        let largest = self.largest;
        for l in 1..self.sizes.len() {
            for i in 0..self.sizes[l] {
                for j in 0..self.sizes[l - 1] {
                    let idx = i + largest * j;
                    self.weights[l][idx] -= eta * self.grad_weights[l][idx] * factor * scale;
                }
                self.biases[l][i] -= eta * self.grad_biases[l][i] * factor;
            }
        }
    }

    /// Trains on examples `start..start+num` as one batch and returns the
    /// mean squared error over those examples and all outputs.
    ///
    /// `feed` loads one example's inputs (given the inputs and `h`) and
    /// returns the weight scale for that example; the scale of the last
    /// example is used when the batch is applied.
    pub fn train_batch<F>(
        &mut self,
        examples: &ExampleSet<'_>,
        start: usize,
        num: usize,
        eta: f64,
        mut feed: F,
    ) -> f64
    where
        F: FnMut(&mut DenseLayers, &[f64], f64) -> f64,
    {
        if num == 0 {
            return 0.0;
        }
        self.zero_gradients();
        let mut total = 0.0;
        let mut scale = 1.0;
        for n in start..start + num {
            let inputs = examples.inputs(n);
            let target = examples.outputs(n);
            scale = feed(self, &*inputs, examples.h(n));
            self.feed_forward(scale);
            self.compute_errors(&target, scale);
            self.accumulate_gradients();
            total += MseLoss::sum_squared(self.outputs(), &target);
        }
        self.apply_gradients(eta, num, scale);
        total / (num * self.sizes[self.output_layer()]) as f64
    }

    /// Sets every bias and weight of layers past the input to a uniform
    /// value in `[-r, r]`.  `r` is `range` when it is positive, otherwise
    /// `1/√(previous layer size)`.  Input-layer parameters are zeroed.
    pub fn init_weights<R: Rng + ?Sized>(&mut self, range: Option<f64>, rng: &mut R) {
        self.biases[0].iter_mut().for_each(|b| *b = 0.0);
        self.weights[0].iter_mut().for_each(|w| *w = 0.0);

        let largest = self.largest;
        for l in 1..self.sizes.len() {
            let r = match range {
                Some(r) if r > 0.0 => r,
                _ => 1.0 / (self.sizes[l - 1] as f64).sqrt(),
            };
            for b in self.biases[l].iter_mut() {
                *b = rng.gen_range(-r..=r);
            }
            for i in 0..self.sizes[l] {
                for j in 0..self.sizes[l - 1] {
                    self.weights[l][i + largest * j] = rng.gen_range(-r..=r);
                }
            }
        }
    }

    /// Number of parameters: for each layer past the input, one bias plus
    /// one weight per previous-layer node, for every node.
    pub fn data_size(&self) -> usize {
        self.sizes.windows(2).map(|w| w[1] * (1 + w[0])).sum()
    }

    /// Appends the parameters layer by layer, node by node, each node's
    /// bias followed by its incoming weights.
    pub fn write_params(&self, out: &mut Vec<f64>) {
        for l in 1..self.sizes.len() {
            for j in 0..self.sizes[l] {
                out.push(self.biases[l][j]);
                for k in 0..self.sizes[l - 1] {
                    out.push(self.weight(l, j, k));
                }
            }
        }
    }

    /// Reads parameters in `write_params` order; `params` must hold exactly
    /// `data_size()` values.
    pub fn read_params(&mut self, params: &[f64]) -> Result<()> {
        if params.len() != self.data_size() {
            return Err(NetError::Format(format!(
                "expected {} parameters, got {}",
                self.data_size(),
                params.len()
            )));
        }
        let largest = self.largest;
        let mut it = params.iter().copied();
        for l in 1..self.sizes.len() {
            for j in 0..self.sizes[l] {
                self.biases[l][j] = it.next().unwrap_or(0.0);
                for k in 0..self.sizes[l - 1] {
                    self.weights[l][j + largest * k] = it.next().unwrap_or(0.0);
                }
            }
        }
        Ok(())
    }
}
