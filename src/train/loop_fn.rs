use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::data::ExampleSet;
use crate::error::Result;
use crate::network::network::Net;
use crate::train::cv_stats::CvStats;
use crate::train::sgd_params::SgdParams;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `net` on `examples` by stochastic gradient descent and returns the
/// mean squared error of the final network.
///
/// The last `params.cv_example_count()` examples are held out for
/// cross-validation; the rest form the training subset.  Each iteration
/// presents exactly one training example, and the training subset is
/// reshuffled at the start of every pass over it.  Every `cv_interval`
/// iterations one CV slice is tested, cycling through the slices.
///
/// With `store_best` set, the parameters with the lowest error seen (CV
/// error if `select_best_with_cv`, otherwise the per-example training
/// error) are restored once the iterations are done.
///
/// The returned error is measured over the CV examples if there are any,
/// otherwise over the training subset.
///
/// # Errors
/// Fails before touching the weights if the parameters do not fit the
/// example set (see [`SgdParams::validate`]), and propagates any error from
/// the network's training hook.
pub fn train_sgd<N: Net + ?Sized>(
    net: &mut N,
    examples: &ExampleSet<'_>,
    params: &SgdParams,
) -> Result<f64> {
    *net.rng() = StdRng::seed_from_u64(params.seed);
    params.validate(examples.count())?;

    let n_cv = params.cv_example_count();
    let n_training = examples.count() - n_cv;
    let mut training = examples.sub_view(0, n_training)?;
    let mut cv = if n_cv > 0 {
        Some(examples.sub_view(n_training, n_cv)?)
    } else {
        None
    };

    net.init_weights(params.init_range);

    info!(
        net_type = %net.net_type(),
        iterations = params.iterations,
        training = n_training,
        cross_validation = n_cv,
        eta = params.eta,
        seed = params.seed,
        "training started"
    );

    let mut best: Option<Snapshot> = None;
    let mut cv_countdown = params.cv_interval;
    let mut cv_slice = 0;

    for i in 0..params.iterations {
        let index = i % n_training;
        if index == 0 {
            training.shuffle(net.rng(), params.shuffle_mode);
        }

        let error = net.train_batch(&training, index, 1, params.eta)?;
        if params.store_best && !params.select_best_with_cv {
            Snapshot::offer(&mut best, &*net, error, i);
        }

        let Some(cv) = cv.as_mut() else { continue };
        cv_countdown -= 1;
        if cv_countdown > 0 {
            continue;
        }
        cv_countdown = params.cv_interval;

        let cv_error = net.test(cv, cv_slice * params.n_per_slice, params.n_per_slice);
        if params.store_best && params.select_best_with_cv {
            Snapshot::offer(&mut best, &*net, cv_error, i);
        }
        debug!(iteration = i, slice = cv_slice, cv_error, "cross-validation");

        if let Some(ref tx) = params.progress_tx {
            let stats = CvStats {
                iteration: i,
                slice: cv_slice,
                cv_error,
                best_error: best.as_ref().map(|b| b.error),
            };
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(stats);
        }

        cv_slice += 1;
        if cv_slice == params.n_slices {
            cv_slice = 0;
            if params.cv_shuffle {
                cv.shuffle(net.rng(), params.shuffle_mode);
            }
        }
    }

    if let Some(best) = best {
        trace!(iteration = best.iteration, error = best.error, "restoring best network");
        net.load(&best.params)?;
    }

    let error = match cv {
        Some(ref cv) => net.test_all(cv),
        None => net.test_all(&training),
    };
    info!(error, "training finished");
    Ok(error)
}

/// Fraction of `examples` whose highest output lands on the same node as
/// the highest target.  Meaningful for one-hot classification sets.
pub fn accuracy<N: Net + ?Sized>(net: &mut N, examples: &ExampleSet<'_>) -> f64 {
    let n = examples.count();
    if n == 0 {
        return 0.0;
    }
    let correct = (0..n)
        .filter(|&i| {
            net.set_h(examples.h(i));
            let out = net.run(&examples.inputs(i));
            argmax(out) == argmax(&examples.outputs(i))
        })
        .count();
    correct as f64 / n as f64
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// The best parameters seen so far and the error they scored.
struct Snapshot {
    error: f64,
    iteration: usize,
    params: Vec<f64>,
}

impl Snapshot {
    /// Replaces `best` with the network's current parameters if `error`
    /// beats it.
    fn offer<N: Net + ?Sized>(best: &mut Option<Snapshot>, net: &N, error: f64, iteration: usize) {
        if best.as_ref().map_or(true, |b| error < b.error) {
            trace!(iteration, error, "new best network");
            *best = Some(Snapshot { error, iteration, params: net.save() });
        }
    }
}

fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &x)| if x > bv { (i, x) } else { (bi, bv) })
        .0
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::data::ShuffleMode;
    use crate::error::NetError;
    use crate::network::{Net, PlainNet, UesNet};

    /// `count` examples of y = x over [0, 1).
    fn identity_set(count: usize) -> ExampleSet<'static> {
        let mut e = ExampleSet::new(count, 1, 1, 1).unwrap();
        for i in 0..count {
            let v = i as f64 / count as f64;
            e.set_example(i, &[v], &[v], 0.0);
        }
        e
    }

    #[test]
    fn same_seed_same_network() {
        let e = identity_set(20);
        let params = SgdParams::new(0.5, 500).seed(7);
        let mut a = PlainNet::new(&[1, 3, 1]).unwrap();
        let mut b = PlainNet::new(&[1, 3, 1]).unwrap();
        let ea = a.train_sgd(&e, &params).unwrap();
        let eb = b.train_sgd(&e, &params).unwrap();
        assert_eq!(ea, eb);
        assert_eq!(a.save(), b.save());
    }

    #[test]
    fn different_seeds_differ() {
        let e = identity_set(20);
        let mut a = PlainNet::new(&[1, 3, 1]).unwrap();
        let mut b = PlainNet::new(&[1, 3, 1]).unwrap();
        a.train_sgd(&e, &SgdParams::new(0.5, 100).seed(1)).unwrap();
        b.train_sgd(&e, &SgdParams::new(0.5, 100).seed(2)).unwrap();
        assert_ne!(a.save(), b.save());
    }

    #[test]
    fn bad_parameters_leave_weights_alone() {
        let e = identity_set(10);
        let mut net = PlainNet::new(&[1, 2, 1]).unwrap();
        let before = net.save();

        let err = net
            .train_sgd(&e, &SgdParams::new(0.1, 10).cross_validation_raw(5, 2, 1))
            .unwrap_err();
        assert!(matches!(err, NetError::Range(_)));

        let err = net
            .train_sgd(&e, &SgdParams::new(0.1, 10).select_best_with_cv(true))
            .unwrap_err();
        assert!(matches!(err, NetError::Config(_)));
        assert_eq!(net.save(), before);
    }

    #[test]
    fn reports_every_cross_validation() {
        let e = identity_set(20);
        let (tx, rx) = mpsc::channel();
        let params = SgdParams::new(0.5, 100)
            .cross_validation_raw(2, 2, 10)
            .progress(tx);
        let mut net = PlainNet::new(&[1, 2, 1]).unwrap();
        net.train_sgd(&e, &params).unwrap();
        drop(params);

        let stats: Vec<CvStats> = rx.iter().collect();
        assert_eq!(stats.len(), 10);
        assert_eq!(stats[0].iteration, 9);
        let slices: Vec<usize> = stats.iter().map(|s| s.slice).collect();
        assert_eq!(slices, [0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
        assert!(stats.iter().all(|s| s.best_error.is_none()));
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let e = identity_set(20);
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let params = SgdParams::new(0.5, 50).cross_validation_raw(1, 4, 5).progress(tx);
        let mut net = PlainNet::new(&[1, 2, 1]).unwrap();
        assert!(net.train_sgd(&e, &params).is_ok());
    }

    #[test]
    fn best_network_is_restored() {
        let e = identity_set(20);
        let (tx, rx) = mpsc::channel();
        let params = SgdParams::new(2.0, 400)
            .cross_validation(&e, 0.25, 40, 1, false)
            .store_best()
            .progress(tx);
        let mut net = PlainNet::new(&[1, 3, 1]).unwrap();
        let error = net.train_sgd(&e, &params).unwrap();
        drop(params);

        let best = rx
            .iter()
            .map(|s| s.cv_error)
            .fold(f64::INFINITY, f64::min);
        // One slice covers every CV example, so the final test repeats the
        // best evaluation.
        assert_eq!(error, best);
    }

    #[test]
    fn best_training_step_is_restored() {
        let e = identity_set(6);
        let (eta, iterations, seed) = (3.0, 60, 5);

        // the same run stepped by hand, remembering the lowest-error step
        let mut manual = PlainNet::new(&[1, 2, 1]).unwrap();
        *manual.rng() = StdRng::seed_from_u64(seed);
        manual.init_weights(None);
        let mut training = e.sub_view(0, e.count()).unwrap();
        let mut best_error = f64::INFINITY;
        let mut best_params = Vec::new();
        for i in 0..iterations {
            let index = i % training.count();
            if index == 0 {
                training.shuffle(manual.rng(), ShuffleMode::default());
            }
            let error = manual.train_batch(&training, index, 1, eta).unwrap();
            if error < best_error {
                best_error = error;
                best_params = manual.save();
            }
        }

        let mut last = PlainNet::new(&[1, 2, 1]).unwrap();
        last.train_sgd(&e, &SgdParams::new(eta, iterations).seed(seed)).unwrap();
        assert_eq!(last.save(), manual.save());

        let mut best = PlainNet::new(&[1, 2, 1]).unwrap();
        best.train_sgd(&e, &SgdParams::new(eta, iterations).store_best().seed(seed)).unwrap();
        assert_eq!(best.save(), best_params);
    }

    /// CV errors of a run that never moves its weights, so each error
    /// depends only on which examples sit in the tested slice.
    fn frozen_cv_errors(cv_shuffle: bool) -> Vec<f64> {
        let e = identity_set(30);
        let (tx, rx) = mpsc::channel();
        let mut params = SgdParams::new(0.0, 40).cross_validation_raw(2, 5, 1).progress(tx);
        params.cv_shuffle = cv_shuffle;
        let mut net = PlainNet::new(&[1, 3, 1]).unwrap();
        net.train_sgd(&e, &params).unwrap();
        drop(params);
        rx.iter().map(|s| s.cv_error).collect()
    }

    #[test]
    fn cv_examples_reshuffle_when_slices_wrap() {
        let fixed = frozen_cv_errors(false);
        assert_eq!(fixed.len(), 40);
        assert_ne!(fixed[0], fixed[1]);
        for (i, &err) in fixed.iter().enumerate() {
            assert_eq!(err, fixed[i % 2]);
        }

        let shuffled = frozen_cv_errors(true);
        assert_eq!(shuffled[..2], fixed[..2]);
        assert!(shuffled.iter().enumerate().any(|(i, &err)| err != fixed[i % 2]));
    }

    #[test]
    fn modulated_net_trains_through_the_trait() {
        let mut e = ExampleSet::new(4, 1, 1, 2).unwrap();
        e.set_example(0, &[0.0], &[0.0], 0.0);
        e.set_example(1, &[0.0], &[1.0], 1.0);
        e.set_example(2, &[1.0], &[1.0], 0.0);
        e.set_example(3, &[1.0], &[0.0], 1.0);
        let mut net: Box<dyn Net> = Box::new(UesNet::new(&[1, 2, 1]).unwrap());
        let error = net.train_sgd(&e, &SgdParams::new(0.1, 80).seed(3)).unwrap();
        assert!(error.is_finite());
    }

    #[test]
    fn argmax_picks_first_highest() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.2]), 1);
        assert_eq!(argmax(&[3.0]), 0);
    }
}
