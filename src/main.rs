use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uesmann::train::accuracy;
use uesmann::{
    load_net, make_net_for, save_net, ExampleSet, IdxImages, Net, NetType, Result, SgdParams,
    ShuffleMode,
};

/// Names of the sixteen binary boolean functions, indexed by truth table.
const BOOL_NAMES: [&str; 16] = [
    "f", "and", "x and !y", "x", "!x and y", "y", "xor", "or", "nor", "xnor", "!y", "x or !y",
    "!x", "!x or y", "nand", "t",
];

#[derive(Parser)]
#[command(name = "uesmann")]
#[command(about = "Modulated neural networks: UESMANN, output blending and h-as-input")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train networks to switch between pairs of boolean functions and
    /// print the success rate per pair as CSV
    BoolMap {
        /// Network type (plain, ob, hin, ues)
        #[arg(long, default_value = "ues")]
        net_type: NetType,
        /// Networks trained per pairing
        #[arg(long, default_value = "1000")]
        attempts: u64,
        /// Passes over the 8 examples per network
        #[arg(long, default_value = "75000")]
        epochs: usize,
        /// Learning rate
        #[arg(long, default_value = "0.1")]
        eta: f64,
        /// Hidden nodes
        #[arg(long, default_value = "2")]
        hidden: usize,
        /// Function at h=0 (truth-table index); all pairs when omitted
        #[arg(long, requires = "second")]
        first: Option<usize>,
        /// Function at h=1 (truth-table index)
        #[arg(long, requires = "first")]
        second: Option<usize>,
    },
    /// Train a plain classifier on an IDX (MNIST-format) image set
    Mnist {
        /// IDX1 label file
        #[arg(long)]
        labels: PathBuf,
        /// IDX3 image file
        #[arg(long)]
        images: PathBuf,
        /// First image to load
        #[arg(long, default_value = "0")]
        start: usize,
        /// Images to load; 0 loads the rest of the file
        #[arg(long, default_value = "0")]
        count: usize,
        /// Hidden nodes
        #[arg(long, default_value = "32")]
        hidden: usize,
        /// Training iterations (single examples)
        #[arg(long, default_value = "100000")]
        iterations: usize,
        /// Learning rate
        #[arg(long, default_value = "0.1")]
        eta: f64,
        /// Generator seed
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Save the trained network here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Describe a saved network file
    Info {
        /// Network file
        file: PathBuf,
    },
}

/// Whether truth table `f` is true for inputs `a`, `b`.  The table's bits
/// cover 00, 01, 10, 11 from most to least significant.
fn bool_func(f: usize, a: bool, b: bool) -> bool {
    let bit = 1 << ((if a { 0 } else { 2 }) + (if b { 0 } else { 1 }));
    f & bit != 0
}

/// Eight examples: each input pair at h=0 (function `f0`) then h=1 (`f1`).
fn bool_examples(f0: usize, f1: usize) -> Result<ExampleSet<'static>> {
    let mut e = ExampleSet::new(8, 2, 1, 2)?;
    for (i, (a, b)) in [(0, 0), (0, 1), (1, 0), (1, 1)].into_iter().enumerate() {
        let ins = [a as f64, b as f64];
        for (level, f) in [f0, f1].into_iter().enumerate() {
            let out = if bool_func(f, a != 0, b != 0) { 1.0 } else { 0.0 };
            e.set_example(i * 2 + level, &ins, &[out], level as f64);
        }
    }
    Ok(e)
}

/// Whether `net` performs `f0` at h=0 and `f1` at h=1 on every input pair.
fn performs(net: &mut dyn Net, f0: usize, f1: usize) -> bool {
    for a in 0..2 {
        for b in 0..2 {
            let ins = [a as f64, b as f64];
            for (h, f) in [(0.0, f0), (1.0, f1)] {
                net.set_h(h);
                let high = net.run(&ins)[0] > 0.5;
                if high != bool_func(f, a != 0, b != 0) {
                    return false;
                }
            }
        }
    }
    true
}

fn bool_pairing(
    net_type: NetType,
    f0: usize,
    f1: usize,
    attempts: u64,
    epochs: usize,
    eta: f64,
    hidden: usize,
) -> Result<f64> {
    let e = bool_examples(f0, f1)?;
    let mut successes = 0;
    for seed in 0..attempts {
        let params = SgdParams::per_example(eta, &e, epochs)
            .store_best()
            .shuffle(ShuffleMode::Stride)
            .seed(seed);
        let mut net = make_net_for(net_type, &e, hidden)?;
        net.train_sgd(&e, &params)?;
        if performs(net.as_mut(), f0, f1) {
            successes += 1;
        }
    }
    Ok(successes as f64 / attempts.max(1) as f64)
}

fn bool_map(
    net_type: NetType,
    attempts: u64,
    epochs: usize,
    eta: f64,
    hidden: usize,
    pair: Option<(usize, usize)>,
) -> Result<()> {
    let pairs: Vec<(usize, usize)> = match pair {
        Some(p) => vec![p],
        None => (0..16).flat_map(|a| (0..16).map(move |b| (a, b))).collect(),
    };
    println!("a,b,correct");
    for (f0, f1) in pairs {
        let correct = bool_pairing(net_type, f0 & 15, f1 & 15, attempts, epochs, eta, hidden)?;
        info!(from = BOOL_NAMES[f0 & 15], to = BOOL_NAMES[f1 & 15], correct, "pairing done");
        println!("{},{},{}", f0 & 15, f1 & 15, correct);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn mnist(
    labels: PathBuf,
    images: PathBuf,
    start: usize,
    count: usize,
    hidden: usize,
    iterations: usize,
    eta: f64,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let src = IdxImages::load(&labels, &images, start, count)?;
    let e = ExampleSet::from_images(&src)?;
    info!(
        examples = e.count(),
        inputs = e.input_count(),
        outputs = e.output_count(),
        "loaded images"
    );

    let params = SgdParams::new(eta, iterations)
        .cross_validation(&e, 0.1, 100, 1, true)
        .store_best()
        .shuffle(ShuffleMode::None)
        .seed(seed);
    let mut net = make_net_for(NetType::Plain, &e, hidden)?;
    let mse = net.train_sgd(&e, &params)?;

    let n_cv = params.cv_example_count();
    let cv = e.sub_view(e.count() - n_cv, n_cv)?;
    println!("cv mse: {:.6}", mse);
    println!("cv accuracy: {:.4}", accuracy(net.as_mut(), &cv));

    if let Some(path) = output {
        save_net(&path, net.as_ref())?;
        info!(path = %path.display(), "network saved");
    }
    Ok(())
}

fn info(file: PathBuf) -> Result<()> {
    let net = load_net(&file)?;
    let sizes: Vec<usize> = (0..net.layer_count()).map(|n| net.layer_size(n)).collect();
    println!("type: {} ({})", net.net_type(), net.net_type().tag());
    println!("layers: {:?}", sizes);
    println!("parameters: {}", net.data_size());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::BoolMap { net_type, attempts, epochs, eta, hidden, first, second } => {
            bool_map(net_type, attempts, epochs, eta, hidden, first.zip(second))
        }
        Commands::Mnist { labels, images, start, count, hidden, iterations, eta, seed, output } => {
            mnist(labels, images, start, count, hidden, iterations, eta, seed, output)
        }
        Commands::Info { file } => info(file),
    };

    if let Err(e) = result {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}
