use uesmann::{make_net_for, ExampleSet, NetType, SgdParams};

fn main() -> uesmann::Result<()> {
    // XOR at h=0, AND at h=1, each input pair at both levels.
    let mut e = ExampleSet::new(8, 2, 1, 2)?;
    let cases = [
        ([0.0, 0.0], 0.0, 0.0),
        ([0.0, 1.0], 1.0, 0.0),
        ([1.0, 0.0], 1.0, 0.0),
        ([1.0, 1.0], 0.0, 1.0),
    ];
    for (i, (ins, xor, and)) in cases.iter().enumerate() {
        e.set_example(i * 2, ins, &[*xor], 0.0);
        e.set_example(i * 2 + 1, ins, &[*and], 1.0);
    }

    let params = SgdParams::per_example(0.1, &e, 75_000).store_best().seed(1);
    let mut net = make_net_for(NetType::Uesmann, &e, 2)?;
    let mse = net.train_sgd(&e, &params)?;
    println!("training mse = {mse:.6}");

    for h in [0.0, 1.0] {
        net.set_h(h);
        for (ins, _, _) in &cases {
            println!("h={h} {:?} -> {:.4}", ins, net.run(ins)[0]);
        }
    }
    Ok(())
}
