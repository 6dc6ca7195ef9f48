use rand::rngs::StdRng;
use rand::SeedableRng;

use uesmann::{ExampleSet, NetError, ShuffleMode};

/// `count` examples whose single input is their original position and
/// whose `h` cycles through `levels` values spread over [0, 1].
fn tagged(count: usize, levels: usize) -> ExampleSet<'static> {
    let mut e = ExampleSet::new(count, 1, 1, levels).unwrap();
    for i in 0..count {
        let h = if levels > 1 { (i % levels) as f64 / (levels - 1) as f64 } else { 0.0 };
        e.set_example(i, &[i as f64], &[0.0], h);
    }
    e
}

fn tags(e: &ExampleSet<'_>) -> Vec<usize> {
    (0..e.count()).map(|i| e.inputs(i)[0] as usize).collect()
}

#[test]
fn sub_view_reads_parent_values() {
    let parent = tagged(20, 1);
    for (start, len) in [(0, 20), (3, 5), (19, 1), (0, 1)] {
        let view = parent.sub_view(start, len).unwrap();
        assert_eq!(view.count(), len);
        for i in 0..len {
            assert_eq!(view.inputs(i)[0], parent.inputs(start + i)[0]);
            assert_eq!(view.h(i), parent.h(start + i));
        }
    }
}

#[test]
fn sub_view_bounds() {
    let parent = tagged(10, 1);
    for (start, len) in [(0, 0), (5, 6), (10, 1), (usize::MAX, 2)] {
        assert!(
            matches!(parent.sub_view(start, len), Err(NetError::Range(_))),
            "start={} len={}",
            start,
            len
        );
    }
}

#[test]
fn sub_view_writes_reach_parent() {
    let parent = tagged(10, 1);
    {
        let mut view = parent.sub_view(4, 3).unwrap();
        view.set_h(1, 0.75);
        view.outputs_mut(2)[0] = 9.0;
    }
    assert_eq!(parent.h(5), 0.75);
    assert_eq!(parent.outputs(6)[0], 9.0);
}

#[test]
fn shuffle_is_a_bijection() {
    for mode in [ShuffleMode::None, ShuffleMode::Stride, ShuffleMode::Alternate] {
        for levels in [1, 2, 3] {
            let mut e = tagged(30, levels);
            let mut rng = StdRng::seed_from_u64(11);
            for _ in 0..5 {
                e.shuffle(&mut rng, mode);
                let mut seen = tags(&e);
                seen.sort_unstable();
                assert_eq!(seen, (0..30).collect::<Vec<_>>(), "{:?} levels={}", mode, levels);
            }
        }
    }
}

#[test]
fn shuffle_moves_examples() {
    let mut e = tagged(30, 1);
    e.shuffle(&mut StdRng::seed_from_u64(5), ShuffleMode::None);
    assert_ne!(tags(&e), (0..30).collect::<Vec<_>>());
}

#[test]
fn stride_keeps_blocks_intact() {
    let mut e = tagged(24, 3);
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..4 {
        e.shuffle(&mut rng, ShuffleMode::Stride);
        let t = tags(&e);
        for block in t.chunks(3) {
            assert_eq!(block[0] % 3, 0);
            assert_eq!(block[1], block[0] + 1);
            assert_eq!(block[2], block[0] + 2);
        }
    }
}

#[test]
fn alternate_cycles_buckets() {
    for levels in [2, 3, 4] {
        let mut e = tagged(8 * levels, levels);
        let mut rng = StdRng::seed_from_u64(levels as u64);
        for _ in 0..3 {
            e.shuffle(&mut rng, ShuffleMode::Alternate);
            for i in 0..e.count() {
                assert_eq!(e.h_bucket(i), i % levels, "levels={} position={}", levels, i);
            }
        }
    }
}

#[test]
fn alternate_uses_the_h_range() {
    let mut e = ExampleSet::new(8, 1, 1, 2).unwrap();
    for i in 0..8 {
        let h = if i < 4 { -1.0 } else { 1.0 };
        e.set_example(i, &[i as f64], &[0.0], h);
    }
    e.set_h_range(-1.0, 1.0);
    e.shuffle(&mut StdRng::seed_from_u64(4), ShuffleMode::Alternate);
    for i in 0..8 {
        assert_eq!(e.h(i), if i % 2 == 0 { -1.0 } else { 1.0 });
    }
}

#[test]
fn shuffling_a_view_keeps_parent_order() {
    let parent = tagged(12, 1);
    let mut view = parent.sub_view(2, 8).unwrap();
    view.shuffle(&mut StdRng::seed_from_u64(8), ShuffleMode::None);
    assert_eq!(tags(&parent), (0..12).collect::<Vec<_>>());
    let mut seen = tags(&view);
    seen.sort_unstable();
    assert_eq!(seen, (2..10).collect::<Vec<_>>());
}
