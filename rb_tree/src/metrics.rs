use hdrhistogram::Histogram;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::RedBlackTree;

fn gen_keys(count: usize, random: bool) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..count as u64).collect();
    if random {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        keys.shuffle(&mut rng);
    }
    keys
}

fn depths(tree: &RedBlackTree<u64, u64>) -> Histogram<u64> {
    let mut hist = Histogram::new(3).unwrap();
    tree.for_each_depth(|depth| hist.record(depth as u64).unwrap());
    hist
}

/// Height limit of a red-black tree with `n` nodes, counted in edges.
fn max_height(n: usize) -> u64 {
    (2.0 * ((n + 1) as f64).log2()).floor() as u64
}

#[test]
fn height_is_logarithmic() {
    for random in [false, true] {
        let keys = gen_keys(20_000, random);
        let mut tree = RedBlackTree::new();
        for (i, k) in keys.iter().enumerate() {
            tree.insert(*k, *k).unwrap();
            if i % 1000 == 0 {
                assert!(depths(&tree).max() <= max_height(tree.len()));
            }
        }
        let hist = depths(&tree);
        assert_eq!(hist.len(), keys.len() as u64);
        assert!(hist.max() <= max_height(tree.len()));

        // and stays that way while shrinking
        for k in keys.iter().step_by(3) {
            tree.delete(k).unwrap();
        }
        assert!(depths(&tree).max() <= max_height(tree.len()));
    }
}

#[test]
#[ignore = "not really a test but prints node depths for different insert orders"]
fn metrics() {
    #[derive(Debug)]
    struct StatsPrint {
        min: u64,
        p50: u64,
        p90: u64,
        max: u64,
        mean: f64,
        std: f64,
    }

    impl StatsPrint {
        fn new(stats: &Histogram<u64>) -> Self {
            Self {
                min: stats.min(),
                p50: stats.value_at_quantile(0.5),
                p90: stats.value_at_quantile(0.9),
                max: stats.max(),
                mean: stats.mean(),
                std: stats.stdev(),
            }
        }
    }

    for count in [1_000, 100_000, 1_000_000] {
        for random in [false, true] {
            let mut tree = RedBlackTree::new();
            for k in gen_keys(count, random) {
                tree.insert(k, k).unwrap();
            }
            println!(
                "\n{} keys, random={}, bound={}\n  depth={:#?}",
                count,
                random,
                max_height(count),
                StatsPrint::new(&depths(&tree))
            );
        }
    }
}
