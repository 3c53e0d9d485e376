use crate::model::{Problem, TestSpec};
use crate::search::annealing::AnnealingConfig;
use ecow::eco_format;
use proptest::prelude::*;

prop_compose! {
    /// A random DAG of 1 to 8 tests named `t0`, `t1`, ... Edges only ever run from a
    /// lower to a higher index, so every generated graph is acyclic.
    pub(crate) fn arb_problem()(n in 1usize..=8)(
        n in Just(n),
        tests in prop::collection::vec((0.01f64..=1.0, 0.1f64..100.0), n),
        edges in prop::collection::vec(any::<bool>(), n * (n - 1) / 2),
    ) -> Problem {
        let specs = tests
            .iter()
            .enumerate()
            .map(|(i, &(p, cost))| TestSpec::new(eco_format!("t{}", i), p, cost));
        let pairs = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j)));
        let chosen: Vec<(String, String)> = pairs
            .zip(edges)
            .filter(|(_, keep)| *keep)
            .map(|((i, j), _)| (format!("t{}", i), format!("t{}", j)))
            .collect();
        Problem::new(specs, chosen).unwrap()
    }
}

/// Short annealing schedule for property tests.
pub(crate) fn quick_config(seed: u64) -> AnnealingConfig {
    AnnealingConfig {
        iters_per_temperature: 20,
        max_steps: 400,
        seed,
        ..AnnealingConfig::default()
    }
}
