use crate::model::Problem;
use crate::search::annealing::{AnnealingConfig, AnnealingOutcome, multi_start};
use crate::search::exact::exact_optimum;
use crate::search::greedy::greedy;
use crate::search::{SearchError, Solution};
use log::{debug, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

pub fn timed<T>(f: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = f();
    Timed {
        value,
        elapsed: start.elapsed(),
    }
}

/// `(cost - reference) / reference`, only defined for a positive reference.
pub fn relative_gap(cost: f64, reference: f64) -> Option<f64> {
    (reference > 0.0).then(|| (cost - reference) / reference)
}

/// Which strategies a comparison runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub greedy: bool,
    pub annealing: bool,
    pub exact: bool,
    /// Exact search is skipped for problems with more tests than this.
    pub exact_limit: usize,
    pub restarts: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            greedy: true,
            annealing: true,
            exact: true,
            exact_limit: 12,
            restarts: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub tests: usize,
    pub edges: usize,
    pub greedy: Option<Timed<Result<Solution, SearchError>>>,
    pub annealing: Option<Timed<AnnealingOutcome>>,
    pub exact: Option<Timed<Solution>>,
    pub exact_skipped: bool,
}

impl Comparison {
    pub fn greedy_solution(&self) -> Option<&Solution> {
        self.greedy.as_ref().and_then(|g| g.value.as_ref().ok())
    }

    pub fn annealing_solution(&self) -> Option<&Solution> {
        self.annealing.as_ref().map(|a| &a.value.solution)
    }

    pub fn exact_solution(&self) -> Option<&Solution> {
        self.exact.as_ref().map(|e| &e.value)
    }

    pub fn gap_sa_vs_greedy(&self) -> Option<f64> {
        relative_gap(self.annealing_solution()?.cost, self.greedy_solution()?.cost)
    }

    pub fn gap_greedy_vs_opt(&self) -> Option<f64> {
        relative_gap(self.greedy_solution()?.cost, self.exact_solution()?.cost)
    }

    pub fn gap_sa_vs_opt(&self) -> Option<f64> {
        relative_gap(self.annealing_solution()?.cost, self.exact_solution()?.cost)
    }
}

/// Runs the selected strategies on one problem, timing each. A greedy failure (a test
/// with `p == 0`) is kept in the result rather than aborting the comparison.
pub fn compare(
    problem: &Problem,
    selection: &Selection,
    config: &AnnealingConfig,
) -> Result<Comparison, SearchError> {
    let greedy = selection.greedy.then(|| timed(|| greedy(problem)));

    let annealing = if selection.annealing {
        let run = timed(|| multi_start(problem, config, selection.restarts));
        Some(Timed {
            value: run.value?,
            elapsed: run.elapsed,
        })
    } else {
        None
    };

    let exact_skipped = selection.exact && problem.len() > selection.exact_limit;
    if exact_skipped {
        warn!(
            "Skipping exact search: {} tests exceeds the limit of {}",
            problem.len(),
            selection.exact_limit
        );
    }
    let exact = (selection.exact && !exact_skipped).then(|| timed(|| exact_optimum(problem)));

    debug!(
        "compared {} tests: greedy {:?}, annealing {:?}, exact {:?}",
        problem.len(),
        greedy.as_ref().map(|g| g.elapsed),
        annealing.as_ref().map(|a| a.elapsed),
        exact.as_ref().map(|e| e.elapsed)
    );

    Ok(Comparison {
        tests: problem.len(),
        edges: problem.edge_count(),
        greedy,
        annealing,
        exact,
        exact_skipped,
    })
}
