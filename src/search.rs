pub mod annealing;
pub mod exact;
pub mod greedy;

use crate::model::{Order, Problem, TestId};
use crate::search::annealing::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("test {0} has success probability 0: cost/p priority is undefined")]
    ZeroSuccessProbability(TestId),
    #[error("invalid annealing configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A feasible order together with its expected cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub order: Order,
    pub cost: f64,
}

impl Solution {
    pub(crate) fn evaluate(problem: &Problem, order: Order) -> Self {
        let cost = problem.expected_cost(&order);
        Solution { order, cost }
    }

    pub fn labels(&self, problem: &Problem) -> Vec<TestId> {
        problem.labels(&self.order)
    }
}
