//! Optimal ordering of diagnostic tests under precedence constraints.
//!
//! Tests run one after another and testing stops at the first failure, so the goal is the
//! feasible order with the lowest expected total cost. Three strategies share the
//! [`model::Problem`]: a greedy constructor, simulated annealing over feasible swaps, and
//! exhaustive enumeration for small instances.

pub mod compare;
pub mod loader;
pub mod model;
pub mod order;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use model::{Order, Problem, ProblemError, TestId, TestSpec};
pub use search::{SearchError, Solution};
