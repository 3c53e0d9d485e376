use crate::model::{Problem, TestSpec};
use crate::search::{SearchError, Solution};
use log::debug;
use petgraph::graph::NodeIndex;

/// Cheap-and-reliable-first priority: `cost / p`. Lower runs earlier.
///
/// This is a heuristic with no approximation guarantee. It is undefined for tests that
/// always fail (`p == 0`), which is reported instead of guessed around.
pub fn priority(test: &TestSpec) -> Result<f64, SearchError> {
    if test.p_success == 0.0 {
        return Err(SearchError::ZeroSuccessProbability(test.id.clone()));
    }
    Ok(test.cost / test.p_success)
}

/// Builds an order online: among the tests whose predecessors have all been placed,
/// repeatedly take the one with the lowest [`priority`], breaking ties by smallest id.
pub fn greedy(problem: &Problem) -> Result<Solution, SearchError> {
    let mut indegree = problem.indegrees();
    let mut available: Vec<NodeIndex> = problem
        .by_id()
        .iter()
        .copied()
        .filter(|idx| indegree[idx.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(problem.len());
    while let Some(pos) = select(problem, &available)? {
        let chosen = available.swap_remove(pos);
        order.push(chosen);

        for next in problem.successors(chosen) {
            indegree[next.index()] -= 1;
            if indegree[next.index()] == 0 {
                available.push(next);
            }
        }
    }

    let solution = Solution::evaluate(problem, order);
    debug!("greedy: expected cost {:.6}", solution.cost);
    Ok(solution)
}

fn select(problem: &Problem, available: &[NodeIndex]) -> Result<Option<usize>, SearchError> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, idx) in available.iter().enumerate() {
        let score = priority(problem.test(*idx))?;
        let better = match best {
            None => true,
            Some((best_pos, best_score)) => {
                score < best_score
                    || (score == best_score
                        && problem.rank(*idx) < problem.rank(available[best_pos]))
            }
        };
        if better {
            best = Some((pos, score));
        }
    }
    Ok(best.map(|(pos, _)| pos))
}
