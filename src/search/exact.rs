use crate::model::{Order, Problem};
use crate::search::Solution;
use log::debug;
use petgraph::graph::NodeIndex;

struct Frame {
    candidates: Vec<NodeIndex>,
    next: usize,
}

/// Lazily enumerates every feasible order of a problem, in lexicographic id order of the
/// branching choices.
///
/// Backtracking keeps one set of indegree counters and undoes each placement on the way
/// back up instead of copying state per branch. The number of orders is exponential for
/// loosely constrained graphs; bounding the problem size is up to the caller.
pub struct TopologicalOrders<'a> {
    problem: &'a Problem,
    indegree: Vec<usize>,
    placed: Vec<bool>,
    order: Order,
    frames: Vec<Frame>,
    started: bool,
}

impl<'a> TopologicalOrders<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        TopologicalOrders {
            problem,
            indegree: problem.indegrees(),
            placed: vec![false; problem.len()],
            order: Vec::with_capacity(problem.len()),
            frames: Vec::new(),
            started: false,
        }
    }

    fn candidates(&self) -> Vec<NodeIndex> {
        self.problem
            .by_id()
            .iter()
            .copied()
            .filter(|idx| !self.placed[idx.index()] && self.indegree[idx.index()] == 0)
            .collect()
    }

    fn place(&mut self, idx: NodeIndex) {
        self.placed[idx.index()] = true;
        self.order.push(idx);
        for next in self.problem.successors(idx) {
            self.indegree[next.index()] -= 1;
        }
    }

    fn retract(&mut self) {
        let Some(idx) = self.order.pop() else {
            return;
        };
        self.placed[idx.index()] = false;
        for next in self.problem.successors(idx) {
            self.indegree[next.index()] += 1;
        }
    }
}

impl Iterator for TopologicalOrders<'_> {
    type Item = Order;

    fn next(&mut self) -> Option<Order> {
        if !self.started {
            self.started = true;
            let candidates = self.candidates();
            self.frames.push(Frame {
                candidates,
                next: 0,
            });
        }

        loop {
            let frame = self.frames.last_mut()?;
            if frame.next == frame.candidates.len() {
                // Every branch below this frame is exhausted: undo the choice that led here.
                self.frames.pop();
                self.retract();
                continue;
            }

            let idx = frame.candidates[frame.next];
            frame.next += 1;
            self.place(idx);

            if self.order.len() == self.problem.len() {
                let complete = self.order.clone();
                self.retract();
                return Some(complete);
            }

            let candidates = self.candidates();
            self.frames.push(Frame {
                candidates,
                next: 0,
            });
        }
    }
}

pub fn count_feasible_orders(problem: &Problem) -> usize {
    TopologicalOrders::new(problem).count()
}

/// Ground-truth optimum by exhaustive enumeration. On equal cost the order enumerated
/// first is kept.
pub fn exact_optimum(problem: &Problem) -> Solution {
    let mut best: Option<Solution> = None;
    let mut enumerated = 0usize;

    for order in TopologicalOrders::new(problem) {
        enumerated += 1;
        let cost = problem.expected_cost(&order);
        if best.as_ref().is_none_or(|b| cost < b.cost) {
            best = Some(Solution { order, cost });
        }
    }

    debug!("exact: enumerated {} feasible orders", enumerated);
    // A validated problem has at least one test, hence at least one feasible order.
    best.unwrap_or_else(|| Solution::evaluate(problem, problem.topological_order()))
}
