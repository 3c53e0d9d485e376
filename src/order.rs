use crate::model::{Order, Problem};
use petgraph::graph::NodeIndex;
use rand::Rng;
use rand::seq::index;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Draws two distinct positions in `0..len`. Requires `len >= 2`.
pub fn random_pair<R: Rng + ?Sized>(rng: &mut R, len: usize) -> (usize, usize) {
    let picked = index::sample(rng, len, 2);
    (picked.index(0), picked.index(1))
}

impl Problem {
    /// Kahn's algorithm, always taking the available test with the smallest id.
    pub fn topological_order(&self) -> Order {
        let mut indegree = self.indegrees();
        let mut ready: BinaryHeap<Reverse<(usize, NodeIndex)>> = self
            .by_id()
            .iter()
            .filter(|idx| indegree[idx.index()] == 0)
            .map(|idx| Reverse((self.rank(*idx), *idx)))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse((_, idx))) = ready.pop() {
            order.push(idx);
            for next in self.successors(idx) {
                indegree[next.index()] -= 1;
                if indegree[next.index()] == 0 {
                    ready.push(Reverse((self.rank(next), next)));
                }
            }
        }
        order
    }

    /// A feasible order decorrelated from the topological sort by `2 * len` random
    /// feasibility-preserving swaps.
    pub fn random_feasible_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Order {
        let mut order = self.topological_order();
        if order.len() < 2 {
            return order;
        }

        for _ in 0..2 * order.len() {
            let (i, j) = random_pair(rng, order.len());
            if let Some(swapped) = self.try_swap(&order, i, j) {
                order = swapped;
            }
        }
        order
    }

    /// Exchanges positions `i` and `j`, returning the new order only when it is still
    /// feasible. `i == j` hands back an unchanged copy.
    pub fn try_swap(&self, order: &[NodeIndex], i: usize, j: usize) -> Option<Order> {
        let mut swapped = order.to_vec();
        if i == j {
            return Some(swapped);
        }
        if i >= swapped.len() || j >= swapped.len() {
            return None;
        }

        swapped.swap(i, j);
        self.is_feasible(&swapped).then_some(swapped)
    }
}
