use ecow::EcoString;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use thiserror::Error;


pub type TestId = EcoString;

/// A sequence of tests, expressed as node indices of the [`Problem`] it was built for.
pub type Order = Vec<NodeIndex>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProblemError {
    #[error("problem contains no tests")]
    Empty,
    #[error("duplicate test id: {0}")]
    DuplicateId(TestId),
    #[error("test {id}: success probability {p} is outside [0, 1]")]
    ProbabilityOutOfRange { id: TestId, p: f64 },
    #[error("test {id}: cost {cost} must be finite and greater than 0")]
    NonPositiveCost { id: TestId, cost: f64 },
    #[error("edge {edge}: source test '{id}' does not exist")]
    UnknownSource { edge: usize, id: TestId },
    #[error("edge {edge}: target test '{id}' does not exist")]
    UnknownTarget { edge: usize, id: TestId },
    #[error("edge {edge}: self-loop on '{id}' is not allowed")]
    SelfLoop { edge: usize, id: TestId },
    #[error("precedence graph is not acyclic: cycle through '{0}'")]
    Cycle(TestId),
    #[error("unknown test id: {0}")]
    UnknownTest(TestId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub id: TestId,
    pub p_success: f64,
    pub cost: f64,
}

impl TestSpec {
    pub fn new(id: impl Into<TestId>, p_success: f64, cost: f64) -> Self {
        TestSpec {
            id: id.into(),
            p_success,
            cost,
        }
    }

    fn validate(&self) -> Result<(), ProblemError> {
        if !(0.0..=1.0).contains(&self.p_success) {
            return Err(ProblemError::ProbabilityOutOfRange {
                id: self.id.clone(),
                p: self.p_success,
            });
        }
        if !self.cost.is_finite() || self.cost <= 0.0 {
            return Err(ProblemError::NonPositiveCost {
                id: self.id.clone(),
                cost: self.cost,
            });
        }
        Ok(())
    }
}

/// A validated sequential testing instance: the precedence DAG and the data of every test.
///
/// Edge `u -> v` means `u` has to run before `v`. Once built, a problem is never mutated;
/// searches keep their scratch state (indegree counters, orders) to themselves.
#[derive(Debug, Clone)]
pub struct Problem {
    graph: DiGraph<TestSpec, ()>,
    index: HashMap<TestId, NodeIndex>,
    // Nodes sorted by id, and each node's position in that sorting.
    by_id: Vec<NodeIndex>,
    rank: Vec<usize>,
}

impl Problem {
    /// Builds a problem, rejecting duplicate ids, out-of-range test data, dangling or
    /// self-loop edges and cycles. Parallel edges collapse into one.
    pub fn new<T, E, S>(tests: T, edges: E) -> Result<Self, ProblemError>
    where
        T: IntoIterator<Item = TestSpec>,
        E: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut graph: DiGraph<TestSpec, ()> = DiGraph::new();
        let mut index = HashMap::new();

        for test in tests {
            test.validate()?;
            if index.contains_key(&test.id) {
                return Err(ProblemError::DuplicateId(test.id));
            }
            let id = test.id.clone();
            let idx = graph.add_node(test);
            index.insert(id, idx);
        }

        if graph.node_count() == 0 {
            return Err(ProblemError::Empty);
        }

        for (edge, (from, to)) in edges.into_iter().enumerate() {
            let (from, to) = (from.as_ref(), to.as_ref());
            let Some(&u) = index.get(from) else {
                return Err(ProblemError::UnknownSource {
                    edge,
                    id: from.into(),
                });
            };
            let Some(&v) = index.get(to) else {
                return Err(ProblemError::UnknownTarget {
                    edge,
                    id: to.into(),
                });
            };
            if u == v {
                return Err(ProblemError::SelfLoop {
                    edge,
                    id: from.into(),
                });
            }
            graph.update_edge(u, v, ());
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(ProblemError::Cycle(graph[cycle.node_id()].id.clone()));
        }

        let mut by_id: Vec<NodeIndex> = graph.node_indices().collect();
        by_id.sort_by(|a, b| graph[*a].id.cmp(&graph[*b].id));
        let mut rank = vec![0; by_id.len()];
        for (pos, idx) in by_id.iter().enumerate() {
            rank[idx.index()] = pos;
        }

        Ok(Problem {
            graph,
            index,
            by_id,
            rank,
        })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn test(&self, idx: NodeIndex) -> &TestSpec {
        &self.graph[idx]
    }

    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn tests(&self) -> impl Iterator<Item = &TestSpec> {
        self.graph.node_weights()
    }

    /// All node indices, sorted by test id.
    pub fn by_id(&self) -> &[NodeIndex] {
        &self.by_id
    }

    /// Position of `idx` among the tests sorted by id. Used to break ties deterministically.
    pub fn rank(&self, idx: NodeIndex) -> usize {
        self.rank[idx.index()]
    }

    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    /// Fresh per-search indegree counters, indexed by `NodeIndex::index()`.
    pub fn indegrees(&self) -> Vec<usize> {
        self.graph
            .node_indices()
            .map(|idx| self.predecessors(idx).count())
            .collect()
    }

    /// Maps caller-side ids onto an order of this problem. The result is not checked for
    /// feasibility; use [`Problem::is_feasible`] before trusting its cost.
    pub fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Result<Order, ProblemError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                self.node(id).ok_or_else(|| ProblemError::UnknownTest(id.into()))
            })
            .collect()
    }

    pub fn labels(&self, order: &[NodeIndex]) -> Vec<TestId> {
        order.iter().map(|idx| self.graph[*idx].id.clone()).collect()
    }

    /// Returns true if `order` is a permutation of all tests that respects every edge.
    pub fn is_feasible(&self, order: &[NodeIndex]) -> bool {
        let n = self.graph.node_count();
        if order.len() != n {
            return false;
        }

        let mut position = vec![usize::MAX; n];
        for (pos, idx) in order.iter().enumerate() {
            match position.get_mut(idx.index()) {
                Some(slot) if *slot == usize::MAX => *slot = pos,
                _ => return false,
            }
        }

        self.graph
            .raw_edges()
            .iter()
            .all(|e| position[e.source().index()] < position[e.target().index()])
    }

    /// Expected cost of running `order` until the first failing test:
    /// `sum_k cost(k) * prod_{j<k} p(j)`.
    ///
    /// Every index must belong to this problem.
    pub fn expected_cost(&self, order: &[NodeIndex]) -> f64 {
        let mut total = 0.0;
        let mut reach = 1.0;
        for idx in order {
            let test = &self.graph[*idx];
            total += test.cost * reach;
            reach *= test.p_success;
        }
        total
    }
}
