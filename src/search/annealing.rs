use crate::model::{Order, Problem};
use crate::order::random_pair;
use crate::search::{SearchError, Solution};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;


#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    #[error("t_start ({t_start}) must be greater than t_end ({t_end})")]
    TemperatureOrder { t_start: f64, t_end: f64 },
    #[error("t_end ({0}) must not be negative")]
    NegativeFreezing(f64),
    #[error("alpha ({0}) must lie strictly between 0 and 1")]
    CoolingRate(f64),
    #[error("iters_per_temperature must be at least 1")]
    ZeroWidth,
    #[error("at least one restart is required")]
    NoRestarts,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub t_start: f64,
    /// Freezing threshold: the search stops once the temperature is at or below it.
    pub t_end: f64,
    /// Geometric cooling factor applied after every temperature level.
    pub alpha: f64,
    pub iters_per_temperature: usize,
    /// Hard ceiling on steps, regardless of the cooling schedule.
    pub max_steps: usize,
    pub seed: u64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            t_start: 1.0,
            t_end: 1e-3,
            alpha: 0.98,
            iters_per_temperature: 200,
            max_steps: 15_000,
            seed: 42,
        }
    }
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("t_start", self.t_start),
            ("t_end", self.t_end),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if self.t_end < 0.0 {
            return Err(ConfigError::NegativeFreezing(self.t_end));
        }
        if self.t_start <= self.t_end {
            return Err(ConfigError::TemperatureOrder {
                t_start: self.t_start,
                t_end: self.t_end,
            });
        }
        if self.alpha <= 0.0 || self.alpha >= 1.0 {
            return Err(ConfigError::CoolingRate(self.alpha));
        }
        if self.iters_per_temperature == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceSample {
    pub step: usize,
    pub temperature: f64,
    pub current_cost: f64,
    pub best_cost: f64,
}

/// Append-only history of an annealing run: one sample at initialization, then one per
/// evaluated (accepted or rejected) move.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchTrace(Vec<TraceSample>);

impl SearchTrace {
    fn push(&mut self, sample: TraceSample) {
        self.0.push(sample);
    }

    pub fn samples(&self) -> &[TraceSample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&TraceSample> {
        self.0.last()
    }

    /// Writes the samples as a pretty-printed JSON array of
    /// `{step, temperature, current_cost, best_cost}` objects.
    pub fn write_json<W: io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingOutcome {
    pub solution: Solution,
    pub trace: SearchTrace,
    pub steps: usize,
}

/// Simulated annealing over feasible orders, driven one step at a time.
///
/// Moves are pairwise swaps filtered through [`Problem::try_swap`], so neither the current
/// nor the best order is ever infeasible. Callers that want early termination can stop
/// calling [`Annealer::step`] and [`Annealer::finish`] whatever has been found.
pub struct Annealer<'a, R: Rng> {
    problem: &'a Problem,
    config: AnnealingConfig,
    rng: R,
    current: Order,
    current_cost: f64,
    best: Order,
    best_cost: f64,
    temperature: f64,
    step: usize,
    // Iterations spent at the current temperature level.
    level_step: usize,
    trace: SearchTrace,
}

impl<'a, R: Rng> Annealer<'a, R> {
    pub fn new(
        problem: &'a Problem,
        config: AnnealingConfig,
        mut rng: R,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let current = problem.random_feasible_order(&mut rng);
        let current_cost = problem.expected_cost(&current);
        let mut trace = SearchTrace::default();
        trace.push(TraceSample {
            step: 0,
            temperature: config.t_start,
            current_cost,
            best_cost: current_cost,
        });

        Ok(Annealer {
            problem,
            temperature: config.t_start,
            config,
            rng,
            best: current.clone(),
            best_cost: current_cost,
            current,
            current_cost,
            step: 0,
            level_step: 0,
            trace,
        })
    }

    /// True once the temperature has frozen, the step budget is spent, or there is no
    /// move to make (fewer than two tests).
    pub fn is_done(&self) -> bool {
        self.current.len() < 2
            || self.temperature <= self.config.t_end
            || self.step >= self.config.max_steps
    }

    /// Runs one inner-loop iteration. Returns false without doing anything once done.
    pub fn step(&mut self) -> bool {
        if self.is_done() {
            return false;
        }
        self.step += 1;

        let (i, j) = random_pair(&mut self.rng, self.current.len());
        if let Some(neighbor) = self.problem.try_swap(&self.current, i, j) {
            let neighbor_cost = self.problem.expected_cost(&neighbor);
            let delta = neighbor_cost - self.current_cost;
            let accept =
                delta < 0.0 || self.rng.random::<f64>() < (-delta / self.temperature).exp();

            if accept {
                self.current = neighbor;
                self.current_cost = neighbor_cost;
                if self.current_cost < self.best_cost {
                    self.best = self.current.clone();
                    self.best_cost = self.current_cost;
                }
            }

            self.trace.push(TraceSample {
                step: self.step,
                temperature: self.temperature,
                current_cost: self.current_cost,
                best_cost: self.best_cost,
            });
        }

        self.level_step += 1;
        if self.level_step == self.config.iters_per_temperature {
            self.level_step = 0;
            self.temperature *= self.config.alpha;
        }
        true
    }

    pub fn run(mut self) -> AnnealingOutcome {
        while self.step() {}
        self.finish()
    }

    pub fn finish(self) -> AnnealingOutcome {
        AnnealingOutcome {
            solution: Solution {
                order: self.best,
                cost: self.best_cost,
            },
            trace: self.trace,
            steps: self.step,
        }
    }

    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn current_cost(&self) -> f64 {
        self.current_cost
    }

    pub fn best_cost(&self) -> f64 {
        self.best_cost
    }

    pub fn trace(&self) -> &SearchTrace {
        &self.trace
    }
}

/// Runs annealing to completion with a `StdRng` seeded from `config.seed`.
pub fn simulated_annealing(
    problem: &Problem,
    config: &AnnealingConfig,
) -> Result<AnnealingOutcome, SearchError> {
    let rng = StdRng::seed_from_u64(config.seed);
    let outcome = Annealer::new(problem, config.clone(), rng)?.run();
    debug!(
        "annealing (seed {}): {} steps, best cost {:.6}",
        config.seed, outcome.steps, outcome.solution.cost
    );
    Ok(outcome)
}

/// Independent annealing runs with seeds `seed, seed + 1, ...`, executed in parallel.
/// The cheapest result wins; on equal cost the lowest seed is kept.
pub fn multi_start(
    problem: &Problem,
    config: &AnnealingConfig,
    restarts: usize,
) -> Result<AnnealingOutcome, SearchError> {
    let runs = (0..restarts)
        .into_par_iter()
        .map(|offset| {
            let config = AnnealingConfig {
                seed: config.seed.wrapping_add(offset as u64),
                ..config.clone()
            };
            simulated_annealing(problem, &config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(best) = runs.into_iter().reduce(|best, run| {
        if run.solution.cost < best.solution.cost {
            run
        } else {
            best
        }
    }) else {
        return Err(ConfigError::NoRestarts.into());
    };
    Ok(best)
}
