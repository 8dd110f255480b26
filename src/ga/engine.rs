//! Generational loop.
//!
//! # Loop
//!
//! ```text
//! population ← initializer(initial_population)
//! for g in 0..generations:
//!     score, sort descending (stable)
//!     improvement? record best, stagnation = 0 : stagnation += 1
//!     stagnation ≥ stagnation_limit → EarlyStopped
//!     target = stagnation > shrink_after ? max(min_population, len/2) : steady_population
//!     next = top max(min_elite, target/elite_divisor)
//!     fill to target: two distinct parents from top target/2 → crossover → mutate
//! → BudgetExhausted
//! ```
//!
//! Scoring runs on rayon when [`SchedulerConfig::parallel`] is set.
//! Everything else is sequential and driven by the caller's RNG, so a fixed
//! seed reproduces a run exactly.

use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Candidate, FitnessEvaluator, GeneticOperators, PopulationInitializer, ScheduleContext};
use crate::cancel::RunGuard;
use crate::config::SchedulerConfig;
use crate::error::Result;

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// No improvement for `stagnation_limit` generations.
    EarlyStopped,
    /// All generations ran.
    BudgetExhausted,
}

/// Result of one evolution.
#[derive(Debug, Clone)]
pub struct Evolution {
    /// Best candidate seen.
    pub best: Candidate,
    /// Its fitness.
    pub best_fitness: i64,
    /// Generations evaluated.
    pub generations: usize,
    /// Why the loop stopped.
    pub termination: Termination,
}

/// Runs the GA for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct EvolutionEngine<'a> {
    ctx: &'a ScheduleContext,
    config: &'a SchedulerConfig,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates an engine over a prepared context.
    pub fn new(ctx: &'a ScheduleContext, config: &'a SchedulerConfig) -> Self {
        Self { ctx, config }
    }

    /// Evolves a population and returns the best candidate.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`](crate::Error::Cancelled) or
    /// [`Error::DeadlineExceeded`](crate::Error::DeadlineExceeded) when the
    /// guard trips between generations.
    pub fn run<R: Rng>(&self, rng: &mut R, guard: &RunGuard) -> Result<Evolution> {
        let config = self.config;
        let evaluator = FitnessEvaluator::new(self.ctx);
        let operators = GeneticOperators::new(self.ctx, config);

        let mut population =
            PopulationInitializer::new(self.ctx).generate(config.initial_population, rng);
        let mut best: Option<(Candidate, i64)> = None;
        let mut stagnation = 0usize;
        let mut generations = 0usize;
        let mut termination = Termination::BudgetExhausted;

        for generation in 0..config.generations {
            guard.check()?;
            generations = generation + 1;

            let scores = evaluator.score_all(&population, config.parallel);
            let mut ranked: Vec<(i64, Candidate)> = scores.into_iter().zip(population).collect();
            ranked.sort_by(|a, b| b.0.cmp(&a.0));

            let Some(top) = ranked.first().map(|(score, _)| *score) else {
                population = Vec::new();
                break;
            };
            if best.as_ref().map_or(true, |(_, f)| top > *f) {
                best = Some((ranked[0].1.clone(), top));
                stagnation = 0;
                debug!(generation, fitness = top, "new best");
            } else {
                stagnation += 1;
            }

            if stagnation >= config.stagnation_limit {
                debug!(generation, stagnation, "early stop");
                termination = Termination::EarlyStopped;
                population = ranked.into_iter().map(|(_, c)| c).collect();
                break;
            }

            let target = if stagnation > config.shrink_after {
                config.min_population.max(ranked.len() / 2)
            } else {
                config.steady_population
            };
            let elites = config.min_elite.max(target / config.elite_divisor);
            let sorted: Vec<Candidate> = ranked.into_iter().map(|(_, c)| c).collect();
            population = self.next_generation(&operators, sorted, target, elites, generation, rng);
            trace!(generation, size = population.len(), elites, "generation bred");
        }

        let (best, best_fitness) = match best {
            Some(found) => found,
            None => self.fallback(&evaluator, population),
        };
        Ok(Evolution {
            best,
            best_fitness,
            generations,
            termination,
        })
    }

    fn next_generation<R: Rng>(
        &self,
        operators: &GeneticOperators<'_>,
        sorted: Vec<Candidate>,
        target: usize,
        elites: usize,
        generation: usize,
        rng: &mut R,
    ) -> Vec<Candidate> {
        let pool = (target / 2).max(2).min(sorted.len());
        let mut next: Vec<Candidate> = sorted.iter().take(elites.min(target)).cloned().collect();

        while next.len() < target {
            let mut child = match pool {
                0 => Candidate::from_locked(&self.ctx.data),
                1 => sorted[0].clone(),
                _ => {
                    let picks = sample(rng, pool, 2);
                    operators.crossover(&sorted[picks.index(0)], &sorted[picks.index(1)])
                }
            };
            operators.mutate(&mut child, generation, rng);
            next.push(child);
        }
        next
    }

    /// Best of the final population, or a locked-only candidate.
    fn fallback(&self, evaluator: &FitnessEvaluator<'_>, population: Vec<Candidate>) -> (Candidate, i64) {
        population
            .into_iter()
            .map(|c| {
                let score = evaluator.score(&c);
                (c, score)
            })
            .max_by_key(|(_, s)| *s)
            .unwrap_or_else(|| {
                let c = Candidate::from_locked(&self.ctx.data);
                let score = evaluator.score(&c);
                (c, score)
            })
    }
}
