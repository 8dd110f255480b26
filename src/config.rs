//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::ConstraintPolicy;

/// Configuration for a scheduling run.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes.
///
/// # Examples
///
/// ```
/// use u_timetable::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_generations(60)
///     .with_max_retries(5)
///     .with_seed(42)
///     .with_parallel(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Candidates built for the first generation.
    pub initial_population: usize,

    /// Generation budget per attempt.
    pub generations: usize,

    /// Generations without improvement before stopping early.
    pub stagnation_limit: usize,

    /// Stagnation above which the population is halved.
    pub shrink_after: usize,

    /// Floor of the halved population.
    pub min_population: usize,

    /// Population size while the search is improving.
    pub steady_population: usize,

    /// Minimum number of elites carried over unchanged.
    pub min_elite: usize,

    /// Elites are `population / elite_divisor` (at least `min_elite`).
    pub elite_divisor: usize,

    /// Mutation rate at generation 0.
    pub mutation_start: f64,

    /// Total linear decay of the mutation rate over the run.
    pub mutation_decay: f64,

    /// Lowest mutation rate.
    pub mutation_floor: f64,

    /// Full restarts after the first attempt fails.
    pub max_retries: u32,

    /// Whether to score candidates in parallel using rayon.
    pub parallel: bool,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,

    /// Wall-clock limit for one `schedule_scope` call, in milliseconds.
    pub time_limit_ms: Option<u64>,

    /// Placeholder values consulted by the hard rules.
    pub policy: ConstraintPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_population: 50,
            generations: 100,
            stagnation_limit: 20,
            shrink_after: 5,
            min_population: 15,
            steady_population: 30,
            min_elite: 3,
            elite_divisor: 10,
            mutation_start: 0.5,
            mutation_decay: 0.4,
            mutation_floor: 0.1,
            max_retries: 20,
            parallel: true,
            seed: None,
            time_limit_ms: None,
            policy: ConstraintPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the size of the first generation.
    pub fn with_initial_population(mut self, n: usize) -> Self {
        self.initial_population = n;
        self
    }

    /// Sets the generation budget per attempt.
    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    /// Sets how many generations without improvement end an attempt.
    pub fn with_stagnation_limit(mut self, n: usize) -> Self {
        self.stagnation_limit = n;
        self
    }

    /// Sets the number of full restarts after the first attempt.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Enables or disables rayon fitness scoring.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Fixes the RNG seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Bounds the wall-clock time of one `schedule_scope` call.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Sets the venue and faculty sentinels used by the hard rules.
    pub fn with_policy(mut self, policy: ConstraintPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Time limit as a `Duration`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Mutation rate for `generation`: linear decay from
    /// `mutation_start`, never below `mutation_floor`.
    pub fn mutation_rate(&self, generation: usize) -> f64 {
        let progress = if self.generations == 0 {
            1.0
        } else {
            generation as f64 / self.generations as f64
        };
        (self.mutation_start - self.mutation_decay * progress).max(self.mutation_floor)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.initial_population < 2 {
            return fail("initial_population must be at least 2".into());
        }
        if self.generations == 0 {
            return fail("generations must be at least 1".into());
        }
        if self.min_population < 2 || self.steady_population < 2 {
            return fail("population sizes must be at least 2".into());
        }
        if self.elite_divisor == 0 {
            return fail("elite_divisor must be at least 1".into());
        }
        if self.min_elite >= self.min_population.min(self.steady_population) {
            return fail(format!(
                "min_elite ({}) must be below every population size",
                self.min_elite
            ));
        }
        for (name, p) in [
            ("mutation_start", self.mutation_start),
            ("mutation_decay", self.mutation_decay),
            ("mutation_floor", self.mutation_floor),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return fail(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        Ok(())
    }
}
