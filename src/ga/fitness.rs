//! Candidate fitness (higher = better).
//!
//! # Scoring
//!
//! Locked placements are never scored. For every other placement:
//!
//! | Term | Effect |
//! |------|--------|
//! | inadmissible per validity matrix | −50, placement ignored otherwise |
//! | admissible | +5 |
//! | (day, slot) with >1 distinct venue | −50 |
//! | (day, slot) with >1 distinct checked faculty | −50 |
//! | core course beyond 2 slots in a day | −50 per extra slot |
//! | core course in two adjacent slots | −50 per adjacent pair |
//! | faculty with 3 core slots inside a 2-slot span | −50 per window |
//! | core weekly hours off target | −50 per hour of deviation |
//!
//! Achieved hours count locked placements plus admissible unlocked ones.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;

use super::{Candidate, ScheduleContext};
use crate::constraints::CORE_DAILY_CAP;
use crate::models::Position;

/// Penalty unit for every violated term.
pub const PENALTY: i64 = 50;
/// Reward for an admissible placement.
pub const REWARD: i64 = 5;

/// Scores candidates against a shared context.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator<'a> {
    ctx: &'a ScheduleContext,
}

impl<'a> FitnessEvaluator<'a> {
    /// Creates an evaluator for candidates of `ctx`.
    pub fn new(ctx: &'a ScheduleContext) -> Self {
        Self { ctx }
    }

    /// Scores one candidate.
    pub fn score(&self, candidate: &Candidate) -> i64 {
        let data = &self.ctx.data;
        let policy = &self.ctx.policy;
        let mut score = 0i64;

        let mut achieved = data.locked_hours();
        let mut venues: HashMap<Position, HashSet<&str>> = HashMap::new();
        let mut faculty: HashMap<Position, HashSet<&str>> = HashMap::new();
        let mut per_day: HashMap<(u8, &str), usize> = HashMap::new();
        let mut core_slots: HashMap<(u8, &str), Vec<u8>> = HashMap::new();
        let mut faculty_core_slots: HashMap<(u8, &str), Vec<u8>> = HashMap::new();

        for p in candidate.unlocked(data) {
            if !self.ctx.matrix.admits(p) {
                score -= PENALTY;
                continue;
            }
            score += REWARD;

            let class = &*p.class;
            if let Some(h) = achieved.get_mut(p.course_id()) {
                *h += 1;
            }
            if !policy.is_open_venue(&class.venue) {
                venues.entry(p.position).or_default().insert(class.venue.trim());
            }
            for f in policy.checked_faculty(class) {
                faculty.entry(p.position).or_default().insert(f);
                if class.is_core() {
                    faculty_core_slots.entry((p.day(), f)).or_default().push(p.slot());
                }
            }
            if class.is_core() {
                *per_day.entry((p.day(), p.course_id())).or_default() += 1;
                core_slots.entry((p.day(), p.course_id())).or_default().push(p.slot());
            }
        }

        score -= PENALTY * venues.values().filter(|s| s.len() > 1).count() as i64;
        score -= PENALTY * faculty.values().filter(|s| s.len() > 1).count() as i64;
        score -= PENALTY
            * per_day
                .values()
                .map(|&n| n.saturating_sub(CORE_DAILY_CAP) as i64)
                .sum::<i64>();
        score -= PENALTY * core_slots.into_values().map(adjacent_pairs).sum::<i64>();
        score -= PENALTY * faculty_core_slots.into_values().map(crowded_windows).sum::<i64>();
        score -= PENALTY * hour_deviation(&data.requirements, &achieved);

        score
    }

    /// Scores a population, in parallel when `parallel` is set.
    pub fn score_all(&self, population: &[Candidate], parallel: bool) -> Vec<i64> {
        if parallel {
            population.par_iter().map(|c| self.score(c)).collect()
        } else {
            population.iter().map(|c| self.score(c)).collect()
        }
    }
}

/// Pairs of consecutive slot indices in an unsorted slot list.
fn adjacent_pairs(mut slots: Vec<u8>) -> i64 {
    slots.sort_unstable();
    slots.windows(2).filter(|w| w[1] == w[0] + 1).count() as i64
}

/// Windows of three sorted slots whose first and last are at most two
/// indices apart.
fn crowded_windows(mut slots: Vec<u8>) -> i64 {
    slots.sort_unstable();
    slots.windows(3).filter(|w| w[2] <= w[0] + 2).count() as i64
}

fn hour_deviation(required: &BTreeMap<String, u32>, achieved: &BTreeMap<String, u32>) -> i64 {
    required
        .iter()
        .map(|(course, &req)| {
            let got = achieved.get(course).copied().unwrap_or(0);
            (req as i64 - got as i64).abs()
        })
        .sum()
}
