//! Initial population.
//!
//! # Algorithm
//!
//! Each candidate starts from the locked placements. Free positions are
//! shuffled and visited in passes; at each position one core course that
//! still lacks hours (and has fewer than two slots that day) is drawn at
//! random, then one of its classes admissible there. A position that
//! yields nothing is dropped from the pool. Construction stops when the
//! pool is empty, every requirement is met, or a full pass places nothing.
//! Candidates may end with unmet hours; later generations repair them.

use rand::prelude::IndexedRandom;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Candidate, ScheduleContext};
use crate::constraints::CORE_DAILY_CAP;
use crate::models::{Placement, Position};

/// Builds starting candidates.
#[derive(Debug, Clone, Copy)]
pub struct PopulationInitializer<'a> {
    ctx: &'a ScheduleContext,
}

impl<'a> PopulationInitializer<'a> {
    /// Creates an initializer for `ctx`.
    pub fn new(ctx: &'a ScheduleContext) -> Self {
        Self { ctx }
    }

    /// Generates `size` independent candidates.
    pub fn generate<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Candidate> {
        (0..size).map(|_| self.build_candidate(rng)).collect()
    }

    /// Builds one candidate.
    pub fn build_candidate<R: Rng>(&self, rng: &mut R) -> Candidate {
        let data = &self.ctx.data;
        let mut candidate = Candidate::from_locked(data);

        let mut remaining: Vec<(&str, u32)> = data
            .requirements
            .iter()
            .map(|(course, &req)| (course.as_str(), req))
            .collect();
        for p in &data.locked {
            if let Some((_, left)) = remaining.iter_mut().find(|(c, _)| *c == p.course_id()) {
                *left = left.saturating_sub(1);
            }
        }

        let mut pool: Vec<Position> = Position::all().filter(|p| !data.is_locked(*p)).collect();

        while !pool.is_empty() && remaining.iter().any(|(_, left)| *left > 0) {
            pool.shuffle(rng);
            let mut placed_any = false;

            for pos in pool.clone() {
                let eligible: Vec<usize> = remaining
                    .iter()
                    .enumerate()
                    .filter(|(_, (course, left))| {
                        *left > 0 && candidate.count_on_day(course, pos.day) < CORE_DAILY_CAP
                    })
                    .map(|(i, _)| i)
                    .collect();
                if eligible.is_empty() {
                    pool.retain(|p| *p != pos);
                    if remaining.iter().all(|(_, left)| *left == 0) {
                        break;
                    }
                    continue;
                }

                let Some(&pick) = eligible.choose(rng) else {
                    continue;
                };
                let course = remaining[pick].0;
                let options = self.ctx.valid_classes_at(course, pos);
                if let Some(class) = options.choose(rng) {
                    candidate.push(Placement::at(pos, std::sync::Arc::clone(class)));
                    remaining[pick].1 -= 1;
                    placed_any = true;
                }
                pool.retain(|p| *p != pos);
            }

            if !placed_any {
                break;
            }
        }

        candidate
    }
}
