//! Constraint-aware genetic operators.
//!
//! # Crossover
//!
//! Positional recombination biased toward the first parent. The child has
//! exactly the first parent's positions; at every unlocked position the
//! second parent's placement replaces the first parent's when the second
//! parent has one there. Locked positions are copied from the first
//! parent unconditionally.
//!
//! # Mutation
//!
//! Two phases, both consulting the validity matrix before introducing a
//! placement:
//!
//! 1. **Fill**: visit free positions in random order and add a valid
//!    class of a randomly chosen under-filled core course.
//! 2. **Perturb**: each unlocked placement, with probability equal to the
//!    generation's mutation rate, is switched to a different under-filled
//!    course that has a valid class at the same position.
//!
//! The rate decays linearly with the generation index, see
//! [`SchedulerConfig::mutation_rate`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::prelude::IndexedRandom;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Candidate, ScheduleContext};
use crate::config::SchedulerConfig;
use crate::models::Placement;

/// Crossover and mutation over candidates of one scope.
#[derive(Debug, Clone, Copy)]
pub struct GeneticOperators<'a> {
    ctx: &'a ScheduleContext,
    config: &'a SchedulerConfig,
}

impl<'a> GeneticOperators<'a> {
    /// Creates operators; `config` supplies the mutation schedule.
    pub fn new(ctx: &'a ScheduleContext, config: &'a SchedulerConfig) -> Self {
        Self { ctx, config }
    }

    /// Produces one child from two parents.
    pub fn crossover(&self, parent1: &Candidate, parent2: &Candidate) -> Candidate {
        let data = &self.ctx.data;
        let placements = parent1
            .placements
            .iter()
            .map(|p| {
                if data.is_locked(p.position) {
                    return p.clone();
                }
                parent2.at(p.position).unwrap_or(p).clone()
            })
            .collect();
        Candidate { placements }
    }

    /// Mutates `candidate` in place for `generation`.
    pub fn mutate<R: Rng>(&self, candidate: &mut Candidate, generation: usize, rng: &mut R) {
        let rate = self.config.mutation_rate(generation);
        let mut counts = candidate.core_counts(&self.ctx.data);
        self.fill(candidate, &mut counts, rng);
        self.perturb(candidate, &mut counts, rate, rng);
    }

    fn fill<R: Rng>(&self, candidate: &mut Candidate, counts: &mut BTreeMap<String, u32>, rng: &mut R) {
        let mut free = candidate.free_positions();
        free.shuffle(rng);

        for pos in free {
            let under = self.under_filled(counts, None);
            let Some(&course) = under.choose(rng) else {
                break;
            };
            if let Some(class) = self.ctx.valid_classes_at(course, pos).choose(rng) {
                candidate.push(Placement::at(pos, Arc::clone(class)));
                bump(counts, course, 1);
            }
        }
    }

    fn perturb<R: Rng>(
        &self,
        candidate: &mut Candidate,
        counts: &mut BTreeMap<String, u32>,
        rate: f64,
        rng: &mut R,
    ) {
        let data = &self.ctx.data;
        for i in 0..candidate.placements.len() {
            let pos = candidate.placements[i].position;
            if data.is_locked(pos) || !rng.random_bool(rate) {
                continue;
            }
            let old = candidate.placements[i].course_id().to_owned();
            let under = self.under_filled(counts, Some(&old));
            let Some(&course) = under.choose(rng) else {
                continue;
            };
            if let Some(class) = self.ctx.valid_classes_at(course, pos).choose(rng) {
                candidate.placements[i] = Placement::at(pos, Arc::clone(class));
                bump(counts, &old, -1);
                bump(counts, course, 1);
            }
        }
    }

    /// Core courses below their required hours, optionally excluding one.
    fn under_filled(&self, counts: &BTreeMap<String, u32>, except: Option<&str>) -> Vec<&'a str> {
        self.ctx
            .data
            .requirements
            .iter()
            .filter(|(course, &req)| {
                Some(course.as_str()) != except && counts.get(*course).copied().unwrap_or(0) < req
            })
            .map(|(course, _)| course.as_str())
            .collect()
    }
}

fn bump(counts: &mut BTreeMap<String, u32>, course: &str, delta: i32) {
    if let Some(n) = counts.get_mut(course) {
        *n = n.saturating_add_signed(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::{PopulationInitializer, ScopeData, ValidityMatrix};
    use crate::models::{ClassId, ClassSection, ConstraintPolicy, Course, CourseCategory, Position, Scope};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn context(
        courses: &[(&str, u32)],
        valid: impl FnMut(&ClassSection, Position) -> bool,
    ) -> ScheduleContext {
        let scope = Scope::new("2024", "5", "A", "CSE");
        let mut classes: Vec<Arc<ClassSection>> = courses
            .iter()
            .enumerate()
            .map(|(i, (name, hours))| {
                Arc::new(ClassSection::new(i as u64 + 1, Arc::new(Course::core(*name, *hours)), scope.clone()))
            })
            .collect();
        let oe = Arc::new(ClassSection::new(
            100,
            Arc::new(Course::new("OE", CourseCategory::Coordinator)),
            scope.clone(),
        ));
        classes.push(Arc::clone(&oe));
        let locked = vec![Placement::new(1, 1, oe), Placement::new(3, 4, Arc::clone(&classes[0]))];
        let data = ScopeData::from_parts(scope, classes, locked).unwrap();
        let matrix = ValidityMatrix::from_fn(&data, valid);
        ScheduleContext::new(data, matrix, ConstraintPolicy::default())
    }

    fn place(ctx: &ScheduleContext, c: &mut Candidate, id: u64, day: u8, slot: u8) {
        c.push(Placement::new(day, slot, Arc::clone(ctx.data.class(ClassId(id)).unwrap())));
    }

    #[test]
    fn test_crossover_takes_second_parent_at_shared_positions() {
        let ctx = context(&[("DL", 4), ("SE", 4)], |_, _| true);
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);

        let mut p1 = Candidate::from_locked(&ctx.data);
        place(&ctx, &mut p1, 1, 2, 1);
        place(&ctx, &mut p1, 1, 2, 5);
        let mut p2 = Candidate::from_locked(&ctx.data);
        place(&ctx, &mut p2, 2, 2, 1);
        place(&ctx, &mut p2, 2, 6, 6);

        let child = ops.crossover(&p1, &p2);
        assert_eq!(child.len(), p1.len());
        assert!(child.preserves(&ctx.data.locked));
        assert_eq!(child.at(Position::new(2, 1)).unwrap().class_id(), ClassId(2));
        assert_eq!(child.at(Position::new(2, 5)).unwrap().class_id(), ClassId(1));
        assert!(child.at(Position::new(6, 6)).is_none());
    }

    #[test]
    fn test_crossover_never_overrides_locked() {
        let ctx = context(&[("DL", 4), ("SE", 4)], |_, _| true);
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);

        let p1 = Candidate::from_locked(&ctx.data);
        // A malformed second parent holding SE at a locked position.
        let mut p2 = Candidate::default();
        place(&ctx, &mut p2, 2, 1, 1);

        let child = ops.crossover(&p1, &p2);
        assert!(child.preserves(&ctx.data.locked));
        assert_eq!(child.len(), 2);
    }

    #[test]
    fn test_mutate_fills_missing_hours() {
        let ctx = context(&[("DL", 4), ("SE", 3)], |_, _| true);
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);
        let mut rng = SmallRng::seed_from_u64(42);

        let mut c = Candidate::from_locked(&ctx.data);
        ops.mutate(&mut c, 0, &mut rng);

        let counts = c.core_counts(&ctx.data);
        assert_eq!(counts["DL"], 4);
        assert_eq!(counts["SE"], 3);
        assert!(c.preserves(&ctx.data.locked));
        assert_eq!(c.occupied().len(), c.len());
    }

    #[test]
    fn test_mutate_only_uses_admissible_cells() {
        let ctx = context(&[("DL", 4), ("SE", 3)], |class, pos| {
            class.course.id != "SE" || pos.day == 5
        });
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);
        let mut rng = SmallRng::seed_from_u64(42);

        for generation in 0..20 {
            let mut c = PopulationInitializer::new(&ctx).build_candidate(&mut rng);
            ops.mutate(&mut c, generation, &mut rng);
            assert!(c.preserves(&ctx.data.locked));
            assert!(c.unlocked(&ctx.data).all(|p| ctx.matrix.admits(p)));
        }
    }

    #[test]
    fn test_perturb_switches_to_underfilled_course() {
        let ctx = context(&[("DL", 2), ("SE", 1)], |_, _| true);
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);
        let mut rng = SmallRng::seed_from_u64(42);

        // DL over its target, SE missing. Perturb with certainty.
        let mut c = Candidate::from_locked(&ctx.data);
        place(&ctx, &mut c, 1, 5, 2);
        let mut counts = c.core_counts(&ctx.data);
        ops.perturb(&mut c, &mut counts, 1.0, &mut rng);

        assert_eq!(c.at(Position::new(5, 2)).unwrap().course_id(), "SE");
        assert_eq!(counts["SE"], 1);
        assert_eq!(counts["DL"], 1);
        assert_eq!(c.at(Position::new(3, 4)).unwrap().course_id(), "DL");
    }

    #[test]
    fn test_mutate_without_room_is_noop() {
        let ctx = context(&[("DL", 4)], |_, _| false);
        let config = SchedulerConfig::default();
        let ops = GeneticOperators::new(&ctx, &config);
        let mut rng = SmallRng::seed_from_u64(42);

        let mut c = Candidate::from_locked(&ctx.data);
        ops.mutate(&mut c, 3, &mut rng);
        assert_eq!(c.len(), 2);
    }
}
