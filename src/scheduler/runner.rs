//! Top-level scheduling of one scope.
//!
//! # Algorithm
//!
//! 1. Take the scope's lock.
//! 2. Attempt loop (1 + `max_retries` attempts at most):
//!    load the scope, precompute the validity matrix, evolve, assess.
//!    An attempt with violations or unmet hours is retried from scratch
//!    while retries remain.
//! 3. Commit the last attempt's best candidate: delete the scope's
//!    unlocked placements, write every admissible unlocked placement.
//!    Refused writes are logged and skipped.
//! 4. Mark the scope `Completed` if every core requirement is met.
//!
//! Cancellation and the time limit are checked before every attempt, after
//! each class row of the validity matrix and between generations. A
//! cancelled or timed-out run commits nothing.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use super::{ManualAssigner, ScopeLocks, SolutionAssessment};
use crate::cancel::{CancelFlag, RunGuard};
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::ga::{Evolution, EvolutionEngine, ScheduleContext, Termination};
use crate::models::{Placement, Scope, ScopeStatus};
use crate::store::TimetableStore;

/// Result of [`TimetableScheduler::schedule_scope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Placements written by the commit.
    pub committed_count: usize,
    /// Inadmissible unlocked placements in the best candidate.
    pub violations: usize,
    /// Whether every core course reached its weekly hours.
    pub requirements_met: bool,
    /// Scope status after the run.
    pub final_status: ScopeStatus,
    /// Attempts made, the first one included.
    pub attempts: u32,
    /// Fitness of the committed candidate.
    pub best_fitness: i64,
    /// How the last attempt's loop ended.
    pub termination: Termination,
    /// Assessment of the committed candidate.
    pub assessment: SolutionAssessment,
}

/// GA timetabler bound to a store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_timetable::{SchedulerConfig, TimetableScheduler};
/// use u_timetable::models::{ClassSection, Course, Scope};
/// use u_timetable::store::InMemoryStore;
///
/// let scope = Scope::new("2024", "5", "A", "CSE");
/// let store = Arc::new(InMemoryStore::new());
/// store.add_class(ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope.clone()));
///
/// let config = SchedulerConfig::default().with_seed(42).with_parallel(false);
/// let scheduler = TimetableScheduler::new(store, config).unwrap();
/// let outcome = scheduler.schedule_scope(&scope).unwrap();
/// assert!(outcome.requirements_met);
/// assert_eq!(outcome.committed_count, 4);
/// ```
#[derive(Debug)]
pub struct TimetableScheduler<S: TimetableStore + ?Sized> {
    store: Arc<S>,
    config: SchedulerConfig,
    locks: Arc<ScopeLocks>,
}

impl<S: TimetableStore + ?Sized> TimetableScheduler<S> {
    /// Creates a scheduler after validating `config`.
    pub fn new(store: Arc<S>, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: Arc::new(ScopeLocks::new()),
        })
    }

    /// Shares scope locks with other writers of the same store.
    pub fn with_locks(mut self, locks: Arc<ScopeLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// The validated run configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Manual assignment sharing this scheduler's store, policy and locks.
    pub fn manual(&self) -> ManualAssigner<S> {
        ManualAssigner::new(
            Arc::clone(&self.store),
            self.config.policy.clone(),
            Arc::clone(&self.locks),
        )
    }

    /// Builds and commits a timetable for `scope`.
    ///
    /// Core courses requiring zero hours count as met.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`](crate::Error::InvalidInput) if the scope's
    ///   classes or locked placements are inconsistent
    /// - [`Error::DeadlineExceeded`](crate::Error::DeadlineExceeded) once
    ///   the configured time limit passes
    /// - [`Error::Store`](crate::Error::Store) on persistence failures
    pub fn schedule_scope(&self, scope: &Scope) -> Result<Outcome> {
        self.schedule_scope_with_cancel(scope, &CancelFlag::new())
    }

    /// Like [`schedule_scope`](Self::schedule_scope), stopping with
    /// [`Error::Cancelled`](crate::Error::Cancelled) once `cancel` is set.
    pub fn schedule_scope_with_cancel(&self, scope: &Scope, cancel: &CancelFlag) -> Result<Outcome> {
        let span = info_span!("schedule_scope", %scope);
        let _enter = span.enter();
        let guard = RunGuard::new(cancel.clone(), self.config.time_limit());
        self.locks.with_lock(scope, || self.run_locked(scope, &guard))
    }

    fn run_locked(&self, scope: &Scope, guard: &RunGuard) -> Result<Outcome> {
        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let mut attempt: u32 = 0;
        loop {
            guard.check()?;
            let ctx = ScheduleContext::build(&*self.store, scope, &self.config.policy, guard)?;
            let evolution = EvolutionEngine::new(&ctx, &self.config).run(&mut rng, guard)?;
            let assessment = SolutionAssessment::assess(&ctx, &evolution.best);
            info!(
                attempt,
                fitness = evolution.best_fitness,
                generations = evolution.generations,
                violations = assessment.violations,
                deficit = assessment.deficit(),
                "attempt finished"
            );

            if !assessment.is_acceptable() && attempt < self.config.max_retries {
                attempt += 1;
                continue;
            }
            return self.commit(scope, &ctx, evolution, assessment, attempt + 1);
        }
    }

    fn commit(
        &self,
        scope: &Scope,
        ctx: &ScheduleContext,
        evolution: Evolution,
        assessment: SolutionAssessment,
        attempts: u32,
    ) -> Result<Outcome> {
        let accepted: Vec<Placement> = evolution
            .best
            .unlocked(&ctx.data)
            .filter(|p| ctx.matrix.admits(p))
            .cloned()
            .collect();
        let report = self
            .store
            .replace_placements(scope, ctx.data.locked_positions(), &accepted)?;
        for (placement, error) in &report.rejected {
            warn!(
                class = %placement.class_id(),
                position = %placement.position,
                %error,
                "placement not persisted"
            );
        }

        let mut final_status = self.store.get_or_create_status(scope)?.status;
        if assessment.requirements_met {
            self.store.update_status(scope, ScopeStatus::Completed)?;
            final_status = ScopeStatus::Completed;
        }
        info!(
            attempts,
            committed = report.inserted,
            deleted = report.deleted,
            requirements_met = assessment.requirements_met,
            "timetable committed"
        );

        Ok(Outcome {
            committed_count: report.inserted,
            violations: assessment.violations,
            requirements_met: assessment.requirements_met,
            final_status,
            attempts,
            best_fitness: evolution.best_fitness,
            termination: evolution.termination,
            assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{ClassId, ClassSection, Course, CourseCategory, Faculty, Position, StatusRecord};
    use crate::store::{InMemoryStore, Reach, ReplaceReport, StoreResult};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn scope() -> Scope {
        Scope::new("2024", "5", "A", "CSE")
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::default().with_seed(42).with_parallel(false)
    }

    fn scheduler(store: &Arc<InMemoryStore>, config: SchedulerConfig) -> TimetableScheduler<InMemoryStore> {
        TimetableScheduler::new(Arc::clone(store), config).unwrap()
    }

    fn core(store: &InMemoryStore, id: u64, name: &str, hours: u32, scope: &Scope) -> Arc<ClassSection> {
        store.add_class(ClassSection::new(id, Arc::new(Course::core(name, hours)), scope.clone()))
    }

    /// Positions holding more than one core placement.
    fn double_core_positions(store: &InMemoryStore, scope: &Scope) -> usize {
        let mut per_position: HashMap<Position, usize> = HashMap::new();
        for p in store.placements(scope).iter().filter(|p| p.is_core()) {
            *per_position.entry(p.position).or_default() += 1;
        }
        per_position.values().filter(|&&n| n > 1).count()
    }

    /// Sets a cancel flag on the first placement lookup.
    struct CancelOnLookup {
        inner: InMemoryStore,
        flag: CancelFlag,
        lookups: AtomicUsize,
    }

    impl TimetableStore for CancelOnLookup {
        fn load_classes(&self, scope: &Scope) -> StoreResult<Vec<Arc<ClassSection>>> {
            self.inner.load_classes(scope)
        }

        fn load_locked_placements(&self, scope: &Scope) -> StoreResult<Vec<Placement>> {
            self.inner.load_locked_placements(scope)
        }

        fn placements_at(&self, position: Position, reach: Reach<'_>) -> StoreResult<Vec<Placement>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.flag.cancel();
            self.inner.placements_at(position, reach)
        }

        fn insert_placements(&self, placements: &[Placement]) -> StoreResult<()> {
            self.inner.insert_placements(placements)
        }

        fn replace_placements(
            &self,
            scope: &Scope,
            keep: &HashSet<Position>,
            placements: &[Placement],
        ) -> StoreResult<ReplaceReport> {
            self.inner.replace_placements(scope, keep, placements)
        }

        fn get_or_create_status(&self, scope: &Scope) -> StoreResult<StatusRecord> {
            self.inner.get_or_create_status(scope)
        }

        fn update_status(&self, scope: &Scope, status: ScopeStatus) -> StoreResult<()> {
            self.inner.update_status(scope, status)
        }
    }

    #[test]
    fn test_single_course_converges() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());

        let outcome = scheduler(&store, config()).schedule_scope(&scope()).unwrap();

        assert!(outcome.requirements_met);
        assert!(outcome.committed_count >= 4);
        assert_eq!(outcome.violations, 0);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.final_status, ScopeStatus::Completed);
        assert_eq!(store.placements(&scope()).len(), outcome.committed_count);
        assert_eq!(store.status(&scope()), Some(ScopeStatus::Completed));
    }

    #[test]
    fn test_unsatisfiable_scope_stops_after_all_retries() {
        let store = Arc::new(InMemoryStore::new());
        let f1 = Arc::new(Faculty::new("F1", "Dr. Rao"));
        store.add_class(
            ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope()).with_faculty(Arc::clone(&f1)),
        );
        // F1 is busy in section B everywhere except three slots on day 6.
        let other = store.add_class(
            ClassSection::new(2, Arc::new(Course::new("ITT", CourseCategory::Department)), scope().with_section("B"))
                .with_faculty(f1),
        );
        for pos in Position::all().filter(|p| !(p.day == 6 && [1, 4, 7].contains(&p.slot))) {
            store.place(other.id, pos.day, pos.slot).unwrap();
        }

        let config = config().with_generations(3);
        let outcome = scheduler(&store, config).schedule_scope(&scope()).unwrap();

        assert_eq!(outcome.attempts, 21);
        assert!(!outcome.requirements_met);
        assert_eq!(outcome.assessment.deficit(), 1);
        assert_eq!(outcome.committed_count, 3);
        assert_eq!(outcome.final_status, ScopeStatus::CoordinatorAssigning);
        assert_eq!(store.class_loads(), 21);
    }

    #[test]
    fn test_locked_placements_untouched() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        let oe = store.add_class(ClassSection::new(
            2,
            Arc::new(Course::new("OE", CourseCategory::Coordinator).with_hours(1)),
            scope(),
        ));
        store.place(oe.id, 1, 1).unwrap();

        let outcome = scheduler(&store, config()).schedule_scope(&scope()).unwrap();
        assert!(outcome.requirements_met);

        let placed = store.placements(&scope());
        let at_origin: Vec<_> = placed.iter().filter(|p| p.position == Position::new(1, 1)).collect();
        assert_eq!(at_origin.len(), 1);
        assert_eq!(at_origin[0].class_id(), oe.id);
        assert_eq!(placed.len(), 1 + outcome.committed_count);
    }

    #[test]
    fn test_rerun_keeps_committed_timetable() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        core(&store, 2, "SE", 3, &scope());
        let scheduler = scheduler(&store, config());

        let first = scheduler.schedule_scope(&scope()).unwrap();
        let before = store.placements(&scope());
        let second = scheduler.schedule_scope(&scope()).unwrap();

        assert!(first.requirements_met && second.requirements_met);
        assert_eq!(second.committed_count, 0);
        let after = store.placements(&scope());
        assert_eq!(before.len(), after.len());
        assert!(before.iter().all(|b| after.iter().any(|a| a.same_as(b))));
    }

    #[test]
    fn test_no_double_core_per_slot() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 6, &scope());
        core(&store, 2, "SE", 6, &scope());
        core(&store, 3, "CE", 5, &scope());
        core(&store, 4, "ML", 4, &scope());

        let outcome = scheduler(&store, config()).schedule_scope(&scope()).unwrap();
        assert!(outcome.committed_count > 0);
        assert_eq!(double_core_positions(&store, &scope()), 0);
    }

    #[test]
    fn test_shared_faculty_never_double_booked() {
        let store = Arc::new(InMemoryStore::new());
        let f1 = Arc::new(Faculty::new("F1", "Dr. Rao"));
        store.add_class(
            ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope()).with_faculty(Arc::clone(&f1)),
        );
        store.add_class(ClassSection::new(2, Arc::new(Course::core("SE", 4)), scope()).with_faculty(f1));

        scheduler(&store, config()).schedule_scope(&scope()).unwrap();

        let placed = store.placements(&scope());
        for p in &placed {
            let busy = placed
                .iter()
                .filter(|q| q.position == p.position && q.class.taught_by("F1"))
                .count();
            assert_eq!(busy, 1);
        }
    }

    #[test]
    fn test_refused_writes_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let dl = core(&store, 1, "DL", 4, &scope());
        core(&store, 2, "SE", 3, &scope());
        store.refuse_inserts_for(dl.id);

        let outcome = scheduler(&store, config()).schedule_scope(&scope()).unwrap();

        assert_eq!(outcome.committed_count, 3);
        assert!(store.placements(&scope()).iter().all(|p| p.class_id() == ClassId(2)));
    }

    #[test]
    fn test_cancelled_run_commits_nothing() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        let flag = CancelFlag::new();
        flag.cancel();

        let err = scheduler(&store, config())
            .schedule_scope_with_cancel(&scope(), &flag)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(store.placements(&scope()).is_empty());
        assert_eq!(store.status(&scope()), None);
    }

    #[test]
    fn test_cancel_during_matrix_build() {
        let inner = InMemoryStore::new();
        for id in 1..=3 {
            core(&inner, id, &format!("C{id}"), 2, &scope());
        }
        let flag = CancelFlag::new();
        let store = Arc::new(CancelOnLookup {
            inner,
            flag: flag.clone(),
            lookups: AtomicUsize::new(0),
        });
        let scheduler = TimetableScheduler::new(Arc::clone(&store), config()).unwrap();

        let err = scheduler.schedule_scope_with_cancel(&scope(), &flag).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(store.inner.placements(&scope()).is_empty());
        assert_eq!(store.inner.status(&scope()), None);

        // Only the first class row was validated.
        let one_row = store.lookups.load(Ordering::SeqCst);
        let full = CancelOnLookup {
            inner: InMemoryStore::new(),
            flag: CancelFlag::new(),
            lookups: AtomicUsize::new(0),
        };
        for id in 1..=3 {
            core(&full.inner, id, &format!("C{id}"), 2, &scope());
        }
        ScheduleContext::build(&full, &scope(), &SchedulerConfig::default().policy, &RunGuard::unbounded())
            .unwrap();
        assert!(one_row > 0);
        assert!(one_row < full.lookups.load(Ordering::SeqCst));
    }

    #[test]
    fn test_zero_hour_core_course_counts_as_met() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        core(&store, 2, "ASSO", 0, &scope());

        let outcome = scheduler(&store, config()).schedule_scope(&scope()).unwrap();

        assert!(outcome.requirements_met);
        assert_eq!(outcome.assessment.hours["ASSO"].achieved, 0);
        assert!(store.placements(&scope()).iter().all(|p| p.class_id() == ClassId(1)));
    }

    #[test]
    fn test_time_limit() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        let config = config().with_time_limit(Duration::ZERO);

        let err = scheduler(&store, config).schedule_scope(&scope()).unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[test]
    fn test_store_failure_propagates() {
        let store = Arc::new(InMemoryStore::new());
        core(&store, 1, "DL", 4, &scope());
        store.set_offline(true);

        let err = scheduler(&store, config()).schedule_scope(&scope()).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let err = TimetableScheduler::new(store, config().with_generations(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_concurrent_scopes() {
        let store = Arc::new(InMemoryStore::new());
        let scopes = [scope(), scope().with_section("B"), scope().with_section("C")];
        for (i, s) in scopes.iter().enumerate() {
            core(&store, 10 * i as u64 + 1, &format!("DL{i}"), 4, s);
            core(&store, 10 * i as u64 + 2, &format!("SE{i}"), 3, s);
        }
        let scheduler = Arc::new(scheduler(&store, config().with_parallel(true)));

        let handles: Vec<_> = scopes
            .iter()
            .cloned()
            .map(|s| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || scheduler.schedule_scope(&s).unwrap())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().requirements_met);
        }
        for s in &scopes {
            assert_eq!(store.placements(s).len(), 7);
            assert_eq!(double_core_positions(&store, s), 0);
        }
    }

    #[test]
    fn test_manual_then_optimize() {
        let store = Arc::new(InMemoryStore::new());
        let oe = store.add_class(ClassSection::new(
            1,
            Arc::new(Course::new("OE", CourseCategory::Coordinator).with_hours(2)),
            scope(),
        ));
        core(&store, 2, "DL", 4, &scope());
        let scheduler = scheduler(&store, config());

        let status = scheduler.manual().assign(&scope(), oe.id, &[1, 3], &[1]).unwrap();
        assert_eq!(status, ScopeStatus::GaRunning);

        let outcome = scheduler.schedule_scope(&scope()).unwrap();
        assert!(outcome.requirements_met);
        assert_eq!(store.placements(&scope()).len(), 2 + 4);
        assert!(store
            .placements(&scope())
            .iter()
            .filter(|p| p.class_id() == ClassId(2))
            .all(|p| p.position != Position::new(1, 1) && p.position != Position::new(3, 1)));
    }
}
