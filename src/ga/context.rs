//! Per-run scheduling context.
//!
//! [`ScopeData`] is the snapshot of classes, core requirements and locked
//! placements loaded once per attempt. [`ValidityMatrix`] caches the
//! constraint validator's answer for every (class, day, slot). Both are
//! read-only for the rest of the attempt and shared by every GA
//! component through [`ScheduleContext`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cancel::RunGuard;
use crate::constraints::ConstraintValidator;
use crate::error::{Error, Result};
use crate::models::{ClassId, ClassSection, ConstraintPolicy, Placement, Position, Scope, POSITIONS};
use crate::store::TimetableStore;
use crate::validation::validate_scope_input;

/// Snapshot of one scope.
#[derive(Debug, Clone)]
pub struct ScopeData {
    /// The scope.
    pub scope: Scope,
    /// Classes of the scope, ordered by ID.
    pub classes: Vec<Arc<ClassSection>>,
    /// Required weekly hours per core course ID.
    pub requirements: BTreeMap<String, u32>,
    /// Placements persisted before the run. Never changed by the GA.
    pub locked: Vec<Placement>,
    class_index: HashMap<ClassId, usize>,
    course_classes: HashMap<String, Vec<usize>>,
    locked_positions: HashSet<Position>,
}

impl ScopeData {
    /// Loads and validates the scope from the store.
    pub fn load<S: TimetableStore + ?Sized>(store: &S, scope: &Scope) -> Result<Self> {
        let classes = store.load_classes(scope)?;
        let locked = store.load_locked_placements(scope)?;
        Self::from_parts(scope.clone(), classes, locked)
    }

    /// Builds the snapshot from already loaded records.
    pub fn from_parts(
        scope: Scope,
        mut classes: Vec<Arc<ClassSection>>,
        locked: Vec<Placement>,
    ) -> Result<Self> {
        validate_scope_input(&scope, &classes, &locked).map_err(Error::InvalidInput)?;
        classes.sort_by_key(|c| c.id);

        let mut class_index = HashMap::new();
        let mut course_classes: HashMap<String, Vec<usize>> = HashMap::new();
        let mut requirements = BTreeMap::new();
        for (i, class) in classes.iter().enumerate() {
            class_index.insert(class.id, i);
            if class.is_core() {
                course_classes.entry(class.course.id.clone()).or_default().push(i);
                requirements.insert(class.course.id.clone(), class.course.hours_per_week);
            }
        }
        for (course, _) in requirements.iter().filter(|(_, hours)| **hours == 0) {
            warn!(%scope, course = %course, "core course requires no hours");
        }
        let locked_positions = locked.iter().map(|p| p.position).collect();

        Ok(Self {
            scope,
            classes,
            requirements,
            locked,
            class_index,
            course_classes,
            locked_positions,
        })
    }

    /// Looks up a class by ID.
    pub fn class(&self, id: ClassId) -> Option<&Arc<ClassSection>> {
        self.class_index.get(&id).map(|&i| &self.classes[i])
    }

    /// Classes teaching core course `course_id`.
    pub fn classes_of(&self, course_id: &str) -> impl Iterator<Item = &Arc<ClassSection>> {
        self.course_classes
            .get(course_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.classes[i])
    }

    /// Required hours of a core course (0 for anything else).
    pub fn required(&self, course_id: &str) -> u32 {
        self.requirements.get(course_id).copied().unwrap_or(0)
    }

    /// Whether a locked placement occupies `position`.
    #[inline]
    pub fn is_locked(&self, position: Position) -> bool {
        self.locked_positions.contains(&position)
    }

    /// Positions held by locked placements.
    pub fn locked_positions(&self) -> &HashSet<Position> {
        &self.locked_positions
    }

    /// Locked placements per core course.
    pub fn locked_hours(&self) -> BTreeMap<String, u32> {
        let mut hours: BTreeMap<String, u32> =
            self.requirements.keys().map(|c| (c.clone(), 0)).collect();
        for p in &self.locked {
            if let Some(h) = hours.get_mut(p.course_id()) {
                *h += 1;
            }
        }
        hours
    }
}

/// Cached admissibility of every (class, day, slot) in a scope.
#[derive(Debug, Clone)]
pub struct ValidityMatrix {
    cells: Vec<bool>,
    index: HashMap<ClassId, usize>,
}

impl ValidityMatrix {
    /// Runs the constraint validator for every class × 6 days × 8 slots.
    ///
    /// Rule violations become `false`; store failures abort. `guard` is
    /// checked after each class row.
    pub fn precompute<S: TimetableStore + ?Sized>(
        store: &S,
        data: &ScopeData,
        policy: &ConstraintPolicy,
        guard: &RunGuard,
    ) -> Result<Self> {
        let validator = ConstraintValidator::new(store, &data.scope, policy);
        let mut cells = vec![false; data.classes.len() * POSITIONS];
        for (i, class) in data.classes.iter().enumerate() {
            for pos in Position::all() {
                cells[i * POSITIONS + pos.index()] =
                    validator.is_admissible(class, pos.day, pos.slot)?;
            }
            guard.check()?;
        }
        let matrix = Self::with_cells(data, cells);
        debug!(
            classes = data.classes.len(),
            admissible = matrix.admissible_count(),
            "validity matrix computed"
        );
        Ok(matrix)
    }

    /// Builds a matrix from a predicate. Useful for synthetic scopes.
    pub fn from_fn(data: &ScopeData, mut f: impl FnMut(&ClassSection, Position) -> bool) -> Self {
        let mut cells = Vec::with_capacity(data.classes.len() * POSITIONS);
        for class in &data.classes {
            cells.extend(Position::all().map(|pos| f(class, pos)));
        }
        Self::with_cells(data, cells)
    }

    fn with_cells(data: &ScopeData, cells: Vec<bool>) -> Self {
        let index = data
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        Self { cells, index }
    }

    /// Whether `class` may be placed at `position`. Unknown classes and
    /// off-grid positions are never admissible.
    #[inline]
    pub fn is_valid(&self, class: ClassId, position: Position) -> bool {
        if !position.is_valid() {
            return false;
        }
        self.index
            .get(&class)
            .map(|&i| self.cells[i * POSITIONS + position.index()])
            .unwrap_or(false)
    }

    /// Whether a placement is admissible.
    #[inline]
    pub fn admits(&self, placement: &Placement) -> bool {
        self.is_valid(placement.class_id(), placement.position)
    }

    /// Number of admissible cells.
    pub fn admissible_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }
}

/// Everything a GA component needs for one attempt.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    /// Scope snapshot.
    pub data: ScopeData,
    /// Cached admissibility.
    pub matrix: ValidityMatrix,
    /// Sentinels the matrix was computed with.
    pub policy: ConstraintPolicy,
}

impl ScheduleContext {
    /// Loads the scope and precomputes the validity matrix.
    ///
    /// # Errors
    ///
    /// Store failures, invalid scope input, or the guard tripping while
    /// the matrix is built.
    pub fn build<S: TimetableStore + ?Sized>(
        store: &S,
        scope: &Scope,
        policy: &ConstraintPolicy,
        guard: &RunGuard,
    ) -> Result<Self> {
        let data = ScopeData::load(store, scope)?;
        info!(
            classes = data.classes.len(),
            core_courses = data.requirements.len(),
            locked = data.locked.len(),
            "precomputing validity matrix"
        );
        let matrix = ValidityMatrix::precompute(store, &data, policy, guard)?;
        Ok(Self::new(data, matrix, policy.clone()))
    }

    /// Assembles a context from parts.
    pub fn new(data: ScopeData, matrix: ValidityMatrix, policy: ConstraintPolicy) -> Self {
        Self {
            data,
            matrix,
            policy,
        }
    }

    /// Classes of `course_id` admissible at `position`.
    pub fn valid_classes_at(&self, course_id: &str, position: Position) -> Vec<&Arc<ClassSection>> {
        self.data
            .classes_of(course_id)
            .filter(|c| self.matrix.is_valid(c.id, position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use crate::models::{Course, CourseCategory};
    use crate::store::InMemoryStore;

    fn scope() -> Scope {
        Scope::new("2024", "5", "A", "CSE")
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.add_class(ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope()));
        store.add_class(ClassSection::new(2, Arc::new(Course::core("SE", 6)), scope()));
        let oe = store.add_class(ClassSection::new(
            3,
            Arc::new(Course::new("OE", CourseCategory::Coordinator).with_hours(2)),
            scope(),
        ));
        store.place(oe.id, 1, 1).unwrap();
        store
    }

    fn build(store: &InMemoryStore) -> Result<ScheduleContext> {
        ScheduleContext::build(store, &scope(), &ConstraintPolicy::default(), &RunGuard::unbounded())
    }

    #[test]
    fn test_scope_data_requirements() {
        let store = seeded_store();
        let data = ScopeData::load(&store, &scope()).unwrap();

        assert_eq!(data.classes.len(), 3);
        assert_eq!(data.requirements.len(), 2);
        assert_eq!(data.required("DL"), 4);
        assert_eq!(data.required("OE"), 0);
        assert_eq!(data.classes_of("SE").count(), 1);
        assert_eq!(data.classes_of("OE").count(), 0);
        assert!(data.is_locked(Position::new(1, 1)));
        assert_eq!(data.locked_hours()["DL"], 0);
    }

    #[test]
    fn test_scope_data_rejects_bad_input() {
        let classes = vec![
            Arc::new(ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope())),
            Arc::new(ClassSection::new(1, Arc::new(Course::core("SE", 4)), scope())),
        ];
        let err = ScopeData::from_parts(scope(), classes, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_matrix_reflects_locked_state() {
        let store = seeded_store();
        let ctx = build(&store).unwrap();

        // Core classes may not join the slot held by OE.
        assert!(!ctx.matrix.is_valid(ClassId(1), Position::new(1, 1)));
        assert!(ctx.matrix.is_valid(ClassId(1), Position::new(1, 2)));
        assert_eq!(ctx.matrix.admissible_count(), 3 * POSITIONS - 2);
        assert_eq!(ctx.valid_classes_at("DL", Position::new(1, 1)).len(), 0);
        assert_eq!(ctx.valid_classes_at("DL", Position::new(6, 8)).len(), 1);
    }

    #[test]
    fn test_matrix_unknown_inputs_invalid() {
        let store = seeded_store();
        let ctx = build(&store).unwrap();
        assert!(!ctx.matrix.is_valid(ClassId(99), Position::new(2, 2)));
        assert!(!ctx.matrix.is_valid(ClassId(1), Position::new(7, 2)));
    }

    #[test]
    fn test_matrix_from_fn() {
        let store = seeded_store();
        let data = ScopeData::load(&store, &scope()).unwrap();
        let matrix = ValidityMatrix::from_fn(&data, |_, pos| pos.day == 2);
        assert_eq!(matrix.admissible_count(), 3 * 8);
        assert!(matrix.is_valid(ClassId(2), Position::new(2, 5)));
        assert!(!matrix.is_valid(ClassId(2), Position::new(3, 5)));
    }

    #[test]
    fn test_build_propagates_store_failure() {
        let store = seeded_store();
        store.set_offline(true);
        let err = build(&store).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_precompute_stops_when_cancelled() {
        let store = seeded_store();
        let data = ScopeData::load(&store, &scope()).unwrap();
        let flag = CancelFlag::new();
        flag.cancel();
        let guard = RunGuard::new(flag, None);

        let err = ValidityMatrix::precompute(&store, &data, &ConstraintPolicy::default(), &guard)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_precompute_deadline() {
        let store = seeded_store();
        let guard = RunGuard::new(CancelFlag::new(), Some(std::time::Duration::ZERO));
        let err = ScheduleContext::build(&store, &scope(), &ConstraintPolicy::default(), &guard)
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[test]
    fn test_zero_hour_core_course_is_met() {
        let classes = vec![
            Arc::new(ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope())),
            Arc::new(ClassSection::new(2, Arc::new(Course::core("ASSO", 0)), scope())),
        ];
        let data = ScopeData::from_parts(scope(), classes, Vec::new()).unwrap();
        assert_eq!(data.requirements.len(), 2);
        assert_eq!(data.required("ASSO"), 0);
    }
}
