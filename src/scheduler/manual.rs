//! Manual placement of coordinator and department courses.
//!
//! Before the optimizer runs, the timetable coordinator places every
//! coordinator course and then the department coordinator places every
//! department course, one course at a time in a fixed order. Each request
//! goes through the same hard rules as the optimizer.
//!
//! # Status flow
//!
//! ```text
//! CoordinatorAssigning ──(coordinator courses fulfilled)──▶ DepartmentAssigning
//! DepartmentAssigning ──(department courses fulfilled)──▶ GaRunning
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::ScopeLocks;
use crate::constraints::ConstraintValidator;
use crate::error::{Error, Result};
use crate::models::{
    ClassId, ClassSection, ConstraintPolicy, Course, CourseCategory, Placement, Scope,
    ScopeStatus, DAYS, SLOTS,
};
use crate::store::TimetableStore;
use crate::validation::{ValidationError, ValidationErrorKind};

/// Manual assignment front end for one store.
#[derive(Debug)]
pub struct ManualAssigner<S: TimetableStore + ?Sized> {
    store: Arc<S>,
    policy: ConstraintPolicy,
    locks: Arc<ScopeLocks>,
}

impl<S: TimetableStore + ?Sized> Clone for ManualAssigner<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: TimetableStore + ?Sized> ManualAssigner<S> {
    /// Creates an assigner. Share `locks` with the scheduler of the same store.
    pub fn new(store: Arc<S>, policy: ConstraintPolicy, locks: Arc<ScopeLocks>) -> Self {
        Self {
            store,
            policy,
            locks,
        }
    }

    /// The course that must be placed next, if any.
    ///
    /// Coordinator courses come first, then department courses, each group
    /// ordered by name. A course is pending while its persisted placements
    /// in the scope are fewer than its weekly hours.
    pub fn pending_course(&self, scope: &Scope) -> Result<Option<Arc<Course>>> {
        let classes = self.store.load_classes(scope)?;
        let placed = self.store.load_locked_placements(scope)?;
        Ok(pending_in(&classes, &placed))
    }

    /// Places `class_id` at every (day, slot) combination requested.
    ///
    /// Each slot is validated as one multi-day request and persisted before
    /// the next slot is checked. Returns the scope status afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownClass`] if the class is not in the scope
    /// - [`Error::InvalidInput`] for empty or out-of-range days and slots
    /// - [`Error::NothingPending`] if every manual course is fulfilled
    /// - [`Error::OutOfOrder`] if another course is pending
    /// - [`Error::Violation`] for the first broken rule
    pub fn assign(&self, scope: &Scope, class_id: ClassId, days: &[u8], slots: &[u8]) -> Result<ScopeStatus> {
        self.locks
            .with_lock(scope, || self.assign_locked(scope, class_id, days, slots))
    }

    fn assign_locked(
        &self,
        scope: &Scope,
        class_id: ClassId,
        days: &[u8],
        slots: &[u8],
    ) -> Result<ScopeStatus> {
        check_request(days, slots)?;

        let classes = self.store.load_classes(scope)?;
        let class = classes
            .iter()
            .find(|c| c.id == class_id)
            .cloned()
            .ok_or(Error::UnknownClass(class_id))?;

        let placed = self.store.load_locked_placements(scope)?;
        let pending = pending_in(&classes, &placed).ok_or(Error::NothingPending)?;
        if pending.id != class.course.id {
            return Err(Error::OutOfOrder {
                expected: pending.name.clone(),
                requested: class.course.name.clone(),
            });
        }

        let validator = ConstraintValidator::new(&*self.store, scope, &self.policy);
        for &slot in slots {
            validator.validate_days(&class, days, slot)?;
            let batch: Vec<Placement> = days
                .iter()
                .map(|&day| Placement::new(day, slot, Arc::clone(&class)))
                .collect();
            self.store.insert_placements(&batch)?;
            debug!(class = %class.id, slot, days = ?days, "manual placement stored");
        }

        self.advance_status(scope)
    }

    fn advance_status(&self, scope: &Scope) -> Result<ScopeStatus> {
        let classes = self.store.load_classes(scope)?;
        let placed = self.store.load_locked_placements(scope)?;
        let done = |category| fulfilled(&classes, &placed, category);

        let record = self.store.get_or_create_status(scope)?;
        let mut status = record.status;
        if status == ScopeStatus::CoordinatorAssigning && done(CourseCategory::Coordinator) {
            status = ScopeStatus::DepartmentAssigning;
        }
        if status == ScopeStatus::DepartmentAssigning && done(CourseCategory::Department) {
            status = ScopeStatus::GaRunning;
        }
        if status != record.status {
            self.store.update_status(scope, status)?;
            info!(%scope, from = ?record.status, to = ?status, "scope status advanced");
        }
        Ok(status)
    }
}

fn check_request(days: &[u8], slots: &[u8]) -> Result<()> {
    let mut errors = Vec::new();
    if days.is_empty() || slots.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::PositionOutOfRange,
            "at least one day and one slot are required",
        ));
    }
    for &day in days.iter().filter(|&&d| d == 0 || d > DAYS) {
        errors.push(ValidationError::new(
            ValidationErrorKind::PositionOutOfRange,
            format!("day {day} is outside 1..={DAYS}"),
        ));
    }
    for &slot in slots.iter().filter(|&&s| s == 0 || s > SLOTS) {
        errors.push(ValidationError::new(
            ValidationErrorKind::PositionOutOfRange,
            format!("slot {slot} is outside 1..={SLOTS}"),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(errors))
    }
}

fn placed_counts(placed: &[Placement]) -> HashMap<&str, u32> {
    let mut counts = HashMap::new();
    for p in placed {
        *counts.entry(p.course_id()).or_default() += 1;
    }
    counts
}

/// Distinct courses of `category`, ordered by name.
fn courses_of(classes: &[Arc<ClassSection>], category: CourseCategory) -> Vec<Arc<Course>> {
    let mut courses: Vec<Arc<Course>> = Vec::new();
    for class in classes.iter().filter(|c| c.course.category == category) {
        if !courses.iter().any(|c| c.id == class.course.id) {
            courses.push(Arc::clone(&class.course));
        }
    }
    courses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    courses
}

fn pending_in(classes: &[Arc<ClassSection>], placed: &[Placement]) -> Option<Arc<Course>> {
    let counts = placed_counts(placed);
    [CourseCategory::Coordinator, CourseCategory::Department]
        .into_iter()
        .flat_map(|category| courses_of(classes, category))
        .find(|course| counts.get(course.id.as_str()).copied().unwrap_or(0) < course.hours_per_week)
}

fn fulfilled(classes: &[Arc<ClassSection>], placed: &[Placement], category: CourseCategory) -> bool {
    let counts = placed_counts(placed);
    courses_of(classes, category)
        .iter()
        .all(|course| counts.get(course.id.as_str()).copied().unwrap_or(0) >= course.hours_per_week)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faculty, ViolationKind};
    use crate::store::InMemoryStore;

    fn scope() -> Scope {
        Scope::new("2024", "5", "A", "CSE")
    }

    /// Coordinator: OE (2h), CLUB (1h). Department: ITT (2h). Core: DL.
    fn fixture() -> (Arc<InMemoryStore>, ManualAssigner<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let f1 = Arc::new(Faculty::new("F1", "Dr. Rao"));
        store.add_class(
            ClassSection::new(
                1,
                Arc::new(Course::new("OE", CourseCategory::Coordinator).with_hours(2)),
                scope(),
            )
            .with_faculty(Arc::clone(&f1)),
        );
        store.add_class(ClassSection::new(
            2,
            Arc::new(Course::new("CLUB", CourseCategory::Coordinator).with_hours(1)),
            scope(),
        ));
        store.add_class(
            ClassSection::new(
                3,
                Arc::new(Course::new("ITT", CourseCategory::Department).with_hours(2)),
                scope(),
            )
            .with_faculty(f1),
        );
        store.add_class(ClassSection::new(4, Arc::new(Course::core("DL", 4)), scope()));
        let assigner = ManualAssigner::new(
            Arc::clone(&store),
            ConstraintPolicy::default(),
            Arc::new(ScopeLocks::new()),
        );
        (store, assigner)
    }

    #[test]
    fn test_pending_order() {
        let (_, assigner) = fixture();
        // CLUB sorts before OE.
        assert_eq!(assigner.pending_course(&scope()).unwrap().unwrap().id, "CLUB");
    }

    #[test]
    fn test_out_of_order_rejected() {
        let (store, assigner) = fixture();
        let err = assigner.assign(&scope(), ClassId(1), &[1], &[1]).unwrap_err();
        assert!(matches!(err, Error::OutOfOrder { ref expected, .. } if expected == "CLUB"));
        assert!(store.placements(&scope()).is_empty());
    }

    #[test]
    fn test_full_workflow_advances_status() {
        let (store, assigner) = fixture();
        let s = scope();

        assert_eq!(assigner.assign(&s, ClassId(2), &[1], &[8]).unwrap(), ScopeStatus::CoordinatorAssigning);
        assert_eq!(assigner.pending_course(&s).unwrap().unwrap().id, "OE");

        let status = assigner.assign(&s, ClassId(1), &[2, 4], &[1]).unwrap();
        assert_eq!(status, ScopeStatus::DepartmentAssigning);
        assert_eq!(assigner.pending_course(&s).unwrap().unwrap().id, "ITT");

        let status = assigner.assign(&s, ClassId(3), &[3], &[5, 7]).unwrap();
        assert_eq!(status, ScopeStatus::GaRunning);
        assert!(assigner.pending_course(&s).unwrap().is_none());
        assert_eq!(store.status(&s), Some(ScopeStatus::GaRunning));
        assert_eq!(store.placements(&s).len(), 5);

        let err = assigner.assign(&s, ClassId(3), &[5], &[1]).unwrap_err();
        assert!(matches!(err, Error::NothingPending));
    }

    #[test]
    fn test_rule_violation_reported() {
        let (store, assigner) = fixture();
        let s = scope();
        assigner.assign(&s, ClassId(2), &[1], &[1]).unwrap();

        // Same day listed twice.
        let err = assigner.assign(&s, ClassId(1), &[3, 3], &[2]).unwrap_err();
        assert_eq!(err.violation(), Some(ViolationKind::MultiDayMismatch));
        assert_eq!(store.placements(&s).len(), 1);
    }

    #[test]
    fn test_faculty_clash_across_manual_courses() {
        let (_, assigner) = fixture();
        let s = scope();
        assigner.assign(&s, ClassId(2), &[1], &[1]).unwrap();
        assigner.assign(&s, ClassId(1), &[2, 3], &[4]).unwrap();

        // F1 teaches OE at (2, 4).
        let err = assigner.assign(&s, ClassId(3), &[2], &[4]).unwrap_err();
        assert_eq!(err.violation(), Some(ViolationKind::FacultyDoubleBooked));
    }

    #[test]
    fn test_bad_requests() {
        let (_, assigner) = fixture();
        let s = scope();
        assert!(matches!(
            assigner.assign(&s, ClassId(2), &[7], &[1]),
            Err(Error::InvalidInput(ref e)) if e.len() == 1
        ));
        assert!(matches!(assigner.assign(&s, ClassId(2), &[], &[1]), Err(Error::InvalidInput(_))));
        assert!(matches!(assigner.assign(&s, ClassId(99), &[1], &[1]), Err(Error::UnknownClass(ClassId(99)))));
    }
}
