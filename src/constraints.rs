//! Hard-constraint validator.
//!
//! Decides whether a class may be placed at (day, slot) given what is
//! already persisted. Rules are checked in [`Rule::ORDER`]; the first
//! failing rule is reported.
//!
//! | Rule | Reach | Applies to |
//! |------|-------|------------|
//! | CoreSlotExclusivity | scope | any class (core on either side) |
//! | VenueExclusivity | academic year | non-placeholder venues |
//! | FacultyAvailability | academic year | non-sentinel faculty, non-exempt courses |
//! | CoreNonAdjacency | scope | core |
//! | MultiDayConsistency | scope | requests spanning several days |
//! | FacultyContinuousCap | academic year | core |
//! | PerDayCoreCap | scope | core |
//!
//! The validator has no side effects; every answer comes from store reads.

use crate::error::{Error, Result};
use crate::models::{ClassSection, ConstraintPolicy, Position, Rule, Scope};
use crate::store::{Reach, StoreResult, TimetableStore};

/// Maximum placements of one core course per day.
pub const CORE_DAILY_CAP: usize = 2;

/// Checks candidate placements against persisted state.
pub struct ConstraintValidator<'a, S: TimetableStore + ?Sized> {
    store: &'a S,
    scope: &'a Scope,
    policy: &'a ConstraintPolicy,
}

impl<'a, S: TimetableStore + ?Sized> ConstraintValidator<'a, S> {
    /// Creates a validator for `scope`.
    pub fn new(store: &'a S, scope: &'a Scope, policy: &'a ConstraintPolicy) -> Self {
        Self {
            store,
            scope,
            policy,
        }
    }

    /// Validates placing `class` at (day, slot).
    ///
    /// Returns `Err(Error::Violation(kind))` for a broken rule and
    /// `Err(Error::Store(_))` when the store cannot answer.
    pub fn validate(&self, class: &ClassSection, day: u8, slot: u8) -> Result<()> {
        self.validate_days(class, &[day], slot)
    }

    /// Validates placing `class` at `slot` on every day in `days` at once.
    pub fn validate_days(&self, class: &ClassSection, days: &[u8], slot: u8) -> Result<()> {
        let positions: Vec<Position> = days.iter().map(|&d| Position::new(d, slot)).collect();
        for rule in Rule::ORDER {
            if self.breaks(rule, class, &positions)? {
                return Err(Error::Violation(rule.violation()));
            }
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), but folds rule violations into
    /// `Ok(false)`. Store failures still propagate.
    pub fn is_admissible(&self, class: &ClassSection, day: u8, slot: u8) -> Result<bool> {
        match self.validate(class, day, slot) {
            Ok(()) => Ok(true),
            Err(Error::Violation(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn breaks(&self, rule: Rule, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        match rule {
            Rule::CoreSlotExclusivity => self.core_slot_taken(class, positions),
            Rule::VenueExclusivity => self.venue_taken(class, positions),
            Rule::FacultyAvailability => self.faculty_busy(class, positions),
            Rule::CoreNonAdjacency => self.core_adjacent(class, positions),
            Rule::MultiDayConsistency => self.multi_day_mismatch(positions),
            Rule::FacultyContinuousCap => self.faculty_run_too_long(class, positions),
            Rule::PerDayCoreCap => self.daily_cap_reached(class, positions),
        }
    }

    fn in_scope(&self) -> Reach<'a> {
        Reach::Scope(self.scope)
    }

    fn in_year(&self) -> Reach<'a> {
        let scope: &'a Scope = self.scope;
        Reach::Year(&scope.academic_year)
    }

    fn core_slot_taken(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        for &pos in positions {
            let mut others = self
                .store
                .placements_at(pos, self.in_scope())?
                .into_iter()
                .filter(|p| p.class_id() != class.id)
                .peekable();
            if others.peek().is_none() {
                continue;
            }
            if class.is_core() || others.any(|p| p.is_core()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn venue_taken(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        if self.policy.is_open_venue(&class.venue) {
            return Ok(false);
        }
        let venue = class.venue.trim();
        for &pos in positions {
            let clash = self
                .store
                .placements_at(pos, self.in_year())?
                .iter()
                .any(|p| p.class_id() != class.id && p.class.venue.trim() == venue);
            if clash {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn faculty_busy(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        let faculty: Vec<&str> = self.policy.checked_faculty(class).collect();
        if faculty.is_empty() {
            return Ok(false);
        }
        for &pos in positions {
            let busy = self
                .store
                .placements_at(pos, self.in_year())?
                .iter()
                .any(|p| faculty.iter().any(|f| p.class.taught_by(f)));
            if busy {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn core_adjacent(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        if !class.is_core() {
            return Ok(false);
        }
        for pos in positions {
            for neighbour in [pos.shifted(-1), pos.shifted(1)].into_iter().flatten() {
                let same_course = self
                    .store
                    .placements_at(neighbour, self.in_scope())?
                    .iter()
                    .any(|p| p.course_id() == class.course.id);
                if same_course {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// A multi-day request must target distinct days, all free, so the
    /// same class lands identically on each of them.
    fn multi_day_mismatch(&self, positions: &[Position]) -> StoreResult<bool> {
        if positions.len() <= 1 {
            return Ok(false);
        }
        for (i, pos) in positions.iter().enumerate() {
            if positions[..i].contains(pos) {
                return Ok(true);
            }
            if !self.store.placements_at(*pos, self.in_scope())?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn faculty_run_too_long(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        if !class.is_core() {
            return Ok(false);
        }
        let faculty: Vec<&str> = self.policy.checked_faculty(class).collect();
        for f in &faculty {
            for pos in positions {
                for window in [[-2, -1], [1, 2]] {
                    if self.teaches_core_at_all(f, pos, window)? {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn teaches_core_at_all(&self, faculty: &str, pos: &Position, deltas: [i8; 2]) -> StoreResult<bool> {
        for delta in deltas {
            let Some(at) = pos.shifted(delta) else {
                return Ok(false);
            };
            let teaching = self
                .store
                .placements_at(at, self.in_year())?
                .iter()
                .any(|p| p.is_core() && p.class.taught_by(faculty));
            if !teaching {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn daily_cap_reached(&self, class: &ClassSection, positions: &[Position]) -> StoreResult<bool> {
        if !class.is_core() {
            return Ok(false);
        }
        for pos in positions {
            let count = self
                .store
                .placements_on_day(pos.day, self.in_scope())?
                .iter()
                .filter(|p| p.course_id() == class.course.id)
                .count();
            if count >= CORE_DAILY_CAP {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
