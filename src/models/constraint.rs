//! Hard scheduling rules and the policy values they consult.
//!
//! Rules form a closed set evaluated in a fixed order; the first failing
//! rule decides the reported [`ViolationKind`], so rejections are
//! reproducible.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ClassSection, Course};

/// A hard scheduling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// A core course never shares its (day, slot) with anything else.
    CoreSlotExclusivity,
    /// One class per venue per (day, slot) across the academic year.
    VenueExclusivity,
    /// One class per faculty member per (day, slot) across the year.
    FacultyAvailability,
    /// A core course is never placed in two adjacent slots of a day.
    CoreNonAdjacency,
    /// Multi-day requests land on free, identical positions.
    MultiDayConsistency,
    /// A faculty member teaches at most two core slots in a row.
    FacultyContinuousCap,
    /// A core course appears at most twice a day.
    PerDayCoreCap,
}

impl Rule {
    /// Evaluation order.
    pub const ORDER: [Rule; 7] = [
        Rule::CoreSlotExclusivity,
        Rule::VenueExclusivity,
        Rule::FacultyAvailability,
        Rule::CoreNonAdjacency,
        Rule::MultiDayConsistency,
        Rule::FacultyContinuousCap,
        Rule::PerDayCoreCap,
    ];

    /// Violation reported when this rule fails.
    pub fn violation(self) -> ViolationKind {
        match self {
            Rule::CoreSlotExclusivity => ViolationKind::SlotOccupiedByCore,
            Rule::VenueExclusivity => ViolationKind::VenueClash,
            Rule::FacultyAvailability => ViolationKind::FacultyDoubleBooked,
            Rule::CoreNonAdjacency => ViolationKind::CoreAdjacency,
            Rule::MultiDayConsistency => ViolationKind::MultiDayMismatch,
            Rule::FacultyContinuousCap => ViolationKind::FacultyContinuousCap,
            Rule::PerDayCoreCap => ViolationKind::PerDayCoreCap,
        }
    }
}

/// Why a placement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum ViolationKind {
    #[error("slot is already taken and a core course cannot share it")]
    SlotOccupiedByCore,
    #[error("venue is already booked in this slot")]
    VenueClash,
    #[error("faculty is already teaching in this slot")]
    FacultyDoubleBooked,
    #[error("core course would run in adjacent slots")]
    CoreAdjacency,
    #[error("multi-day request targets an occupied or inconsistent position")]
    MultiDayMismatch,
    #[error("faculty would teach more than two core slots in a row")]
    FacultyContinuousCap,
    #[error("core course already has two slots on this day")]
    PerDayCoreCap,
}

/// Placeholder values that switch individual rules off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintPolicy {
    /// Venues never checked for clashes. Blank venues are always open.
    pub open_venues: Vec<String>,
    /// Faculty names standing for "not yet assigned".
    pub unassigned_faculty: Vec<String>,
    /// Course names whose faculty are never double-booking checked.
    pub faculty_exempt_courses: Vec<String>,
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self {
            open_venues: vec!["pg".into()],
            unassigned_faculty: vec!["Some faculty".into(), "Some faculty (-)".into()],
            faculty_exempt_courses: vec!["PET".into(), "LIB".into(), "PROJ WORK".into()],
        }
    }
}

impl ConstraintPolicy {
    /// Whether `venue` is exempt from clash checks.
    pub fn is_open_venue(&self, venue: &str) -> bool {
        let venue = venue.trim();
        venue.is_empty() || self.open_venues.iter().any(|v| v == venue)
    }

    /// Whether the course's faculty are exempt from availability checks.
    pub fn is_faculty_exempt(&self, course: &Course) -> bool {
        self.faculty_exempt_courses.iter().any(|c| *c == course.name)
    }

    /// Faculty of `class` that the availability rules apply to.
    ///
    /// Empty when the course is exempt; sentinel faculty are skipped.
    pub fn checked_faculty<'a>(
        &'a self,
        class: &'a ClassSection,
    ) -> impl Iterator<Item = &'a str> + 'a {
        let exempt = self.is_faculty_exempt(&class.course);
        class
            .faculty
            .iter()
            .filter(move |f| !exempt && !self.unassigned_faculty.iter().any(|s| *s == f.name))
            .map(|f| f.id.as_str())
    }
}
