//! Class section model.
//!
//! A class section binds a course to a section, a venue and a set of
//! faculty within one scope. Courses and faculty are shared (`Arc`) so
//! that placements can carry a full class without deep copies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{Course, Faculty, Scope};

/// Identifier of a class section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// A schedulable class: one course taught to one section.
///
/// At most one class exists per (course, section, year, semester,
/// department); `validation::validate_scope_input` enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSection {
    /// Unique identifier.
    pub id: ClassId,
    /// Course taught.
    pub course: Arc<Course>,
    /// Assigned faculty. A faculty member may teach several sections.
    pub faculty: Vec<Arc<Faculty>>,
    /// Venue label. Blank or placeholder venues are unconstrained.
    pub venue: String,
    /// Scope key. `scope.section` is the section label.
    pub scope: Scope,
}

impl ClassSection {
    /// Creates a class with no faculty and an open venue.
    pub fn new(id: u64, course: Arc<Course>, scope: Scope) -> Self {
        Self {
            id: ClassId(id),
            course,
            faculty: Vec::new(),
            venue: String::new(),
            scope,
        }
    }

    /// Adds a faculty member.
    pub fn with_faculty(mut self, faculty: Arc<Faculty>) -> Self {
        self.faculty.push(faculty);
        self
    }

    /// Sets the venue.
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = venue.into();
        self
    }

    /// Section label.
    #[inline]
    pub fn section(&self) -> &str {
        &self.scope.section
    }

    /// Whether the class teaches a core course.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.course.is_core()
    }

    /// Whether `faculty_id` teaches this class.
    pub fn taught_by(&self, faculty_id: &str) -> bool {
        self.faculty.iter().any(|f| f.id == faculty_id)
    }

    /// Natural key used for the uniqueness rule.
    pub fn natural_key(&self) -> (&str, &str, &str, &str, &str) {
        (
            &self.course.id,
            &self.scope.section,
            &self.scope.academic_year,
            &self.scope.semester,
            &self.scope.department,
        )
    }
}
