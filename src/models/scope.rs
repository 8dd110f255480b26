//! Scheduling scope and its status record.
//!
//! A scope is one independent timetabling problem: an academic year,
//! semester, section and department. Everything the optimizer reads or
//! replaces is keyed by it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// (academic year, semester, section, department) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    /// Academic year (e.g. "2024-25").
    pub academic_year: String,
    /// Semester label ("1".."8").
    pub semester: String,
    /// Section label (e.g. "A").
    pub section: String,
    /// Department code.
    pub department: String,
}

impl Scope {
    /// Creates a scope.
    pub fn new(
        academic_year: impl Into<String>,
        semester: impl Into<String>,
        section: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            academic_year: academic_year.into(),
            semester: semester.into(),
            section: section.into(),
            department: department.into(),
        }
    }

    /// Returns a scope in the same year, semester and department with a
    /// different section.
    pub fn with_section(&self, section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/sem{}/{}/{}",
            self.academic_year, self.semester, self.section, self.department
        )
    }
}

/// Workflow state of a scope.
///
/// Manual placement moves the scope from coordinator to department
/// assignment and then to `GaRunning`; only a run that meets every core
/// requirement moves it to `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeStatus {
    /// Timetable coordinator is placing coordinator courses.
    #[default]
    CoordinatorAssigning,
    /// Department coordinator is placing department courses.
    DepartmentAssigning,
    /// Manual placement is done; the optimizer may run.
    GaRunning,
    /// A full timetable meeting every requirement was committed.
    Completed,
}

/// Persisted status of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// The scope this record belongs to.
    pub scope: Scope,
    /// Current workflow state.
    pub status: ScopeStatus,
}

impl StatusRecord {
    /// Creates a record in the initial state.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            status: ScopeStatus::default(),
        }
    }
}
