//! Course and faculty models.
//!
//! A course is the subject being taught; its category decides which
//! spacing rules apply and who places it. Faculty are shared between
//! class sections, so they are referenced, never owned.

use serde::{Deserialize, Serialize};

/// Scheduling category of a course.
///
/// Coordinator and department courses are placed by hand before the
/// optimizer runs; core courses are what the genetic algorithm fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourseCategory {
    /// Placed by the timetable coordinator (cross-department slots).
    Coordinator,
    /// Placed by the department coordinator.
    Department,
    /// Main subject. Subject to slot exclusivity, adjacency and per-day caps.
    Core,
}

impl CourseCategory {
    /// Whether this is the core category.
    #[inline]
    pub fn is_core(self) -> bool {
        matches!(self, Self::Core)
    }
}

/// A course offered in a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: String,
    /// Course name (e.g. "DL", "PET").
    pub name: String,
    /// Short code.
    pub code: String,
    /// Scheduling category.
    pub category: CourseCategory,
    /// Required weekly hours. Drives the optimizer for core courses and
    /// the manual workflow for the other categories.
    pub hours_per_week: u32,
}

impl Course {
    /// Creates a course with the given ID and category.
    pub fn new(id: impl Into<String>, category: CourseCategory) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            code: String::new(),
            category,
            hours_per_week: 0,
        }
    }

    /// Creates a core course requiring `hours` slots per week.
    pub fn core(id: impl Into<String>, hours: u32) -> Self {
        Self::new(id, CourseCategory::Core).with_hours(hours)
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the short code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the required weekly hours.
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours_per_week = hours;
        self
    }

    /// Whether this course is subject to the core spacing rules.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.category.is_core()
    }
}

/// A faculty member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faculty {
    /// Unique faculty identifier.
    pub id: String,
    /// Display name. Also matched against the unassigned-faculty sentinels.
    pub name: String,
    /// Home department.
    pub department: String,
}

impl Faculty {
    /// Creates a faculty member.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department: String::new(),
        }
    }

    /// Sets the home department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }
}
