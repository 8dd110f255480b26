//! Timetabling domain models.
//!
//! Provides the data types for one timetabling problem and its solution.
//!
//! # Domain Mappings
//!
//! | u-timetable | Meaning |
//! |-------------|---------|
//! | Scope | (year, semester, section, department) problem instance |
//! | Course | Subject with a category and weekly hour requirement |
//! | ClassSection | Course taught to a section by faculty in a venue |
//! | Placement | Class assigned to a (day, slot) |
//! | Rule | Hard constraint checked before any placement |

mod class_section;
mod constraint;
mod course;
mod placement;
mod scope;

pub use class_section::{ClassId, ClassSection};
pub use constraint::{ConstraintPolicy, Rule, ViolationKind};
pub use course::{Course, CourseCategory, Faculty};
pub use placement::{Placement, Position, DAYS, POSITIONS, SLOTS};
pub use scope::{Scope, ScopeStatus, StatusRecord};
