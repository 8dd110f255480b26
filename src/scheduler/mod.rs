//! Scope-level orchestration.
//!
//! Runs the GA for a scope with bounded restarts, commits the result and
//! keeps the scope's status record current. Also hosts the manual
//! assignment workflow that precedes optimization.
//!
//! # Concurrency
//!
//! One [`ScopeLocks`] instance serializes every writer of a scope. Distinct
//! scopes run in parallel; within a run, fitness scoring is spread over
//! rayon's pool.
//!
//! # Reference
//! - Schaerf (1999), "A Survey of Automated Timetabling", §3 (school
//!   timetabling with pre-assignments)

mod assessment;
mod locks;
mod manual;
mod runner;

pub use assessment::{CourseHours, SolutionAssessment};
pub use locks::ScopeLocks;
pub use manual::ManualAssigner;
pub use runner::{Outcome, TimetableScheduler};
