//! Academic timetabling for the U-Engine ecosystem.
//!
//! Builds weekly timetables (6 days × 8 slots) for one
//! (year, semester, section, department) scope at a time. Coordinator and
//! department courses are placed by hand; core courses are filled by a
//! constraint-validated genetic algorithm that never touches what is
//! already persisted.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Scope`, `Course`, `ClassSection`,
//!   `Placement`, `Rule`, `ConstraintPolicy`
//! - **`validation`**: Input integrity checks (duplicate IDs and classes,
//!   foreign classes, off-grid placements)
//! - **`constraints`**: The seven hard rules, checked in a fixed order
//! - **`store`**: Persistence interface and an in-memory implementation
//! - **`ga`**: Scope data, validity matrix, initializer, fitness,
//!   operators, evolution loop
//! - **`scheduler`**: Bounded-retry orchestration, commit, scope locks,
//!   manual assignment
//! - **`config`**: Run parameters (TOML-loadable)
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use u_timetable::{SchedulerConfig, TimetableScheduler};
//! use u_timetable::models::{ClassSection, Course, Faculty, Scope};
//! use u_timetable::store::InMemoryStore;
//!
//! let scope = Scope::new("2024", "5", "A", "CSE");
//! let store = Arc::new(InMemoryStore::new());
//! let rao = Arc::new(Faculty::new("F1", "Dr. Rao"));
//! store.add_class(
//!     ClassSection::new(1, Arc::new(Course::core("DL", 4)), scope.clone())
//!         .with_faculty(Arc::clone(&rao))
//!         .with_venue("LH-1"),
//! );
//! store.add_class(
//!     ClassSection::new(2, Arc::new(Course::core("SE", 3)), scope.clone())
//!         .with_faculty(rao)
//!         .with_venue("LH-2"),
//! );
//!
//! let scheduler = TimetableScheduler::new(store, SchedulerConfig::default().with_seed(7)).unwrap();
//! let outcome = scheduler.schedule_scope(&scope).unwrap();
//! assert!(outcome.requirements_met);
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"

pub mod cancel;
pub mod config;
pub mod constraints;
pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use cancel::CancelFlag;
pub use config::SchedulerConfig;
pub use error::{Error, Result};
pub use scheduler::{Outcome, SolutionAssessment, TimetableScheduler};
