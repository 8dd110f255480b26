//! GA-based timetable construction for one scope.
//!
//! # Encoding
//!
//! A [`Candidate`] is a list of placements over the 6 × 8 week grid, at
//! most one per (day, slot). Locked placements are copied into every
//! candidate and never change. Every other placement belongs to a core
//! course and is drawn from the classes the [`ValidityMatrix`] admits at
//! its position.
//!
//! # Pipeline
//!
//! ```text
//! ScopeData → ValidityMatrix → PopulationInitializer
//!     → [FitnessEvaluator ⇄ GeneticOperators] inside EvolutionEngine
//! ```
//!
//! All components borrow one [`ScheduleContext`] built per attempt; there
//! is no process-wide state, so scopes can be evolved concurrently.
//!
//! # Reference
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"
//! - Eiben & Smith (2015), "Introduction to Evolutionary Computing", Ch. 8
//!   (parameter control)

mod candidate;
mod context;
mod engine;
mod fitness;
mod operators;
mod population;

pub use candidate::Candidate;
pub use context::{ScheduleContext, ScopeData, ValidityMatrix};
pub use engine::{Evolution, EvolutionEngine, Termination};
pub use fitness::{FitnessEvaluator, PENALTY, REWARD};
pub use operators::GeneticOperators;
pub use population::PopulationInitializer;
