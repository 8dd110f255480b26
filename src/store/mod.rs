//! Persistence collaborator.
//!
//! The optimizer never talks to a database directly; it goes through
//! [`TimetableStore`]. Concrete storage is up to the embedder.
//! [`InMemoryStore`] is a complete implementation for tests and
//! single-process use.

mod memory;

pub use memory::InMemoryStore;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{ClassSection, Placement, Position, Scope, ScopeStatus, StatusRecord, SLOTS};

/// Persistence failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A write broke a storage-level uniqueness rule.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// How far a placement query reaches.
#[derive(Debug, Clone, Copy)]
pub enum Reach<'a> {
    /// Placements of classes in exactly this scope.
    Scope(&'a Scope),
    /// Placements of any class in this academic year.
    Year(&'a str),
}

impl Reach<'_> {
    /// Whether a class falls inside this reach.
    pub fn admits(&self, class: &ClassSection) -> bool {
        match self {
            Reach::Scope(scope) => class.scope == **scope,
            Reach::Year(year) => class.scope.academic_year == *year,
        }
    }
}

/// Result of a bulk replacement.
#[derive(Debug, Clone, Default)]
pub struct ReplaceReport {
    /// Placements removed from the scope.
    pub deleted: usize,
    /// Placements written.
    pub inserted: usize,
    /// Placements the store refused, with the reason.
    pub rejected: Vec<(Placement, StoreError)>,
}

/// Storage interface consumed by the validator, the optimizer and the
/// manual assignment workflow.
pub trait TimetableStore: Send + Sync {
    /// All classes of the scope, with course and faculty resolved.
    fn load_classes(&self, scope: &Scope) -> StoreResult<Vec<Arc<ClassSection>>>;

    /// Placements already persisted for the scope.
    fn load_locked_placements(&self, scope: &Scope) -> StoreResult<Vec<Placement>>;

    /// Persisted placements at a position within `reach`.
    fn placements_at(&self, position: Position, reach: Reach<'_>) -> StoreResult<Vec<Placement>>;

    /// Persisted placements on a day within `reach`.
    fn placements_on_day(&self, day: u8, reach: Reach<'_>) -> StoreResult<Vec<Placement>> {
        let mut out = Vec::new();
        for slot in 1..=SLOTS {
            out.extend(self.placements_at(Position::new(day, slot), reach)?);
        }
        Ok(out)
    }

    /// Writes placements atomically: either all are stored or none.
    fn insert_placements(&self, placements: &[Placement]) -> StoreResult<()>;

    /// Deletes every placement of the scope whose position is not in
    /// `keep`, then inserts `placements` one by one. Individual insert
    /// failures are reported, not fatal.
    fn replace_placements(
        &self,
        scope: &Scope,
        keep: &HashSet<Position>,
        placements: &[Placement],
    ) -> StoreResult<ReplaceReport>;

    /// Status record of the scope, created in the initial state if absent.
    fn get_or_create_status(&self, scope: &Scope) -> StoreResult<StatusRecord>;

    /// Overwrites the scope's status.
    fn update_status(&self, scope: &Scope, status: ScopeStatus) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;

    #[test]
    fn test_reach_admits() {
        let a = Scope::new("2024", "5", "A", "CSE");
        let b = a.with_section("B");
        let other_year = Scope::new("2025", "5", "A", "CSE");
        let class = ClassSection::new(1, Arc::new(Course::core("DL", 4)), b.clone());

        assert!(!Reach::Scope(&a).admits(&class));
        assert!(Reach::Scope(&b).admits(&class));
        assert!(Reach::Year("2024").admits(&class));
        assert!(!Reach::Year(&other_year.academic_year).admits(&class));
    }
}
