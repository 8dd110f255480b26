//! Candidate timetable.
//!
//! # Encoding
//!
//! A candidate is the ordered list of placements of one trial solution,
//! locked placements first. Every position holds at most one placement:
//! the initializer and the fill phase of mutation only use free
//! positions, and crossover keeps the first parent's position set.

use std::collections::{BTreeMap, HashSet};

use super::ScopeData;
use crate::models::{Placement, Position};

/// One full trial solution.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    /// Placements, locked ones included.
    pub placements: Vec<Placement>,
}

impl Candidate {
    /// A candidate holding exactly the scope's locked placements.
    pub fn from_locked(data: &ScopeData) -> Self {
        Self {
            placements: data.locked.clone(),
        }
    }

    /// Number of placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether the candidate is empty.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Appends a placement.
    pub fn push(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    /// Placement at `position`, if any.
    pub fn at(&self, position: Position) -> Option<&Placement> {
        self.placements.iter().find(|p| p.position == position)
    }

    /// Occupied positions.
    pub fn occupied(&self) -> HashSet<Position> {
        self.placements.iter().map(|p| p.position).collect()
    }

    /// Free positions, day-major.
    pub fn free_positions(&self) -> Vec<Position> {
        let occupied = self.occupied();
        Position::all().filter(|p| !occupied.contains(p)).collect()
    }

    /// Placements per core course, locked ones included.
    pub fn core_counts(&self, data: &ScopeData) -> BTreeMap<String, u32> {
        let mut counts: BTreeMap<String, u32> =
            data.requirements.keys().map(|c| (c.clone(), 0)).collect();
        for p in &self.placements {
            if let Some(n) = counts.get_mut(p.course_id()) {
                *n += 1;
            }
        }
        counts
    }

    /// Placements of `course_id` on `day`.
    pub fn count_on_day(&self, course_id: &str, day: u8) -> usize {
        self.placements
            .iter()
            .filter(|p| p.day() == day && p.course_id() == course_id)
            .count()
    }

    /// Whether every locked placement is present unchanged.
    pub fn preserves(&self, locked: &[Placement]) -> bool {
        locked
            .iter()
            .all(|l| self.placements.iter().any(|p| p.same_as(l)))
    }

    /// Placements not at a locked position.
    pub fn unlocked<'a>(&'a self, data: &'a ScopeData) -> impl Iterator<Item = &'a Placement> + 'a {
        self.placements.iter().filter(move |p| !data.is_locked(p.position))
    }
}
