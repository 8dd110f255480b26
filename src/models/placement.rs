//! Placement model: a class assigned to a (day, slot) position.
//!
//! The week has 6 teaching days and 8 slots per day, both 1-based.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{ClassId, ClassSection};

/// Number of teaching days per week.
pub const DAYS: u8 = 6;
/// Number of slots per day.
pub const SLOTS: u8 = 8;
/// Number of (day, slot) positions per week.
pub const POSITIONS: usize = DAYS as usize * SLOTS as usize;

/// A (day, slot) position in the weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Day, 1..=6 (Monday..Saturday).
    pub day: u8,
    /// Slot, 1..=8.
    pub slot: u8,
}

impl Position {
    /// Creates a position. Does not range-check; see [`Position::is_valid`].
    #[inline]
    pub const fn new(day: u8, slot: u8) -> Self {
        Self { day, slot }
    }

    /// Whether day and slot fall inside the weekly grid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (1..=DAYS).contains(&self.day) && (1..=SLOTS).contains(&self.slot)
    }

    /// Dense index in `0..POSITIONS`, day-major.
    #[inline]
    pub fn index(&self) -> usize {
        (self.day as usize - 1) * SLOTS as usize + (self.slot as usize - 1)
    }

    /// Same day, slot shifted by `delta`. `None` if it leaves the day.
    pub fn shifted(&self, delta: i8) -> Option<Self> {
        let slot = self.slot as i16 + delta as i16;
        if (1..=SLOTS as i16).contains(&slot) {
            Some(Self::new(self.day, slot as u8))
        } else {
            None
        }
    }

    /// Every position of the week, day-major.
    pub fn all() -> impl Iterator<Item = Position> {
        (1..=DAYS).flat_map(|day| (1..=SLOTS).map(move |slot| Position::new(day, slot)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}s{}", self.day, self.slot)
    }
}

/// A class placed at a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Where the class meets.
    pub position: Position,
    /// The class (shared).
    pub class: Arc<ClassSection>,
}

impl Placement {
    /// Creates a placement.
    pub fn new(day: u8, slot: u8, class: Arc<ClassSection>) -> Self {
        Self {
            position: Position::new(day, slot),
            class,
        }
    }

    /// Creates a placement at an existing position.
    pub fn at(position: Position, class: Arc<ClassSection>) -> Self {
        Self { position, class }
    }

    #[inline]
    pub fn day(&self) -> u8 {
        self.position.day
    }

    #[inline]
    pub fn slot(&self) -> u8 {
        self.position.slot
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class.id
    }

    /// ID of the placed course.
    #[inline]
    pub fn course_id(&self) -> &str {
        &self.class.course.id
    }

    /// Whether the placed course is a core course.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.class.is_core()
    }

    /// Same class at the same position.
    pub fn same_as(&self, other: &Placement) -> bool {
        self.position == other.position && self.class.id == other.class.id
    }
}
