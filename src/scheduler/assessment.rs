//! Solution quality assessment.
//!
//! Evaluates a candidate against the validity matrix and the weekly hour
//! requirements. Drives the retry decision and is returned to callers.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Violations | Unlocked placements the validity matrix rejects |
//! | Achieved hours | Locked + admissible unlocked placements per core course |
//! | Requirements met | Achieved == required for every core course |
//! | Deficit | Σ max(0, required − achieved) |
//! | Occupancy | Filled positions / 48 |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ga::{Candidate, ScheduleContext};
use crate::models::POSITIONS;

/// Required versus achieved hours of one core course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseHours {
    pub required: u32,
    pub achieved: u32,
}

/// Assessment of a candidate timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionAssessment {
    /// Unlocked placements that are not admissible.
    pub violations: usize,
    /// Hours per core course ID.
    pub hours: BTreeMap<String, CourseHours>,
    /// Whether every core course hits its hours exactly.
    pub requirements_met: bool,
    /// Occupied (day, slot) positions.
    pub filled_positions: usize,
}

impl SolutionAssessment {
    /// Assesses `candidate` within `ctx`.
    pub fn assess(ctx: &ScheduleContext, candidate: &Candidate) -> Self {
        let data = &ctx.data;
        let mut achieved = data.locked_hours();
        let mut violations = 0;
        for p in candidate.unlocked(data) {
            if !ctx.matrix.admits(p) {
                violations += 1;
            } else if let Some(h) = achieved.get_mut(p.course_id()) {
                *h += 1;
            }
        }

        let hours: BTreeMap<String, CourseHours> = data
            .requirements
            .iter()
            .map(|(course, &required)| {
                let achieved = achieved.get(course).copied().unwrap_or(0);
                (course.clone(), CourseHours { required, achieved })
            })
            .collect();
        let requirements_met = hours.values().all(|h| h.achieved == h.required);

        Self {
            violations,
            hours,
            requirements_met,
            filled_positions: candidate.occupied().len(),
        }
    }

    /// Missing hours summed over core courses.
    pub fn deficit(&self) -> u32 {
        self.hours
            .values()
            .map(|h| h.required.saturating_sub(h.achieved))
            .sum()
    }

    /// Fraction of the weekly grid in use (0.0..=1.0).
    pub fn occupancy(&self) -> f64 {
        self.filled_positions as f64 / POSITIONS as f64
    }

    /// No violations and every requirement met.
    pub fn is_acceptable(&self) -> bool {
        self.violations == 0 && self.requirements_met
    }
}
