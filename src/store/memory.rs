//! In-memory store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Reach, ReplaceReport, StoreError, StoreResult, TimetableStore};
use crate::models::{
    ClassId, ClassSection, Placement, Position, Scope, ScopeStatus, StatusRecord,
};

#[derive(Debug, Default)]
struct State {
    classes: HashMap<ClassId, Arc<ClassSection>>,
    placements: Vec<Placement>,
    statuses: HashMap<Scope, ScopeStatus>,
    offline: bool,
    refused: HashSet<ClassId>,
}

impl State {
    fn check_online(&self) -> StoreResult<()> {
        if self.offline {
            Err(StoreError::Unavailable("in-memory store switched offline".into()))
        } else {
            Ok(())
        }
    }

    /// Storage-level checks: known class, (class, day, slot) unique.
    fn check_insert(&self, placement: &Placement) -> StoreResult<()> {
        let id = placement.class_id();
        if !self.classes.contains_key(&id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if self.refused.contains(&id) {
            return Err(StoreError::Conflict(format!("writes refused for {id}")));
        }
        if !placement.position.is_valid() {
            return Err(StoreError::Conflict(format!(
                "{} is outside the weekly grid",
                placement.position
            )));
        }
        if self.placements.iter().any(|p| p.same_as(placement)) {
            return Err(StoreError::Conflict(format!(
                "{id} already placed at {}",
                placement.position
            )));
        }
        Ok(())
    }
}

/// Thread-safe in-memory [`TimetableStore`].
///
/// Also offers fault injection (`set_offline`, `refuse_inserts_for`) so
/// that failure paths can be exercised.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    class_loads: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class and returns the shared handle.
    pub fn add_class(&self, class: ClassSection) -> Arc<ClassSection> {
        let class = Arc::new(class);
        self.state.write().classes.insert(class.id, Arc::clone(&class));
        class
    }

    /// Looks up a registered class.
    pub fn class(&self, id: ClassId) -> Option<Arc<ClassSection>> {
        self.state.read().classes.get(&id).cloned()
    }

    /// Persists a single placement of a registered class.
    pub fn place(&self, id: ClassId, day: u8, slot: u8) -> StoreResult<()> {
        let class = self
            .class(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.insert_placements(&[Placement::new(day, slot, class)])
    }

    /// Snapshot of the scope's persisted placements, ordered by position.
    pub fn placements(&self, scope: &Scope) -> Vec<Placement> {
        let mut out: Vec<Placement> = self
            .state
            .read()
            .placements
            .iter()
            .filter(|p| p.class.scope == *scope)
            .cloned()
            .collect();
        out.sort_by_key(|p| (p.position, p.class_id()));
        out
    }

    /// Current status of the scope, if a record exists.
    pub fn status(&self, scope: &Scope) -> Option<ScopeStatus> {
        self.state.read().statuses.get(scope).copied()
    }

    /// Simulates an outage: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().offline = offline;
    }

    /// Makes every insert for `id` fail with `Conflict`.
    pub fn refuse_inserts_for(&self, id: ClassId) {
        self.state.write().refused.insert(id);
    }

    /// Number of `load_classes` calls served so far.
    pub fn class_loads(&self) -> usize {
        self.class_loads.load(Ordering::Relaxed)
    }
}

impl TimetableStore for InMemoryStore {
    fn load_classes(&self, scope: &Scope) -> StoreResult<Vec<Arc<ClassSection>>> {
        let state = self.state.read();
        state.check_online()?;
        self.class_loads.fetch_add(1, Ordering::Relaxed);
        let mut classes: Vec<Arc<ClassSection>> = state
            .classes
            .values()
            .filter(|c| c.scope == *scope)
            .cloned()
            .collect();
        classes.sort_by_key(|c| c.id);
        Ok(classes)
    }

    fn load_locked_placements(&self, scope: &Scope) -> StoreResult<Vec<Placement>> {
        self.state.read().check_online()?;
        Ok(self.placements(scope))
    }

    fn placements_at(&self, position: Position, reach: Reach<'_>) -> StoreResult<Vec<Placement>> {
        let state = self.state.read();
        state.check_online()?;
        Ok(state
            .placements
            .iter()
            .filter(|p| p.position == position && reach.admits(&p.class))
            .cloned()
            .collect())
    }

    fn placements_on_day(&self, day: u8, reach: Reach<'_>) -> StoreResult<Vec<Placement>> {
        let state = self.state.read();
        state.check_online()?;
        Ok(state
            .placements
            .iter()
            .filter(|p| p.day() == day && reach.admits(&p.class))
            .cloned()
            .collect())
    }

    fn insert_placements(&self, placements: &[Placement]) -> StoreResult<()> {
        let mut state = self.state.write();
        state.check_online()?;
        for (i, p) in placements.iter().enumerate() {
            state.check_insert(p)?;
            if placements[..i].iter().any(|q| q.same_as(p)) {
                return Err(StoreError::Conflict(format!(
                    "{} requested twice at {}",
                    p.class_id(),
                    p.position
                )));
            }
        }
        state.placements.extend(placements.iter().cloned());
        Ok(())
    }

    fn replace_placements(
        &self,
        scope: &Scope,
        keep: &HashSet<Position>,
        placements: &[Placement],
    ) -> StoreResult<ReplaceReport> {
        let mut state = self.state.write();
        state.check_online()?;

        let before = state.placements.len();
        state
            .placements
            .retain(|p| p.class.scope != *scope || keep.contains(&p.position));
        let mut report = ReplaceReport {
            deleted: before - state.placements.len(),
            ..Default::default()
        };

        for p in placements {
            match state.check_insert(p) {
                Ok(()) => {
                    state.placements.push(p.clone());
                    report.inserted += 1;
                }
                Err(e) => report.rejected.push((p.clone(), e)),
            }
        }
        Ok(report)
    }

    fn get_or_create_status(&self, scope: &Scope) -> StoreResult<StatusRecord> {
        let mut state = self.state.write();
        state.check_online()?;
        let status = *state.statuses.entry(scope.clone()).or_default();
        Ok(StatusRecord {
            scope: scope.clone(),
            status,
        })
    }

    fn update_status(&self, scope: &Scope, status: ScopeStatus) -> StoreResult<()> {
        let mut state = self.state.write();
        state.check_online()?;
        state.statuses.insert(scope.clone(), status);
        Ok(())
    }
}
