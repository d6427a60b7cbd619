//! Registry — the authoritative in-memory map of workload records.
//!
//! A single `RwLock` guards the map. Every mutation goes through it, which
//! makes mutations on one id linearizable. Critical sections never await:
//! the closures passed to [`Registry::update_with`] are synchronous.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::*;

/// Point-in-time counts taken under one read lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub total: usize,
    /// Every phase is present, including those with a zero count.
    pub by_phase: BTreeMap<Phase, usize>,
}

/// Thread-safe workload registry. Cloning shares the underlying map.
#[derive(Clone)]
pub struct Registry {
    workloads: Arc<RwLock<HashMap<WorkloadId, Workload>>>,
    max_workloads: usize,
}

impl Registry {
    /// Create an empty registry holding at most `max_workloads` records.
    pub fn new(max_workloads: usize) -> Self {
        Self {
            workloads: Arc::new(RwLock::new(HashMap::new())),
            max_workloads,
        }
    }

    pub fn max_workloads(&self) -> usize {
        self.max_workloads
    }

    /// Insert a new record.
    ///
    /// Fails with `AlreadyExists` on an id collision and with
    /// `CapacityExceeded` when the registry is full.
    pub fn put_new(&self, workload: Workload) -> RegistryResult<Workload> {
        workload
            .check_invariants()
            .map_err(|reason| RegistryError::Invariant {
                id: workload.id.clone(),
                reason,
            })?;

        let mut workloads = self.workloads.write();
        if workloads.contains_key(&workload.id) {
            return Err(RegistryError::AlreadyExists(workload.id));
        }
        if workloads.len() >= self.max_workloads {
            return Err(RegistryError::CapacityExceeded {
                max: self.max_workloads,
            });
        }
        workloads.insert(workload.id.clone(), workload.clone());
        debug!(id = %workload.id, total = workloads.len(), "workload stored");
        Ok(workload)
    }

    pub fn get(&self, id: &str) -> RegistryResult<Workload> {
        self.workloads
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Snapshot of all records, oldest first (ties broken by id).
    pub fn list(&self) -> Vec<Workload> {
        let mut all: Vec<Workload> = self.workloads.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Remove a record in any phase and return it.
    pub fn delete(&self, id: &str) -> RegistryResult<Workload> {
        let removed = self
            .workloads
            .write()
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        debug!(%id, phase = %removed.status.phase, "workload deleted");
        Ok(removed)
    }

    /// Apply `f` to the record under the registry's exclusion.
    ///
    /// `f` works on a copy. If it fails, or its result breaks an invariant
    /// or the phase state machine, the stored record is left untouched.
    /// Successful changes bump `updated_at`, and `status.last_updated`
    /// when the status changed.
    pub fn update_with<T, E, F>(&self, id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Workload) -> Result<T, E>,
        E: From<RegistryError>,
    {
        let mut workloads = self.workloads.write();
        let Some(current) = workloads.get_mut(id) else {
            return Err(RegistryError::NotFound(id.to_string()).into());
        };

        let mut draft = current.clone();
        let out = f(&mut draft)?;
        if draft == *current {
            return Ok(out);
        }

        stamp_and_validate(current, &mut draft, Utc::now())?;
        *current = draft;
        Ok(out)
    }

    /// Count records per phase from a single snapshot.
    pub fn summary(&self) -> RegistrySummary {
        let workloads = self.workloads.read();
        let mut by_phase: BTreeMap<Phase, usize> = Phase::ALL.iter().map(|p| (*p, 0)).collect();
        for w in workloads.values() {
            *by_phase.entry(w.status.phase).or_insert(0) += 1;
        }
        RegistrySummary {
            total: workloads.len(),
            by_phase,
        }
    }

    pub fn len(&self) -> usize {
        self.workloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validate `next` against `prev` and stamp its timestamps.
fn stamp_and_validate(
    prev: &Workload,
    next: &mut Workload,
    now: DateTime<Utc>,
) -> RegistryResult<()> {
    let invariant = |reason: String| RegistryError::Invariant {
        id: prev.id.clone(),
        reason,
    };

    if next.id != prev.id {
        return Err(invariant("id is immutable".into()));
    }
    if next.created_at != prev.created_at {
        return Err(invariant("created_at is immutable".into()));
    }
    if !prev.status.phase.can_transition_to(next.status.phase) {
        return Err(RegistryError::IllegalTransition {
            id: prev.id.clone(),
            from: prev.status.phase,
            to: next.status.phase,
        });
    }

    // Timestamps never move backwards, even if the wall clock does.
    next.updated_at = now.max(prev.updated_at);

    let mut status_probe = next.status.clone();
    status_probe.last_updated = prev.status.last_updated;
    if status_probe != prev.status {
        next.status.last_updated = now.max(prev.status.last_updated);
    }

    next.check_invariants().map_err(invariant)
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn workload(id: &str) -> Workload {
        Workload::new(id, ResourceSpec::new(1000, 2 << 30, 0), Utc::now())
    }

    #[test]
    fn put_and_get_round_trip() {
        let registry = Registry::new(10);
        let stored = registry.put_new(workload("a")).unwrap();

        assert_eq!(registry.get("a").unwrap(), stored);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = Registry::new(10);
        registry.put_new(workload("a")).unwrap();

        let err = registry.put_new(workload("a")).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("a".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let registry = Registry::new(1);
        registry.put_new(workload("x")).unwrap();

        let err = registry.put_new(workload("y")).unwrap_err();
        assert_eq!(err, RegistryError::CapacityExceeded { max: 1 });
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.list()[0].id, "x");
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let registry = Registry::new(10);
        registry.put_new(workload("d")).unwrap();

        assert!(registry.delete("d").is_ok());
        assert_eq!(
            registry.delete("d").unwrap_err(),
            RegistryError::NotFound("d".into())
        );
        assert!(registry.get("d").is_err());
    }

    #[test]
    fn invalid_record_is_not_admitted() {
        let registry = Registry::new(10);
        let mut w = workload("bad");
        w.status.ready_replicas = 5;

        assert!(matches!(
            registry.put_new(w),
            Err(RegistryError::Invariant { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn update_bumps_timestamps() {
        let registry = Registry::new(10);
        let before = registry.put_new(workload("a")).unwrap();

        registry
            .update_with::<_, RegistryError, _>("a", |w| {
                w.status.phase = Phase::Scheduled;
                w.assigned_node = "node-1".into();
                Ok(())
            })
            .unwrap();

        let after = registry.get("a").unwrap();
        assert_eq!(after.status.phase, Phase::Scheduled);
        assert!(after.updated_at >= before.updated_at);
        assert!(after.status.last_updated >= before.status.last_updated);
        assert!(after.updated_at >= after.created_at);
    }

    #[test]
    fn metrics_only_update_keeps_status_timestamp() {
        let registry = Registry::new(10);
        let before = registry.put_new(workload("a")).unwrap();

        registry
            .update_with::<_, RegistryError, _>("a", |w| {
                w.metrics.rps = 42.0;
                Ok(())
            })
            .unwrap();

        let after = registry.get("a").unwrap();
        assert_eq!(after.metrics.rps, 42.0);
        assert_eq!(after.status.last_updated, before.status.last_updated);
    }

    #[test]
    fn failed_closure_preserves_record() {
        let registry = Registry::new(10);
        let before = registry.put_new(workload("a")).unwrap();

        let result: Result<(), RegistryError> = registry.update_with("a", |w| {
            w.name = "changed".into();
            Err(RegistryError::NotFound("synthetic".into()))
        });

        assert!(result.is_err());
        assert_eq!(registry.get("a").unwrap(), before);
    }

    #[test]
    fn illegal_transition_preserves_record() {
        let registry = Registry::new(10);
        let before = registry.put_new(workload("a")).unwrap();

        let result = registry.update_with::<_, RegistryError, _>("a", |w| {
            w.status.phase = Phase::Running;
            w.assigned_node = "node-1".into();
            Ok(())
        });

        assert!(matches!(
            result,
            Err(RegistryError::IllegalTransition {
                from: Phase::Pending,
                to: Phase::Running,
                ..
            })
        ));
        assert_eq!(registry.get("a").unwrap(), before);
    }

    #[test]
    fn invariant_breaking_update_is_rejected() {
        let registry = Registry::new(10);
        let before = registry.put_new(workload("a")).unwrap();

        // Scheduled without a node.
        let result = registry.update_with::<_, RegistryError, _>("a", |w| {
            w.status.phase = Phase::Scheduled;
            Ok(())
        });
        assert!(matches!(result, Err(RegistryError::Invariant { .. })));

        // Id rewrite.
        let result = registry.update_with::<_, RegistryError, _>("a", |w| {
            w.id = "b".into();
            Ok(())
        });
        assert!(matches!(result, Err(RegistryError::Invariant { .. })));

        assert_eq!(registry.get("a").unwrap(), before);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let registry = Registry::new(10);
        let result = registry.update_with::<(), RegistryError, _>("ghost", |_| Ok(()));
        assert_eq!(result.unwrap_err(), RegistryError::NotFound("ghost".into()));
    }

    #[test]
    fn list_is_a_snapshot() {
        let registry = Registry::new(10);
        registry.put_new(workload("a")).unwrap();
        registry.put_new(workload("b")).unwrap();

        let snapshot = registry.list();
        registry.delete("a").unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn summary_counts_every_phase() {
        let registry = Registry::new(10);
        registry.put_new(workload("a")).unwrap();
        registry.put_new(workload("b")).unwrap();
        registry
            .update_with::<_, RegistryError, _>("b", |w| {
                w.status.phase = Phase::Failed;
                Ok(())
            })
            .unwrap();

        let summary = registry.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_phase[&Phase::Pending], 1);
        assert_eq!(summary.by_phase[&Phase::Failed], 1);
        assert_eq!(summary.by_phase[&Phase::Running], 0);
        assert_eq!(summary.by_phase.len(), Phase::ALL.len());
    }

    #[test]
    fn concurrent_creates_with_same_id_admit_exactly_one() {
        let registry = Registry::new(100);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.put_new(workload("z"))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::AlreadyExists(_))))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
        assert_eq!(registry.len(), 1);
    }
}
