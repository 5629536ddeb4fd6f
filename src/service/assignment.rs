//! Reconciles an employee's active (department, position) assignments with a
//! newly selected set.

use std::collections::BTreeSet;
use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::model::assignment::AssignmentKey;
use crate::service::operation::OperationStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("malformed assignment key {0:?}: expected department_id:position_id")]
    MalformedKey(String),
    #[error("unknown department {0}")]
    UnknownDepartment(String),
    #[error("unknown position {0}")]
    UnknownPosition(String),
}

/// One activate/deactivate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentChange {
    pub key: AssignmentKey,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_activate: BTreeSet<AssignmentKey>,
    pub to_deactivate: BTreeSet<AssignmentKey>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_activate.is_empty() && self.to_deactivate.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_activate.len() + self.to_deactivate.len()
    }

    /// Activations first, then deactivations, each in key order.
    pub fn changes(&self) -> impl Iterator<Item = AssignmentChange> + '_ {
        let activate = self.to_activate.iter().map(|key| AssignmentChange {
            key: key.clone(),
            active: true,
        });
        let deactivate = self.to_deactivate.iter().map(|key| AssignmentChange {
            key: key.clone(),
            active: false,
        });
        activate.chain(deactivate)
    }

    /// The set obtained by applying this reconciliation to `previous`.
    #[cfg(test)]
    pub fn apply_to(&self, previous: &BTreeSet<AssignmentKey>) -> BTreeSet<AssignmentKey> {
        previous
            .difference(&self.to_deactivate)
            .chain(self.to_activate.iter())
            .cloned()
            .collect()
    }
}

pub fn reconcile(
    previous_active: &BTreeSet<AssignmentKey>,
    new_selected: &BTreeSet<AssignmentKey>,
) -> Reconciliation {
    Reconciliation {
        to_activate: new_selected.difference(previous_active).cloned().collect(),
        to_deactivate: previous_active.difference(new_selected).cloned().collect(),
    }
}

/// Reads and toggles an employee's assignments.
pub trait AssignmentStore {
    type Error: std::fmt::Display;

    /// Keys currently active for the employee.
    fn active_keys(
        &self,
        employee_id: &str,
    ) -> impl Future<Output = Result<BTreeSet<AssignmentKey>, Self::Error>>;

    fn set_active(
        &self,
        employee_id: &str,
        change: &AssignmentChange,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChangeOutcome {
    pub department_id: String,
    pub position_id: String,
    pub active: bool,
    pub status: OperationStatus,
}

/// Issues each change in turn, awaiting one before sending the next. A failed
/// change is reported and the remaining ones are still attempted; completed
/// changes are not rolled back.
pub async fn apply<S: AssignmentStore>(
    store: &S,
    employee_id: &str,
    reconciliation: &Reconciliation,
) -> Vec<ChangeOutcome> {
    if reconciliation.is_empty() {
        debug!(employee_id, "Assignments unchanged");
        return Vec::new();
    }
    let mut outcomes = Vec::with_capacity(reconciliation.len());

    for change in reconciliation.changes() {
        let result = store.set_active(employee_id, &change).await;
        if let Err(e) = &result {
            warn!(
                error = %e,
                employee_id,
                key = %change.key,
                active = change.active,
                "Assignment change failed"
            );
        }
        outcomes.push(ChangeOutcome {
            department_id: change.key.department_id,
            position_id: change.key.position_id,
            active: change.active,
            status: result.into(),
        });
    }

    info!(
        employee_id,
        total = outcomes.len(),
        failed = outcomes.iter().filter(|o| o.status.is_failed()).count(),
        "Assignments reconciled"
    );

    outcomes
}

/// Result of bringing an employee's assignments in line with a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSync {
    /// Reading the currently active keys.
    pub lookup: OperationStatus,
    pub changes: Vec<ChangeOutcome>,
}

/// Loads the active keys, then reconciles and applies. When the lookup fails
/// no change is attempted and the failure is reported in `lookup`.
pub async fn sync<S: AssignmentStore>(
    store: &S,
    employee_id: &str,
    selected: &BTreeSet<AssignmentKey>,
) -> AssignmentSync {
    let previous = match store.active_keys(employee_id).await {
        Ok(previous) => previous,
        Err(e) => {
            warn!(error = %e, employee_id, "Failed to load active assignments");
            return AssignmentSync {
                lookup: OperationStatus::failed(e),
                changes: Vec::new(),
            };
        }
    };

    let plan = reconcile(&previous, selected);
    debug!(
        employee_id,
        activate = plan.to_activate.len(),
        deactivate = plan.to_deactivate.len(),
        "Reconciled assignments"
    );

    AssignmentSync {
        lookup: OperationStatus::Succeeded,
        changes: apply(store, employee_id, &plan).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn key(d: &str, p: &str) -> AssignmentKey {
        AssignmentKey::new(d, p)
    }

    fn set(keys: &[(&str, &str)]) -> BTreeSet<AssignmentKey> {
        keys.iter().map(|(d, p)| key(d, p)).collect()
    }

    /// Records every call and fails the ones whose department is listed.
    #[derive(Default)]
    struct RecordingStore {
        active: BTreeSet<AssignmentKey>,
        fail_lookup: bool,
        calls: Mutex<Vec<(String, AssignmentKey, bool)>>,
        fail_departments: Vec<String>,
    }

    impl AssignmentStore for RecordingStore {
        type Error = String;

        async fn active_keys(&self, _employee_id: &str) -> Result<BTreeSet<AssignmentKey>, String> {
            if self.fail_lookup {
                Err("connection reset".to_string())
            } else {
                Ok(self.active.clone())
            }
        }

        async fn set_active(&self, employee_id: &str, change: &AssignmentChange) -> Result<(), String> {
            self.calls
                .lock()
                .unwrap()
                .push((employee_id.to_string(), change.key.clone(), change.active));
            if self.fail_departments.contains(&change.key.department_id) {
                Err(format!("write rejected for {}", change.key))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn computes_add_and_remove_sets() {
        let prev = set(&[("D1", "P1"), ("D2", "P2")]);
        let new = set(&[("D2", "P2"), ("D3", "P1")]);
        let r = reconcile(&prev, &new);
        assert_eq!(r.to_activate, set(&[("D3", "P1")]));
        assert_eq!(r.to_deactivate, set(&[("D1", "P1")]));
        assert!(r.to_activate.is_disjoint(&r.to_deactivate));
        assert_eq!(r.apply_to(&prev), new);
    }

    #[test]
    fn reconciling_a_set_with_itself_is_empty() {
        let prev = set(&[("D1", "P1"), ("D2", "P2")]);
        let r = reconcile(&prev, &prev);
        assert!(r.is_empty());
        assert_eq!(r.changes().count(), 0);
    }

    #[test]
    fn same_department_different_position_are_distinct_keys() {
        let prev = set(&[("D1", "P1")]);
        let new = set(&[("D1", "P2")]);
        let r = reconcile(&prev, &new);
        assert_eq!(r.to_activate, set(&[("D1", "P2")]));
        assert_eq!(r.to_deactivate, set(&[("D1", "P1")]));
    }

    #[test]
    fn from_empty_and_to_empty() {
        let some = set(&[("D1", "P1"), ("D2", "P1")]);
        let none = BTreeSet::new();
        assert_eq!(reconcile(&none, &some).to_activate, some);
        assert_eq!(reconcile(&some, &none).to_deactivate, some);
        assert_eq!(reconcile(&some, &none).apply_to(&some), none);
    }

    #[test]
    fn changes_emit_activations_before_deactivations() {
        let prev = set(&[("D1", "P1"), ("D0", "P9")]);
        let new = set(&[("D3", "P1"), ("D2", "P2")]);
        let order: Vec<(String, bool)> = reconcile(&prev, &new)
            .changes()
            .map(|c| (c.key.to_string(), c.active))
            .collect();
        assert_eq!(
            order,
            vec![
                ("D2:P2".to_string(), true),
                ("D3:P1".to_string(), true),
                ("D0:P9".to_string(), false),
                ("D1:P1".to_string(), false),
            ]
        );
    }

    #[actix_web::test]
    async fn apply_reports_each_change_in_order() {
        let store = RecordingStore::default();
        let r = reconcile(&set(&[("D1", "P1")]), &set(&[("D2", "P2")]));

        let outcomes = apply(&store, "E1", &r).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == OperationStatus::Succeeded));
        let calls = store.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("E1".to_string(), key("D2", "P2"), true),
                ("E1".to_string(), key("D1", "P1"), false),
            ]
        );
    }

    #[actix_web::test]
    async fn apply_keeps_going_after_a_failure() {
        let store = RecordingStore {
            fail_departments: vec!["D2".to_string()],
            ..Default::default()
        };
        let r = reconcile(&set(&[("D1", "P1")]), &set(&[("D2", "P2"), ("D3", "P3")]));

        let outcomes = apply(&store, "E1", &r).await;

        assert_eq!(store.calls.lock().unwrap().len(), 3);
        assert_eq!(
            outcomes[0].status,
            OperationStatus::failed("write rejected for D2:P2")
        );
        assert_eq!(outcomes[1].status, OperationStatus::Succeeded);
        assert_eq!(outcomes[2].department_id, "D1");
        assert!(!outcomes[2].active);
        assert_eq!(outcomes[2].status, OperationStatus::Succeeded);
    }

    #[actix_web::test]
    async fn sync_reconciles_against_the_stored_keys() {
        let store = RecordingStore {
            active: set(&[("D1", "P1"), ("D2", "P2")]),
            ..Default::default()
        };

        let result = sync(&store, "E1", &set(&[("D2", "P2"), ("D3", "P1")])).await;

        assert_eq!(result.lookup, OperationStatus::Succeeded);
        let calls = store.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("E1".to_string(), key("D3", "P1"), true),
                ("E1".to_string(), key("D1", "P1"), false),
            ]
        );
    }

    #[actix_web::test]
    async fn failed_lookup_attempts_no_change() {
        let store = RecordingStore {
            fail_lookup: true,
            ..Default::default()
        };

        let result = sync(&store, "E1", &set(&[("D1", "P1")])).await;

        assert_eq!(result.lookup, OperationStatus::failed("connection reset"));
        assert!(result.changes.is_empty());
        assert!(store.calls.lock().unwrap().is_empty());
    }
}
