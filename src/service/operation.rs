use serde::Serialize;
use utoipa::ToSchema;

/// Outcome of one step of a multi-step write, reported back to the caller
/// instead of being tracked in any shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    /// Nothing to do for this step.
    Idle,
    Succeeded,
    Failed { reason: String },
}

impl OperationStatus {
    pub fn failed(reason: impl ToString) -> Self {
        OperationStatus::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, OperationStatus::Failed { .. })
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for OperationStatus {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => OperationStatus::Succeeded,
            Err(e) => OperationStatus::failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_tagged_state() {
        assert_eq!(
            serde_json::to_value(OperationStatus::Succeeded).unwrap(),
            serde_json::json!({ "state": "succeeded" })
        );
        assert_eq!(
            serde_json::to_value(OperationStatus::failed("timeout")).unwrap(),
            serde_json::json!({ "state": "failed", "reason": "timeout" })
        );
    }

    #[test]
    fn converts_from_results() {
        let ok: Result<(), String> = Ok(());
        let err: Result<(), String> = Err("boom".into());
        assert_eq!(OperationStatus::from(ok), OperationStatus::Succeeded);
        assert!(OperationStatus::from(err).is_failed());
        assert!(!OperationStatus::Idle.is_failed());
    }
}
