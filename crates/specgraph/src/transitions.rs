//! Status state machines for tasks and workflow artifacts.
//!
//! ```text
//! task:      pending -> in_progress -> completed
//!            pending <-> blocked, in_progress -> blocked
//! artifact:  draft <-> ready
//! ```

use crate::domain::{ArtifactStatus, ObjectId, TaskStatus};
use crate::error::{Error, Result};

/// Statuses a task may move to from `from`.
pub fn task_targets(from: TaskStatus) -> &'static [TaskStatus] {
    match from {
        TaskStatus::Pending => &[TaskStatus::InProgress, TaskStatus::Blocked],
        TaskStatus::InProgress => &[TaskStatus::Completed, TaskStatus::Blocked],
        TaskStatus::Blocked => &[TaskStatus::Pending],
        TaskStatus::Completed => &[],
    }
}

/// Check a task status change.
///
/// # Errors
///
/// - [`Error::AlreadyInState`] when `from == to`
/// - [`Error::InvalidTransition`] when the change is not allowed
pub fn validate_task_transition(id: &ObjectId, from: TaskStatus, to: TaskStatus) -> Result<()> {
    if from == to {
        return Err(Error::AlreadyInState {
            id: id.clone(),
            status: from.to_string(),
        });
    }
    if !task_targets(from).contains(&to) {
        return Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

/// Check a workflow artifact status change. Draft and ready toggle freely.
///
/// # Errors
///
/// Returns [`Error::AlreadyInState`] when `from == to`.
pub fn validate_artifact_transition(
    id: &ObjectId,
    from: ArtifactStatus,
    to: ArtifactStatus,
) -> Result<()> {
    if from == to {
        return Err(Error::AlreadyInState {
            id: id.clone(),
            status: from.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Pending, TaskStatus::InProgress)]
    #[case(TaskStatus::Pending, TaskStatus::Blocked)]
    #[case(TaskStatus::InProgress, TaskStatus::Completed)]
    #[case(TaskStatus::InProgress, TaskStatus::Blocked)]
    #[case(TaskStatus::Blocked, TaskStatus::Pending)]
    fn test_allowed_task_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        assert!(validate_task_transition(&ObjectId::new("t"), from, to).is_ok());
    }

    #[rstest]
    #[case(TaskStatus::Pending, TaskStatus::Completed)]
    #[case(TaskStatus::Blocked, TaskStatus::InProgress)]
    #[case(TaskStatus::Completed, TaskStatus::Pending)]
    #[case(TaskStatus::Completed, TaskStatus::InProgress)]
    #[case(TaskStatus::InProgress, TaskStatus::Pending)]
    fn test_rejected_task_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        let err = validate_task_transition(&ObjectId::new("t"), from, to).unwrap_err();
        match err {
            Error::InvalidTransition { from: f, to: t } => {
                assert_eq!(f, from.as_str());
                assert_eq!(t, to.as_str());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_task_status_is_already_in_state() {
        let err = validate_task_transition(
            &ObjectId::new("t-1"),
            TaskStatus::Completed,
            TaskStatus::Completed,
        )
        .unwrap_err();

        assert!(matches!(err, Error::AlreadyInState { ref status, .. } if status == "completed"));
        assert_eq!(err.to_string(), "t-1 is already completed");
    }

    #[test]
    fn test_artifact_transitions() {
        let id = ObjectId::new("s");
        assert!(
            validate_artifact_transition(&id, ArtifactStatus::Draft, ArtifactStatus::Ready).is_ok()
        );
        assert!(
            validate_artifact_transition(&id, ArtifactStatus::Ready, ArtifactStatus::Draft).is_ok()
        );
        assert!(matches!(
            validate_artifact_transition(&id, ArtifactStatus::Ready, ArtifactStatus::Ready),
            Err(Error::AlreadyInState { .. })
        ));
    }
}
