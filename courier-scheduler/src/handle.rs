//! Handles to scheduled work.

use std::fmt;
use std::hash::{Hash, Hasher};
use tokio_util::sync::CancellationToken;

/// Identifier of one scheduled task, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Returned by every scheduling call; pass it back to
/// [`Scheduler::cancel`](crate::Scheduler::cancel).
#[derive(Debug, Clone)]
pub struct ScheduledHandle {
    id: TaskId,
    token: CancellationToken,
    repeating: bool,
}

impl ScheduledHandle {
    pub(crate) fn new(id: TaskId, token: CancellationToken, repeating: bool) -> Self {
        Self {
            id,
            token,
            repeating,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once cancelled directly or by a scheduler shutdown.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

impl PartialEq for ScheduledHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScheduledHandle {}

impl Hash for ScheduledHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_identity_is_id() {
        let token = CancellationToken::new();
        let a = ScheduledHandle::new(TaskId(1), token.clone(), false);
        let b = ScheduledHandle::new(TaskId(1), CancellationToken::new(), true);
        assert_eq!(a, b);
        assert_eq!(a.id().to_string(), "task-1");
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let handle = ScheduledHandle::new(TaskId(7), CancellationToken::new(), true);
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.is_repeating());
    }
}
