//! Per-task outcomes and aggregated batch results

use courier_core::SharedError;
use std::fmt;

/// Terminal state of one forked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeState {
    Success,
    Failed,
    /// Not finished when the scope was cancelled or timed out.
    Unavailable,
}

impl fmt::Display for OutcomeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeState::Success => "SUCCESS",
            OutcomeState::Failed => "FAILED",
            OutcomeState::Unavailable => "UNAVAILABLE",
        })
    }
}

/// Outcome of the task at `index` (its submission position).
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub index: usize,
    pub state: OutcomeState,
    pub result: Option<T>,
    pub error: Option<SharedError>,
}

impl<T> Outcome<T> {
    pub fn success(index: usize, value: T) -> Self {
        Self {
            index,
            state: OutcomeState::Success,
            result: Some(value),
            error: None,
        }
    }

    pub fn failed(index: usize, error: SharedError) -> Self {
        Self {
            index,
            state: OutcomeState::Failed,
            result: None,
            error: Some(error),
        }
    }

    pub fn unavailable(index: usize) -> Self {
        Self {
            index,
            state: OutcomeState::Unavailable,
            result: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == OutcomeState::Success
    }

    pub fn is_failed(&self) -> bool {
        self.state == OutcomeState::Failed
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == OutcomeState::Unavailable
    }
}

/// Outcomes of a batch run, one per submitted task in submission order.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    pub outcomes: Vec<Outcome<T>>,
    /// The scope was cancelled before every task finished.
    pub cancelled: bool,
    pub timed_out: bool,
}

impl<T> BatchResult<T> {
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            cancelled: false,
            timed_out: false,
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Values of the successful tasks, in submission order.
    pub fn successes(&self) -> Vec<&T> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .filter_map(|o| o.result.as_ref())
            .collect()
    }

    /// Errors of the failed tasks, in submission order.
    pub fn failures(&self) -> Vec<&SharedError> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .filter_map(|o| o.error.as_ref())
            .collect()
    }

    pub fn unavailable_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_unavailable()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failed)
    }

    pub fn first_failure(&self) -> Option<&SharedError> {
        self.failures().into_iter().next()
    }

    pub fn into_successes(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter(|o| o.state == OutcomeState::Success)
            .filter_map(|o| o.result)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    fn sample() -> BatchResult<u32> {
        BatchResult {
            outcomes: vec![
                Outcome::success(0, 10),
                Outcome::failed(1, Arc::new(Boom)),
                Outcome::unavailable(2),
                Outcome::success(3, 30),
            ],
            cancelled: true,
            timed_out: false,
        }
    }

    #[test]
    fn test_derived_views() {
        let batch = sample();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.successes(), vec![&10, &30]);
        assert_eq!(batch.failures().len(), 1);
        assert_eq!(batch.unavailable_count(), 1);
        assert!(batch.has_failures());
        assert_eq!(
            batch.first_failure().map(|e| e.to_string()),
            Some("boom".to_string())
        );
        assert_eq!(batch.into_successes(), vec![10, 30]);
    }

    #[test]
    fn test_empty_batch() {
        let batch: BatchResult<u32> = BatchResult::empty();
        assert!(batch.is_empty());
        assert!(!batch.has_failures());
        assert!(batch.first_failure().is_none());
        assert!(!batch.cancelled && !batch.timed_out);
    }

    #[test]
    fn test_outcome_state_display() {
        assert_eq!(OutcomeState::Unavailable.to_string(), "UNAVAILABLE");
        assert!(Outcome::<u8>::unavailable(0).is_unavailable());
    }
}
