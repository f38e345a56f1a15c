//! Batch errors and failure-chain helpers

use crate::outcome::BatchResult;
use courier_core::SharedError;
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Error from [`crate::run_batch`]. Both variants carry the computed
/// [`BatchResult`] so partial outcomes stay inspectable.
#[derive(Debug)]
pub enum BatchError<T> {
    /// At least one task failed and the caller asked to fail the batch.
    Failed { result: BatchResult<T> },
    /// The scope deadline expired; unfinished tasks are `Unavailable`.
    TimedOut {
        result: BatchResult<T>,
        timeout: Duration,
    },
}

impl<T> BatchError<T> {
    pub fn result(&self) -> &BatchResult<T> {
        match self {
            BatchError::Failed { result } | BatchError::TimedOut { result, .. } => result,
        }
    }

    pub fn into_result(self) -> BatchResult<T> {
        match self {
            BatchError::Failed { result } | BatchError::TimedOut { result, .. } => result,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BatchError::TimedOut { .. })
    }
}

impl<T> fmt::Display for BatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Failed { result } => {
                write!(
                    f,
                    "{} of {} batch tasks failed",
                    result.failures().len(),
                    result.len()
                )?;
                if let Some(first) = result.first_failure() {
                    write!(f, ", first failure: {}", unwrap_root_message(&**first))?;
                }
                Ok(())
            }
            BatchError::TimedOut { result, timeout } => write!(
                f,
                "Batch timed out after {:?} with {} of {} tasks unfinished",
                timeout,
                result.unavailable_count(),
                result.len()
            ),
        }
    }
}

impl<T: fmt::Debug> Error for BatchError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BatchError::Failed { result } => result
                .first_failure()
                .map(|e| &**e as &(dyn Error + 'static)),
            BatchError::TimedOut { .. } => None,
        }
    }
}

/// A panic captured from a forked task.
#[derive(Debug, Clone)]
pub struct PanicError {
    pub message: String,
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.message)
    }
}

impl Error for PanicError {}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Message of the deepest cause in `error`'s source chain.
///
/// The walk stops at the first cause already visited, so self-referencing
/// or cyclic chains terminate. When the deepest cause renders an empty
/// message, its type name is returned instead.
pub fn unwrap_root_message(error: &(dyn Error + 'static)) -> String {
    let mut current = error;
    let mut seen: Vec<*const ()> = vec![address(current)];
    while let Some(cause) = current.source() {
        let addr = address(cause);
        if seen.contains(&addr) {
            break;
        }
        seen.push(addr);
        current = cause;
    }

    let message = current.to_string();
    if message.trim().is_empty() {
        type_name_of(current)
    } else {
        message
    }
}

/// Same as [`unwrap_root_message`] for a shared task error.
pub fn root_message(error: &SharedError) -> String {
    unwrap_root_message(&**error)
}

fn address(error: &(dyn Error + 'static)) -> *const () {
    error as *const dyn Error as *const ()
}

// Error trait objects have no runtime type name; the leading identifier of
// the derived Debug output is the type name for structs and enums.
fn type_name_of(error: &(dyn Error + 'static)) -> String {
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}
