//! Scope-local bindings
//!
//! A [`ScopeContext`] is an immutable type map attached to the running tokio
//! task through a task-local. Binding a value produces a new context that is
//! installed only for the duration of one future; the previous context comes
//! back when that future completes, fails or is dropped. Children forked by
//! the runner capture the context current at fork time, so bindings flow down
//! into children but never sideways into unrelated tasks.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CONTEXT: ScopeContext;
}

type Bindings = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Snapshot of the values bound to the current scope, keyed by type.
#[derive(Clone, Default)]
pub struct ScopeContext {
    bindings: Arc<Bindings>,
}

impl ScopeContext {
    /// The context of the running task, or an empty one outside any scope.
    pub fn current() -> Self {
        CONTEXT.try_with(Clone::clone).unwrap_or_default()
    }

    /// A copy of this context with `value` bound under its type, replacing
    /// any earlier binding of the same type.
    pub fn with<T: Any + Send + Sync>(&self, value: Arc<T>) -> Self {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(TypeId::of::<T>(), value);
        Self {
            bindings: Arc::new(bindings),
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.bindings
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run `fut` with this context installed.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CONTEXT.scope(self, fut).await
    }

    /// Run the synchronous closure `f` with this context installed.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CONTEXT.sync_scope(self, f)
    }
}

impl fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeContext")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

/// The value of type `T` bound to the current scope, if any.
pub fn current<T: Any + Send + Sync>() -> Option<Arc<T>> {
    CONTEXT.try_with(|context| context.get::<T>()).ok().flatten()
}

/// Run `fut` with `value` bound on top of the current context.
pub async fn bind<T, F>(value: Arc<T>, fut: F) -> F::Output
where
    T: Any + Send + Sync,
    F: Future,
{
    ScopeContext::current().with(value).scope(fut).await
}
