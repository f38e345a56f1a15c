//! Type-erased cache payloads and the expiring value wrapper.

use courier_core::{CacheError, EpochMillis};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Object-safe equality and hashing for anything stored in the cache.
///
/// Implemented for every `Eq + Hash + Debug` type, so raw keys and payloads
/// never need a manual impl. Two objects of different concrete types are
/// never equal, and the type participates in the hash.
pub trait CacheObject: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_object(&self, other: &dyn CacheObject) -> bool;
    fn hash_object(&self, state: &mut dyn Hasher);
    fn type_name(&self) -> &'static str;
}

impl<T> CacheObject for T
where
    T: Any + Send + Sync + fmt::Debug + Eq + Hash,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_object(&self, other: &dyn CacheObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn hash_object(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A cached payload and the instant after which it is stale.
///
/// Equality and hashing look at the payload only; two wrappers holding equal
/// payloads are equal whatever their expiry.
#[derive(Clone)]
pub struct CacheValue {
    value: Arc<dyn CacheObject>,
    expires_at: EpochMillis,
}

impl CacheValue {
    pub fn new<V: CacheObject>(value: V, expires_at: EpochMillis) -> Self {
        Self {
            value: Arc::new(value),
            expires_at,
        }
    }

    /// Wrap `value` so it expires `ttl` after `now`.
    pub fn with_ttl<V: CacheObject>(value: V, ttl: Duration, now: EpochMillis) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self::new(value, now.saturating_add(ttl_ms))
    }

    pub fn expires_at(&self) -> EpochMillis {
        self.expires_at
    }

    /// Strictly after the expiry instant; `now == expires_at` is still live.
    pub fn is_expired(&self, now: EpochMillis) -> bool {
        now > self.expires_at
    }

    pub fn value(&self) -> &dyn CacheObject {
        &*self.value
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.as_any().downcast_ref::<V>()
    }

    pub fn try_downcast<V: Any>(&self) -> Result<&V, CacheError> {
        self.downcast_ref::<V>().ok_or(CacheError::TypeMismatch {
            expected: std::any::type_name::<V>(),
            found: self.type_name(),
        })
    }

    /// True when the payload equals `payload`.
    pub fn holds(&self, payload: &dyn CacheObject) -> bool {
        self.value.eq_object(payload)
    }
}

impl PartialEq for CacheValue {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq_object(&*other.value)
    }
}

impl Eq for CacheValue {}

impl Hash for CacheValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash_object(state);
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheValue")
            .field("value", &self.value)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_is_expired_boundary() {
        let value = CacheValue::new("TRK-1".to_string(), 1_000);
        assert!(!value.is_expired(999));
        assert!(!value.is_expired(1_000));
        assert!(value.is_expired(1_001));
    }

    #[test]
    fn test_with_ttl() {
        let value = CacheValue::with_ttl(7u32, Duration::from_secs(5), 10_000);
        assert_eq!(value.expires_at(), 15_000);
        let forever = CacheValue::with_ttl(7u32, Duration::MAX, 10_000);
        assert_eq!(forever.expires_at(), i64::MAX);
    }

    #[test]
    fn test_equality_ignores_expiry() {
        let a = CacheValue::new("label".to_string(), 1);
        let b = CacheValue::new("label".to_string(), 9_999);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_different_types_are_not_equal() {
        let a = CacheValue::new(1u32, 0);
        let b = CacheValue::new(1u64, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_downcast() {
        let value = CacheValue::new("qr".to_string(), 0);
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("qr"));
        assert!(value.downcast_ref::<u32>().is_none());

        match value.try_downcast::<u32>().unwrap_err() {
            CacheError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "u32");
                assert!(found.ends_with("String"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_holds() {
        let value = CacheValue::new(42i32, 0);
        assert!(value.holds(&42i32));
        assert!(!value.holds(&43i32));
        assert!(!value.holds(&"42"));
    }
}
