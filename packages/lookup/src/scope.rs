//! Per-request correlation and dedup.

use std::sync::{Mutex, MutexGuard, PoisonError};

use parcel_map_cache::RequestCache;
use serde::{Serialize, de::DeserializeOwned};

/// One logical user request.
///
/// Carries the correlation id echoed in every log line for the request,
/// and a scratch cache that deduplicates sub-resource fetches (the same
/// parcel geometry wanted by two phases, say) until the scope is dropped
/// at the end of the request.
pub struct RequestScope {
    id: String,
    cache: Mutex<RequestCache>,
}

impl RequestScope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cache: Mutex::new(RequestCache::new()),
        }
    }

    /// Correlation id for this request's log lines.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock().get_as(key)
    }

    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) {
        self.lock().set_as(key, value);
    }

    fn lock(&self) -> MutexGuard<'_, RequestCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_get_distinct_ids() {
        let a = RequestScope::new();
        let b = RequestScope::new();

        assert_ne!(a.id(), b.id());
        assert!(!a.id().is_empty());
    }

    #[test]
    fn values_round_trip_within_a_scope() {
        let scope = RequestScope::new();
        assert_eq!(scope.get_as::<Vec<u32>>("parcel:ain:5843004015"), None);

        scope.set_as("parcel:ain:5843004015", &vec![1_u32, 2, 3]);

        assert_eq!(
            scope.get_as::<Vec<u32>>("parcel:ain:5843004015"),
            Some(vec![1, 2, 3])
        );
        assert_eq!(scope.get_as::<Vec<u32>>("parcel:ain:other"), None);
    }
}
