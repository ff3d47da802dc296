//! Write-through local cache over the page's persisted key/value store.
//!
//! Every key, once read or written, is memoized as its canonical JSON value.
//! Later reads are served from memory; writes that would store the memoized
//! value again are skipped.
//!
//! # Example
//!
//! ```ignore
//! let cache = LocalCache::new(transport);
//!
//! cache.set("icu/Filter", &"urgent").await?;
//! let filter: String = cache.get("icu/Filter", String::new()).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::type_name;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, from_str, from_value, to_value};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::transport::Transport;

// ============================================================================
// LocalCache
// ============================================================================

/// Memoizing cache in front of the persisted store.
#[derive(Debug)]
pub struct LocalCache {
    transport: Transport,
    memo: Mutex<FxHashMap<String, Value>>,
}

impl LocalCache {
    /// Creates an empty cache over a transport.
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            memo: Mutex::new(FxHashMap::default()),
        }
    }

    /// Reads `key`, falling back to `default`.
    ///
    /// The first read goes to the backing store. A value that is absent,
    /// empty or not shaped like `T` yields `default`; shape mismatches are
    /// logged, never returned.
    ///
    /// # Errors
    ///
    /// Transport failures only.
    pub async fn get<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let memoized = self.memo.lock().get(key).cloned();
        if let Some(value) = memoized {
            trace!(key, "Cache hit");
            return Ok(from_value(value.clone()).unwrap_or_else(|_| {
                log_mismatch(&Error::deserialization(value.to_string(), type_name::<T>()));
                default
            }));
        }

        let stored = self.transport.storage_get(key).await?;
        let value = match stored.as_deref() {
            None | Some("") => default,
            Some(json) => from_str(json).unwrap_or_else(|_| {
                log_mismatch(&Error::deserialization(json, type_name::<T>()));
                default
            }),
        };

        // Memoize what the caller sees, including a substituted default.
        let canonical = to_value(&value)?;
        self.memo.lock().insert(key.to_string(), canonical);

        Ok(value)
    }

    /// Writes `key`, returning whether the backing store was touched.
    ///
    /// A value serializing to JSON `null` removes the key. A value whose
    /// canonical JSON equals the memoized one is not written again.
    ///
    /// # Errors
    ///
    /// Serialization and transport failures.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        let canonical = to_value(value)?;
        if canonical.is_null() {
            self.remove(key).await?;
            return Ok(true);
        }

        if self.memo.lock().get(key) == Some(&canonical) {
            trace!(key, "Unchanged, write skipped");
            return Ok(false);
        }

        self.transport
            .storage_set(key, &canonical.to_string())
            .await?;
        self.memo.lock().insert(key.to_string(), canonical);

        debug!(key, "Cache written");
        Ok(true)
    }

    /// Removes `key` from memory and from the backing store.
    ///
    /// # Errors
    ///
    /// Transport failures.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.memo.lock().remove(key);
        self.transport.storage_remove(key).await?;
        debug!(key, "Cache entry removed");
        Ok(())
    }

    /// Forgets every memoized value. The backing store is untouched.
    pub fn reset(&self) {
        self.memo.lock().clear();
    }

    /// Returns `true` if `key` is memoized.
    #[must_use]
    pub fn is_cached(&self, key: &str) -> bool {
        self.memo.lock().contains_key(key)
    }
}

fn log_mismatch(error: &Error) {
    warn!(error = %error, "Ignoring cached value");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use proptest::prelude::*;
    use serde::Deserialize;

    use crate::testing::FakePage;

    fn cache_over(page: &Arc<FakePage>) -> LocalCache {
        LocalCache::new(Transport::embedded(Arc::clone(page) as _))
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Window {
        width: u32,
        height: u32,
        title: String,
    }

    #[tokio::test]
    async fn test_round_trip_survives_restart() {
        let page = FakePage::shared();
        let cache = cache_over(&page);
        let window = Window {
            width: 1024,
            height: 768,
            title: "main".into(),
        };

        assert!(cache.set("icu/Window", &window).await.expect("set"));
        cache.reset();

        let loaded = cache
            .get(
                "icu/Window",
                Window {
                    width: 0,
                    height: 0,
                    title: String::new(),
                },
            )
            .await
            .expect("get");
        assert_eq!(loaded, window);
    }

    #[tokio::test]
    async fn test_unchanged_value_is_written_once() {
        let page = FakePage::shared();
        let cache = cache_over(&page);

        assert!(cache.set("icu/Filter", "urgent").await.expect("set"));
        assert!(!cache.set("icu/Filter", "urgent").await.expect("set"));
        assert_eq!(page.storage_writes(), 1);

        assert!(cache.set("icu/Filter", "other").await.expect("set"));
        assert_eq!(page.storage_writes(), 2);
    }

    #[tokio::test]
    async fn test_reallocated_structured_value_is_deduplicated() {
        let page = FakePage::shared();
        let cache = cache_over(&page);

        cache.set("icu/Tags", &vec!["a".to_string()]).await.expect("set");
        let changed = cache
            .set("icu/Tags", &vec!["a".to_string()])
            .await
            .expect("set");

        assert!(!changed);
        assert_eq!(page.storage_writes(), 1);
    }

    #[tokio::test]
    async fn test_null_removes_key() {
        let page = FakePage::shared();
        let cache = cache_over(&page);

        cache.set("icu/Filter", "urgent").await.expect("set");
        cache.set("icu/Filter", &None::<String>).await.expect("remove");

        assert_eq!(page.stored("icu/Filter"), None);
        assert!(!cache.is_cached("icu/Filter"));
        assert_eq!(
            cache.get("icu/Filter", "fallback".to_string()).await.expect("get"),
            "fallback"
        );
    }

    #[tokio::test]
    async fn test_empty_string_is_stored() {
        let page = FakePage::shared();
        let cache = cache_over(&page);

        cache.set("icu/Filter", "").await.expect("set");
        assert_eq!(page.stored("icu/Filter").as_deref(), Some("\"\""));
    }

    #[tokio::test]
    async fn test_corrupt_value_falls_back_to_default() {
        let page = FakePage::shared();
        page.seed_storage("icu/Interactive", "\"not a bool\"");
        let cache = cache_over(&page);

        let interactive = cache.get("icu/Interactive", true).await.expect("get");
        assert!(interactive);
    }

    #[tokio::test]
    async fn test_empty_backing_value_is_default() {
        let page = FakePage::shared();
        page.seed_storage("icu/Filter", "");
        let cache = cache_over(&page);

        assert_eq!(cache.get("icu/Filter", "x".to_string()).await.expect("get"), "x");
    }

    #[tokio::test]
    async fn test_memoized_read_skips_backing_store() {
        let page = FakePage::shared();
        page.seed_storage("icu/Filter", "\"urgent\"");
        let cache = cache_over(&page);

        assert_eq!(cache.get("icu/Filter", String::new()).await.expect("get"), "urgent");

        // Changed behind the cache's back; memo still wins.
        page.seed_storage("icu/Filter", "\"changed\"");
        assert_eq!(cache.get("icu/Filter", String::new()).await.expect("get"), "urgent");

        cache.reset();
        assert_eq!(cache.get("icu/Filter", String::new()).await.expect("get"), "changed");
    }

    #[tokio::test]
    async fn test_set_after_default_read_writes() {
        let page = FakePage::shared();
        let cache = cache_over(&page);

        // A default read memoizes `false` without writing it.
        assert!(!cache.get("icu/StopOnFirstFailure", false).await.expect("get"));
        assert_eq!(page.storage_writes(), 0);

        assert!(!cache.set("icu/StopOnFirstFailure", &false).await.expect("set"));
        assert!(cache.set("icu/StopOnFirstFailure", &true).await.expect("set"));
        assert_eq!(page.storage_writes(), 1);
    }

    proptest! {
        #[test]
        fn prop_round_trip(value in "\\PC*", number in any::<i64>()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime");

            rt.block_on(async {
                let page = FakePage::shared();
                let cache = cache_over(&page);

                cache.set("k/text", &value).await.expect("set");
                cache.set("k/number", &number).await.expect("set");
                cache.reset();

                let text: String = cache.get("k/text", String::new()).await.expect("get");
                let n: i64 = cache.get("k/number", 0).await.expect("get");
                assert_eq!(text, value);
                assert_eq!(n, number);
            });
        }
    }
}
