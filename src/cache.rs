//! Cache manager: key derivation, get-or-render, invalidation.
//!
//! ## Cache Key Design
//!
//! ```text
//! {namespace}/{class}/{id}/{declaration fingerprint}/{version}/{exposure}
//! ```
//!
//! - The declaration fingerprint hashes the class schema together with the
//!   transform chain, so entries written under older declarations are never
//!   read back.
//! - Versions the class never names render exactly like `unspecified`, so they
//!   share its key. This keeps the key space per identity enumerable:
//!   `(named versions + unspecified) x 3 exposure levels`.
//! - Every key of one identity shares the `{namespace}/{class}/{id}/` prefix,
//!   which backends with prefix deletion use for invalidation.

use std::fmt;
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::config::EngineConfig;
use crate::error::{CacheError, RenderError};
use crate::metrics::{
    RenderMetrics, NoOpMetrics, CACHE_HIT, CACHE_MISS, CORRUPT_ENTRY, FRAGMENT_RENDERED,
    INVALIDATION, STORE_ERROR,
};
use crate::schema::ClassSchema;
use crate::store::{CacheStore, StoreError};
use crate::transform::TransformPipeline;
use crate::types::{ApiVersion, ExposureLevel, Fragment, ObjectKey};

/// A derived cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentKey(String);

impl FragmentKey {
    /// Get the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape the key separator so that components cannot collide.
fn key_component(raw: &str) -> String {
    raw.replace('%', "%25").replace('/', "%2F")
}

/// Wraps fragment rendering with get-or-compute-and-store semantics.
///
/// The manager imposes no locking of its own: two concurrent misses for the
/// same key may both render and both write the same value.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    namespace: String,
    pipeline_fingerprint: String,
    disabled: bool,
    metrics: Arc<dyn RenderMetrics>,
}

impl CacheManager {
    /// Create a cache manager over `store`.
    pub fn new(
        store: Arc<dyn CacheStore>,
        config: &EngineConfig,
        pipeline: &TransformPipeline,
    ) -> Self {
        Self {
            store,
            namespace: config.key_namespace.clone(),
            pipeline_fingerprint: pipeline.fingerprint(),
            disabled: config.disable_caching,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Report counters to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn RenderMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether reads and writes go to the store.
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub(crate) fn metrics(&self) -> &dyn RenderMetrics {
        self.metrics.as_ref()
    }

    /// Version component used in keys for a render of `schema` at `version`.
    pub fn key_version(schema: &ClassSchema, version: &ApiVersion) -> ApiVersion {
        if schema.mentions_version(version) {
            version.clone()
        } else {
            ApiVersion::unspecified()
        }
    }

    /// Prefix shared by every key of one identity.
    pub fn identity_prefix(&self, object: &ObjectKey) -> String {
        format!(
            "{}/{}/{}/",
            key_component(&self.namespace),
            key_component(&object.class),
            key_component(object.id.as_str())
        )
    }

    /// Derive the key for one `(class, id, version, exposure)` combination.
    pub fn fragment_key(
        &self,
        schema: &ClassSchema,
        object: &ObjectKey,
        version: &ApiVersion,
        exposure: ExposureLevel,
    ) -> FragmentKey {
        let declarations = canonical_hash_hex(&(schema.fingerprint(), &self.pipeline_fingerprint));
        FragmentKey(format!(
            "{}{}/{}/{}",
            self.identity_prefix(object),
            declarations,
            key_component(Self::key_version(schema, version).as_str()),
            exposure.as_str()
        ))
    }

    /// Every key that can hold a fragment of `object` under `schema`.
    pub fn fragment_keys(&self, schema: &ClassSchema, object: &ObjectKey) -> Vec<FragmentKey> {
        let mut versions: Vec<ApiVersion> = schema.known_versions().into_iter().collect();
        versions.push(ApiVersion::unspecified());

        versions
            .iter()
            .flat_map(|version| {
                ExposureLevel::ALL_LEVELS
                    .iter()
                    .map(move |level| self.fragment_key(schema, object, version, *level))
            })
            .collect()
    }

    /// Return the stored fragment, or render, store and return it.
    ///
    /// Store read failures and undecodable entries count as misses. Store
    /// write failures are logged and the fresh fragment is still returned.
    pub fn get_or_render<F>(
        &self,
        schema: &ClassSchema,
        object: &ObjectKey,
        version: &ApiVersion,
        exposure: ExposureLevel,
        render: F,
    ) -> Result<Fragment, RenderError>
    where
        F: FnOnce() -> Result<Fragment, RenderError>,
    {
        let class = [("class", object.class.as_str())];

        if self.disabled {
            let fragment = render()?;
            self.metrics.increment(FRAGMENT_RENDERED, &class);
            return Ok(fragment);
        }

        let key = self.fragment_key(schema, object, version, exposure);
        if let Some(fragment) = self.read(&key, object) {
            tracing::trace!(object = %object, key = %key, "fragment cache hit");
            self.metrics.increment(CACHE_HIT, &class);
            return Ok(fragment);
        }

        tracing::debug!(object = %object, key = %key, "fragment cache miss");
        self.metrics.increment(CACHE_MISS, &class);
        let fragment = render()?;
        self.metrics.increment(FRAGMENT_RENDERED, &class);
        self.write(&key, object, &fragment);
        Ok(fragment)
    }

    fn read(&self, key: &FragmentKey, object: &ObjectKey) -> Option<Fragment> {
        match self.store.get(key.as_str()) {
            Ok(Some(raw)) => match serde_json::from_str::<Fragment>(&raw) {
                Ok(fragment) => Some(fragment),
                Err(e) => {
                    tracing::warn!(
                        object = %object,
                        key = %key,
                        error = %e,
                        "undecodable fragment in store; recomputing"
                    );
                    self.metrics
                        .increment(CORRUPT_ENTRY, &[("class", object.class.as_str())]);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.store_failed("get", key, object, &e);
                None
            }
        }
    }

    fn write(&self, key: &FragmentKey, object: &ObjectKey, fragment: &Fragment) {
        let raw = match serde_json::to_string(fragment) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(object = %object, key = %key, error = %e, "fragment not serializable; not stored");
                return;
            }
        };
        if let Err(e) = self.store.set(key.as_str(), raw) {
            self.store_failed("set", key, object, &e);
        }
    }

    fn store_failed(&self, op: &str, key: &FragmentKey, object: &ObjectKey, error: &StoreError) {
        tracing::warn!(
            op = op,
            object = %object,
            key = %key,
            error = %error,
            "fragment store operation failed"
        );
        self.metrics.increment(
            STORE_ERROR,
            &[("class", object.class.as_str()), ("op", op)],
        );
    }

    /// Remove every cached fragment of `object`.
    ///
    /// Uses the backend's prefix deletion when available. Otherwise every
    /// derivable key is deleted, which needs the class schema; without one
    /// nothing can have been cached and `Ok(0)` is returned.
    ///
    /// Returns the number of entries removed (prefix deletion) or keys
    /// deleted (enumeration). Every key is attempted even after a failure.
    pub fn invalidate(
        &self,
        schema: Option<&ClassSchema>,
        object: &ObjectKey,
    ) -> Result<usize, CacheError> {
        self.metrics
            .increment(INVALIDATION, &[("class", object.class.as_str())]);
        let prefix = self.identity_prefix(object);

        let prefix_error = match self.store.delete_prefix(&prefix) {
            Ok(Some(removed)) => {
                tracing::debug!(object = %object, removed, "fragments invalidated by prefix");
                return Ok(removed);
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    object = %object,
                    prefix = %prefix,
                    error = %e,
                    "prefix delete failed; deleting keys individually"
                );
                Some(e)
            }
        };

        let Some(schema) = schema else {
            return match prefix_error {
                Some(source) => Err(CacheError::Store {
                    object: object.clone(),
                    failed: 1,
                    attempted: 1,
                    source,
                }),
                None => Ok(0),
            };
        };

        let keys = self.fragment_keys(schema, object);
        let attempted = keys.len();
        let mut failed = 0;
        let mut first_error: Option<StoreError> = None;

        for key in &keys {
            if let Err(e) = self.store.delete(key.as_str()) {
                self.store_failed("delete", key, object, &e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(source) => Err(CacheError::Store {
                object: object.clone(),
                failed,
                attempted,
                source,
            }),
            None => {
                tracing::debug!(object = %object, deleted = attempted, "fragments invalidated by key");
                Ok(attempted)
            }
        }
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("namespace", &self.namespace)
            .field("pipeline_fingerprint", &self.pipeline_fingerprint)
            .field("disabled", &self.disabled)
            .finish()
    }
}
