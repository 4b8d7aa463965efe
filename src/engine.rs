//! Top-level render entry point.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::composer::Composer;
use crate::config::EngineConfig;
use crate::error::{CacheError, RenderError};
use crate::metrics::RenderMetrics;
use crate::schema::SchemaRegistry;
use crate::store::CacheStore;
use crate::transform::TransformPipeline;
use crate::types::{ApiVersion, Document, DocumentRef, ExposureLevel, InstanceId, ObjectKey};

/// Per-call render options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Requested version. `None` uses the engine's default.
    pub version: Option<ApiVersion>,
    /// Requested exposure level.
    pub exposure: ExposureLevel,
}

impl RenderOptions {
    /// Options with an explicit version.
    pub fn version(mut self, version: impl Into<ApiVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Options with an explicit exposure level.
    pub fn exposure(mut self, exposure: ExposureLevel) -> Self {
        self.exposure = exposure;
        self
    }
}

/// Fragment cache and composition engine.
///
/// Holds the shared read-only state of every render: schema registry,
/// transform pipeline, cache manager and configuration. `Send + Sync`; render
/// calls may be issued concurrently.
pub struct FragmentEngine {
    registry: Arc<SchemaRegistry>,
    pipeline: TransformPipeline,
    cache: CacheManager,
    config: EngineConfig,
}

impl FragmentEngine {
    /// Create an engine.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn CacheStore>,
        config: EngineConfig,
        pipeline: TransformPipeline,
    ) -> Self {
        let cache = CacheManager::new(store, &config, &pipeline);

        tracing::info!(
            classes = registry.len(),
            registry_fingerprint = %registry.fingerprint(),
            pipeline_fingerprint = %pipeline.fingerprint(),
            transforms = ?pipeline.names(),
            default_version = %config.default_version(),
            disable_caching = config.disable_caching,
            max_depth = ?config.max_depth,
            "fragment engine initialized"
        );

        Self {
            registry,
            pipeline,
            cache,
            config,
        }
    }

    /// Report cache and composition counters to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn RenderMetrics>) -> Self {
        self.cache = self.cache.with_metrics(metrics);
        self
    }

    /// Render `doc` as a top-level instance.
    pub fn render(&self, doc: &dyn Document, options: &RenderOptions) -> Result<Value, RenderError> {
        let version = self.resolve_version(options);
        let fragment = self
            .composer()
            .compose(doc, &version, options.exposure, None)?;
        // Top-level instances are never omitted.
        Ok(fragment.map(Value::Object).unwrap_or(Value::Null))
    }

    /// Render each document as a top-level instance, in order.
    pub fn render_all(&self, docs: &[DocumentRef], options: &RenderOptions) -> Result<Value, RenderError> {
        docs.iter()
            .map(|doc| self.render(doc.as_ref(), options))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Remove every cached fragment of `(class, id)`.
    ///
    /// Called by the persistence layer when an instance is created, updated
    /// or destroyed.
    pub fn invalidate(&self, class: &str, id: &InstanceId) -> Result<usize, CacheError> {
        let object = ObjectKey::new(class, id.clone());
        let result = self.cache.invalidate(self.registry.get(class), &object);
        match &result {
            Ok(removed) => tracing::info!(object = %object, removed, "fragments invalidated"),
            Err(e) => tracing::warn!(object = %object, error = %e, "fragment invalidation incomplete"),
        }
        result
    }

    /// Remove every cached fragment of `doc`.
    pub fn invalidate_document(&self, doc: &dyn Document) -> Result<usize, CacheError> {
        self.invalidate(doc.class_name(), &doc.id())
    }

    /// Get a reference to the schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Get a reference to the transform pipeline.
    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Get a reference to the cache manager.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_version(&self, options: &RenderOptions) -> ApiVersion {
        options
            .version
            .clone()
            .unwrap_or_else(|| self.config.default_version())
    }

    fn composer(&self) -> Composer<'_> {
        Composer::new(&self.registry, &self.cache, &self.pipeline, self.config.max_depth)
    }
}

impl std::fmt::Debug for FragmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentEngine")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
