//! Source plugin model: the capability set every backend collector implements,
//! and a compile-time registry mapping `type` strings to constructors.

pub mod azure_monitor;
pub mod cloudwatch;
pub mod datadog;
pub mod gcp_monitoring;
pub mod prometheus;
pub mod system;

use async_trait::async_trait;
use helios_core::model::{CollectionResult, SourceConfig};

use crate::error::SourceError;

/// Capability set every metrics source implements.
///
/// `collect()` must never propagate a backend error out of the poller loop: it
/// catches its own failures and reports them as a failed [`CollectionResult`].
#[async_trait]
pub trait Source: Send + Sync {
    /// Registry key this instance was constructed under.
    fn source_type(&self) -> &'static str;

    /// Operator-assigned instance name.
    fn name(&self) -> &str;

    /// One-time setup (client construction, credential validation). Returning
    /// `Err` excludes this source from the agent's active set for this run; it
    /// is never fatal to the whole agent.
    async fn initialize(&mut self) -> Result<(), SourceError>;

    /// Poll the backend once.
    async fn collect(&mut self) -> CollectionResult;

    /// Cheap liveness probe of the backend.
    async fn health_check(&mut self) -> bool;

    /// Release any held resources. Default is a no-op.
    async fn close(&mut self) {}

    /// Whether this instance should be scheduled at all.
    fn is_enabled(&self) -> bool;
}

/// Class-level capability queried before construction: which credential keys a
/// source type requires, and what it queries by default when the operator
/// configures none.
pub trait SourceClass {
    fn required_credentials() -> Vec<&'static str> {
        Vec::new()
    }

    fn default_queries() -> Vec<String> {
        Vec::new()
    }
}

/// A constructor function registered for one source `type` string.
pub type SourceFactory = fn(SourceConfig) -> Box<dyn Source>;

/// One registry entry, submitted at compile time via [`inventory::submit!`].
pub struct SourceRegistration {
    pub type_name: &'static str,
    pub factory: SourceFactory,
    pub required_credentials: fn() -> Vec<&'static str>,
    pub default_queries: fn() -> Vec<String>,
}

inventory::collect!(SourceRegistration);

/// Process-wide source registry. Populated at compile time, read-only thereafter.
pub struct SourceRegistry;

impl SourceRegistry {
    /// Look up the registration for `type_name`.
    #[must_use]
    pub fn find(type_name: &str) -> Option<&'static SourceRegistration> {
        inventory::iter::<SourceRegistration>()
            .into_iter()
            .find(|reg| reg.type_name == type_name)
    }

    /// Construct a new source instance for `config`, or `None` for an unknown type.
    #[must_use]
    pub fn create(config: SourceConfig) -> Option<Box<dyn Source>> {
        Self::find(&config.source_type).map(|reg| (reg.factory)(config))
    }

    /// All registered type strings.
    #[must_use]
    pub fn list_types() -> Vec<&'static str> {
        inventory::iter::<SourceRegistration>()
            .into_iter()
            .map(|reg| reg.type_name)
            .collect()
    }

    /// Whether `type_name` has a registered constructor.
    #[must_use]
    pub fn is_registered(type_name: &str) -> bool {
        Self::find(type_name).is_some()
    }
}

/// Register a source type's constructor, required credentials, and default
/// queries in one call. Invoked once per built-in source module.
macro_rules! register_source {
    ($type_name:literal, $ctor:path, $class:ty) => {
        inventory::submit! {
            $crate::source::SourceRegistration {
                type_name: $type_name,
                factory: $ctor,
                required_credentials: <$class as $crate::source::SourceClass>::required_credentials,
                default_queries: <$class as $crate::source::SourceClass>::default_queries,
            }
        }
    };
}
pub(crate) use register_source;

/// Merge a source's static config labels into every sample, plus the
/// always-present `host` label used by most collectors.
pub(crate) fn merge_static_labels(
    mut samples: Vec<helios_core::model::MetricSample>,
    config: &SourceConfig,
) -> Vec<helios_core::model::MetricSample> {
    for sample in &mut samples {
        for (k, v) in &config.labels {
            sample.labels.entry(k.clone()).or_insert_with(|| v.clone());
        }
        sample.source = config.name.clone();
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_is_registered() {
        assert!(SourceRegistry::is_registered("system"));
    }

    #[test]
    fn unknown_type_is_not_registered() {
        assert!(!SourceRegistry::is_registered("not-a-real-source"));
    }
}
