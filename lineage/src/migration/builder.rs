use super::{
    MigrationConfig, MigrationEngine, MigrationEventListener, SchemaTransformer,
};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::store::{StoreFormat, StoreFormatProvider};
use crate::version::VersionRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Fluent configuration of a [`MigrationEngine`].
///
/// A version registry and a transformer are required; everything else has a
/// default. Invalid settings are captured as they are made and reported by
/// [`build`](Self::build).
///
/// # Examples
///
/// ```rust
/// use lineage::migration::{MigrationEngine, StepTransformers};
/// use lineage::version::{SchemaFingerprint, VersionRegistry};
///
/// let registry = VersionRegistry::builder()
///     .version("v1", SchemaFingerprint::new("app/v1"))
///     .version("v2", SchemaFingerprint::new("app/v2"))
///     .build()
///     .unwrap();
///
/// let engine = MigrationEngine::builder()
///     .registry(registry)
///     .transformer(StepTransformers::new().register("v1", "v2", |_input, _output| Ok(())))
///     .temp_prefix(".app-migration-")
///     .build()
///     .unwrap();
/// assert_eq!(engine.config().temp_prefix(), ".app-migration-");
/// ```
#[derive(Default)]
pub struct MigrationEngineBuilder {
    error: Option<MigrationError>,
    registry: Option<VersionRegistry>,
    transformer: Option<Arc<dyn SchemaTransformer>>,
    format: StoreFormat,
    config: MigrationConfig,
    listeners: Vec<MigrationEventListener>,
}

impl MigrationEngineBuilder {
    pub fn new() -> Self {
        MigrationEngineBuilder::default()
    }

    pub fn registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn transformer<T: SchemaTransformer + 'static>(mut self, transformer: T) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    /// Storage engine of the stores to migrate. Defaults to
    /// [`JournaledFileFormat`](crate::store::JournaledFileFormat).
    pub fn store_format<T: StoreFormatProvider + 'static>(mut self, format: T) -> Self {
        self.format = StoreFormat::new(format);
        self
    }

    pub fn scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_scratch_dir(scratch_dir) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn temp_prefix(mut self, temp_prefix: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_temp_prefix(temp_prefix) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn verify_each_step(mut self, verify_each_step: bool) -> Self {
        self.config.set_verify_each_step(verify_each_step);
        self
    }

    pub fn sync_on_swap(mut self, sync_on_swap: bool) -> Self {
        self.config.set_sync_on_swap(sync_on_swap);
        self
    }

    /// Registers a listener receiving every state transition.
    pub fn add_listener(mut self, listener: MigrationEventListener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> MigrationResult<MigrationEngine> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let registry = self.registry.ok_or_else(|| {
            log::error!("A version registry is required to build a migration engine");
            MigrationError::new(
                "A version registry is required to build a migration engine",
                ErrorKind::ConfigurationError,
            )
        })?;
        if registry.is_empty() {
            log::error!("The version registry of a migration engine cannot be empty");
            return Err(MigrationError::new(
                "The version registry of a migration engine cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }

        let transformer = self.transformer.ok_or_else(|| {
            log::error!("A schema transformer is required to build a migration engine");
            MigrationError::new(
                "A schema transformer is required to build a migration engine",
                ErrorKind::ConfigurationError,
            )
        })?;

        Ok(MigrationEngine::new(
            registry,
            transformer,
            self.format,
            self.config,
            self.listeners,
        ))
    }
}
