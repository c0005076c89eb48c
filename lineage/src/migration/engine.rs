use super::{
    MigrationConfig, MigrationEngineBuilder, MigrationEvent, MigrationEventListener,
    MigrationPlan, MigrationPlanner, MigrationReport, MigrationState, MigrationStep,
    SchemaTransformer,
};
use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::store::{ScratchArea, StoreFormat, StoreInspector, StoreSwapper};
use crate::version::{SchemaVersion, VersionRegistry};
use chrono::Utc;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Migrates a store on disk to a target schema version, one step at a time.
///
/// A call flushes the store's journal, resolves its current version, plans the
/// chain of steps and applies them to scratch copies. The original store is
/// only touched by the final atomic swap, so a failure anywhere before that
/// leaves it byte-for-byte intact and the next call simply starts over.
///
/// The engine assumes nobody else has the store open while it runs. Calls on
/// one engine are serialized: a call made while another is in progress fails
/// with [`ErrorKind::InvalidOperation`]. Cloning is cheap and clones share that
/// guard.
#[derive(Clone)]
pub struct MigrationEngine {
    inner: Arc<MigrationEngineInner>,
}

impl MigrationEngine {
    pub fn builder() -> MigrationEngineBuilder {
        MigrationEngineBuilder::new()
    }

    pub(crate) fn new(
        registry: VersionRegistry,
        transformer: Arc<dyn SchemaTransformer>,
        format: StoreFormat,
        config: MigrationConfig,
        listeners: Vec<MigrationEventListener>,
    ) -> Self {
        let inner = MigrationEngineInner {
            inspector: StoreInspector::new(registry.clone(), format.clone()),
            planner: MigrationPlanner::new(registry.clone()),
            swapper: StoreSwapper::new(format.clone(), config.sync_on_swap()),
            scratch: ScratchArea::new(config.scratch_dir(), config.temp_prefix()),
            registry,
            transformer,
            format,
            config,
            listeners,
            state: atomic(MigrationState::Idle),
            running: Mutex::new(()),
        };
        MigrationEngine {
            inner: Arc::new(inner),
        }
    }

    /// Migrates the store at `store_path` to `target`.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::InvalidOperation`] if another call is running on this engine.
    /// * [`ErrorKind::ConfigurationError`] if the store matches no registered
    ///   version, or `target` is unknown or not reachable from it.
    /// * [`ErrorKind::TransformError`] if a step fails or produces a store that
    ///   does not resolve to the step's destination.
    /// * The IO family of kinds for filesystem failures.
    ///
    /// Whatever the error, the store at `store_path` is either untouched or
    /// completely replaced by the migrated one.
    pub fn migrate(
        &self,
        store_path: &Path,
        target: &SchemaVersion,
    ) -> MigrationResult<MigrationReport> {
        let _running = self.inner.running.try_lock().ok_or_else(|| {
            log::error!(
                "Cannot migrate {}, another migration is in progress",
                store_path.display()
            );
            MigrationError::new(
                &format!(
                    "Cannot migrate {}, another migration is in progress",
                    store_path.display()
                ),
                ErrorKind::InvalidOperation,
            )
        })?;

        self.inner.transition(MigrationState::Idle, store_path);
        log::info!("Migrating {} to {}", store_path.display(), target);

        match self.inner.run(store_path, target) {
            Ok(report) => {
                log::info!("Migrated {}: {}", store_path.display(), report);
                Ok(report)
            }
            Err(e) => {
                self.inner.transition(MigrationState::FatalAborted, store_path);
                log::error!("Migration of {} aborted: {}", store_path.display(), e);
                Err(e)
            }
        }
    }

    /// Migrates to the registered version named `identifier`.
    pub fn migrate_to(
        &self,
        store_path: &Path,
        identifier: &str,
    ) -> MigrationResult<MigrationReport> {
        let target = self.inner.registry.get(identifier).ok_or_else(|| {
            log::error!("Unknown target schema version {}", identifier);
            MigrationError::new(
                &format!("Unknown target schema version {}", identifier),
                ErrorKind::ConfigurationError,
            )
        })?;
        self.migrate(store_path, &target)
    }

    /// Migrates to the latest registered version.
    pub fn migrate_to_latest(&self, store_path: &Path) -> MigrationResult<MigrationReport> {
        let latest = self.inner.registry.latest()?;
        self.migrate(store_path, &latest)
    }

    /// State of the current call, or the terminal state of the last one.
    pub fn state(&self) -> MigrationState {
        self.inner.state.read_with(|state| *state)
    }

    /// Removes intermediate stores of `store_path` left in the scratch directory
    /// by an aborted process. Artifacts of other stores are kept. Returns how
    /// many files were removed.
    pub fn purge_scratch(&self, store_path: &Path) -> MigrationResult<usize> {
        let _running = self.inner.running.try_lock().ok_or_else(|| {
            log::error!("Cannot purge scratch artifacts while a migration is in progress");
            MigrationError::new(
                "Cannot purge scratch artifacts while a migration is in progress",
                ErrorKind::InvalidOperation,
            )
        })?;
        self.inner.scratch.purge(store_path)
    }
}

impl Deref for MigrationEngine {
    type Target = MigrationEngineInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Debug for MigrationEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Shared state of a [`MigrationEngine`].
pub struct MigrationEngineInner {
    registry: VersionRegistry,
    inspector: StoreInspector,
    planner: MigrationPlanner,
    transformer: Arc<dyn SchemaTransformer>,
    format: StoreFormat,
    swapper: StoreSwapper,
    scratch: ScratchArea,
    config: MigrationConfig,
    listeners: Vec<MigrationEventListener>,
    state: Atomic<MigrationState>,
    running: Mutex<()>,
}

impl MigrationEngineInner {
    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn inspector(&self) -> &StoreInspector {
        &self.inspector
    }

    pub fn planner(&self) -> &MigrationPlanner {
        &self.planner
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn scratch(&self) -> &ScratchArea {
        &self.scratch
    }

    fn transition(&self, state: MigrationState, store_path: &Path) {
        self.state.write_with(|current| *current = state);
        log::debug!("{}: {}", store_path.display(), state);

        if !self.listeners.is_empty() {
            let event = MigrationEvent::new(state, store_path);
            for listener in &self.listeners {
                listener.notify(&event);
            }
        }
    }

    fn run(&self, store_path: &Path, target: &SchemaVersion) -> MigrationResult<MigrationReport> {
        let started_at = Utc::now();
        self.config.validate_for(store_path)?;
        if !self.registry.contains(target) {
            log::error!("Target schema version {} is not registered", target);
            return Err(MigrationError::new(
                &format!("Target schema version {} is not registered", target),
                ErrorKind::ConfigurationError,
            ));
        }

        self.transition(MigrationState::Flushing, store_path);
        self.format.checkpoint(store_path)?;

        self.transition(MigrationState::Inspecting, store_path);
        let source = self.inspector.inspect(store_path)?;
        if source == *target {
            self.transition(MigrationState::NoOp, store_path);
            return Ok(MigrationReport::new(
                source,
                target.clone(),
                Vec::new(),
                started_at,
            ));
        }

        self.transition(MigrationState::Planning, store_path);
        let plan = self.planner.plan(&source, target)?;
        log::debug!("{}: plan {}", store_path.display(), plan);

        self.scratch.ensure()?;
        let mut live: Option<PathBuf> = None;
        match self.execute(store_path, &plan, &mut live) {
            Ok(()) => {
                self.transition(MigrationState::Done, store_path);
                Ok(MigrationReport::new(
                    source,
                    target.clone(),
                    plan.into_iter().collect(),
                    started_at,
                ))
            }
            Err(e) => {
                if let Some(intermediate) = live {
                    self.discard(&intermediate);
                }
                Err(e)
            }
        }
    }

    // `live` tracks the one intermediate store owned by this call, so the
    // caller can remove it whatever fails.
    fn execute(
        &self,
        store_path: &Path,
        plan: &MigrationPlan,
        live: &mut Option<PathBuf>,
    ) -> MigrationResult<()> {
        let total = plan.len();
        for (index, step) in plan.iter().enumerate() {
            self.transition(
                MigrationState::Executing {
                    step: index + 1,
                    of: total,
                },
                store_path,
            );

            let output = self.scratch.allocate(store_path, step);
            let input = live.clone().unwrap_or_else(|| store_path.to_path_buf());
            if let Err(e) = self.apply_step(step, &input, &output) {
                self.discard(&output);
                return Err(e);
            }

            if let Some(superseded) = live.replace(output) {
                if let Err(e) = self.swapper.destroy(&superseded) {
                    log::warn!(
                        "Could not remove superseded store {}: {}",
                        superseded.display(),
                        e
                    );
                }
            }
        }

        let final_store = live.clone().ok_or_else(|| {
            log::error!("Migration plan {} produced no store", plan);
            MigrationError::new(
                &format!("Migration plan {} produced no store", plan),
                ErrorKind::InternalError,
            )
        })?;

        self.transition(MigrationState::Verifying, store_path);
        self.format.checkpoint(&final_store)?;
        self.expect_version(&final_store, plan.destination())?;

        self.transition(MigrationState::Swapping, store_path);
        self.swapper.atomic_replace(store_path, &final_store)?;

        // the swap is committed, from here on cleanup is best-effort
        live.take();
        self.discard(&final_store);
        Ok(())
    }

    fn apply_step(&self, step: &MigrationStep, input: &Path, output: &Path) -> MigrationResult<()> {
        log::debug!(
            "Applying {} to {} into {}",
            step,
            input.display(),
            output.display()
        );

        self.transformer.apply(step, input, output).map_err(|e| {
            log::error!("Migration step {} failed: {}", step, e);
            MigrationError::new_with_cause(
                &format!("Migration step {} failed", step),
                ErrorKind::TransformError,
                e,
            )
        })?;

        if self.config.verify_each_step() {
            self.format.checkpoint(output).map_err(|e| {
                rejected_output(&format!("Output of migration step {} is unreadable", step), e)
            })?;
            self.expect_version(output, step.destination())?;
        }
        Ok(())
    }

    fn expect_version(&self, path: &Path, expected: &SchemaVersion) -> MigrationResult<()> {
        let found = self
            .inspector
            .read_metadata(path)
            .and_then(|metadata| self.inspector.compatible_version(&metadata))
            .map_err(|e| {
                rejected_output(&format!("Cannot resolve the version of {}", path.display()), e)
            })?;

        if found.as_ref() != Some(expected) {
            let found = found
                .map(|v| v.identifier().to_string())
                .unwrap_or_else(|| "no registered version".to_string());
            log::error!(
                "{} resolves to {} instead of {}",
                path.display(),
                found,
                expected
            );
            return Err(MigrationError::new(
                &format!("{} resolves to {} instead of {}", path.display(), found, expected),
                ErrorKind::TransformError,
            ));
        }
        Ok(())
    }

    fn discard(&self, path: &Path) {
        if let Err(e) = self.swapper.destroy(path) {
            log::warn!("Could not remove temporary store {}: {}", path.display(), e);
        }
    }
}

// A step output that cannot be checkpointed or resolved is the transformer's
// fault, unless the filesystem itself refused the operation.
fn rejected_output(message: &str, cause: MigrationError) -> MigrationError {
    log::error!("{}: {}", message, cause);
    match cause.kind() {
        ErrorKind::IOError | ErrorKind::DiskFull | ErrorKind::PermissionDenied => cause,
        _ => MigrationError::new_with_cause(message, ErrorKind::TransformError, cause),
    }
}
