use super::MigrationStep;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use indexmap::IndexMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::Arc;

/// Applies exactly one [`MigrationStep`] to a store artifact.
///
/// `input` holds a complete, checkpointed store in `step.source()` and must not
/// be modified. The implementation writes a complete store in
/// `step.destination()` to `output`, a path allocated by the engine that does
/// not exist yet. A partial `output` left behind by a failing call is removed by
/// the engine.
///
/// Closures of type `Fn(&MigrationStep, &Path, &Path) -> MigrationResult<()>`
/// are transformers too.
pub trait SchemaTransformer: Send + Sync {
    fn apply(&self, step: &MigrationStep, input: &Path, output: &Path) -> MigrationResult<()>;
}

impl<F> SchemaTransformer for F
where
    F: Fn(&MigrationStep, &Path, &Path) -> MigrationResult<()> + Send + Sync,
{
    fn apply(&self, step: &MigrationStep, input: &Path, output: &Path) -> MigrationResult<()> {
        self(step, input, output)
    }
}

type StepFn = Arc<dyn Fn(&Path, &Path) -> MigrationResult<()> + Send + Sync>;

/// A [`SchemaTransformer`] dispatching each step to the function registered for
/// its `(source, destination)` identifier pair.
///
/// # Examples
///
/// ```rust
/// use lineage::migration::StepTransformers;
/// use lineage::store::{rewrite_records, StoreMetadata};
///
/// let transformers = StepTransformers::new()
///     .register("v1", "v2", |input, output| {
///         rewrite_records(input, output, StoreMetadata::new("app/v2"), |record| {
///             Ok(Some(record.to_ascii_uppercase()))
///         })
///     });
/// assert!(transformers.contains("v1", "v2"));
/// ```
#[derive(Clone, Default)]
pub struct StepTransformers {
    steps: IndexMap<(String, String), StepFn>,
}

impl StepTransformers {
    pub fn new() -> Self {
        StepTransformers {
            steps: IndexMap::new(),
        }
    }

    /// Registers the function for the step from `source` to `destination`.
    /// A later registration for the same pair replaces the earlier one.
    pub fn register<F>(mut self, source: &str, destination: &str, step: F) -> Self
    where
        F: Fn(&Path, &Path) -> MigrationResult<()> + Send + Sync + 'static,
    {
        self.steps.insert(
            (source.to_string(), destination.to_string()),
            Arc::new(step),
        );
        self
    }

    pub fn contains(&self, source: &str, destination: &str) -> bool {
        self.steps
            .contains_key(&(source.to_string(), destination.to_string()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl SchemaTransformer for StepTransformers {
    fn apply(&self, step: &MigrationStep, input: &Path, output: &Path) -> MigrationResult<()> {
        let key = (
            step.source().identifier().to_string(),
            step.destination().identifier().to_string(),
        );
        match self.steps.get(&key) {
            Some(transform) => transform(input, output),
            None => {
                log::error!("No transformer registered for step {}", step);
                Err(MigrationError::new(
                    &format!("No transformer registered for step {}", step),
                    ErrorKind::TransformError,
                ))
            }
        }
    }
}

impl Debug for StepTransformers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.keys().map(|(from, to)| format!("{} -> {}", from, to)))
            .finish()
    }
}
