use super::{MigrationPlan, MigrationStep};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::version::{SchemaVersion, VersionRegistry};

/// Computes the chain of single-version steps between two registered versions.
#[derive(Debug, Clone)]
pub struct MigrationPlanner {
    registry: VersionRegistry,
}

impl MigrationPlanner {
    pub fn new(registry: VersionRegistry) -> Self {
        MigrationPlanner { registry }
    }

    /// Walks the successor chain from `source` until it reaches `destination`.
    ///
    /// Equal versions produce an empty plan.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ConfigurationError`] when either version is not registered
    /// or `destination` is not reachable from `source` (including any downgrade).
    pub fn plan(
        &self,
        source: &SchemaVersion,
        destination: &SchemaVersion,
    ) -> MigrationResult<MigrationPlan> {
        for version in [source, destination] {
            if !self.registry.contains(version) {
                log::error!("Schema version {} is not registered", version);
                return Err(MigrationError::new(
                    &format!("Schema version {} is not registered", version),
                    ErrorKind::ConfigurationError,
                ));
            }
        }

        let mut steps = Vec::new();
        let mut current = source.clone();
        while current != *destination {
            let next = self.registry.successor(&current).ok_or_else(|| {
                log::error!(
                    "No migration path from {} to {}: {} is the latest version",
                    source,
                    destination,
                    current
                );
                MigrationError::new(
                    &format!(
                        "No migration path from {} to {}: {} is the latest version",
                        source, destination, current
                    ),
                    ErrorKind::ConfigurationError,
                )
            })?;
            steps.push(MigrationStep::new(current, next.clone()));
            current = next;
        }

        log::debug!("Planned {} step(s) from {} to {}", steps.len(), source, destination);
        Ok(MigrationPlan::new(source.clone(), destination.clone(), steps))
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }
}
