use crate::version::SchemaVersion;
use std::fmt::{Display, Formatter};
use std::slice::Iter;

/// One transformation from a schema version to its immediate successor.
///
/// Steps are only handed out by the [`MigrationPlanner`](super::MigrationPlanner),
/// so a step never skips a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MigrationStep {
    source: SchemaVersion,
    destination: SchemaVersion,
}

impl MigrationStep {
    pub(crate) fn new(source: SchemaVersion, destination: SchemaVersion) -> Self {
        MigrationStep {
            source,
            destination,
        }
    }

    pub fn source(&self) -> &SchemaVersion {
        &self.source
    }

    pub fn destination(&self) -> &SchemaVersion {
        &self.destination
    }
}

impl Display for MigrationStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Ordered chain of contiguous steps from a source to a destination version.
///
/// An empty plan means the store is already at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    source: SchemaVersion,
    destination: SchemaVersion,
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub(crate) fn new(
        source: SchemaVersion,
        destination: SchemaVersion,
        steps: Vec<MigrationStep>,
    ) -> Self {
        MigrationPlan {
            source,
            destination,
            steps,
        }
    }

    pub fn source(&self) -> &SchemaVersion {
        &self.source
    }

    pub fn destination(&self) -> &SchemaVersion {
        &self.destination
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, MigrationStep> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a MigrationPlan {
    type Item = &'a MigrationStep;
    type IntoIter = Iter<'a, MigrationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl IntoIterator for MigrationPlan {
    type Item = MigrationStep;
    type IntoIter = std::vec::IntoIter<MigrationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl Display for MigrationPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "{} (no-op)", self.source);
        }

        write!(f, "{}", self.source)?;
        for step in &self.steps {
            write!(f, " -> {}", step.destination())?;
        }
        Ok(())
    }
}
