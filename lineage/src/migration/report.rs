use super::MigrationStep;
use crate::version::SchemaVersion;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt::{Display, Formatter};

/// Outcome of a successful migration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    source: SchemaVersion,
    target: SchemaVersion,
    steps: Vec<MigrationStep>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl MigrationReport {
    pub(crate) fn new(
        source: SchemaVersion,
        target: SchemaVersion,
        steps: Vec<MigrationStep>,
        started_at: DateTime<Utc>,
    ) -> Self {
        MigrationReport {
            source,
            target,
            steps,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Version the store was in before the call.
    pub fn source(&self) -> &SchemaVersion {
        &self.source
    }

    pub fn target(&self) -> &SchemaVersion {
        &self.target
    }

    /// Steps applied, in order. Empty for a no-op.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }

    /// `true` when the store already was at the target and was left untouched.
    pub fn is_no_op(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Display for MigrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_no_op() {
            write!(f, "already at {}", self.target)
        } else {
            write!(
                f,
                "{} -> {} in {} step(s), {} ms",
                self.source,
                self.target,
                self.steps.len(),
                self.elapsed().num_milliseconds()
            )
        }
    }
}
