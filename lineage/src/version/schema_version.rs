use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A position in the linear chain of schema versions.
///
/// The ordinal is assigned by the [`VersionRegistry`](super::VersionRegistry) from
/// registration order, starting at 1 for the oldest version. Versions are ordered
/// by ordinal; the identifier is the stable, human readable name that is recorded
/// in version tables and log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    ordinal: u32,
    identifier: String,
}

impl SchemaVersion {
    pub(crate) fn new(ordinal: u32, identifier: &str) -> Self {
        SchemaVersion {
            ordinal,
            identifier: identifier.to_string(),
        }
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal
            .cmp(&other.ordinal)
            .then_with(|| self.identifier.cmp(&other.identifier))
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)
    }
}
