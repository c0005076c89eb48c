use crate::store::StoreMetadata;

/// Decides whether a store's metadata was written in one particular schema version.
///
/// Every registered version carries one descriptor. Descriptors of different
/// versions must never accept the same metadata; the
/// [`StoreInspector`](crate::store::StoreInspector) reports an overlap as a
/// configuration error instead of picking one.
///
/// Closures of type `Fn(&StoreMetadata) -> bool` are descriptors too.
pub trait SchemaDescriptor: Send + Sync {
    fn is_compatible(&self, metadata: &StoreMetadata) -> bool;
}

impl<F> SchemaDescriptor for F
where
    F: Fn(&StoreMetadata) -> bool + Send + Sync,
{
    fn is_compatible(&self, metadata: &StoreMetadata) -> bool {
        self(metadata)
    }
}

/// Descriptor matching metadata that is byte-for-byte equal to a fingerprint.
///
/// This is the natural descriptor for stores that record a schema hash or
/// schema name in their header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFingerprint {
    fingerprint: Vec<u8>,
}

impl SchemaFingerprint {
    pub fn new(fingerprint: impl Into<Vec<u8>>) -> Self {
        SchemaFingerprint {
            fingerprint: fingerprint.into(),
        }
    }

    /// Metadata a store written in this version carries.
    pub fn metadata(&self) -> StoreMetadata {
        StoreMetadata::new(self.fingerprint.clone())
    }
}

impl SchemaDescriptor for SchemaFingerprint {
    fn is_compatible(&self, metadata: &StoreMetadata) -> bool {
        metadata.as_bytes() == self.fingerprint.as_slice()
    }
}
