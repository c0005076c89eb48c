use std::fmt::{Display, Formatter};

/// Opaque descriptor read from a store's header.
///
/// The engine never interprets these bytes itself; it hands them to each
/// registered [`SchemaDescriptor`](crate::version::SchemaDescriptor) in turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StoreMetadata {
    bytes: Vec<u8>,
}

impl StoreMetadata {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        StoreMetadata {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Display for StoreMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lossy_text() {
        assert_eq!(StoreMetadata::new("app/v1").to_string(), "app/v1");
        assert_eq!(StoreMetadata::new(vec![0xFF]).to_string(), "\u{FFFD}");
    }

    #[test]
    fn default_is_empty() {
        let metadata = StoreMetadata::default();
        assert!(metadata.is_empty());
        assert_eq!(metadata.len(), 0);
        assert!(metadata.into_bytes().is_empty());
    }
}
