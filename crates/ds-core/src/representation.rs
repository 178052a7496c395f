//! Caller-supplied input: a type tag plus a way to get the bytes.

use std::sync::Arc;

use crate::content::TypeTag;
use crate::ports::ByteSourcePort;

#[derive(Clone)]
pub enum ByteSource {
    /// Bytes already in memory.
    Resident(Arc<Vec<u8>>),
    /// Bytes produced asynchronously (file read, pasteboard promise, ...).
    Deferred(Arc<dyn ByteSourcePort>),
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::Resident(bytes) => write!(f, "Resident({} bytes)", bytes.len()),
            ByteSource::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// One alternate format offered for a dropped item.
#[derive(Debug, Clone)]
pub struct Representation {
    pub type_tag: TypeTag,
    pub source: ByteSource,
}

impl Representation {
    pub fn resident(type_tag: impl Into<TypeTag>, bytes: Vec<u8>) -> Self {
        Self {
            type_tag: type_tag.into(),
            source: ByteSource::Resident(Arc::new(bytes)),
        }
    }

    pub fn deferred(type_tag: impl Into<TypeTag>, source: Arc<dyn ByteSourcePort>) -> Self {
        Self {
            type_tag: type_tag.into(),
            source: ByteSource::Deferred(source),
        }
    }
}
