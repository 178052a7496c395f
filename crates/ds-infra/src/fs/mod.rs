pub mod byte_store;
pub mod file_source;
pub mod memory_store;

pub use byte_store::FsByteStore;
pub use file_source::FileByteSource;
pub use memory_store::MemoryByteStore;
