//! RecordStore implementations.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;
