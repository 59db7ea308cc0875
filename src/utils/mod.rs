//! Utility modules

pub mod memory_storage;

#[cfg(test)]
pub mod test_fixtures;

pub use memory_storage::{MemoryStorage, StubLedger};
