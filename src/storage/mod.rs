//! Storage backends for contact records.

mod memory;
mod traits;

pub use memory::InMemoryContactStore;
pub use traits::{ContactStore, ContactTx, StorageError};
