//! Infrastructure layer: store, notifier and blob implementations behind
//! the domain ports.

pub mod blob;
pub mod in_memory;
pub mod notify;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
