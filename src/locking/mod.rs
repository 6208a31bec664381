//! Exclusive access to a store snapshot across processes.

mod store_lock;

pub use store_lock::{LockInfo, StoreLock, cleanup_all_locks};
