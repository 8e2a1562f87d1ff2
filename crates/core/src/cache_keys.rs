//! Well-known read-cache keys.
//!
//! Producers of task mutations evict these keys through the cache
//! invalidator; the task listing endpoint reads through them.

/// The fixed key under which the full task list is cached.
pub const TASK_LIST: &str = "tasks";
