//! Shared data models.

pub mod connection;
pub mod query;
pub mod reply;
pub mod request;

// Re-export commonly used types
pub use connection::{ConnectionItem, DbType, PoolStats};
pub use query::{ColumnValue, Row};
pub use reply::{Reply, ReplyStatus};
pub use request::{Command, Method, Request};
