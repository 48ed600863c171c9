//! Database kind and connection models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Supported database kinds, addressed on the wire by their `dbKind` name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
pub enum DbType {
    /// SQLite, file or in-memory.
    #[serde(rename = "sqlite3")]
    SQLite,
    /// MySQL / MariaDB.
    #[serde(rename = "mysql")]
    MySQL,
    /// PostgreSQL.
    #[serde(rename = "postgres")]
    Postgres,
}

impl DbType {
    /// Every kind the gateway accepts.
    pub const ALL: [DbType; 3] = [DbType::SQLite, DbType::MySQL, DbType::Postgres];

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::SQLite => "sqlite3",
            DbType::MySQL => "mysql",
            DbType::Postgres => "postgres",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DbType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedDatabaseType(s.to_string()))
    }
}

/// Pool statistics for a registered handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PoolStats {
    /// Open connections.
    pub size: u32,
    /// Idle connections.
    pub idle: u32,
    /// Upper bound on open connections.
    pub max_size: u32,
}

/// A registered connection as reported by the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionItem {
    /// Database kind the handle is registered under.
    pub db_kind: DbType,
    /// Pool statistics.
    pub pool: PoolStats,
}
