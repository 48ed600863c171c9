//! Connection registry.
//!
//! Process-wide map from database kind to its open pool. The first
//! registration for a kind wins and is kept for the life of the process.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use common::errors::{AppError, AppResult};
use common::models::{ConnectionItem, DbType};
use tokio::sync::RwLock;

use crate::database::DatabasePool;

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The pool is now the registered handle for its kind.
    Inserted,
    /// A handle already existed; the offered pool was closed.
    AlreadyPresent,
}

/// Registered database handles indexed by kind.
///
/// The lock is only held for the map access itself, never across database
/// I/O.
#[derive(Default)]
pub struct ConnectionRegistry {
    pools: RwLock<HashMap<DbType, DatabasePool>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pool` under `db_type` unless a handle is already registered.
    ///
    /// Redundant registrations are not errors. The losing pool is closed
    /// after the lock is released; the existing handle is never replaced.
    pub async fn register(&self, db_type: DbType, pool: DatabasePool) -> Registration {
        let rejected = {
            let mut pools = self.pools.write().await;
            match pools.entry(db_type) {
                Entry::Occupied(_) => Some(pool),
                Entry::Vacant(slot) => {
                    slot.insert(pool);
                    None
                }
            }
        };

        match rejected {
            Some(pool) => {
                pool.close().await;
                Registration::AlreadyPresent
            }
            None => Registration::Inserted,
        }
    }

    /// Returns the handle registered for `db_type`.
    pub async fn lookup(&self, db_type: DbType) -> AppResult<DatabasePool> {
        self.pools
            .read()
            .await
            .get(&db_type)
            .cloned()
            .ok_or_else(|| AppError::NoConnection(db_type.to_string()))
    }

    /// Number of registered handles.
    pub async fn len(&self) -> usize {
        self.pools.read().await.len()
    }

    /// Registered handles with their pool statistics, ordered by kind.
    pub async fn list(&self) -> Vec<ConnectionItem> {
        let pools = self.pools.read().await;
        let mut items: Vec<ConnectionItem> = pools
            .iter()
            .map(|(db_kind, pool)| ConnectionItem {
                db_kind: *db_kind,
                pool: pool.stats(),
            })
            .collect();
        items.sort_by_key(|item| item.db_kind);
        items
    }

    /// Registered handle for `db_type` with its pool statistics.
    pub async fn item(&self, db_type: DbType) -> AppResult<ConnectionItem> {
        let pool = self.lookup(db_type).await?;
        Ok(ConnectionItem {
            db_kind: db_type,
            pool: pool.stats(),
        })
    }
}
