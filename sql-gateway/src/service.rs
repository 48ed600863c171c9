//! SQL operations against registered handles.

use std::sync::Arc;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::AppResult;
use common::models::{DbType, Row};

use crate::database::DatabasePool;
use crate::registry::{ConnectionRegistry, Registration};

/// The database capability the dispatcher relies on.
#[async_trait]
pub trait SqlServiceTrait: Send + Sync {
    /// Opens a handle from `dsn` and registers it under `db_type`.
    async fn connect(&self, db_type: DbType, dsn: &str) -> AppResult<Registration>;

    /// Runs a statement, returning the number of affected rows.
    async fn exec(&self, db_type: DbType, sql: &str) -> AppResult<u64>;

    /// Runs a query, returning its rows in order.
    async fn query(&self, db_type: DbType, sql: &str) -> AppResult<Vec<Row>>;
}

/// SQL service backed by the connection registry.
pub struct SqlService {
    config: AppConfig,
    registry: Arc<ConnectionRegistry>,
}

impl SqlService {
    pub fn new(config: AppConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self { config, registry }
    }
}

#[async_trait]
impl SqlServiceTrait for SqlService {
    async fn connect(&self, db_type: DbType, dsn: &str) -> AppResult<Registration> {
        let pool = DatabasePool::connect(db_type, dsn, &self.config).await?;
        let registration = self.registry.register(db_type, pool).await;
        match registration {
            Registration::Inserted => tracing::info!(db_kind = %db_type, "connection registered"),
            // The new DSN is discarded; the handle opened first stays in use.
            Registration::AlreadyPresent => {
                tracing::info!(db_kind = %db_type, "connection already registered, reusing it")
            }
        }
        Ok(registration)
    }

    async fn exec(&self, db_type: DbType, sql: &str) -> AppResult<u64> {
        let pool = self.registry.lookup(db_type).await?;
        let affected = pool.execute(sql).await?;
        tracing::debug!(db_kind = %db_type, affected, "statement executed");
        Ok(affected)
    }

    async fn query(&self, db_type: DbType, sql: &str) -> AppResult<Vec<Row>> {
        let pool = self.registry.lookup(db_type).await?;
        let rows = pool.fetch_rows(sql).await?;
        tracing::debug!(db_kind = %db_type, rows = rows.len(), "query returned");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use common::errors::AppError;
    use common::models::ColumnValue;

    use super::*;

    fn service() -> SqlService {
        SqlService::new(AppConfig::default(), Arc::new(ConnectionRegistry::new()))
    }

    #[tokio::test]
    async fn test_exec_without_connection() {
        let service = service();
        assert!(matches!(
            service.exec(DbType::SQLite, "create table t(id int)").await,
            Err(AppError::NoConnection(_))
        ));
        assert!(matches!(
            service.query(DbType::SQLite, "select 1").await,
            Err(AppError::NoConnection(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let service = service();
        assert_eq!(
            service.connect(DbType::SQLite, ":memory:").await.unwrap(),
            Registration::Inserted
        );
        assert_eq!(
            service.connect(DbType::SQLite, ":memory:").await.unwrap(),
            Registration::AlreadyPresent
        );
    }

    #[tokio::test]
    async fn test_exec_then_query() {
        let service = service();
        service.connect(DbType::SQLite, ":memory:").await.unwrap();
        service
            .exec(DbType::SQLite, "create table users(id int, name varchar(255))")
            .await
            .unwrap();
        assert_eq!(
            service
                .exec(DbType::SQLite, "insert into users values (1, 'gorilla')")
                .await
                .unwrap(),
            1
        );

        let rows = service.query(DbType::SQLite, "select * from users").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], ColumnValue::Int(1));
        assert_eq!(rows[0]["name"], ColumnValue::Text("gorilla".into()));
    }
}
