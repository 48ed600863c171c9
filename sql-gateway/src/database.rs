//! Database backends.
//!
//! Wraps the sqlx pool of each supported database kind behind one enum that
//! can open a handle from a DSN, run statements and decode result rows.

use std::str::FromStr;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{ColumnValue, DbType, PoolStats, Row};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::Decimal;
use sqlx::Row as _;
use sqlx::{Column, ColumnIndex, Decode, MySqlPool, PgPool, SqlitePool, Type, TypeInfo, ValueRef};

/// Connection pool wrapper for different database types.
///
/// Cloning is cheap; clones share the underlying pool.
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

impl DatabasePool {
    /// Opens a pool for `db_type` from a client supplied DSN.
    ///
    /// The pool connects eagerly, so an unreachable server or unusable file
    /// is reported here rather than on first use.
    pub async fn connect(db_type: DbType, dsn: &str, config: &AppConfig) -> AppResult<Self> {
        let url = normalize_dsn(db_type, dsn);
        let timeout = config.connect_timeout();

        match db_type {
            DbType::MySQL => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::MySQL(pool))
            }
            DbType::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(timeout)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::Postgres(pool))
            }
            DbType::SQLite => {
                let options = SqliteConnectOptions::from_str(&url)
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?
                    .create_if_missing(true);
                // A single connection that never expires: an in-memory
                // database lives exactly as long as this connection.
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>)
                    .acquire_timeout(timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    /// Runs a statement and returns the number of affected rows.
    pub async fn execute(&self, sql: &str) -> AppResult<u64> {
        let result = match self {
            DatabasePool::MySQL(pool) => sqlx::query(sql).execute(pool).await.map(|r| r.rows_affected()),
            DatabasePool::Postgres(pool) => sqlx::query(sql).execute(pool).await.map(|r| r.rows_affected()),
            DatabasePool::SQLite(pool) => sqlx::query(sql).execute(pool).await.map(|r| r.rows_affected()),
        };
        result.map_err(|e| AppError::DatabaseQuery(e.to_string()))
    }

    /// Runs a query and decodes every result row.
    ///
    /// A column whose type has no JSON rendering fails the whole query with
    /// `AppError::Serialization`.
    pub async fn fetch_rows(&self, sql: &str) -> AppResult<Vec<Row>> {
        match self {
            DatabasePool::MySQL(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .iter()
                .map(|row| decode_row(row, mysql_value))
                .collect(),
            DatabasePool::Postgres(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .iter()
                .map(|row| decode_row(row, postgres_value))
                .collect(),
            DatabasePool::SQLite(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await
                .map_err(|e| AppError::DatabaseQuery(e.to_string()))?
                .iter()
                .map(|row| decode_row(row, sqlite_value))
                .collect(),
        }
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        match self {
            DatabasePool::MySQL(p) => PoolStats {
                size: p.size(),
                idle: p.num_idle() as u32,
                max_size: p.options().get_max_connections(),
            },
            DatabasePool::Postgres(p) => PoolStats {
                size: p.size(),
                idle: p.num_idle() as u32,
                max_size: p.options().get_max_connections(),
            },
            DatabasePool::SQLite(p) => PoolStats {
                size: p.size(),
                idle: p.num_idle() as u32,
                max_size: p.options().get_max_connections(),
            },
        }
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        match self {
            DatabasePool::MySQL(p) => p.close().await,
            DatabasePool::Postgres(p) => p.close().await,
            DatabasePool::SQLite(p) => p.close().await,
        }
    }
}

/// Turns a client DSN into a URL sqlx understands.
///
/// SQLite accepts `:memory:`, plain paths and `sqlite:` URLs. MySQL and
/// PostgreSQL DSNs without a scheme get their default one.
fn normalize_dsn(db_type: DbType, dsn: &str) -> String {
    let dsn = dsn.trim();
    match db_type {
        DbType::SQLite if dsn.starts_with("sqlite:") => dsn.to_string(),
        DbType::SQLite => format!("sqlite:{}", dsn),
        DbType::MySQL | DbType::Postgres if dsn.contains("://") => dsn.to_string(),
        DbType::MySQL => format!("mysql://{}", dsn),
        DbType::Postgres => format!("postgres://{}", dsn),
    }
}

/// Backend specific decoding, tried before the shared fallbacks.
type BackendDecoder<R> = fn(&R, usize, &str) -> Option<ColumnValue>;

fn decode_row<R>(row: &R, backend: BackendDecoder<R>) -> AppResult<Row>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i16: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i8: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    let mut decoded = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let declared = column.type_info().name();
        let value = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => Some(ColumnValue::Null),
            Ok(_) => backend(row, index, declared).or_else(|| {
                decode_int(row, index)
                    .or_else(|| decode_real(row, index))
                    .or_else(|| decode_text(row, index))
            }),
            Err(e) => {
                tracing::debug!(index, error = %e, "column not readable");
                None
            }
        };
        let value = value.ok_or_else(|| {
            AppError::Serialization(format!(
                "column {} has unsupported type {}",
                column.name(),
                declared
            ))
        })?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_int<R>(row: &R, index: usize) -> Option<ColumnValue>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i16: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i8: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<i64, _>(index)
        .or_else(|_| row.try_get::<i32, _>(index).map(i64::from))
        .or_else(|_| row.try_get::<i16, _>(index).map(i64::from))
        .or_else(|_| row.try_get::<i8, _>(index).map(i64::from))
        .ok()
        .map(ColumnValue::Int)
}

fn decode_real<R>(row: &R, index: usize) -> Option<ColumnValue>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<f64, _>(index)
        .or_else(|_| row.try_get::<f32, _>(index).map(f64::from))
        .ok()
        .map(ColumnValue::Real)
}

/// Strings first, then dates and times rendered as text, then raw bytes.
fn decode_text<R>(row: &R, index: usize) -> Option<ColumnValue>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Some(ColumnValue::Text(v));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(index) {
        return Some(ColumnValue::Text(v.to_rfc3339()));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(index) {
        return Some(ColumnValue::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(index) {
        return Some(ColumnValue::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(index) {
        return Some(ColumnValue::Text(v.to_string()));
    }
    row.try_get::<Vec<u8>, _>(index).ok().map(ColumnValue::Bytes)
}

fn is_bool(declared: &str) -> bool {
    declared.eq_ignore_ascii_case("BOOLEAN") || declared.eq_ignore_ascii_case("BOOL")
}

fn mysql_value(row: &MySqlRow, index: usize, declared: &str) -> Option<ColumnValue> {
    if is_bool(declared) {
        return row.try_get::<bool, _>(index).ok().map(ColumnValue::Bool);
    }
    if declared.ends_with("UNSIGNED") {
        return row.try_get::<u64, _>(index).ok().map(|v| match i64::try_from(v) {
            Ok(v) => ColumnValue::Int(v),
            Err(_) => ColumnValue::UInt(v),
        });
    }
    if declared.eq_ignore_ascii_case("DECIMAL") {
        return decimal_value(row.try_get::<Decimal, _>(index));
    }
    None
}

fn postgres_value(row: &PgRow, index: usize, declared: &str) -> Option<ColumnValue> {
    if is_bool(declared) {
        return row.try_get::<bool, _>(index).ok().map(ColumnValue::Bool);
    }
    if declared.eq_ignore_ascii_case("NUMERIC") {
        return decimal_value(row.try_get::<Decimal, _>(index));
    }
    None
}

fn sqlite_value(row: &SqliteRow, index: usize, declared: &str) -> Option<ColumnValue> {
    if is_bool(declared) {
        return row.try_get::<bool, _>(index).ok().map(ColumnValue::Bool);
    }
    None
}

/// Decimals are rendered as text so no precision is lost.
fn decimal_value(value: Result<Decimal, sqlx::Error>) -> Option<ColumnValue> {
    match value {
        Ok(v) => Some(ColumnValue::Text(v.to_string())),
        Err(e) => {
            tracing::debug!(error = %e, "decimal column not decodable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> DatabasePool {
        DatabasePool::connect(DbType::SQLite, ":memory:", &AppConfig::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_normalize_sqlite_dsn() {
        assert_eq!(normalize_dsn(DbType::SQLite, ":memory:"), "sqlite::memory:");
        assert_eq!(normalize_dsn(DbType::SQLite, "data/app.db"), "sqlite:data/app.db");
        assert_eq!(normalize_dsn(DbType::SQLite, "sqlite://app.db"), "sqlite://app.db");
    }

    #[test]
    fn test_normalize_network_dsn() {
        assert_eq!(
            normalize_dsn(DbType::MySQL, "root:pw@localhost:3306/app"),
            "mysql://root:pw@localhost:3306/app"
        );
        assert_eq!(
            normalize_dsn(DbType::Postgres, "postgres://u@db/app"),
            "postgres://u@db/app"
        );
    }

    #[tokio::test]
    async fn test_execute_and_fetch_rows() {
        let pool = memory_pool().await;
        pool.execute("create table users(id int, name varchar(255), score real, note text)")
            .await
            .unwrap();
        let affected = pool
            .execute("insert into users values (1, 'gorilla', 2.5, null)")
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = pool.fetch_rows("select * from users").await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["id"], ColumnValue::Int(1));
        assert_eq!(row["name"], ColumnValue::Text("gorilla".into()));
        assert_eq!(row["score"], ColumnValue::Real(2.5));
        assert_eq!(row["note"], ColumnValue::Null);
    }

    #[tokio::test]
    async fn test_memory_databases_are_isolated() {
        let a = memory_pool().await;
        let b = memory_pool().await;
        a.execute("create table only_in_a(id int)").await.unwrap();
        assert!(b.fetch_rows("select * from only_in_a").await.is_err());
    }

    #[tokio::test]
    async fn test_bad_sql_is_query_error() {
        let pool = memory_pool().await;
        assert!(matches!(
            pool.execute("create tabel broken").await,
            Err(AppError::DatabaseQuery(_))
        ));
        assert!(matches!(
            pool.fetch_rows("select * from missing").await,
            Err(AppError::DatabaseQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_unopenable_file_is_connection_error() {
        let result = DatabasePool::connect(
            DbType::SQLite,
            "/nonexistent-dir/for/sure/app.db",
            &AppConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::DatabaseConnection(_))));
    }

    #[tokio::test]
    async fn test_fetch_rows_decodes_declared_types() {
        let pool = memory_pool().await;
        pool.execute(
            "create table events(id smallint, ok boolean, ratio float, at datetime, payload blob)",
        )
        .await
        .unwrap();
        pool.execute("insert into events values (3, 1, 0.5, '2024-01-02 03:04:05', x'00ff')")
            .await
            .unwrap();

        let rows = pool.fetch_rows("select * from events").await.unwrap();
        let row = &rows[0];
        assert_eq!(row["id"], ColumnValue::Int(3));
        assert_eq!(row["ok"], ColumnValue::Bool(true));
        assert_eq!(row["ratio"], ColumnValue::Real(0.5));
        assert!(matches!(&row["at"], ColumnValue::Text(t) if t.starts_with("2024-01-02")));
        assert_eq!(row["payload"], ColumnValue::Bytes(vec![0x00, 0xff]));
    }

    #[test]
    fn test_bool_columns_by_declared_name() {
        assert!(is_bool("BOOLEAN"));
        assert!(is_bool("bool"));
        assert!(!is_bool("TINYINT"));
    }

    #[test]
    fn test_decimals_render_as_text() {
        let value = decimal_value(Ok(Decimal::new(123456, 3)));
        assert_eq!(value, Some(ColumnValue::Text("123.456".into())));
        assert_eq!(decimal_value(Err(sqlx::Error::RowNotFound)), None);
    }

    #[tokio::test]
    async fn test_sqlite_pool_stats() {
        let pool = memory_pool().await;
        assert_eq!(pool.stats().max_size, 1);
    }
}
