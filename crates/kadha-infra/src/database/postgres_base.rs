use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{DbConn, DbErr, EntityTrait, PrimaryKeyTrait, SqlErr};

use kadha_core::error::RepoError;
use kadha_core::ports::BaseRepository;

use super::connections::DEFAULT_OPERATION_TIMEOUT;

/// Generic PostgreSQL repository implementation.
///
/// Every operation runs under `timeout`; a transaction that does not finish
/// in time is dropped, which rolls it back.
pub struct PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    pub(crate) timeout: Duration,
    _entity: PhantomData<E>,
}

impl<E> PostgresBaseRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self::with_timeout(db, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn with_timeout(db: DbConn, timeout: Duration) -> Self {
        Self {
            db,
            timeout,
            _entity: PhantomData,
        }
    }

    pub(crate) async fn bounded<F, T>(&self, operation: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        bounded(self.timeout, operation).await
    }
}

/// Run `operation`, failing with `RepoError::Timeout` once `limit` elapses.
pub(crate) async fn bounded<F, T>(limit: Duration, operation: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Store operation timed out");
            Err(RepoError::Timeout(limit))
        }
    }
}

/// Translate a SeaORM error into the repository vocabulary.
pub(crate) fn db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => return RepoError::Constraint(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            return RepoError::InvalidReference(detail);
        }
        _ => {}
    }

    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        other => RepoError::Query(other.to_string()),
    }
}

#[async_trait]
impl<E, T, ID> BaseRepository<T, ID> for PostgresBaseRepository<E>
where
    E: EntityTrait,
    E::Model: Sync + Send,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = ID>,
    ID: Send + Sync + Into<sea_orm::Value> + Clone + Copy + 'static,
    T: From<E::Model> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError> {
        self.bounded(async {
            let result = E::find_by_id(id).one(&self.db).await.map_err(db_err)?;
            Ok(result.map(Into::into))
        })
        .await
    }
}
