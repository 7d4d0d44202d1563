//! Session repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use upwatch_core::auth::{NewSession, Session, SessionStore, StoreError, refresh_token_digest};
use upwatch_shared::{SessionId, UserId};

use super::store_error;
use crate::entities::sessions;

/// Session repository backed by the `sessions` table.
///
/// Refresh tokens are stored as their SHA-256 digest only.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert<C: ConnectionTrait>(
        conn: &C,
        session: NewSession,
    ) -> Result<SessionId, StoreError> {
        let model = sessions::ActiveModel {
            id: NotSet,
            user_id: Set(session.user_id.get()),
            refresh_token_hash: Set(refresh_token_digest(&session.refresh_token)),
            fingerprint: Set(session.fingerprint),
            expires_at: Set(session.expires_at.into()),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
        .map_err(store_error)?;

        Ok(SessionId::new(model.id))
    }
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            id: SessionId::new(model.id),
            user_id: UserId::new(model.user_id),
            refresh_token_digest: model.refresh_token_hash,
            fingerprint: model.fingerprint,
            expires_at: model.expires_at.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Filter on the unique `(user_id, refresh_token_hash, fingerprint)` triple,
/// restricted to unexpired rows.
fn live_triple(
    user_id: UserId,
    refresh_token: &str,
    fingerprint: &str,
) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(sessions::Column::UserId.eq(user_id.get()))
        .add(sessions::Column::RefreshTokenHash.eq(refresh_token_digest(refresh_token)))
        .add(sessions::Column::Fingerprint.eq(fingerprint))
        .add(sessions::Column::ExpiresAt.gt(Utc::now()))
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create_session(&self, session: NewSession) -> Result<SessionId, StoreError> {
        Self::insert(&self.db, session).await
    }

    async fn get_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
    ) -> Result<Option<Session>, StoreError> {
        let model = sessions::Entity::find()
            .filter(live_triple(user_id, refresh_token, fingerprint))
            .one(&self.db)
            .await
            .map_err(store_error)?;

        Ok(model.map(Session::from))
    }

    async fn get_user_sessions(&self, user_id: UserId) -> Result<Vec<Session>, StoreError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id.get()))
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(sessions::Column::CreatedAt)
            .order_by_desc(sessions::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        Ok(models.into_iter().map(Session::from).collect())
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StoreError> {
        sessions::Entity::delete_by_id(id.get())
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn delete_all_sessions(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id.get()))
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected)
    }

    async fn rotate_session(
        &self,
        user_id: UserId,
        refresh_token: &str,
        fingerprint: &str,
        replacement: NewSession,
    ) -> Result<Option<SessionId>, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;

        // The DELETE takes the row lock: of two concurrent rotations of the
        // same token, the second sees zero rows once the first commits.
        let deleted = sessions::Entity::delete_many()
            .filter(live_triple(user_id, refresh_token, fingerprint))
            .exec(&txn)
            .await
            .map_err(store_error)?;

        if deleted.rows_affected == 0 {
            txn.rollback().await.map_err(store_error)?;
            debug!(user_id = %user_id, "No live session to rotate");
            return Ok(None);
        }

        let id = Self::insert(&txn, replacement).await?;
        txn.commit().await.map_err(store_error)?;

        Ok(Some(id))
    }

    async fn evict_oldest_sessions(&self, user_id: UserId, keep: u64) -> Result<u64, StoreError> {
        let stale: Vec<i64> = sessions::Entity::find()
            .select_only()
            .column(sessions::Column::Id)
            .filter(sessions::Column::UserId.eq(user_id.get()))
            .order_by_desc(sessions::Column::CreatedAt)
            .order_by_desc(sessions::Column::Id)
            .offset(keep)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(store_error)?;

        if stale.is_empty() {
            return Ok(0);
        }

        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::Id.is_in(stale))
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected)
    }
}
