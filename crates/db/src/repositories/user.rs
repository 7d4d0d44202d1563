//! User repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use upwatch_core::auth::{NewUser, StoreError, User, UserStore};
use upwatch_shared::UserId;

use super::store_error;
use crate::entities::users;

/// User repository backed by the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            username: model.username,
            email: model.email,
            contact_id: model.contact_id,
            password_hash: model.password_hash,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        let model = users::ActiveModel {
            id: NotSet,
            username: Set(user.username),
            email: Set(user.contact.email),
            contact_id: Set(user.contact.contact_id),
            password_hash: Set(user.password_hash),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(store_error)?;

        Ok(UserId::new(model.id))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let model = users::Entity::find_by_id(id.get())
            .one(&self.db)
            .await
            .map_err(store_error)?;

        Ok(model.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(store_error)?;

        Ok(model.map(User::from))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = users::Entity::delete_by_id(id.get())
            .exec(&self.db)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected > 0)
    }
}
