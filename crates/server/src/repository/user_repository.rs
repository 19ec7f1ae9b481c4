use crate::entity::{marked, problem, user};
use super::{ProblemRecord, WriteTransaction};
use anyhow::Result;
use async_trait::async_trait;
use probmark_core::domain::{Committed, DocId, Indexable, ProblemId, SearchCapability, UserId};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl From<user::Model> for UserRecord {
    fn from(model: user::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
        }
    }
}

impl Indexable for UserRecord {
    const CAPABILITY: Option<SearchCapability> = None;

    fn index_id(&self) -> DocId {
        self.id.into()
    }

    fn field_value(&self, field: &str) -> Option<String> {
        match field {
            "username" => Some(self.username.clone()),
            "email" => Some(self.email.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<Committed<UserRecord>>;
    /// `None` when the user does not exist.
    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: String,
    ) -> Result<Option<Committed<UserRecord>>>;
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    async fn is_marked(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool>;
    /// Returns `true` when the pair was newly marked.
    async fn mark(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool>;
    /// Returns `true` when an existing mark was removed.
    async fn unmark(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool>;
    async fn marked_problems(&self, user_id: UserId) -> Result<Vec<ProblemRecord>>;
    async fn marked_count(&self, user_id: UserId) -> Result<u64>;
}

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<Committed<UserRecord>> {
        let mut txn = WriteTransaction::begin(&self.db).await?;
        let record = txn.insert_user(new_user).await?;
        let changes = txn.commit().await?;

        Ok(Committed::new(record, changes))
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: String,
    ) -> Result<Option<Committed<UserRecord>>> {
        let mut txn = WriteTransaction::begin(&self.db).await?;
        let Some(record) = txn.update_user_password(user_id, password_hash).await? else {
            txn.rollback().await?;
            return Ok(None);
        };
        let changes = txn.commit().await?;

        Ok(Some(Committed::new(record, changes)))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        let model = user::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await?;

        Ok(model.map(UserRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;

        Ok(model.map(UserRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        Ok(model.map(UserRecord::from))
    }

    async fn is_marked(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool> {
        let count = marked::Entity::find()
            .filter(marked::Column::UserId.eq(user_id.into_inner()))
            .filter(marked::Column::ProblemId.eq(problem_id.into_inner()))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn mark(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool> {
        if self.is_marked(user_id, problem_id).await? {
            return Ok(false);
        }

        let active_model = marked::ActiveModel {
            user_id: Set(user_id.into_inner()),
            problem_id: Set(problem_id.into_inner()),
        };
        marked::Entity::insert(active_model)
            .exec_without_returning(&self.db)
            .await?;

        Ok(true)
    }

    async fn unmark(&self, user_id: UserId, problem_id: ProblemId) -> Result<bool> {
        let result = marked::Entity::delete_many()
            .filter(marked::Column::UserId.eq(user_id.into_inner()))
            .filter(marked::Column::ProblemId.eq(problem_id.into_inner()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn marked_problems(&self, user_id: UserId) -> Result<Vec<ProblemRecord>> {
        let models = problem::Entity::find()
            .inner_join(marked::Entity)
            .filter(marked::Column::UserId.eq(user_id.into_inner()))
            .order_by_asc(problem::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(ProblemRecord::from).collect())
    }

    async fn marked_count(&self, user_id: UserId) -> Result<u64> {
        let count = marked::Entity::find()
            .filter(marked::Column::UserId.eq(user_id.into_inner()))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}
