//! Write transactions that report what they changed.
//!
//! Every write goes through a [`WriteTransaction`]. Committing it returns the
//! [`ChangeSet`] of the transaction so the caller can replay it into the
//! search index once the rows are durable.

use anyhow::{Context, Result};
use chrono::Utc;
use probmark_core::domain::{ChangeSet, ProblemId, UserId};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::debug;

use super::problem_repository::{NewProblem, ProblemRecord, UpdateProblem};
use super::user_repository::{NewUser, UserRecord};
use crate::entity::{problem, user};

pub struct WriteTransaction {
    txn: DatabaseTransaction,
    changes: ChangeSet,
}

impl WriteTransaction {
    pub async fn begin(db: &DatabaseConnection) -> Result<Self> {
        let txn = db.begin().await.context("failed to begin write transaction")?;

        Ok(Self {
            txn,
            changes: ChangeSet::new(),
        })
    }

    pub async fn insert_problem(&mut self, new_problem: NewProblem) -> Result<ProblemRecord> {
        let active_model = problem::ActiveModel {
            problem_name: Set(new_problem.problem_name),
            problem_link: Set(new_problem.problem_link),
            keywords: Set(new_problem.keywords),
            tags: Set(new_problem.tags),
            platform: Set(new_problem.platform),
            ..Default::default()
        };

        let model = active_model.insert(&self.txn).await?;
        let record = ProblemRecord::from(model);
        self.changes.record_added(&record);
        Ok(record)
    }

    pub async fn update_problem(
        &mut self,
        problem_id: ProblemId,
        update: UpdateProblem,
    ) -> Result<Option<ProblemRecord>> {
        let Some(model) = problem::Entity::find_by_id(problem_id.into_inner())
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: problem::ActiveModel = model.into();
        active_model.problem_name = Set(update.problem_name);
        active_model.problem_link = Set(update.problem_link);
        active_model.keywords = Set(update.keywords);
        active_model.tags = Set(update.tags);
        active_model.platform = Set(update.platform);
        active_model.updated_at = Set(Utc::now().naive_utc());

        let updated = active_model.update(&self.txn).await?;
        let record = ProblemRecord::from(updated);
        self.changes.record_updated(&record);
        Ok(Some(record))
    }

    pub async fn delete_problem(&mut self, problem_id: ProblemId) -> Result<Option<ProblemRecord>> {
        let Some(model) = problem::Entity::find_by_id(problem_id.into_inner())
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };

        problem::Entity::delete_many()
            .filter(problem::Column::Id.eq(model.id))
            .exec(&self.txn)
            .await?;

        let record = ProblemRecord::from(model);
        self.changes.record_deleted(&record);
        Ok(Some(record))
    }

    pub async fn insert_user(&mut self, new_user: NewUser) -> Result<UserRecord> {
        let active_model = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            ..Default::default()
        };

        let model = active_model.insert(&self.txn).await?;
        let record = UserRecord::from(model);
        self.changes.record_added(&record);
        Ok(record)
    }

    pub async fn update_user_password(
        &mut self,
        user_id: UserId,
        password_hash: String,
    ) -> Result<Option<UserRecord>> {
        let Some(model) = user::Entity::find_by_id(user_id.into_inner())
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };

        let mut active_model: user::ActiveModel = model.into();
        active_model.password_hash = Set(password_hash);

        let updated = active_model.update(&self.txn).await?;
        let record = UserRecord::from(updated);
        self.changes.record_updated(&record);
        Ok(Some(record))
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Commits the rows and hands back what changed. No change-set is
    /// produced when the commit fails.
    pub async fn commit(self) -> Result<ChangeSet> {
        self.txn
            .commit()
            .await
            .context("failed to commit write transaction")?;

        debug!(
            added = self.changes.added().len(),
            updated = self.changes.updated().len(),
            deleted = self.changes.deleted().len(),
            "write transaction committed"
        );
        Ok(self.changes)
    }

    pub async fn rollback(self) -> Result<()> {
        self.txn
            .rollback()
            .await
            .context("failed to roll back write transaction")
    }
}
