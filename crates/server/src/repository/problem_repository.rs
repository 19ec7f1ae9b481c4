use crate::entity::problem;
use super::WriteTransaction;
use anyhow::Result;
use async_trait::async_trait;
use probmark_core::domain::{Committed, DocId, Indexable, ProblemId, SearchCapability};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Index namespace holding problem documents.
pub const PROBLEM_NAMESPACE: &str = "problem";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRecord {
    pub id: ProblemId,
    pub problem_name: String,
    pub problem_link: String,
    pub keywords: String,
    pub tags: String,
    pub platform: String,
}

impl From<problem::Model> for ProblemRecord {
    fn from(model: problem::Model) -> Self {
        Self {
            id: ProblemId::new(model.id),
            problem_name: model.problem_name,
            problem_link: model.problem_link,
            keywords: model.keywords,
            tags: model.tags,
            platform: model.platform,
        }
    }
}

impl Indexable for ProblemRecord {
    const CAPABILITY: Option<SearchCapability> =
        Some(SearchCapability::new(PROBLEM_NAMESPACE, &["keywords"]));

    fn index_id(&self) -> DocId {
        self.id.into()
    }

    fn field_value(&self, field: &str) -> Option<String> {
        let value = match field {
            "problem_name" => &self.problem_name,
            "problem_link" => &self.problem_link,
            "keywords" => &self.keywords,
            "tags" => &self.tags,
            "platform" => &self.platform,
            _ => return None,
        };
        Some(value.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NewProblem {
    pub problem_name: String,
    pub problem_link: String,
    pub keywords: String,
    pub tags: String,
    pub platform: String,
}

/// Full replacement of a problem's editable fields.
pub type UpdateProblem = NewProblem;

#[async_trait]
pub trait ProblemRepository: Send + Sync {
    async fn create(&self, new_problem: NewProblem) -> Result<Committed<ProblemRecord>>;
    async fn update(
        &self,
        problem_id: ProblemId,
        update: UpdateProblem,
    ) -> Result<Option<Committed<ProblemRecord>>>;
    async fn delete(&self, problem_id: ProblemId) -> Result<Option<Committed<ProblemRecord>>>;
    async fn find_by_id(&self, problem_id: ProblemId) -> Result<Option<ProblemRecord>>;
    async fn find_by_link(&self, problem_link: &str) -> Result<Option<ProblemRecord>>;
    /// Rows for `problem_ids` in no particular order; unknown ids are skipped.
    async fn find_by_ids(&self, problem_ids: &[ProblemId]) -> Result<Vec<ProblemRecord>>;
    /// Up to `limit` rows with ids greater than `after`, ascending by id.
    async fn list_after(&self, after: Option<ProblemId>, limit: u64) -> Result<Vec<ProblemRecord>>;
}

#[derive(Clone)]
pub struct SeaOrmProblemRepository {
    db: DatabaseConnection,
}

impl SeaOrmProblemRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProblemRepository for SeaOrmProblemRepository {
    async fn create(&self, new_problem: NewProblem) -> Result<Committed<ProblemRecord>> {
        let mut txn = WriteTransaction::begin(&self.db).await?;
        let record = txn.insert_problem(new_problem).await?;
        let changes = txn.commit().await?;

        Ok(Committed::new(record, changes))
    }

    async fn update(
        &self,
        problem_id: ProblemId,
        update: UpdateProblem,
    ) -> Result<Option<Committed<ProblemRecord>>> {
        let mut txn = WriteTransaction::begin(&self.db).await?;
        let Some(record) = txn.update_problem(problem_id, update).await? else {
            txn.rollback().await?;
            return Ok(None);
        };
        let changes = txn.commit().await?;

        Ok(Some(Committed::new(record, changes)))
    }

    async fn delete(&self, problem_id: ProblemId) -> Result<Option<Committed<ProblemRecord>>> {
        let mut txn = WriteTransaction::begin(&self.db).await?;
        let Some(record) = txn.delete_problem(problem_id).await? else {
            txn.rollback().await?;
            return Ok(None);
        };
        let changes = txn.commit().await?;

        Ok(Some(Committed::new(record, changes)))
    }

    async fn find_by_id(&self, problem_id: ProblemId) -> Result<Option<ProblemRecord>> {
        let model = problem::Entity::find_by_id(problem_id.into_inner())
            .one(&self.db)
            .await?;

        Ok(model.map(ProblemRecord::from))
    }

    async fn find_by_link(&self, problem_link: &str) -> Result<Option<ProblemRecord>> {
        let model = problem::Entity::find()
            .filter(problem::Column::ProblemLink.eq(problem_link))
            .one(&self.db)
            .await?;

        Ok(model.map(ProblemRecord::from))
    }

    async fn find_by_ids(&self, problem_ids: &[ProblemId]) -> Result<Vec<ProblemRecord>> {
        if problem_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = problem::Entity::find()
            .filter(problem::Column::Id.is_in(problem_ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(ProblemRecord::from).collect())
    }

    async fn list_after(&self, after: Option<ProblemId>, limit: u64) -> Result<Vec<ProblemRecord>> {
        let mut query = problem::Entity::find();
        if let Some(after) = after {
            query = query.filter(problem::Column::Id.gt(after.into_inner()));
        }

        let models = query
            .order_by_asc(problem::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(ProblemRecord::from).collect())
    }
}
