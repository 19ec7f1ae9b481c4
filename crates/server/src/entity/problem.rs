use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub problem_name: String,
    #[sea_orm(unique)]
    pub problem_link: String,
    pub keywords: String,
    pub tags: String,
    pub platform: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::marked::Entity")]
    Marked,
}

impl Related<super::marked::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Marked.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
