use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "worked_on")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub person_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub job_title: String,
    pub source: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
