use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "worked_with")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub person_a: String,
    pub person_b: String,
    pub start_date: String,
    pub end_date: String,
    pub shared_season_count: i32,
    pub season_labels: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
