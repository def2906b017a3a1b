use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub reviewer_reg_number: String,

    pub subject_reg_number: String,

    pub content: String,

    /// 1..=5
    pub rating: i32,

    /// Month bucket stamped at creation (`YYYY-MM`), never recomputed.
    pub month_year: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
