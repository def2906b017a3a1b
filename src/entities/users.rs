use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Login key; uniqueness is enforced by the database.
    #[sea_orm(unique)]
    pub reg_number: String,

    pub mobile: String,

    pub email: String,

    pub personal_email: String,

    pub team_number: String,

    pub codename: String,

    /// `pbkdf2_sha256$<iterations>$<salt>$<key>`
    pub password_hash: String,

    pub residence_type: String,

    pub hostel_type: Option<String>,

    pub block_room: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
