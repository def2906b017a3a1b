use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub reg_number: String,
    pub email: String,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            reg_number: model.reg_number,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// Fields for a new member. `password_hash` must already be a credential string.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub reg_number: String,
    pub mobile: String,
    pub email: String,
    pub personal_email: String,
    pub team_number: String,
    pub codename: String,
    pub password_hash: String,
    pub residence_type: String,
    pub hostel_type: Option<String>,
    pub block_room: Option<String>,
}

/// Public directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub reg_number: String,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_reg_number(&self, reg_number: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::RegNumber.eq(reg_number))
            .one(&self.conn)
            .await
            .context("Failed to query user by registration number")?;

        Ok(user.map(User::from))
    }

    /// Get user by registration number together with the stored credential (for login)
    pub async fn get_by_reg_number_with_password(
        &self,
        reg_number: &str,
    ) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::RegNumber.eq(reg_number))
            .one(&self.conn)
            .await
            .context("Failed to query user for login")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Signup duplicate check: matches on either key.
    pub async fn get_by_email_or_reg_number(
        &self,
        email: &str,
        reg_number: &str,
    ) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(email))
                    .add(users::Column::RegNumber.eq(reg_number)),
            )
            .one(&self.conn)
            .await
            .context("Failed to query user by email or registration number")?;

        Ok(user.map(User::from))
    }

    /// Inserts a user. The raw `DbErr` is returned so callers can tell a
    /// unique-constraint violation apart from other failures.
    pub async fn create(&self, new_user: NewUser) -> std::result::Result<User, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            name: Set(new_user.name),
            reg_number: Set(new_user.reg_number),
            mobile: Set(new_user.mobile),
            email: Set(new_user.email),
            personal_email: Set(new_user.personal_email),
            team_number: Set(new_user.team_number),
            codename: Set(new_user.codename),
            password_hash: Set(new_user.password_hash),
            residence_type: Set(new_user.residence_type),
            hostel_type: Set(new_user.hostel_type),
            block_room: Set(new_user.block_room),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(User::from(model))
    }

    pub async fn list_people(&self, exclude_reg_number: Option<&str>) -> Result<Vec<Person>> {
        let mut query = users::Entity::find()
            .select_only()
            .column(users::Column::Name)
            .column(users::Column::RegNumber)
            .order_by_asc(users::Column::Name);

        if let Some(excluded) = exclude_reg_number {
            query = query.filter(users::Column::RegNumber.ne(excluded));
        }

        let rows = query
            .into_tuple::<(String, String)>()
            .all(&self.conn)
            .await
            .context("Failed to list people")?;

        Ok(rows
            .into_iter()
            .map(|(name, reg_number)| Person { name, reg_number })
            .collect())
    }
}
