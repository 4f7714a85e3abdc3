use super::{RegistrationStore, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    team::{NewTeam, Team},
    user::{NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed registration store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations to `StoreError::Conflict`
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique");
            return StoreError::Conflict(format!("Constraint violation: {}", constraint));
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::Conflict("Referenced user does not exist".to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RegistrationStore for PgStore {
    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(User::username_exists(&self.pool, username).await?)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let user = User::create(&self.pool, user).await.map_err(classify)?;
        debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team> {
        let team = Team::create(&self.pool, team).await.map_err(classify)?;
        debug!(team_id = %team.id, user_id = %team.user_id, "Inserted team");
        Ok(team)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_team_by_user(&self, user_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_user(&self.pool, user_id).await?)
    }

    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::activate(&self.pool, id).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let deleted = User::delete(&self.pool, id).await?;
        debug!(user_id = %id, deleted, "Deleted user");
        Ok(deleted)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
