/// Team model and database operations
///
/// A team is the profile portion of a registration. Every team belongs to
/// exactly one user, and the relationship is established when the team is
/// saved.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     informal_email VARCHAR(254) NOT NULL,
///     image VARCHAR(255),
///     country VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TEAM_COLUMNS: &str = "id, user_id, informal_email, image, country, created_at";

/// A persisted team profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID (UUID v4)
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Less authoritative contact address, e.g. the team's mailing list
    pub informal_email: String,

    /// Media path of the team logo, relative to the media root
    pub image: Option<String>,

    pub country: String,

    pub created_at: DateTime<Utc>,
}

/// A team that has not been written to the database yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeam {
    pub user_id: Uuid,
    pub informal_email: String,
    pub image: Option<String>,
    pub country: String,
}

impl Team {
    /// Inserts a new team
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist, already owns a team, or
    /// the database connection fails.
    pub async fn create(pool: &PgPool, data: NewTeam) -> Result<Self, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(&format!(
            r#"
            INSERT INTO teams (user_id, informal_email, image, country)
            VALUES ($1, $2, $3, $4)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.informal_email)
        .bind(data.image)
        .bind(data.country)
        .fetch_one(pool)
        .await?;

        Ok(team)
    }

    /// Finds the team owned by a user
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }
}
