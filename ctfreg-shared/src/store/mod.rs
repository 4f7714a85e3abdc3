/// Persistence seam for registrations
///
/// The forms and the confirmation handler talk to a [`RegistrationStore`]
/// instead of a concrete pool, so the same flow runs against PostgreSQL in
/// production and against [`MemoryStore`] in tests and local demos.
///
/// # Implementations
///
/// - [`PgStore`]: sqlx/PostgreSQL, delegating to the model CRUD functions
/// - [`MemoryStore`]: process-local maps behind a mutex

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    team::{NewTeam, Team},
    user::{NewUser, User},
};
use async_trait::async_trait;
use uuid::Uuid;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or relationship constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations needed by the registration flow
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Returns true if a user with this username exists
    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    /// Persists a new user
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    /// Persists a new team; the owning user must already exist
    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_team_by_user(&self, user_id: Uuid) -> StoreResult<Option<Team>>;

    /// Flips an inactive user to active
    ///
    /// Returns None if the user does not exist or is already active.
    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Removes a user together with its team
    ///
    /// Returns false if no such user exists.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Checks that the backing storage is reachable
    async fn ping(&self) -> StoreResult<()>;
}
