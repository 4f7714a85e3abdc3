use super::{RegistrationStore, StoreError, StoreResult};
use crate::models::{
    team::{NewTeam, Team},
    user::{NewUser, User},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
}

/// In-memory registration store
///
/// Enforces the same constraints as the PostgreSQL schema: unique usernames,
/// one team per user and teams only for existing users.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Number of stored teams
    pub fn team_count(&self) -> usize {
        self.lock().teams.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-insert
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.lock().users.values().any(|u| u.username == username))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.lock();

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(
                "Constraint violation: users_username_key".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn insert_team(&self, team: NewTeam) -> StoreResult<Team> {
        let mut tables = self.lock();

        if !tables.users.contains_key(&team.user_id) {
            return Err(StoreError::Conflict(
                "Referenced user does not exist".to_string(),
            ));
        }
        if tables.teams.values().any(|t| t.user_id == team.user_id) {
            return Err(StoreError::Conflict(
                "Constraint violation: teams_user_id_key".to_string(),
            ));
        }

        let team = Team {
            id: Uuid::new_v4(),
            user_id: team.user_id,
            informal_email: team.informal_email,
            image: team.image,
            country: team.country,
            created_at: Utc::now(),
        };
        tables.teams.insert(team.id, team.clone());

        Ok(team)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_team_by_user(&self, user_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self
            .lock()
            .teams
            .values()
            .find(|t| t.user_id == user_id)
            .cloned())
    }

    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut tables = self.lock();

        match tables.users.get_mut(&id) {
            Some(user) if !user.is_active => {
                user.is_active = true;
                user.updated_at = Utc::now();
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock();

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.teams.retain(|_, team| team.user_id != id);

        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(NewUser::inactive("alice", "h", "a@example.org"))
            .await
            .unwrap();

        let result = store
            .insert_user(NewUser::inactive("alice", "h", "b@example.org"))
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_team_requires_existing_user() {
        let store = MemoryStore::new();

        let result = store
            .insert_team(NewTeam {
                user_id: Uuid::new_v4(),
                informal_email: "team@example.org".to_string(),
                image: None,
                country: "Germany".to_string(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.team_count(), 0);
    }

    #[tokio::test]
    async fn test_activate_only_once() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser::inactive("alice", "h", "a@example.org"))
            .await
            .unwrap();

        let activated = store.activate_user(user.id).await.unwrap().unwrap();
        assert!(activated.is_active);

        assert!(store.activate_user(user.id).await.unwrap().is_none());
        assert!(store.activate_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_removes_team() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser::inactive("alice", "h", "a@example.org"))
            .await
            .unwrap();
        store
            .insert_team(NewTeam {
                user_id: user.id,
                informal_email: "team@example.org".to_string(),
                image: None,
                country: "Germany".to_string(),
            })
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert_eq!(store.user_count(), 0);
        assert_eq!(store.team_count(), 0);
        assert!(!store.username_exists("alice").await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
    }
}
