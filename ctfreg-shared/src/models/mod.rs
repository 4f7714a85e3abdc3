/// Database models for ctfreg
///
/// # Models
///
/// - `user`: User accounts (the identity portion of a registration)
/// - `team`: Team profiles, each owned by exactly one user
///
/// Both models come in a persisted form (`User`, `Team`) and a transient
/// form (`NewUser`, `NewTeam`) that has not been written yet.

pub mod team;
pub mod user;
