//! # ctfreg Shared Library
//!
//! This crate contains the registration domain used by the ctfreg API server:
//! the user and team records, the two registration forms, password hashing,
//! confirmation tokens and the confirmation mail.
//!
//! ## Module Organization
//!
//! - `models`: Database models for users and teams
//! - `db`: Connection pool and migrations
//! - `store`: Persistence seam used by the forms (PostgreSQL + in-memory)
//! - `auth`: Password hashing and email confirmation tokens
//! - `mail`: Mail capability, templates and the confirmation mail
//! - `media`: Storage for uploaded team images
//! - `forms`: `UserCredentialsForm` and `TeamProfileForm`
//! - `error`: Common error types

pub mod auth;
pub mod db;
pub mod error;
pub mod forms;
pub mod mail;
pub mod media;
pub mod models;
pub mod store;

/// Current version of the ctfreg shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
