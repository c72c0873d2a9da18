//! Blindmatch - Matchmaking core for a blind-dating service
//!
//! This library implements the matchmaking state machine behind a
//! blind-dating bot: profile validation and normalization, the waiting
//! queue, the compatibility search, and the relationship ledger (active
//! matches plus the permanent rejection blocklist). Channel provisioning
//! and direct messages are external collaborators behind trait seams.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchError, MatchMaker, MatchOutcome, RegistrationError};
pub use crate::models::{ActiveMatch, Gender, PreferenceSet, Profile, QueueEntry};
pub use crate::services::{ChannelProvisioner, MatchmakingStore, NotificationGateway};
