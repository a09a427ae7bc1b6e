//! # Guild Ledger
//!
//! Roster, gear-progress and attendance tracker for an online-game guild.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (members, equipment, activity, etc.)
//! - **storage**: JSONL document store behind the `GuildStore` trait
//! - **calculate**: Gear progress and guild-wide statistics
//! - **activity**: Profile change diffing and the activity feed
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod activity;
pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod storage;

pub use models::*;
