//! Core data models for the guild ledger.

mod activity;
mod announcement;
mod equipment;
mod guild_event;
mod ids;
mod member;
mod stats;

pub use activity::*;
pub use announcement::*;
pub use equipment::*;
pub use guild_event::*;
pub use ids::*;
pub use member::*;
pub use stats::*;
