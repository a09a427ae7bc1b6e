pub mod activity;
pub mod announcements;
pub mod equipment;
pub mod events;
pub mod members;
pub mod profile;
pub mod stats;
