//! Background tasks.
//!
//! - `rotation_scheduler` - Periodic signing secret rotation (cron driven)

pub mod rotation_scheduler;

pub use rotation_scheduler::spawn_rotation_scheduler;
