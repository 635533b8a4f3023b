//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Reaper: removes expired entries from every cache at configured intervals

mod reaper;

pub use reaper::{spawn_reaper, sweep_once};
