//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All spans are wall-clock `std::time::Duration`
//! - Ticks and deadlines are measured from sink acquisition

mod config;
mod error;
mod record;
mod request;
mod sink;
mod stats;

pub use config::*;
pub use error::*;
pub use record::*;
pub use request::*;
pub use sink::*;
pub use stats::{RunningStats, StatsSummary};
