//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: the decoded
//! [`Event`] model, routing keys, dispatch reports, the sink and dispatch
//! traits, and the configuration blueprint.
//! Business crates depend only on this crate, never on each other.
//!
//! ## Time Model
//! - Every event carries a UTC capture timestamp assigned on decode
//! - No ordering is implied between events from different datagrams

mod blueprint;
mod error;
mod event;
mod report;
mod route;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use report::*;
pub use route::*;
pub use sink::*;
