//! Generic transactional entity cache with per-key locking, pluggable
//! update-acceptance policy and synchronous listener dispatch.

mod core;
mod entity;
mod event;
mod flow;

pub use self::core::*;
pub use entity::*;
pub use event::*;
pub use flow::*;
