//! m-engine: server-side data plane for an industrial monitoring platform.
//!
//! A typed, keyed in-memory entity cache with per-key locking and pluggable
//! update acceptance, a reactive alarm evaluation engine with oscillation
//! damping, and a scheduled parallel rule recomputation engine. All three
//! share one cache layer and one locking discipline.

pub mod cache;
mod alarm;
mod config;
mod constants;
mod errors;
mod index;
mod loader;
mod rule;
mod supervision;
mod tag;
mod update;
pub mod utils;

pub use alarm::*;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use index::*;
pub use loader::*;
pub use rule::*;
pub use supervision::*;
pub use tag::*;
pub use update::*;
pub use utils::*;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
