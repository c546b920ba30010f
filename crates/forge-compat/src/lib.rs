//! # forge-compat
//!
//! The version compatibility core of the mod marketplace: resolves each mod
//! version's free-text constraint against the catalog of published SPT engine
//! versions and against other mods' version lists, and keeps those derived
//! association sets consistent through event-driven recomputation as either
//! side of the data changes.
//!
//! The surrounding web application owns routing, auth, storage and the real
//! database; it invokes this crate in-process whenever the underlying rows
//! change and reads the recomputed associations back out.

pub mod error;
pub use error::Result;
pub use error::Error;

pub mod version;
pub use version::SptVersion;
pub use version::Constraint;

pub mod catalog;
pub use catalog::EngineVersion;

pub mod database;
pub use database::CompatDatabase;
pub use database::ChangeEvent;

pub mod resolver;

pub mod propagator;
pub use propagator::ChangePropagator;

pub mod import;
