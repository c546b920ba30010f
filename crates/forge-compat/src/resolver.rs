//! Recomputation of the derived association sets.
//!
//! Two resolvers, one per relationship type:
//!
//! - [`engine`] maps a version's compatibility constraint onto the engine
//!   version catalog.
//! - [`dependency`] maps a version's dependency constraints onto the target
//!   mods' version lists, including the mandatory reverse fan-out.
//!
//! Both are synchronous, idempotent, and defensive: a malformed constraint
//! resolves to an empty set instead of erroring, so resolution can never fail
//! the write that triggered it. The only errors they surface are missing
//! entity ids, which indicate a caller bug rather than bad data.

pub mod engine;
pub mod dependency;
