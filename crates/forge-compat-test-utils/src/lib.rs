//! Various helper functions for testing
//!
//! Fixture builders for the integration tests: a known engine version catalog
//! and pre-populated databases. Functions here return ready values rather than
//! panicking mid-setup so failures point at the test, not the fixture.

use chrono::{Duration, Utc};
use forge_compat::{CompatDatabase, SptVersion};
use forge_compat::database::{ModId, VersionId};

/// The catalog most scenario tests run against.
pub const SAMPLE_CATALOG: [&str; 5] = ["3.7.0", "3.7.1", "3.8.0", "3.8.1", "3.9.0"];

pub fn sample_catalog() -> Vec<String> {
	SAMPLE_CATALOG.iter().map(|s| s.to_string()).collect()
}

/// A database whose engine table holds [`SAMPLE_CATALOG`] (all published a day
/// ago) plus the `0.0.0` sentinel, with the setup events already drained.
pub fn database_with_catalog() -> CompatDatabase {
	let mut db = CompatDatabase::new();
	let published = Some(Utc::now() - Duration::days(1));
	db.add_engine_version(SptVersion::parse("0.0.0").expect("sentinel parses"), None);
	for version in SAMPLE_CATALOG {
		db.add_engine_version(SptVersion::parse(version).expect("sample catalog versions parse"), published);
	}
	db.take_events();
	db
}

/// A mod with the given semantic versions, each with an empty engine
/// constraint. Returns the mod and its version ids in order.
pub fn mod_with_versions(db: &mut CompatDatabase, name: &str, versions: &[&str]) -> (ModId, Vec<VersionId>) {
	let mod_id = db.add_mod(name, None);
	let ids = versions.iter()
		.map(|v| db.add_version(mod_id, *v, "").expect("mod exists"))
		.collect();
	(mod_id, ids)
}
