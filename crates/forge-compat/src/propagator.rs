//! The event layer keeping derived associations consistent.
//!
//! [`ChangePropagator`] subscribes to the database's lifecycle event queue and
//! dispatches to the resolvers:
//!
//! | event | action |
//! |---|---|
//! | version created | engine resolve + dependency resolve + dependent fan-out |
//! | version updated, constraint changed | engine resolve |
//! | version updated, version label changed | dependent fan-out on its mod |
//! | version deleted | dependent fan-out on its mod |
//! | dependency saved / deleted | dependency resolve of the owner |
//! | engine version saved / deleted | engine resolve of *every* version |
//! | mod reparented | both resolvers on every child version |
//!
//! Handler failures are logged and never abort the pump: a failed resolve
//! leaves an association transiently stale until the next [`reconcile`] pass,
//! which is also the prescribed fix should [`verify`] ever report drift.

use std::collections::HashSet;

use crate::catalog::EngineVersionId;
use crate::database::{ChangeEvent, CompatDatabase, DependencyId, VersionId};
use crate::resolver::{dependency, engine};

#[derive(Debug, Default)]
pub struct ChangePropagator;

impl ChangePropagator {
	pub fn new() -> Self {
		Self
	}

	/// Drain and handle every pending event, including any emitted while the
	/// pump runs.
	///
	/// Full-catalog rescans happen in here, so hosts are expected to call
	/// `pump` off the user-facing request path after engine-version writes;
	/// correctness only needs it to run eventually.
	pub fn pump(&self, db: &mut CompatDatabase) {
		loop {
			let events = db.take_events();
			if events.is_empty() { return }
			for event in events {
				self.handle(db, event);
			}
		}
	}

	fn handle(&self, db: &mut CompatDatabase, event: ChangeEvent) {
		log::trace!("propagating {event:?}");
		match event {
			ChangeEvent::VersionCreated(id) => {
				log_failure("engine resolve", engine::resolve(db, id));
				log_failure("dependency resolve", dependency::resolve(db, id));
				if let Some(mod_id) = db.version(id).map(|v| v.mod_id()) {
					dependency::resolve_dependents_of(db, mod_id);
				}
			},
			ChangeEvent::VersionUpdated { id, constraint_changed, version_changed } => {
				if constraint_changed {
					log_failure("engine resolve", engine::resolve(db, id));
				}
				if version_changed {
					if let Some(mod_id) = db.version(id).map(|v| v.mod_id()) {
						dependency::resolve_dependents_of(db, mod_id);
					}
				}
			},
			ChangeEvent::VersionDeleted { mod_id, .. } => {
				dependency::resolve_dependents_of(db, mod_id);
			},
			ChangeEvent::DependencySaved { owner } | ChangeEvent::DependencyDeleted { owner } => {
				log_failure("dependency resolve", dependency::resolve(db, owner));
			},
			ChangeEvent::EngineVersionSaved(_) | ChangeEvent::EngineVersionDeleted(_) => {
				/* the full catalog rescan; see the module docs on cost */
				for id in db.all_version_ids() {
					log_failure("engine resolve", engine::resolve(db, id));
				}
			},
			ChangeEvent::ModReparented(mod_id) => {
				for id in db.versions_of_mod(mod_id) {
					log_failure("engine resolve", engine::resolve(db, id));
					log_failure("dependency resolve", dependency::resolve(db, id));
				}
			},
		}
	}
}

fn log_failure(what: &str, result: crate::Result<()>) {
	if let Err(e) = result {
		log::warn!("{what} failed, association left stale until reconcile: {e}");
	}
}

/// Re-resolve every version from scratch.
///
/// The at-least-once repair pass: run periodically, or after [`verify`]
/// reports an [`Inconsistency`]. Also discards any queued events, since it
/// subsumes whatever they would have triggered.
pub fn reconcile(db: &mut CompatDatabase) {
	log::info!("reconciling all derived associations");
	for id in db.all_version_ids() {
		log_failure("engine resolve", engine::resolve(db, id));
		log_failure("dependency resolve", dependency::resolve(db, id));
	}
	db.take_events();
}

/// A detected violation of the consistency invariant.
///
/// Should never occur in normal operation; the fix is always to re-run
/// resolution, never to patch the association by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
	EngineLinks {
		version: VersionId,
		expected: HashSet<EngineVersionId>,
		actual: HashSet<EngineVersionId>,
	},
	SatisfiedVersions {
		version: VersionId,
		dependency: DependencyId,
		expected: HashSet<VersionId>,
		actual: HashSet<VersionId>,
	},
}

/// Recompute every derived set without writing and report any drift.
pub fn verify(db: &mut CompatDatabase) -> Vec<Inconsistency> {
	let mut findings = Vec::new();

	for id in db.all_version_ids() {
		let Some(row) = db.version(id) else { continue };
		let expression = row.spt_constraint().to_string();
		let actual = row.engine_versions().clone();
		let dependencies = row.dependencies()
			.iter()
			.map(|d| (d.id(), d.target_mod(), d.expression().to_string(), d.satisfied_versions().clone()))
			.collect::<Vec<_>>();

		let expected = engine::expected_links(db, &expression);
		if expected != actual {
			findings.push(Inconsistency::EngineLinks { version: id, expected, actual });
		}

		for (dep_id, target_mod, dep_expression, dep_actual) in dependencies {
			let dep_expected = dependency::expected_links(db, target_mod, &dep_expression);
			if dep_expected != dep_actual {
				findings.push(Inconsistency::SatisfiedVersions {
					version: id,
					dependency: dep_id,
					expected: dep_expected,
					actual: dep_actual,
				});
			}
		}
	}

	findings
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::version::SptVersion;
	use chrono::Utc;

	#[test]
	fn verify_reports_drift_and_reconcile_repairs_it() {
		let mut db = CompatDatabase::new();
		db.add_engine_version(SptVersion::parse("3.8.0").unwrap(), Some(Utc::now()));
		let m = db.add_mod("SAIN", None);
		let v = db.add_version(m, "1.0.0", "~3.8.0").unwrap();

		/* nothing pumped yet, so the derived set is stale by construction */
		assert!(!verify(&mut db).is_empty());

		reconcile(&mut db);
		assert!(verify(&mut db).is_empty());
		assert_eq!(db.version(v).unwrap().engine_versions().len(), 1);
	}
}
