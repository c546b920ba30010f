//! Dependency side of resolution.

use std::collections::HashSet;

use crate::database::{CompatDatabase, DependencyId, ModId, VersionId};
use crate::version::constraint;

/// Computes which of `target_mod`'s versions satisfy `expression`.
///
/// Candidate version strings that aren't semantic versions simply never match;
/// mods are allowed arbitrary version labels.
pub(crate) fn expected_links(db: &CompatDatabase, target_mod: ModId, expression: &str) -> HashSet<VersionId> {
	if expression.trim().is_empty() {
		return HashSet::new();
	}
	db.versions_of_mod(target_mod)
		.into_iter()
		.filter(|candidate| {
			db.version(*candidate)
				.map(|row| constraint::matches_lenient(row.version(), expression))
				.unwrap_or(false)
		})
		.collect()
}

/// Recompute and persist `satisfied_versions` for every dependency constraint
/// of one mod version. Full replace, idempotent, never errors on bad data.
///
/// # Errors
/// Only [`MissingEntity`](crate::Error::MissingEntity) when `id` is unknown.
pub fn resolve(db: &mut CompatDatabase, id: VersionId) -> crate::Result<()> {
	let dependencies = db.version(id)
		.ok_or_else(|| crate::Error::MissingEntity(format!("version {id:?}")))?
		.dependencies()
		.iter()
		.map(|d| (d.id(), d.target_mod(), d.expression().to_string()))
		.collect::<Vec<(DependencyId, ModId, String)>>();

	for (dep_id, target_mod, expression) in dependencies {
		let links = expected_links(db, target_mod, &expression);
		db.replace_dependency_links(id, dep_id, links)?;
	}
	Ok(())
}

/// Reverse fan-out: re-resolve every version holding a dependency constraint
/// aimed at `mod_id`.
///
/// This is mandatory whenever a version of `mod_id` is created, renamed or
/// deleted; resolving only the owning side would leave dependents stale.
pub fn resolve_dependents_of(db: &mut CompatDatabase, mod_id: ModId) {
	for dependent in db.dependents_of(mod_id) {
		if let Err(e) = resolve(db, dependent) {
			log::warn!("failed to re-resolve dependent version {}: {e}", dependent.0);
		}
	}
}
