//! Engine-version side of resolution.

use std::collections::HashSet;

use crate::catalog::EngineVersionId;
use crate::database::{CompatDatabase, VersionId};
use crate::version::Constraint;

/// Computes the engine versions the given constraint currently matches.
///
/// An empty expression matches nothing by design, a malformed one degrades to
/// nothing, and the `0.0.0` sentinel is excluded unconditionally even if a
/// clause would naively match it.
pub(crate) fn expected_links(db: &mut CompatDatabase, expression: &str) -> HashSet<EngineVersionId> {
	if expression.trim().is_empty() {
		return HashSet::new();
	}
	let constraint = match Constraint::parse(expression) {
		Ok(c) => c,
		Err(e) => {
			log::debug!("constraint `{expression}` does not parse, resolving to nothing: {e}");
			return HashSet::new();
		}
	};
	db.valid_engine_versions()
		.iter()
		.filter(|entry| !entry.version.is_zero() && constraint.matches(&entry.version))
		.map(|entry| entry.id)
		.collect()
}

/// Recompute and persist `engine_versions` for one mod version.
///
/// Full replace of the association set, never an incremental patch, so a
/// redundant call (or one made after manual data corruption) always restores
/// the consistency invariant.
///
/// # Errors
/// Only [`MissingEntity`](crate::Error::MissingEntity) when `id` is unknown.
pub fn resolve(db: &mut CompatDatabase, id: VersionId) -> crate::Result<()> {
	let expression = db.version(id)
		.ok_or_else(|| crate::Error::MissingEntity(format!("version {id:?}")))?
		.spt_constraint()
		.to_string();
	let links = expected_links(db, &expression);
	db.replace_engine_links(id, links)
}
