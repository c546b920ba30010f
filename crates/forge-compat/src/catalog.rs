//! The catalog of published engine versions.
//!
//! The catalog is the ground truth for resolution and import validation: a
//! constraint is only ever meaningful relative to the engine versions that
//! currently exist. Two kinds of row are stored but never resolvable:
//!
//! - the `0.0.0` sentinel, a historical placeholder;
//! - rows with no publish date, which represent "not a real published version".
//!
//! [`VersionCatalog`] keeps the valid subset lazily cached in ascending order;
//! the owning database invalidates it on every engine-version write.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::version::SptVersion;

/// A unique identifier for engine version rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EngineVersionId(pub u64);

/// One published (or about to be published) engine version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineVersion {
	id: EngineVersionId,
	version: SptVersion,
	publish_date: Option<DateTime<Utc>>,
}

impl EngineVersion {
	pub fn new(id: EngineVersionId, version: SptVersion, publish_date: Option<DateTime<Utc>>) -> Self {
		Self { id, version, publish_date }
	}

	pub fn id(&self) -> EngineVersionId { self.id }
	pub fn version(&self) -> &SptVersion { &self.version }
	pub fn publish_date(&self) -> Option<DateTime<Utc>> { self.publish_date }
	pub(crate) fn set_publish_date(&mut self, publish_date: Option<DateTime<Utc>>) { self.publish_date = publish_date; }

	/// The `0.0.0` placeholder row.
	pub fn is_sentinel(&self) -> bool {
		self.version.is_zero()
	}

	/// Whether this row may ever appear in a resolved association set.
	pub fn is_valid_target(&self) -> bool {
		!self.is_sentinel() && self.publish_date.is_some()
	}

	/// Publish-date visibility: privileged viewers see unpublished and
	/// future-dated rows, everyone else only rows published by `now`. The
	/// sentinel is invisible to all viewers.
	pub fn is_visible_to(&self, privileged: bool, now: DateTime<Utc>) -> bool {
		if self.is_sentinel() { return false }
		if privileged { return true }
		matches!(self.publish_date, Some(date) if date <= now)
	}
}

/// A valid catalog entry as cached by [`VersionCatalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
	pub id: EngineVersionId,
	pub version: SptVersion,
}

/// Lazily cached view over the valid subset of the engine version table.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VersionCatalog {
	cached: Option<Vec<CatalogEntry>>,
}

impl VersionCatalog {
	/// Drop the cache. Called by the database on any engine-version write.
	pub fn invalidate(&mut self) {
		self.cached = None;
	}

	/// Rebuild the cache from the given rows if it was invalidated.
	pub fn fill<'a>(&mut self, rows: impl Iterator<Item = &'a EngineVersion>) {
		if self.cached.is_some() { return }
		let mut entries = rows
			.filter(|ev| ev.is_valid_target())
			.map(|ev| CatalogEntry { id: ev.id(), version: ev.version().clone() })
			.collect::<Vec<_>>();
		entries.sort_by(|a, b| a.version.cmp(&b.version));
		self.cached = Some(entries);
	}

	/// The valid entries, ascending. Empty until [`fill`](Self::fill) runs.
	pub fn entries(&self) -> &[CatalogEntry] {
		self.cached.as_deref().unwrap_or(&[])
	}

	/// Every valid version as a string, ascending. The form consumed by the
	/// importer.
	pub fn all_valid_versions(&self) -> Vec<String> {
		self.entries().iter().map(|e| e.version.to_string()).collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn row(id: u64, version: &str, published: bool) -> EngineVersion {
		let date = published.then(|| Utc::now() - chrono::Duration::days(1));
		EngineVersion::new(EngineVersionId(id), SptVersion::parse(version).unwrap(), date)
	}

	#[test]
	fn catalog_excludes_sentinel_and_unpublished() {
		let rows = vec![row(1, "0.0.0", true), row(2, "3.8.0", true), row(3, "3.9.0", false)];
		let mut catalog = VersionCatalog::default();
		catalog.fill(rows.iter());
		assert_eq!(catalog.all_valid_versions(), vec!["3.8.0".to_string()]);
	}

	#[test]
	fn catalog_sorts_ascending() {
		let rows = vec![row(1, "3.9.0", true), row(2, "3.7.1", true), row(3, "3.8.0", true)];
		let mut catalog = VersionCatalog::default();
		catalog.fill(rows.iter());
		assert_eq!(catalog.all_valid_versions(), vec!["3.7.1", "3.8.0", "3.9.0"]);
	}

	#[test]
	fn fill_is_lazy_until_invalidated() {
		let mut catalog = VersionCatalog::default();
		catalog.fill(vec![row(1, "3.8.0", true)].iter());
		/* stale rows are ignored until an invalidate */
		catalog.fill(vec![row(2, "3.9.0", true)].iter());
		assert_eq!(catalog.all_valid_versions(), vec!["3.8.0"]);
		catalog.invalidate();
		catalog.fill(vec![row(2, "3.9.0", true)].iter());
		assert_eq!(catalog.all_valid_versions(), vec!["3.9.0"]);
	}

	#[test]
	fn visibility_follows_publish_date() {
		let now = Utc::now();
		let published = row(1, "3.8.0", true);
		let unpublished = row(2, "3.9.0", false);
		let future = EngineVersion::new(EngineVersionId(3), SptVersion::parse("3.10.0").unwrap(), Some(now + chrono::Duration::days(7)));
		let sentinel = row(4, "0.0.0", true);

		assert!(published.is_visible_to(false, now));
		assert!(!unpublished.is_visible_to(false, now));
		assert!(!future.is_visible_to(false, now));
		assert!(unpublished.is_visible_to(true, now));
		assert!(future.is_visible_to(true, now));
		assert!(!sentinel.is_visible_to(true, now));
	}
}
