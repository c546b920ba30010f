//! In-memory reference implementation of the persistence interface.
//!
//! The marketplace application owns the real tables; this crate only needs
//! CRUD over mods, mod versions, dependency constraints and engine versions,
//! plus a "replace all members of an association set" operation and the
//! reverse lookup "which versions depend on mod X". [`CompatDatabase`]
//! implements exactly that surface so the resolvers and the tests have
//! something concrete to run against.
//!
//! Every mutation pushes a typed [`ChangeEvent`] onto an internal queue that
//! [`ChangePropagator`](crate::propagator::ChangePropagator) drains; explicit
//! subscription instead of hidden framework observers. Association-set
//! replacement never emits events, which is what keeps the propagator free of
//! feedback loops.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::catalog::{CatalogEntry, EngineVersion, EngineVersionId, VersionCatalog};
use crate::version::SptVersion;

mod dependency_index;
use dependency_index::DependencyIndex;

/// A unique identifier for mod (and addon) listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModId(pub u64);

/// A unique identifier for mod version rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId(pub u64);

/// A unique identifier for dependency constraint rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyId(pub u64);

/// A mod or addon listing. Versions hang off it; an addon is a listing whose
/// `owner` points at the mod it extends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mod {
	id: ModId,
	name: String,
	owner: Option<ModId>,
	versions: Vec<VersionId>,
}

impl Mod {
	pub fn id(&self) -> ModId { self.id }
	pub fn name(&self) -> &str { &self.name }
	pub fn owner(&self) -> Option<ModId> { self.owner }
	pub fn versions(&self) -> &[VersionId] { &self.versions }
}

/// One published version of a mod.
///
/// `engine_versions` and each dependency's `satisfied_versions` are *derived*
/// sets: they must always equal what re-evaluating the constraints against
/// the current data would produce. Only the resolvers write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModVersion {
	id: VersionId,
	mod_id: ModId,
	/// The mod's own version label. Mods use arbitrary strings here; only
	/// semantic-version shaped ones can ever satisfy a dependency constraint.
	version: String,
	/// Raw engine compatibility expression, possibly empty.
	spt_constraint: String,
	engine_versions: HashSet<EngineVersionId>,
	dependencies: Vec<Dependency>,
}

impl ModVersion {
	pub fn id(&self) -> VersionId { self.id }
	pub fn mod_id(&self) -> ModId { self.mod_id }
	pub fn version(&self) -> &str { &self.version }
	pub fn spt_constraint(&self) -> &str { &self.spt_constraint }
	pub fn engine_versions(&self) -> &HashSet<EngineVersionId> { &self.engine_versions }
	pub fn dependencies(&self) -> &[Dependency] { &self.dependencies }

	pub fn dependency(&self, id: DependencyId) -> Option<&Dependency> {
		self.dependencies.iter().find(|d| d.id == id)
	}
}

/// A declared dependency of one mod version on some other mod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
	id: DependencyId,
	target_mod: ModId,
	expression: String,
	satisfied_versions: HashSet<VersionId>,
}

impl Dependency {
	pub fn id(&self) -> DependencyId { self.id }
	pub fn target_mod(&self) -> ModId { self.target_mod }
	pub fn expression(&self) -> &str { &self.expression }
	pub fn satisfied_versions(&self) -> &HashSet<VersionId> { &self.satisfied_versions }
}

/// Lifecycle events emitted by the database mutations.
///
/// Consumed by [`ChangePropagator`](crate::propagator::ChangePropagator);
/// handlers are idempotent, so redelivery is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
	VersionCreated(VersionId),
	VersionUpdated {
		id: VersionId,
		constraint_changed: bool,
		version_changed: bool,
	},
	VersionDeleted {
		id: VersionId,
		mod_id: ModId,
	},
	DependencySaved {
		owner: VersionId,
	},
	DependencyDeleted {
		owner: VersionId,
	},
	EngineVersionSaved(EngineVersionId),
	EngineVersionDeleted(EngineVersionId),
	/// An addon was attached to a different parent listing.
	ModReparented(ModId),
}

/// Diff-and-apply replacement of an association set.
///
/// Returns `(added, removed)` counts; leaves `current` untouched when the sets
/// already agree so redundant resolves cost no writes.
fn replace_links<T: Eq + std::hash::Hash + Copy>(current: &mut HashSet<T>, new: HashSet<T>) -> (usize, usize) {
	let added = new.difference(current).count();
	let removed = current.difference(&new).count();
	if added != 0 || removed != 0 {
		*current = new;
	}
	(added, removed)
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CompatDatabase {
	mods: HashMap<ModId, Mod>,
	versions: HashMap<VersionId, ModVersion>,
	engine_versions: HashMap<EngineVersionId, EngineVersion>,
	dependency_index: DependencyIndex,
	catalog: VersionCatalog,
	#[serde(skip)]
	events: Vec<ChangeEvent>,
	next_id: u64,
}

impl CompatDatabase {
	pub fn new() -> Self {
		Self::default()
	}

	fn next_id(&mut self) -> u64 {
		self.next_id += 1;
		self.next_id
	}

	fn emit(&mut self, event: ChangeEvent) {
		self.events.push(event);
	}

	/// Drains the pending lifecycle events in emission order.
	pub fn take_events(&mut self) -> Vec<ChangeEvent> {
		std::mem::take(&mut self.events)
	}

	/* Mods */

	pub fn add_mod(&mut self, name: impl Into<String>, owner: Option<ModId>) -> ModId {
		let id = ModId(self.next_id());
		self.mods.insert(id, Mod { id, name: name.into(), owner, versions: Vec::new() });
		id
	}

	pub fn get_mod(&self, id: ModId) -> Option<&Mod> {
		self.mods.get(&id)
	}

	/// Attach `mod_id` to a different parent listing. Every child version of
	/// the moved entity gets re-resolved by the propagator.
	pub fn reparent_mod(&mut self, mod_id: ModId, new_owner: Option<ModId>) -> crate::Result<()> {
		let entry = self.mods.get_mut(&mod_id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("mod {mod_id:?}")))?;
		entry.owner = new_owner;
		self.emit(ChangeEvent::ModReparented(mod_id));
		Ok(())
	}

	/* Mod versions */

	pub fn add_version(&mut self, mod_id: ModId, version: impl Into<String>, spt_constraint: impl Into<String>) -> crate::Result<VersionId> {
		if !self.mods.contains_key(&mod_id) {
			return Err(crate::Error::MissingEntity(format!("mod {mod_id:?}")));
		}
		let id = VersionId(self.next_id());
		self.versions.insert(id, ModVersion {
			id,
			mod_id,
			version: version.into(),
			spt_constraint: spt_constraint.into(),
			engine_versions: HashSet::new(),
			dependencies: Vec::new(),
		});
		self.mods.get_mut(&mod_id).expect("presence checked above").versions.push(id);
		self.emit(ChangeEvent::VersionCreated(id));
		Ok(id)
	}

	pub fn version(&self, id: VersionId) -> Option<&ModVersion> {
		self.versions.get(&id)
	}

	pub fn all_version_ids(&self) -> Vec<VersionId> {
		let mut ids = self.versions.keys().copied().collect::<Vec<_>>();
		ids.sort();
		ids
	}

	pub fn versions_of_mod(&self, mod_id: ModId) -> Vec<VersionId> {
		self.mods.get(&mod_id).map(|m| m.versions.clone()).unwrap_or_default()
	}

	/// Update a version row. `None` leaves a field untouched; the emitted
	/// event carries per-field change flags, and nothing is emitted when the
	/// write was a no-op.
	pub fn update_version(&mut self, id: VersionId, version: Option<&str>, spt_constraint: Option<&str>) -> crate::Result<()> {
		let row = self.versions.get_mut(&id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {id:?}")))?;

		let version_changed = match version {
			Some(v) if v != row.version => { row.version = v.to_string(); true },
			_ => false,
		};
		let constraint_changed = match spt_constraint {
			Some(c) if c != row.spt_constraint => { row.spt_constraint = c.to_string(); true },
			_ => false,
		};

		if version_changed || constraint_changed {
			self.emit(ChangeEvent::VersionUpdated { id, constraint_changed, version_changed });
		}
		Ok(())
	}

	pub fn remove_version(&mut self, id: VersionId) -> crate::Result<()> {
		let row = self.versions.remove(&id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {id:?}")))?;
		if let Some(parent) = self.mods.get_mut(&row.mod_id) {
			parent.versions.retain(|v| *v != id);
		}
		self.dependency_index.remove_version(id);
		self.emit(ChangeEvent::VersionDeleted { id, mod_id: row.mod_id });
		Ok(())
	}

	/* Dependency constraints */

	pub fn add_dependency(&mut self, owner: VersionId, target_mod: ModId, expression: impl Into<String>) -> crate::Result<DependencyId> {
		if !self.mods.contains_key(&target_mod) {
			return Err(crate::Error::MissingEntity(format!("mod {target_mod:?}")));
		}
		let id = DependencyId(self.next_id());
		let owner_mod = {
			let row = self.versions.get_mut(&owner)
				.ok_or_else(|| crate::Error::MissingEntity(format!("version {owner:?}")))?;
			row.dependencies.push(Dependency {
				id,
				target_mod,
				expression: expression.into(),
				satisfied_versions: HashSet::new(),
			});
			row.mod_id
		};
		self.dependency_index.add_dependency(owner, owner_mod, id, target_mod);
		self.emit(ChangeEvent::DependencySaved { owner });
		Ok(id)
	}

	pub fn update_dependency(&mut self, owner: VersionId, id: DependencyId, expression: &str) -> crate::Result<()> {
		let row = self.versions.get_mut(&owner)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {owner:?}")))?;
		let dep = row.dependencies.iter_mut().find(|d| d.id == id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("dependency {id:?}")))?;
		if dep.expression != expression {
			dep.expression = expression.to_string();
			self.emit(ChangeEvent::DependencySaved { owner });
		}
		Ok(())
	}

	pub fn remove_dependency(&mut self, owner: VersionId, id: DependencyId) -> crate::Result<()> {
		let row = self.versions.get_mut(&owner)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {owner:?}")))?;
		let before = row.dependencies.len();
		row.dependencies.retain(|d| d.id != id);
		if row.dependencies.len() == before {
			return Err(crate::Error::MissingEntity(format!("dependency {id:?}")));
		}
		self.dependency_index.remove_dependency(id);
		self.emit(ChangeEvent::DependencyDeleted { owner });
		Ok(())
	}

	/// Every version holding a dependency constraint aimed at `mod_id`.
	pub fn dependents_of(&self, mod_id: ModId) -> Vec<VersionId> {
		self.dependency_index.dependents_of(mod_id)
	}

	/* Engine versions */

	pub fn add_engine_version(&mut self, version: SptVersion, publish_date: Option<DateTime<Utc>>) -> EngineVersionId {
		let id = EngineVersionId(self.next_id());
		self.engine_versions.insert(id, EngineVersion::new(id, version, publish_date));
		self.catalog.invalidate();
		self.emit(ChangeEvent::EngineVersionSaved(id));
		id
	}

	pub fn engine_version(&self, id: EngineVersionId) -> Option<&EngineVersion> {
		self.engine_versions.get(&id)
	}

	pub fn update_engine_version(&mut self, id: EngineVersionId, publish_date: Option<DateTime<Utc>>) -> crate::Result<()> {
		let row = self.engine_versions.get_mut(&id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("engine version {id:?}")))?;
		row.set_publish_date(publish_date);
		self.catalog.invalidate();
		self.emit(ChangeEvent::EngineVersionSaved(id));
		Ok(())
	}

	pub fn remove_engine_version(&mut self, id: EngineVersionId) -> crate::Result<()> {
		self.engine_versions.remove(&id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("engine version {id:?}")))?;
		self.catalog.invalidate();
		self.emit(ChangeEvent::EngineVersionDeleted(id));
		Ok(())
	}

	/// The valid catalog entries, ascending, from the lazy cache.
	pub fn valid_engine_versions(&mut self) -> &[CatalogEntry] {
		self.catalog.fill(self.engine_versions.values());
		self.catalog.entries()
	}

	/// Every valid engine version as a string, ascending.
	pub fn all_valid_versions(&mut self) -> Vec<String> {
		self.catalog.fill(self.engine_versions.values());
		self.catalog.all_valid_versions()
	}

	/// Engine versions a viewer may list, ascending. See
	/// [`EngineVersion::is_visible_to`] for the rule.
	pub fn visible_engine_versions(&self, privileged: bool) -> Vec<&EngineVersion> {
		let now = Utc::now();
		let mut rows = self.engine_versions
			.values()
			.filter(|ev| ev.is_visible_to(privileged, now))
			.collect::<Vec<_>>();
		rows.sort_by(|a, b| a.version().cmp(b.version()));
		rows
	}

	/* Association sets; written only by the resolvers */

	pub(crate) fn replace_engine_links(&mut self, id: VersionId, new: HashSet<EngineVersionId>) -> crate::Result<()> {
		let row = self.versions.get_mut(&id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {id:?}")))?;
		let (added, removed) = replace_links(&mut row.engine_versions, new);
		if added != 0 || removed != 0 {
			log::debug!("engine links for version {}: {} added, {} removed", id.0, added, removed);
		}
		Ok(())
	}

	pub(crate) fn replace_dependency_links(&mut self, owner: VersionId, id: DependencyId, new: HashSet<VersionId>) -> crate::Result<()> {
		let row = self.versions.get_mut(&owner)
			.ok_or_else(|| crate::Error::MissingEntity(format!("version {owner:?}")))?;
		let dep = row.dependencies.iter_mut().find(|d| d.id == id)
			.ok_or_else(|| crate::Error::MissingEntity(format!("dependency {id:?}")))?;
		let (added, removed) = replace_links(&mut dep.satisfied_versions, new);
		if added != 0 || removed != 0 {
			log::debug!("satisfied versions for dependency {}: {} added, {} removed", id.0, added, removed);
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn version(s: &str) -> SptVersion { SptVersion::parse(s).unwrap() }

	#[test]
	fn update_version_flags_only_changed_fields() {
		let mut db = CompatDatabase::new();
		let m = db.add_mod("SAIN", None);
		let v = db.add_version(m, "1.0.0", "~3.8.0").unwrap();
		db.take_events();

		db.update_version(v, None, Some("~3.9.0")).unwrap();
		assert_eq!(db.take_events(), vec![ChangeEvent::VersionUpdated { id: v, constraint_changed: true, version_changed: false }]);

		/* no-op write emits nothing */
		db.update_version(v, Some("1.0.0"), Some("~3.9.0")).unwrap();
		assert!(db.take_events().is_empty());
	}

	#[test]
	fn engine_version_writes_invalidate_catalog() {
		let mut db = CompatDatabase::new();
		let date = Some(Utc::now());
		db.add_engine_version(version("3.8.0"), date);
		assert_eq!(db.all_valid_versions(), vec!["3.8.0"]);
		db.add_engine_version(version("3.7.0"), date);
		assert_eq!(db.all_valid_versions(), vec!["3.7.0", "3.8.0"]);
		let id = db.add_engine_version(version("3.9.0"), date);
		db.remove_engine_version(id).unwrap();
		assert_eq!(db.all_valid_versions(), vec!["3.7.0", "3.8.0"]);
	}

	#[test]
	fn replace_links_is_a_diff() {
		let mut current: HashSet<u32> = [1, 2, 3].into_iter().collect();
		assert_eq!(replace_links(&mut current, [2, 3, 4].into_iter().collect()), (1, 1));
		assert_eq!(current, HashSet::from([2, 3, 4]));
		assert_eq!(replace_links(&mut current, [2, 3, 4].into_iter().collect()), (0, 0));
	}

	#[test]
	fn removing_a_version_unhooks_its_dependencies() {
		let mut db = CompatDatabase::new();
		let target = db.add_mod("SAIN", None);
		let owner = db.add_mod("QuestingBots", None);
		let v = db.add_version(owner, "1.0.0", "").unwrap();
		db.add_dependency(v, target, "^1.0.0").unwrap();
		assert_eq!(db.dependents_of(target), vec![v]);

		db.remove_version(v).unwrap();
		assert!(db.dependents_of(target).is_empty());
		assert!(db.versions_of_mod(owner).is_empty());
	}
}
