//! Reverse orientation of the dependency graph.
//!
//! The resolvers need "which versions depend on mod X" cheaply whenever X's
//! version list changes. Edges point from the depending mod to the target mod
//! and carry the owning version and dependency row, so the reverse fan-out is
//! a walk of a node's incoming edges.

use petgraph::prelude::*;
use petgraph::visit::IntoEdgeReferences;
use serde::{Serialize, Deserialize};

use super::{ModId, VersionId, DependencyId};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeData {
	owner: VersionId,
	dependency: DependencyId,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DependencyIndex {
	graph: StableDiGraph<ModId, EdgeData>,
}

impl DependencyIndex {
	fn get_node_index(&self, mod_id: ModId) -> Option<NodeIndex> {
		self.graph
			.node_indices()
			.find(|i| self.graph[*i] == mod_id)
	}

	/// Returns the index of the existing node or a fresh node for `mod_id`.
	fn get_or_add_node_index(&mut self, mod_id: ModId) -> NodeIndex {
		self.get_node_index(mod_id)
			.unwrap_or_else(|| self.graph.add_node(mod_id))
	}

	pub fn add_dependency(&mut self, owner: VersionId, owner_mod: ModId, dependency: DependencyId, target: ModId) {
		let src = self.get_or_add_node_index(owner_mod);
		let dst = self.get_or_add_node_index(target);
		self.graph.add_edge(src, dst, EdgeData { owner, dependency });
	}

	pub fn remove_dependency(&mut self, dependency: DependencyId) {
		let edge = self.graph
			.edge_references()
			.find(|e| e.weight().dependency == dependency)
			.map(|e| e.id());
		if let Some(id) = edge {
			self.graph.remove_edge(id);
		}
	}

	/// Drops every edge owned by `version`. Used when a version row is deleted.
	pub fn remove_version(&mut self, version: VersionId) {
		let edges = self.graph
			.edge_references()
			.filter(|e| e.weight().owner == version)
			.map(|e| e.id())
			.collect::<Vec<_>>();
		for id in edges {
			self.graph.remove_edge(id);
		}
	}

	/// Every version holding a dependency constraint aimed at `mod_id`,
	/// deduplicated and in a stable order.
	pub fn dependents_of(&self, mod_id: ModId) -> Vec<VersionId> {
		let Some(node) = self.get_node_index(mod_id) else { return Vec::new() };
		let mut owners = self.graph
			.edges_directed(node, Incoming)
			.map(|e| e.weight().owner)
			.collect::<Vec<_>>();
		owners.sort();
		owners.dedup();
		owners
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn dependents_walk_incoming_edges() {
		let mut index = DependencyIndex::default();
		index.add_dependency(VersionId(10), ModId(1), DependencyId(100), ModId(2));
		index.add_dependency(VersionId(11), ModId(1), DependencyId(101), ModId(2));
		index.add_dependency(VersionId(20), ModId(3), DependencyId(102), ModId(2));
		index.add_dependency(VersionId(20), ModId(3), DependencyId(103), ModId(1));

		assert_eq!(index.dependents_of(ModId(2)), vec![VersionId(10), VersionId(11), VersionId(20)]);
		assert_eq!(index.dependents_of(ModId(1)), vec![VersionId(20)]);
		assert!(index.dependents_of(ModId(99)).is_empty());
	}

	#[test]
	fn removal_by_dependency_and_by_version() {
		let mut index = DependencyIndex::default();
		index.add_dependency(VersionId(10), ModId(1), DependencyId(100), ModId(2));
		index.add_dependency(VersionId(10), ModId(1), DependencyId(101), ModId(3));
		index.add_dependency(VersionId(11), ModId(1), DependencyId(102), ModId(2));

		index.remove_dependency(DependencyId(100));
		assert_eq!(index.dependents_of(ModId(2)), vec![VersionId(11)]);

		index.remove_version(VersionId(10));
		assert!(index.dependents_of(ModId(3)).is_empty());
	}
}
