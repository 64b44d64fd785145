use std::fmt;

/// Node fill colors, assigned round-robin as nodes are created.
pub const NODE_COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Opaque node identity, allocated by [`ConceptGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "n{}", self.0)
	}
}

/// Category of a relation, as reported by the oracle.
///
/// Unknown category strings map to [`RelationKind::Neutral`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RelationKind {
	Hierarchical,
	Compositional,
	Causal,
	#[default]
	Neutral,
}

impl RelationKind {
	pub fn from_label(label: &str) -> Self {
		match label.trim().to_ascii_lowercase().as_str() {
			"hierarchical" => Self::Hierarchical,
			"compositional" => Self::Compositional,
			"causal" => Self::Causal,
			_ => Self::Neutral,
		}
	}

	/// Edge stroke color for this relation category.
	pub fn rgb(self) -> (u8, u8, u8) {
		match self {
			Self::Hierarchical => (100, 180, 255),
			Self::Compositional => (123, 211, 137),
			Self::Causal => (255, 159, 67),
			Self::Neutral => (154, 165, 177),
		}
	}
}

/// A concept in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ConceptNode {
	pub id: NodeId,
	/// Display label, case-preserved. Dedup compares labels case-insensitively.
	pub label: String,
	pub color: String,
	/// Seed position for the simulation, kept across updates so existing
	/// nodes don't jump when the graph grows.
	pub position: Option<(f64, f64)>,
	/// Cached explanation, written at most once per session.
	pub explanation: Option<String>,
}

/// A relation between two concepts. Undirected for dedup purposes.
#[derive(Clone, Debug, PartialEq)]
pub struct ConceptEdge {
	pub source: NodeId,
	pub target: NodeId,
	pub relation: String,
	pub kind: RelationKind,
}

/// One related-concept record produced by the oracle. Consumed immediately
/// by the merge step, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedItem {
	pub label: String,
	pub relation: String,
	pub kind: RelationKind,
	pub explanation: Option<String>,
}

/// The explorer's graph: nodes unique by id and by case-insensitive label,
/// edges unique by unordered endpoint pair.
///
/// The graph starts empty, is reset to a single root on a new search, and
/// only grows between resets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConceptGraph {
	pub nodes: Vec<ConceptNode>,
	pub edges: Vec<ConceptEdge>,
	next_id: u64,
	generation: u64,
}

impl ConceptGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bumped on every reset; the renderer rebuilds its simulation when it
	/// sees a new generation and syncs incrementally otherwise.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Drop everything and start over with a single root node.
	pub fn reset_to_root(&mut self, label: &str) -> NodeId {
		self.nodes.clear();
		self.edges.clear();
		self.generation += 1;
		self.add_node(label, NODE_COLORS[0].to_string(), Some((0.0, 0.0)), None)
	}

	pub fn add_node(
		&mut self,
		label: &str,
		color: String,
		position: Option<(f64, f64)>,
		explanation: Option<String>,
	) -> NodeId {
		let id = NodeId(self.next_id);
		self.next_id += 1;
		self.nodes.push(ConceptNode {
			id,
			label: label.trim().to_string(),
			color,
			position,
			explanation,
		});
		id
	}

	pub fn node(&self, id: NodeId) -> Option<&ConceptNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ConceptNode> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.iter().any(|n| n.id == id)
	}

	/// Case-insensitive label lookup. This is the dedup key when merging
	/// generated items into the graph.
	pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
		let needle = label.trim().to_lowercase();
		self.nodes
			.iter()
			.find(|n| n.label.to_lowercase() == needle)
			.map(|n| n.id)
	}

	/// True if an edge between `a` and `b` exists in either direction.
	pub fn has_edge_between(&self, a: NodeId, b: NodeId) -> bool {
		self.edges
			.iter()
			.any(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn label_lookup_is_case_insensitive() {
		let mut g = ConceptGraph::new();
		let id = g.add_node("Cephalopod", "#fff".into(), None, None);
		assert_eq!(g.find_by_label("cephalopod"), Some(id));
		assert_eq!(g.find_by_label("  CEPHALOPOD "), Some(id));
		assert_eq!(g.find_by_label("squid"), None);
	}

	#[test]
	fn edge_lookup_ignores_direction() {
		let mut g = ConceptGraph::new();
		let a = g.add_node("a", "#fff".into(), None, None);
		let b = g.add_node("b", "#fff".into(), None, None);
		g.edges.push(ConceptEdge {
			source: a,
			target: b,
			relation: "relates to".into(),
			kind: RelationKind::Neutral,
		});
		assert!(g.has_edge_between(a, b));
		assert!(g.has_edge_between(b, a));
	}

	#[test]
	fn reset_clears_and_bumps_generation() {
		let mut g = ConceptGraph::new();
		g.add_node("old", "#fff".into(), None, None);
		let r#gen = g.generation();
		let root = g.reset_to_root("Octopus");
		assert_eq!(g.nodes.len(), 1);
		assert!(g.edges.is_empty());
		assert_eq!(g.generation(), r#gen + 1);
		assert_eq!(g.node(root).map(|n| n.label.as_str()), Some("Octopus"));
	}

	#[test]
	fn node_ids_stay_unique_across_resets() {
		let mut g = ConceptGraph::new();
		let first = g.reset_to_root("a");
		let second = g.reset_to_root("b");
		assert_ne!(first, second);
	}

	#[test]
	fn unknown_relation_kinds_fall_back_to_neutral() {
		assert_eq!(RelationKind::from_label("hierarchical"), RelationKind::Hierarchical);
		assert_eq!(RelationKind::from_label(" Causal "), RelationKind::Causal);
		assert_eq!(RelationKind::from_label("sibling"), RelationKind::Neutral);
		assert_eq!(RelationKind::from_label(""), RelationKind::Neutral);
	}
}
