//! Folds a batch of oracle items into the graph.
//!
//! Targets are resolved by case-insensitive label so re-generated concepts
//! attach to their existing node instead of duplicating it. Edges dedup by
//! unordered endpoint pair; self-loops are suppressed. New nodes are seeded
//! near the source's current position so they enter the simulation where
//! the user is looking.

use std::f64::consts::PI;

use log::warn;

use super::model::{ConceptEdge, ConceptGraph, GeneratedItem, NodeId, NODE_COLORS};

/// What a merge changed, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
	pub nodes_added: usize,
	pub edges_added: usize,
}

/// Merge `items` into `graph`, anchored at `source`.
///
/// A missing `source` is a caller error but never fatal: nodes are still
/// created, only the edges for this batch are skipped. Total over its
/// inputs, no error paths.
pub fn merge(
	graph: &mut ConceptGraph,
	source: NodeId,
	source_pos: (f64, f64),
	items: &[GeneratedItem],
) -> MergeOutcome {
	let source_present = graph.contains(source);
	if !source_present && !items.is_empty() {
		warn!("merge: source {source} is not in the graph, adding nodes without edges");
	}

	let mut outcome = MergeOutcome::default();
	for (slot, item) in items.iter().enumerate() {
		let label = item.label.trim();
		if label.is_empty() {
			continue;
		}

		let target = match graph.find_by_label(label) {
			Some(existing) => {
				// First writer wins: never clobber a cached explanation.
				if let (Some(node), Some(explanation)) =
					(graph.node_mut(existing), item.explanation.as_ref())
				{
					if node.explanation.is_none() {
						node.explanation = Some(explanation.clone());
					}
				}
				existing
			}
			None => {
				let color = NODE_COLORS[graph.nodes.len() % NODE_COLORS.len()].to_string();
				let position = seed_position(source_pos, label, slot);
				outcome.nodes_added += 1;
				graph.add_node(label, color, Some(position), item.explanation.clone())
			}
		};

		if source_present && target != source && !graph.has_edge_between(source, target) {
			graph.edges.push(ConceptEdge {
				source,
				target,
				relation: item.relation.clone(),
				kind: item.kind,
			});
			outcome.edges_added += 1;
		}
	}
	outcome
}

/// Place a new node on a ring around its source, scattered deterministically
/// from the label and batch slot so merge stays pure.
fn seed_position(origin: (f64, f64), label: &str, slot: usize) -> (f64, f64) {
	let seed = label
		.bytes()
		.fold(slot, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
	let angle = scatter(seed) * 2.0 * PI;
	let radius = 50.0 + scatter(seed.wrapping_add(1)) * 40.0;
	(
		origin.0 + radius * angle.cos(),
		origin.1 + radius * angle.sin(),
	)
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn scatter(seed: usize) -> f64 {
	let x = seed.wrapping_add(1).wrapping_mul(9301).wrapping_add(49297) % 233280;
	(x as f64) / 233280.0
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::model::RelationKind;

	fn item(label: &str, relation: &str, kind: RelationKind) -> GeneratedItem {
		GeneratedItem {
			label: label.to_string(),
			relation: relation.to_string(),
			kind,
			explanation: None,
		}
	}

	fn item_with_explanation(label: &str, explanation: &str) -> GeneratedItem {
		GeneratedItem {
			explanation: Some(explanation.to_string()),
			..item(label, "related to", RelationKind::Neutral)
		}
	}

	fn rooted(label: &str) -> (ConceptGraph, NodeId) {
		let mut g = ConceptGraph::new();
		let root = g.reset_to_root(label);
		(g, root)
	}

	#[test]
	fn empty_batch_is_a_no_op() {
		let (mut g, root) = rooted("Octopus");
		let before = g.clone();
		let outcome = merge(&mut g, root, (0.0, 0.0), &[]);
		assert_eq!(g, before);
		assert_eq!(outcome, MergeOutcome::default());
	}

	#[test]
	fn new_labels_create_nodes_and_edges() {
		let (mut g, root) = rooted("Octopus");
		let outcome = merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[
				item("Cephalopod", "is a type of", RelationKind::Hierarchical),
				item("Mimic Octopus", "related species", RelationKind::Neutral),
			],
		);
		assert_eq!(outcome, MergeOutcome { nodes_added: 2, edges_added: 2 });
		assert_eq!(g.nodes.len(), 3);
		assert_eq!(g.edges.len(), 2);
		assert!(g.edges.iter().all(|e| e.source == root));
	}

	#[test]
	fn duplicate_labels_within_a_batch_collapse() {
		let (mut g, root) = rooted("Octopus");
		let outcome = merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[
				item("Ink", "produces", RelationKind::Causal),
				item("ink", "squirts", RelationKind::Neutral),
			],
		);
		assert_eq!(outcome.nodes_added, 1);
		assert_eq!(outcome.edges_added, 1);
		assert_eq!(g.nodes.len(), 2);
		assert_eq!(g.edges.len(), 1);
	}

	#[test]
	fn reexpansion_with_different_case_reuses_the_node() {
		let (mut g, root) = rooted("Octopus");
		merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[
				item("Cephalopod", "is a type of", RelationKind::Hierarchical),
				item("Mimic Octopus", "related species", RelationKind::Neutral),
			],
		);
		let outcome = merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[item("cephalopod", "is a type of", RelationKind::Hierarchical)],
		);
		assert_eq!(outcome, MergeOutcome::default());
		assert_eq!(g.nodes.len(), 3);
		assert_eq!(g.edges.len(), 2);
	}

	#[test]
	fn reversed_edges_count_as_duplicates() {
		let (mut g, root) = rooted("Octopus");
		merge(&mut g, root, (0.0, 0.0), &[item("Kraken", "myth of", RelationKind::Neutral)]);
		let kraken = g.find_by_label("kraken").unwrap();

		let outcome = merge(
			&mut g,
			kraken,
			(0.0, 0.0),
			&[item("octopus", "inspired by", RelationKind::Neutral)],
		);
		assert_eq!(outcome.edges_added, 0);
		assert_eq!(g.edges.len(), 1);
	}

	#[test]
	fn self_loops_are_suppressed() {
		let (mut g, root) = rooted("Octopus");
		let outcome = merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[item("octopus", "is itself", RelationKind::Neutral)],
		);
		assert_eq!(outcome, MergeOutcome::default());
		assert_eq!(g.nodes.len(), 1);
		assert!(g.edges.is_empty());
	}

	#[test]
	fn backfill_fills_missing_explanations_only() {
		let (mut g, root) = rooted("Octopus");
		merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[item_with_explanation("Cephalopod", "A marine mollusc class.")],
		);
		let id = g.find_by_label("cephalopod").unwrap();
		assert_eq!(
			g.node(id).unwrap().explanation.as_deref(),
			Some("A marine mollusc class.")
		);

		merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[item_with_explanation("cephalopod", "Some other text.")],
		);
		assert_eq!(
			g.node(id).unwrap().explanation.as_deref(),
			Some("A marine mollusc class."),
			"an existing cached explanation must never be overwritten"
		);
	}

	#[test]
	fn missing_source_adds_nodes_but_no_edges() {
		let mut g = ConceptGraph::new();
		// Ids stay unique across resets, so this one is gone after the second
		// reset but can never collide with a live node.
		let ghost = g.reset_to_root("Ghost");
		let _root = g.reset_to_root("Octopus");
		let outcome = merge(
			&mut g,
			ghost,
			(0.0, 0.0),
			&[item("Cephalopod", "is a type of", RelationKind::Hierarchical)],
		);
		assert_eq!(outcome.nodes_added, 1);
		assert_eq!(outcome.edges_added, 0);
		assert!(g.edges.is_empty());
	}

	#[test]
	fn blank_labels_are_skipped() {
		let (mut g, root) = rooted("Octopus");
		let outcome = merge(
			&mut g,
			root,
			(0.0, 0.0),
			&[item("  ", "is", RelationKind::Neutral), item("Ink", "produces", RelationKind::Causal)],
		);
		assert_eq!(outcome.nodes_added, 1);
		assert_eq!(g.nodes.len(), 2);
	}

	#[test]
	fn new_nodes_are_seeded_near_the_source() {
		let (mut g, root) = rooted("Octopus");
		merge(
			&mut g,
			root,
			(200.0, -80.0),
			&[item("Cephalopod", "is a type of", RelationKind::Hierarchical)],
		);
		let id = g.find_by_label("cephalopod").unwrap();
		let (x, y) = g.node(id).unwrap().position.unwrap();
		let dist = ((x - 200.0).powi(2) + (y + 80.0).powi(2)).sqrt();
		assert!(dist >= 50.0 && dist <= 90.0, "seeded {dist} world units away");
	}

	#[test]
	fn existing_nodes_keep_their_order() {
		let (mut g, root) = rooted("Octopus");
		merge(&mut g, root, (0.0, 0.0), &[item("Ink", "produces", RelationKind::Causal)]);
		merge(&mut g, root, (0.0, 0.0), &[item("Kraken", "myth of", RelationKind::Neutral)]);
		let labels: Vec<&str> = g.nodes.iter().map(|n| n.label.as_str()).collect();
		assert_eq!(labels, vec!["Octopus", "Ink", "Kraken"]);
	}
}
