use std::collections::{HashMap, HashSet};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::gesture::GestureState;
use crate::graph::model::{ConceptGraph, NodeId};

pub const NODE_RADIUS: f64 = 6.0;
pub const ROOT_RADIUS: f64 = 9.0;
pub const HIT_RADIUS: f64 = 14.0;

#[derive(Clone, Debug)]
pub struct NodeVisual {
	pub id: NodeId,
	pub label: String,
	pub color: String,
	pub is_root: bool,
}

/// Render-side record of one edge; the simulation itself only knows spring
/// endpoints.
#[derive(Clone, Debug)]
pub struct SimEdge {
	pub a: DefaultNodeIdx,
	pub b: DefaultNodeIdx,
	pub rgb: (u8, u8, u8),
	pub relation: String,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

pub struct ConceptGraphState {
	pub graph: ForceGraph<NodeVisual, ()>,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub hover: HoverState,
	pub gesture: GestureState,
	/// Browser handle of the pending long-press timer, if any.
	pub long_press_timer: Option<i32>,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	edges: Vec<SimEdge>,
	id_to_idx: HashMap<NodeId, DefaultNodeIdx>,
	/// World position of the interacting node at pin time.
	drag_origin: Option<(f32, f32)>,
	loading: HashSet<DefaultNodeIdx>,
	generation: u64,
	synced_nodes: usize,
	synced_edges: usize,
}

impl ConceptGraphState {
	pub fn new(data: &ConceptGraph, width: f64, height: f64) -> Self {
		let graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});

		let mut state = Self {
			graph,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			pan: PanState::default(),
			hover: HoverState::default(),
			gesture: GestureState::new(),
			long_press_timer: None,
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			edges: Vec::new(),
			id_to_idx: HashMap::new(),
			drag_origin: None,
			loading: HashSet::new(),
			generation: data.generation(),
			synced_nodes: 0,
			synced_edges: 0,
		};
		state.sync(data);
		state
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn edges(&self) -> &[SimEdge] {
		&self.edges
	}

	/// Pull nodes and edges the data graph gained since the last sync.
	/// The data graph only appends between resets, so existing simulation
	/// positions are never disturbed.
	pub fn sync(&mut self, data: &ConceptGraph) {
		for node in &data.nodes[self.synced_nodes.min(data.nodes.len())..] {
			let (x, y) = node.position.unwrap_or((0.0, 0.0));
			let is_root = self.id_to_idx.is_empty();
			let idx = self.graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeVisual {
					id: node.id,
					label: node.label.clone(),
					color: node.color.clone(),
					is_root,
				},
			});
			self.id_to_idx.insert(node.id, idx);
		}
		self.synced_nodes = data.nodes.len();

		for edge in &data.edges[self.synced_edges.min(data.edges.len())..] {
			if let (Some(&a), Some(&b)) = (
				self.id_to_idx.get(&edge.source),
				self.id_to_idx.get(&edge.target),
			) {
				self.graph.add_edge(a, b, EdgeData::default());
				self.edges.push(SimEdge {
					a,
					b,
					rgb: edge.kind.rgb(),
					relation: edge.relation.clone(),
				});
			}
		}
		self.synced_edges = data.edges.len();
	}

	pub fn set_loading(&mut self, ids: &HashSet<NodeId>) {
		self.loading = ids
			.iter()
			.filter_map(|id| self.id_to_idx.get(id).copied())
			.collect();
	}

	pub fn is_loading(&self, idx: DefaultNodeIdx) -> bool {
		self.loading.contains(&idx)
	}

	pub fn has_loading(&self) -> bool {
		!self.loading.is_empty()
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn node_id_at(&self, sx: f64, sy: f64) -> Option<NodeId> {
		let idx = self.node_at_position(sx, sy)?;
		let mut id = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				id = Some(node.data.user_data.id);
			}
		});
		id
	}

	pub fn node_position(&self, id: NodeId) -> Option<(f64, f64)> {
		let idx = *self.id_to_idx.get(&id)?;
		let mut position = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				position = Some((node.x() as f64, node.y() as f64));
			}
		});
		position
	}

	/// Anchor the node against the simulation and remember where it was, so
	/// drag offsets apply from a stable origin.
	pub fn pin_node(&mut self, id: NodeId) {
		let Some(&idx) = self.id_to_idx.get(&id) else {
			return;
		};
		let mut origin = None;
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = true;
				origin = Some((node.data.x, node.data.y));
			}
		});
		self.drag_origin = origin;
	}

	pub fn unpin_node(&mut self, id: NodeId) {
		if let Some(&idx) = self.id_to_idx.get(&id) {
			self.graph.visit_nodes_mut(|node| {
				if node.index() == idx {
					node.data.is_anchor = false;
				}
			});
		}
		self.drag_origin = None;
	}

	/// Track the pointer during a drag. `dx`/`dy` are screen px from the
	/// press point; the view scale maps them into world units.
	pub fn drag_node(&mut self, id: NodeId, dx: f64, dy: f64) {
		let Some(&idx) = self.id_to_idx.get(&id) else {
			return;
		};
		let Some((ox, oy)) = self.drag_origin else {
			return;
		};
		let (nx, ny) = (
			ox + (dx / self.transform.k) as f32,
			oy + (dy / self.transform.k) as f32,
		);
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = nx;
				node.data.y = ny;
				node.data.is_anchor = true;
			}
		});
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.edges {
				if edge.a == idx {
					self.hover.neighbors.insert(edge.b);
				} else if edge.b == idx {
					self.hover.neighbors.insert(edge.a);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
