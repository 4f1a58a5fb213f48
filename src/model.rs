//! Relationship graph data model as delivered by the analysis service.

use std::collections::{BTreeMap, HashSet};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;

/// Role of a node in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// The single central entity the graph is built around.
	Subject,
	/// A contact related to the subject.
	Peer,
}

/// Semantic cluster a peer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RelationshipCategory {
	/// Closest, most important relationships.
	Core,
	/// Working partners.
	Collaboration,
	/// Professional acquaintances.
	Networking,
	/// Recently added contacts.
	New,
	/// Friends and family.
	Personal,
	/// Contacts without recent interaction.
	Dormant,
}

impl RelationshipCategory {
	/// Every category in sector order.
	pub const ALL: [Self; 6] = [
		Self::Core,
		Self::Collaboration,
		Self::Networking,
		Self::New,
		Self::Personal,
		Self::Dormant,
	];

	/// Wire name of the category.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Core => "core",
			Self::Collaboration => "collaboration",
			Self::Networking => "networking",
			Self::New => "new",
			Self::Personal => "personal",
			Self::Dormant => "dormant",
		}
	}

	/// Position of the category in the six-way partition of the circle.
	pub fn sector(self) -> usize {
		match self {
			Self::Core => 0,
			Self::Collaboration => 1,
			Self::Networking => 2,
			Self::New => 3,
			Self::Personal => 4,
			Self::Dormant => 5,
		}
	}

	/// Angle in radians the clustering force steers this category towards.
	pub fn target_angle(self) -> f64 {
		self.sector() as f64 * (PI / 3.0)
	}
}

impl fmt::Display for RelationshipCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RelationshipCategory {
	type Err = GraphError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|category| category.as_str() == value)
			.ok_or_else(|| GraphError::UnknownCategory(value.to_owned()))
	}
}

impl TryFrom<String> for RelationshipCategory {
	type Error = GraphError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

/// Banded classification of a peer score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
	/// 80 and above.
	A,
	/// 65 to 79.
	B,
	/// 50 to 64.
	C,
	/// 35 to 49.
	D,
	/// 20 to 34.
	E,
	/// Below 20.
	F,
}

impl Grade {
	/// Band a score into a grade.
	pub fn from_score(score: u8) -> Self {
		match score {
			80..=u8::MAX => Self::A,
			65..=79 => Self::B,
			50..=64 => Self::C,
			35..=49 => Self::D,
			20..=34 => Self::E,
			_ => Self::F,
		}
	}
}

/// A subject or peer as delivered by the analysis service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	/// Unique node id.
	pub id: String,
	/// Subject or peer.
	pub kind: NodeKind,
	/// Display label.
	pub label: String,
	/// Relationship strength, 0 to 100. Peers only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub score: Option<u8>,
	/// Grade band, derived from `score` when the service omits it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub grade: Option<Grade>,
	/// Semantic cluster. Peers only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub relationship_category: Option<RelationshipCategory>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[allow(missing_docs)]
	pub company: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[allow(missing_docs)]
	pub summary: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	#[allow(missing_docs)]
	pub reasoning: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	#[allow(missing_docs)]
	pub strengths: Vec<String>,
}

impl GraphNode {
	/// Whether this is the central node.
	pub fn is_subject(&self) -> bool {
		self.kind == NodeKind::Subject
	}

	/// Score clamped to 0..=100, zero when absent.
	pub fn score_or_zero(&self) -> u8 {
		self.score.unwrap_or(0).min(100)
	}

	/// Explicit grade or the band derived from the score. Subjects have none.
	pub fn effective_grade(&self) -> Option<Grade> {
		if self.is_subject() {
			return None;
		}
		self.grade.or_else(|| self.score.map(Grade::from_score))
	}
}

/// Link from the subject to a peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
	/// Subject id.
	pub source: String,
	/// Peer id.
	pub target: String,
}

/// Nodes and edges of one analysis result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationGraph {
	#[allow(missing_docs)]
	pub nodes: Vec<GraphNode>,
	#[allow(missing_docs)]
	pub edges: Vec<GraphEdge>,
	/// Opaque service metadata.
	#[serde(default)]
	pub metadata: Value,
}

impl RelationGraph {
	/// Check the structural invariants: unique ids, exactly one subject, peers carry a category,
	/// and every edge connects existing nodes with a peer target.
	pub fn validate(&self) -> Result<(), GraphError> {
		let mut ids = HashSet::with_capacity(self.nodes.len());
		let mut subjects = 0usize;
		for node in &self.nodes {
			if !ids.insert(node.id.as_str()) {
				return Err(GraphError::DuplicateNode(node.id.clone()));
			}
			match node.kind {
				NodeKind::Subject => subjects += 1,
				NodeKind::Peer if node.relationship_category.is_none() => {
					return Err(GraphError::MissingCategory(node.id.clone()));
				}
				NodeKind::Peer => {}
			}
		}

		match subjects {
			0 => return Err(GraphError::MissingSubject),
			1 => {}
			count => return Err(GraphError::MultipleSubjects(count)),
		}

		for edge in &self.edges {
			let target_is_peer = self
				.node(&edge.target)
				.is_some_and(|node| node.kind == NodeKind::Peer);
			if !ids.contains(edge.source.as_str()) || !target_is_peer {
				return Err(GraphError::DanglingEdge {
					from: edge.source.clone(),
					to: edge.target.clone(),
				});
			}
		}
		Ok(())
	}

	/// Look a node up by id.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|node| node.id == id)
	}

	/// The central node, if present.
	pub fn subject(&self) -> Option<&GraphNode> {
		self.nodes.iter().find(|node| node.is_subject())
	}

	/// All peer nodes in payload order.
	pub fn peers(&self) -> impl Iterator<Item = &GraphNode> {
		self.nodes.iter().filter(|node| !node.is_subject())
	}

	/// Subject plus the `limit` highest scoring peers, with the edges between kept nodes.
	/// Ties break on id so the result is stable.
	pub fn top_peers(&self, limit: usize) -> RelationGraph {
		let mut ranked = self.peers().collect::<Vec<_>>();
		ranked.sort_by(|a, b| {
			b.score_or_zero()
				.cmp(&a.score_or_zero())
				.then_with(|| a.id.cmp(&b.id))
		});
		ranked.truncate(limit);

		let mut kept = ranked.iter().map(|node| node.id.as_str()).collect::<HashSet<_>>();
		let mut nodes = Vec::with_capacity(ranked.len() + 1);
		if let Some(subject) = self.subject() {
			kept.insert(subject.id.as_str());
			nodes.push(subject.clone());
		}
		nodes.extend(ranked.into_iter().cloned());

		let edges = self
			.edges
			.iter()
			.filter(|edge| {
				kept.contains(edge.source.as_str()) && kept.contains(edge.target.as_str())
			})
			.cloned()
			.collect();

		RelationGraph {
			nodes,
			edges,
			metadata: self.metadata.clone(),
		}
	}

	/// Peers grouped by category, each group sorted by descending score.
	pub fn group_by_category(&self) -> BTreeMap<RelationshipCategory, Vec<&GraphNode>> {
		let mut groups: BTreeMap<RelationshipCategory, Vec<&GraphNode>> = BTreeMap::new();
		for node in self.peers() {
			if let Some(category) = node.relationship_category {
				groups.entry(category).or_default().push(node);
			}
		}
		for group in groups.values_mut() {
			group.sort_by(|a, b| b.score_or_zero().cmp(&a.score_or_zero()));
		}
		groups
	}
}

/// Aggregate statistics over the analyzed peers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphSummary {
	#[allow(missing_docs)]
	pub total_analyzed: u32,
	#[allow(missing_docs)]
	pub avg_score: f64,
	#[allow(missing_docs)]
	pub max_score: u8,
	/// Peer count per category name.
	pub type_distribution: BTreeMap<String, u32>,
}

impl GraphSummary {
	/// Recompute the summary for the peers of `graph`, e.g. after top-K filtering.
	pub fn from_graph(graph: &RelationGraph) -> Self {
		let mut summary = Self::default();
		let mut total = 0u64;
		for node in graph.peers() {
			let score = node.score_or_zero();
			summary.total_analyzed += 1;
			summary.max_score = summary.max_score.max(score);
			total += u64::from(score);
			if let Some(category) = node.relationship_category {
				*summary
					.type_distribution
					.entry(category.as_str().to_owned())
					.or_default() += 1;
			}
		}
		if summary.total_analyzed > 0 {
			summary.avg_score = total as f64 / f64::from(summary.total_analyzed);
		}
		summary
	}
}

/// Full payload of a successful analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResult {
	#[allow(missing_docs)]
	pub graph: RelationGraph,
	#[serde(default)]
	#[allow(missing_docs)]
	pub summary: GraphSummary,
	/// Signals the scoring service took into account.
	#[serde(default)]
	pub used_features: Vec<String>,
	#[serde(default)]
	#[allow(missing_docs)]
	pub feedback_loop: Value,
	#[serde(default)]
	#[allow(missing_docs)]
	pub quality: Value,
}
