//! Graph builder: turns an `Aggregation` into the node and edge lists
//! consumed by the layout engine, the recommender and the host renderer.

use crate::{
    aggregate::{Aggregation, Connection, Direction, NumberProfile},
    config::{FilterConfig, ScoringConfig},
    record::GeoPoint,
    score::{score_profile, CorrelationLevel, ScoreBreakdown},
    types::{CellId, PhoneNumber, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MIN_STRENGTH: u64 = 1;
const MAX_STRENGTH: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: PhoneNumber,
    pub is_target: bool,
    pub correlation_level: CorrelationLevel,
    pub score: ScoreBreakdown,
    pub interaction_count: u64,
    pub incoming_count: u64,
    pub outgoing_count: u64,
    pub total_duration_secs: u64,
    pub unique_counterparts: usize,
    pub operators: Vec<String>,
    pub cell_ids: Vec<CellId>,
    pub last_interaction: Option<Timestamp>,
    pub geo: Option<GeoPoint>,
}

impl GraphNode {
    fn from_profile(profile: &NumberProfile, scoring: &ScoringConfig) -> Self {
        let score = score_profile(profile, scoring);
        Self {
            id: profile.number.clone(),
            is_target: profile.is_target,
            correlation_level: score.level,
            score,
            interaction_count: profile.interaction_count,
            incoming_count: profile.incoming_count,
            outgoing_count: profile.outgoing_count,
            total_duration_secs: profile.total_duration_secs,
            unique_counterparts: profile.counterparts.len(),
            operators: profile.operators.iter().cloned().collect(),
            cell_ids: profile.cell_ids.iter().cloned().collect(),
            last_interaction: profile.last_interaction,
            geo: profile.geo_mean(),
        }
    }

    /// Operators are kept sorted, so this is the smallest name.
    pub fn primary_operator(&self) -> Option<&str> {
        self.operators.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub first: Timestamp,
    pub last: Timestamp,
}

impl TimeRange {
    pub fn span_secs(&self) -> i64 {
        (self.last - self.first).num_seconds()
    }
}

/// `source_id` is the connection's anchor, `target_id` the other end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source_id: PhoneNumber,
    pub target_id: PhoneNumber,
    pub direction: Direction,
    pub call_count: u64,
    pub total_duration_secs: u64,
    pub strength_weight: u8,
    pub cell_ids: Vec<CellId>,
    pub time_range: TimeRange,
}

impl GraphEdge {
    fn from_connection(connection: &Connection) -> Self {
        Self {
            id: connection.key.edge_id(),
            source_id: connection.anchor.clone(),
            target_id: connection.other.clone(),
            direction: connection.direction(),
            call_count: connection.call_count,
            total_duration_secs: connection.total_duration_secs,
            strength_weight: strength_weight(connection.call_count),
            cell_ids: connection.cell_ids.iter().cloned().collect(),
            time_range: TimeRange {
                first: connection.first_seen,
                last: connection.last_seen,
            },
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source_id == id || self.target_id == id
    }

    /// Materialize a bidirectional edge as an outgoing and an incoming
    /// half. The outgoing half takes the ceiling. Other edges pass through.
    pub fn split(&self) -> Vec<GraphEdge> {
        if self.direction != Direction::Bidirectional {
            return vec![self.clone()];
        }
        let (out_calls, in_calls) = split_count(self.call_count);
        let (out_secs, in_secs) = split_count(self.total_duration_secs);
        let half = |suffix: &str, direction, calls, secs| GraphEdge {
            id: format!("{}:{suffix}", self.id),
            direction,
            call_count: calls,
            total_duration_secs: secs,
            strength_weight: strength_weight(calls),
            ..self.clone()
        };
        vec![
            half("out", Direction::Outgoing, out_calls, out_secs),
            half("in", Direction::Incoming, in_calls, in_secs),
        ]
    }
}

/// Ceiling first, floor second. The halves always sum to `total`.
pub fn split_count(total: u64) -> (u64, u64) {
    (total.div_ceil(2), total / 2)
}

/// clamp(call_count × 2, 1, 10)
pub fn strength_weight(call_count: u64) -> u8 {
    call_count.saturating_mul(2).clamp(MIN_STRENGTH, MAX_STRENGTH) as u8
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorrelationGraph {
    pub target: Option<PhoneNumber>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl CorrelationGraph {
    pub fn empty(target: Option<&str>) -> Self {
        Self {
            target: target.map(str::to_string),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn target_node(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.is_target)
    }

    /// Every bidirectional edge replaced by its two halves.
    pub fn split_bidirectional_edges(&self) -> Vec<GraphEdge> {
        self.edges.iter().flat_map(GraphEdge::split).collect()
    }

    pub fn total_call_count(&self) -> u64 {
        self.edges.iter().map(|e| e.call_count).sum()
    }
}

/// Apply the filter, score every retained number, resolve edges.
pub fn build_graph(
    aggregation: &Aggregation,
    filter: &FilterConfig,
    scoring: &ScoringConfig,
) -> CorrelationGraph {
    if aggregation.is_empty() {
        return CorrelationGraph::empty(aggregation.target());
    }

    let retained: BTreeSet<&str> = aggregation
        .profiles()
        .values()
        .filter(|p| p.is_target || p.interaction_count >= filter.min_interactions)
        .map(|p| p.number.as_str())
        .collect();

    let mut edges: Vec<GraphEdge> = aggregation
        .connections()
        .values()
        .filter(|c| {
            retained.contains(c.key.first())
                && retained.contains(c.key.second())
                && c.call_count >= filter.min_connection_count
        })
        .map(GraphEdge::from_connection)
        .collect();

    let connected: BTreeSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source_id.as_str(), e.target_id.as_str()])
        .collect();

    let nodes: Vec<GraphNode> = aggregation
        .profiles()
        .values()
        .filter(|p| retained.contains(p.number.as_str()))
        .filter(|p| filter.show_isolated || p.is_target || connected.contains(p.number.as_str()))
        .map(|p| GraphNode::from_profile(p, scoring))
        .collect();

    if filter.split_bidirectional {
        edges = edges.iter().flat_map(GraphEdge::split).collect();
    }
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    log::info!(
        "graph: {} of {} numbers, {} edges (filtered {} connections)",
        nodes.len(),
        aggregation.profiles().len(),
        edges.len(),
        aggregation.connections().len().saturating_sub(connected_pairs(&edges)),
    );

    CorrelationGraph {
        target: aggregation.target().map(str::to_string),
        nodes,
        edges,
    }
}

fn connected_pairs(edges: &[GraphEdge]) -> usize {
    edges
        .iter()
        .map(|e| (e.source_id.as_str(), e.target_id.as_str()))
        .collect::<BTreeSet<_>>()
        .len()
}
