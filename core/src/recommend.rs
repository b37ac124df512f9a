//! Mode recommender: ranks layout strategies for the current graph
//! and viewport.
//!
//! Scores are additive: a strategy starts from its base and gains or
//! loses points per rule. Every rule that fires contributes one
//! human-readable reason. Scores are clamped to [0, 100].
//!
//! The thresholds below are the defaults of `RecommenderConfig`.

use crate::{
    config::{RecommenderConfig, TelemetryThresholds},
    graph::CorrelationGraph,
    layout::{StrategyKind, Viewport},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Radial ───────────────────────────────────────────────────────────────────

pub const RADIAL_BASE: f64 = 50.0;
pub const RADIAL_MAX_NODES: usize = 15;
pub const RADIAL_SMALL_BONUS: f64 = 25.0;
pub const RADIAL_OVERFLOW_PENALTY: f64 = 3.0; // per node beyond RADIAL_MAX_NODES
pub const RADIAL_OVERFLOW_PENALTY_CAP: f64 = 45.0;
pub const RADIAL_CENTRALITY_THRESHOLD: f64 = 0.5;
pub const RADIAL_CENTRALITY_BONUS: f64 = 20.0;

// ── Circular ─────────────────────────────────────────────────────────────────

pub const CIRCULAR_BASE: f64 = 45.0;
pub const CIRCULAR_MAX_NODES: usize = 20;
pub const CIRCULAR_SMALL_BONUS: f64 = 20.0;
pub const CIRCULAR_OPERATOR_DIVERSITY: usize = 2;
pub const CIRCULAR_OPERATOR_BONUS: f64 = 15.0;
pub const CIRCULAR_DENSITY_THRESHOLD: f64 = 0.3;
pub const CIRCULAR_DENSITY_BONUS: f64 = 10.0;
pub const CIRCULAR_CROWDED_NODES: usize = 30;
pub const CIRCULAR_CROWDED_PENALTY: f64 = 20.0;

// ── Linear ───────────────────────────────────────────────────────────────────

pub const LINEAR_BASE: f64 = 35.0;
pub const LINEAR_MAX_NODES: usize = 12;
pub const LINEAR_SMALL_BONUS: f64 = 20.0;
pub const LINEAR_SPARSE_DENSITY: f64 = 0.2;
pub const LINEAR_SPARSE_BONUS: f64 = 15.0;
pub const LINEAR_TIME_SPREAD_DAYS: f64 = 1.0;
pub const LINEAR_TIME_BONUS: f64 = 20.0;

// ── Hybrid and viewport ──────────────────────────────────────────────────────

pub const HYBRID_SCORE: f64 = 60.0;
pub const SQUARE_ASPECT_MIN: f64 = 0.75;
pub const SQUARE_ASPECT_MAX: f64 = 1.33;
pub const SQUARE_ASPECT_BONUS: f64 = 5.0;
pub const WIDE_ASPECT_RATIO: f64 = 1.5;
pub const WIDE_ASPECT_BONUS: f64 = 10.0;

pub const EMPTY_CONFIDENCE: f64 = 20.0;
pub const MAX_ALTERNATIVES: usize = 3;
const MAX_SCORE: f64 = 100.0;
const SECS_PER_DAY: f64 = 86_400.0;

// ── Telemetry ────────────────────────────────────────────────────────────────

pub const HEAVY_ZOOM: u32 = 10;
pub const HEAVY_PAN: u32 = 15;
pub const ENGAGED_CLICKS: u32 = 5;
pub const ENGAGED_DWELL_SECS: f64 = 60.0;
pub const IDLE_DWELL_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DataCharacteristics {
    pub node_count: usize,
    pub edge_count: usize,
    /// edges / (n(n-1)/2)
    pub connection_density: f64,
    pub time_spread_days: f64,
    pub operator_diversity: usize,
    /// Share of edges with the target as an endpoint.
    pub target_centrality: f64,
}

impl DataCharacteristics {
    pub fn from_graph(graph: &CorrelationGraph) -> Self {
        let node_count = graph.nodes.len();
        // Split halves share a pair; count each pair once.
        let pairs: BTreeSet<(&str, &str)> = graph
            .edges
            .iter()
            .map(|e| (e.source_id.as_str(), e.target_id.as_str()))
            .collect();
        let edge_count = pairs.len();

        let max_edges = node_count * node_count.saturating_sub(1) / 2;
        let connection_density = if max_edges == 0 {
            0.0
        } else {
            edge_count as f64 / max_edges as f64
        };

        let first = graph.edges.iter().map(|e| e.time_range.first).min();
        let last = graph.edges.iter().map(|e| e.time_range.last).max();
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (Some(f), Some(l)),
            _ => (
                graph.nodes.iter().filter_map(|n| n.last_interaction).min(),
                graph.nodes.iter().filter_map(|n| n.last_interaction).max(),
            ),
        };
        let time_spread_days = match (first, last) {
            (Some(f), Some(l)) => (l - f).num_seconds().max(0) as f64 / SECS_PER_DAY,
            _ => 0.0,
        };

        let operator_diversity = graph
            .nodes
            .iter()
            .flat_map(|n| n.operators.iter())
            .collect::<BTreeSet<_>>()
            .len();

        let target_centrality = match (graph.target_node(), edge_count) {
            (Some(target), count) if count > 0 => {
                pairs
                    .iter()
                    .filter(|(a, b)| *a == target.id || *b == target.id)
                    .count() as f64
                    / count as f64
            }
            _ => 0.0,
        };

        Self {
            node_count,
            edge_count,
            connection_density,
            time_spread_days,
            operator_diversity,
            target_centrality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyScore {
    pub strategy: StrategyKind,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    pub strategy: StrategyKind,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub recommended_strategy: StrategyKind,
    /// 0-100.
    pub confidence: u8,
    pub reasoning: String,
    pub alternatives: Vec<Alternative>,
    /// None when an override short-circuited the scoring.
    pub characteristics: Option<DataCharacteristics>,
}

/// Rank every strategy for `graph` in `viewport`. An override wins outright.
pub fn recommend(
    graph: &CorrelationGraph,
    viewport: &Viewport,
    user_override: Option<StrategyKind>,
    config: &RecommenderConfig,
) -> Recommendation {
    if let Some(strategy) = user_override {
        return Recommendation {
            recommended_strategy: strategy,
            confidence: MAX_SCORE as u8,
            reasoning: format!("User override: {strategy} layout selected explicitly"),
            alternatives: Vec::new(),
            characteristics: None,
        };
    }

    let characteristics = DataCharacteristics::from_graph(graph);
    if characteristics.node_count == 0 {
        return Recommendation {
            recommended_strategy: StrategyKind::Hybrid,
            confidence: config.empty_confidence.clamp(0.0, MAX_SCORE).round() as u8,
            reasoning: "No interaction data to analyse; defaulting to the hybrid layout".into(),
            alternatives: Vec::new(),
            characteristics: Some(characteristics),
        };
    }

    let mut ranked = score_strategies(&characteristics, viewport, config);
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.strategy.cmp(&b.strategy)));

    let best = ranked.remove(0);
    let alternatives = ranked
        .into_iter()
        .take(config.max_alternatives)
        .map(|s| Alternative {
            strategy: s.strategy,
            score: s.score,
            reason: s.reasons.join("; "),
        })
        .collect();

    log::debug!(
        "recommender: {} scores {:.0} for {} nodes / {} edges",
        best.strategy,
        best.score,
        characteristics.node_count,
        characteristics.edge_count
    );

    Recommendation {
        recommended_strategy: best.strategy,
        confidence: best.score.round() as u8,
        reasoning: best.reasons.join("; "),
        alternatives,
        characteristics: Some(characteristics),
    }
}

/// One score per strategy, in `StrategyKind::ALL` order.
pub fn score_strategies(
    data: &DataCharacteristics,
    viewport: &Viewport,
    config: &RecommenderConfig,
) -> Vec<StrategyScore> {
    StrategyKind::ALL
        .into_iter()
        .map(|strategy| {
            let (score, reasons) = match strategy {
                StrategyKind::Radial => score_radial(data, viewport, config),
                StrategyKind::Circular => score_circular(data, config),
                StrategyKind::Linear => score_linear(data, viewport, config),
                StrategyKind::Hybrid => (
                    config.hybrid_score,
                    vec!["Suitable for any graph: switches between circular and radial as it grows".into()],
                ),
            };
            StrategyScore {
                strategy,
                score: score.clamp(0.0, MAX_SCORE),
                reasons,
            }
        })
        .collect()
}

fn score_radial(data: &DataCharacteristics, viewport: &Viewport, c: &RecommenderConfig) -> (f64, Vec<String>) {
    let mut score = c.radial_base;
    let mut reasons = Vec::new();
    let n = data.node_count;

    if n <= c.radial_max_nodes {
        score += c.radial_small_bonus;
        reasons.push(format!("{n} nodes fit on a single ring around the target"));
    } else {
        let penalty = ((n - c.radial_max_nodes) as f64 * c.radial_overflow_penalty)
            .min(c.radial_overflow_penalty_cap);
        score -= penalty;
        reasons.push(format!("{n} nodes crowd a single ring"));
    }
    if data.target_centrality >= c.radial_centrality_threshold {
        score += c.radial_centrality_bonus;
        reasons.push(format!(
            "target takes part in {:.0}% of connections",
            data.target_centrality * 100.0
        ));
    }
    let aspect = viewport.aspect_ratio();
    if (c.square_aspect_min..=c.square_aspect_max).contains(&aspect) {
        score += c.square_aspect_bonus;
        reasons.push("near-square viewport suits a centred layout".into());
    }
    (score, reasons)
}

fn score_circular(data: &DataCharacteristics, c: &RecommenderConfig) -> (f64, Vec<String>) {
    let mut score = c.circular_base;
    let mut reasons = Vec::new();
    let n = data.node_count;

    if n <= c.circular_max_nodes {
        score += c.circular_small_bonus;
        reasons.push(format!("{n} nodes space evenly on one circle"));
    }
    if data.operator_diversity >= c.circular_operator_diversity {
        score += c.circular_operator_bonus;
        reasons.push(format!(
            "{} operators can be grouped into sectors",
            data.operator_diversity
        ));
    }
    if data.connection_density >= c.circular_density_threshold {
        score += c.circular_density_bonus;
        reasons.push(format!(
            "dense connections ({:.0}%) read well across a circle",
            data.connection_density * 100.0
        ));
    }
    if n > c.circular_crowded_nodes {
        score -= c.circular_crowded_penalty;
        reasons.push(format!("{n} nodes overcrowd the circle"));
    }
    if reasons.is_empty() {
        reasons.push("no circular-specific advantage".into());
    }
    (score, reasons)
}

fn score_linear(data: &DataCharacteristics, viewport: &Viewport, c: &RecommenderConfig) -> (f64, Vec<String>) {
    let mut score = c.linear_base;
    let mut reasons = Vec::new();

    if data.node_count <= c.linear_max_nodes {
        score += c.linear_small_bonus;
        reasons.push(format!("{} nodes fit on one axis", data.node_count));
    }
    if data.connection_density < c.linear_sparse_density {
        score += c.linear_sparse_bonus;
        reasons.push("sparse connections keep crossing edges rare".into());
    }
    if data.time_spread_days >= c.linear_time_spread_days {
        score += c.linear_time_bonus;
        reasons.push(format!(
            "activity spans {:.1} days, worth a timeline",
            data.time_spread_days
        ));
    }
    if viewport.aspect_ratio() >= c.wide_aspect_ratio {
        score += c.wide_aspect_bonus;
        reasons.push("wide viewport favours a horizontal axis".into());
    }
    if reasons.is_empty() {
        reasons.push("no linear-specific advantage".into());
    }
    (score, reasons)
}

// ── Adaptive, telemetry-driven advice ────────────────────────────────────────

/// What the user did with the current layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionTelemetry {
    pub current_strategy: StrategyKind,
    #[serde(default)]
    pub zoom_count: u32,
    #[serde(default)]
    pub pan_count: u32,
    #[serde(default)]
    pub click_count: u32,
    #[serde(default)]
    pub dwell_secs: f64,
}

/// Advisory only. Nothing in the crate applies a suggestion on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdaptiveAdvice {
    pub suggested: Option<StrategyKind>,
    pub reason: String,
}

pub fn adapt(
    recommendation: &Recommendation,
    telemetry: &InteractionTelemetry,
    thresholds: &TelemetryThresholds,
) -> AdaptiveAdvice {
    let current = telemetry.current_strategy;

    if telemetry.click_count >= thresholds.engaged_clicks
        && telemetry.dwell_secs >= thresholds.engaged_dwell_secs
    {
        return AdaptiveAdvice {
            suggested: None,
            reason: format!("User is actively exploring the {current} layout; keep it"),
        };
    }

    if telemetry.zoom_count >= thresholds.heavy_zoom {
        let spread = match current {
            StrategyKind::Radial => Some(StrategyKind::Circular),
            StrategyKind::Circular | StrategyKind::Hybrid => Some(StrategyKind::Linear),
            StrategyKind::Linear => None,
        };
        if let Some(next) = spread {
            return AdaptiveAdvice {
                suggested: Some(next),
                reason: format!(
                    "{} zoom actions suggest the {current} layout is too dense; try {next}",
                    telemetry.zoom_count
                ),
            };
        }
    }

    if telemetry.pan_count >= thresholds.heavy_pan && current != StrategyKind::Radial {
        return AdaptiveAdvice {
            suggested: Some(StrategyKind::Radial),
            reason: format!(
                "{} pan actions suggest the {current} layout overflows the viewport; radial is more compact",
                telemetry.pan_count
            ),
        };
    }

    if telemetry.dwell_secs < thresholds.idle_dwell_secs
        && recommendation.recommended_strategy != current
    {
        return AdaptiveAdvice {
            suggested: Some(recommendation.recommended_strategy),
            reason: format!(
                "Short session on {current}; the scored recommendation is {}",
                recommendation.recommended_strategy
            ),
        };
    }

    AdaptiveAdvice {
        suggested: None,
        reason: "No change suggested".into(),
    }
}
