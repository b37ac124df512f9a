use crate::{
    aggregate::DirectionAttribution,
    layout::{LabelMode, LinearSortKey, Orientation, StrategyKind},
    recommend,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

// ── Filtering ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Numbers with fewer interactions are dropped. The target never is.
    pub min_interactions: u64,
    /// Connections with fewer calls are dropped.
    pub min_connection_count: u64,
    /// Keep numbers left without any connection after filtering.
    pub show_isolated: bool,
    /// Emit bidirectional connections as two directed edges.
    pub split_bidirectional: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_interactions: 0,
            min_connection_count: 0,
            show_isolated: true,
            split_bidirectional: false,
        }
    }
}

// ── Correlation scoring ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub frequency_weight: f64,
    pub partner_weight: f64,
    pub duration_weight: f64,
    /// Interaction count at which frequency saturates.
    pub frequency_cap: f64,
    /// Distinct counterparts at which partner diversity saturates.
    pub partner_cap: f64,
    /// Average duration (seconds) at which the duration score saturates.
    pub duration_cap_secs: f64,
    pub operator_bonus: f64,
    pub geo_bonus: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
    pub low_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            frequency_weight: 0.4,
            partner_weight: 0.3,
            duration_weight: 0.2,
            frequency_cap: 10.0,
            partner_cap: 5.0,
            duration_cap_secs: 300.0,
            operator_bonus: 0.3,
            geo_bonus: 0.2,
            high_threshold: 0.8,
            medium_threshold: 0.6,
            low_threshold: 0.3,
        }
    }
}

// ── Layout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinearConfig {
    pub sort_key: LinearSortKey,
    pub orientation: Orientation,
    pub time_proportional: bool,
    /// Preferred gap between neighbours in fixed-spacing mode.
    pub spacing: f64,
    /// Cross-axis shift for crowded nodes in time-proportional mode.
    pub lane_offset: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            sort_key: LinearSortKey::Time,
            orientation: Orientation::Horizontal,
            time_proportional: false,
            spacing: 80.0,
            lane_offset: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JitterConfig {
    pub seed: u64,
    pub amplitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub strategy: StrategyKind,
    pub node_size: f64,
    pub node_spacing: f64,
    pub padding: f64,
    /// Rings never go below this unless the viewport is too small.
    pub min_radius: f64,
    /// Radians; -π/2 puts the first node at twelve o'clock.
    pub start_angle: f64,
    pub group_by_operator: bool,
    /// Hybrid uses circular up to and including this many nodes.
    pub hybrid_threshold: usize,
    pub label_mode: LabelMode,
    pub linear: LinearConfig,
    pub jitter: Option<JitterConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Hybrid,
            node_size: 24.0,
            node_spacing: 16.0,
            padding: 40.0,
            min_radius: 60.0,
            start_angle: -FRAC_PI_2,
            group_by_operator: false,
            hybrid_threshold: 8,
            label_mode: LabelMode::FullNumber,
            linear: LinearConfig::default(),
            jitter: None,
        }
    }
}

// ── Mode recommender ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommenderConfig {
    pub radial_base: f64,
    pub radial_max_nodes: usize,
    pub radial_small_bonus: f64,
    pub radial_overflow_penalty: f64,
    pub radial_overflow_penalty_cap: f64,
    pub radial_centrality_threshold: f64,
    pub radial_centrality_bonus: f64,

    pub circular_base: f64,
    pub circular_max_nodes: usize,
    pub circular_small_bonus: f64,
    pub circular_operator_diversity: usize,
    pub circular_operator_bonus: f64,
    pub circular_density_threshold: f64,
    pub circular_density_bonus: f64,
    pub circular_crowded_nodes: usize,
    pub circular_crowded_penalty: f64,

    pub linear_base: f64,
    pub linear_max_nodes: usize,
    pub linear_small_bonus: f64,
    pub linear_sparse_density: f64,
    pub linear_sparse_bonus: f64,
    pub linear_time_spread_days: f64,
    pub linear_time_bonus: f64,

    pub hybrid_score: f64,

    pub square_aspect_min: f64,
    pub square_aspect_max: f64,
    pub square_aspect_bonus: f64,
    pub wide_aspect_ratio: f64,
    pub wide_aspect_bonus: f64,

    pub empty_confidence: f64,
    pub max_alternatives: usize,

    pub telemetry: TelemetryThresholds,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            radial_base: recommend::RADIAL_BASE,
            radial_max_nodes: recommend::RADIAL_MAX_NODES,
            radial_small_bonus: recommend::RADIAL_SMALL_BONUS,
            radial_overflow_penalty: recommend::RADIAL_OVERFLOW_PENALTY,
            radial_overflow_penalty_cap: recommend::RADIAL_OVERFLOW_PENALTY_CAP,
            radial_centrality_threshold: recommend::RADIAL_CENTRALITY_THRESHOLD,
            radial_centrality_bonus: recommend::RADIAL_CENTRALITY_BONUS,

            circular_base: recommend::CIRCULAR_BASE,
            circular_max_nodes: recommend::CIRCULAR_MAX_NODES,
            circular_small_bonus: recommend::CIRCULAR_SMALL_BONUS,
            circular_operator_diversity: recommend::CIRCULAR_OPERATOR_DIVERSITY,
            circular_operator_bonus: recommend::CIRCULAR_OPERATOR_BONUS,
            circular_density_threshold: recommend::CIRCULAR_DENSITY_THRESHOLD,
            circular_density_bonus: recommend::CIRCULAR_DENSITY_BONUS,
            circular_crowded_nodes: recommend::CIRCULAR_CROWDED_NODES,
            circular_crowded_penalty: recommend::CIRCULAR_CROWDED_PENALTY,

            linear_base: recommend::LINEAR_BASE,
            linear_max_nodes: recommend::LINEAR_MAX_NODES,
            linear_small_bonus: recommend::LINEAR_SMALL_BONUS,
            linear_sparse_density: recommend::LINEAR_SPARSE_DENSITY,
            linear_sparse_bonus: recommend::LINEAR_SPARSE_BONUS,
            linear_time_spread_days: recommend::LINEAR_TIME_SPREAD_DAYS,
            linear_time_bonus: recommend::LINEAR_TIME_BONUS,

            hybrid_score: recommend::HYBRID_SCORE,

            square_aspect_min: recommend::SQUARE_ASPECT_MIN,
            square_aspect_max: recommend::SQUARE_ASPECT_MAX,
            square_aspect_bonus: recommend::SQUARE_ASPECT_BONUS,
            wide_aspect_ratio: recommend::WIDE_ASPECT_RATIO,
            wide_aspect_bonus: recommend::WIDE_ASPECT_BONUS,

            empty_confidence: recommend::EMPTY_CONFIDENCE,
            max_alternatives: recommend::MAX_ALTERNATIVES,

            telemetry: TelemetryThresholds::default(),
        }
    }
}

/// Thresholds for the advisory, telemetry-driven recommender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryThresholds {
    pub heavy_zoom: u32,
    pub heavy_pan: u32,
    pub engaged_clicks: u32,
    pub engaged_dwell_secs: f64,
    pub idle_dwell_secs: f64,
}

impl Default for TelemetryThresholds {
    fn default() -> Self {
        Self {
            heavy_zoom: recommend::HEAVY_ZOOM,
            heavy_pan: recommend::HEAVY_PAN,
            engaged_clicks: recommend::ENGAGED_CLICKS,
            engaged_dwell_secs: recommend::ENGAGED_DWELL_SECS,
            idle_dwell_secs: recommend::IDLE_DWELL_SECS,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub attribution: DirectionAttribution,
    pub filter: FilterConfig,
    pub scoring: ScoringConfig,
    pub layout: LayoutConfig,
    pub recommender: RecommenderConfig,
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing sections and fields take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content).map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can work with: non-positive node size,
    /// negative spacing and unordered score thresholds.
    pub fn validate(&self) -> anyhow::Result<()> {
        let layout = &self.layout;
        if !(layout.node_size.is_finite() && layout.node_size > 0.0) {
            anyhow::bail!("layout.node_size must be positive, got {}", layout.node_size);
        }
        for (name, value) in [
            ("layout.node_spacing", layout.node_spacing),
            ("layout.padding", layout.padding),
            ("layout.min_radius", layout.min_radius),
            ("layout.linear.spacing", layout.linear.spacing),
            ("layout.linear.lane_offset", layout.linear.lane_offset),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("{name} must be non-negative, got {value}");
            }
        }
        let s = &self.scoring;
        if !(s.low_threshold <= s.medium_threshold && s.medium_threshold <= s.high_threshold) {
            anyhow::bail!(
                "scoring thresholds must be ordered low <= medium <= high, got {} / {} / {}",
                s.low_threshold,
                s.medium_threshold,
                s.high_threshold
            );
        }
        Ok(())
    }
}
