//! Layout engine: 2D placement of graph nodes.
//!
//! RULES:
//!   - Every strategy is a pure function of (nodes, viewport, config).
//!     No strategy keeps state between calls.
//!   - Input order never matters: each strategy sorts by stable keys
//!     with the node id as the final tie-break.
//!   - Every position lies inside the viewport minus the effective padding.
//!
//! Strategies implement `LayoutStrategy`. `compute_layout` is the single
//! entry point used by the analyzer.

pub mod circular;
pub mod hybrid;
pub mod jitter;
pub mod linear;
pub mod radial;

use crate::{
    config::LayoutConfig,
    error::{AnalysisError, AnalysisResult},
    graph::GraphNode,
    score::CorrelationLevel,
    types::PhoneNumber,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, f64::consts::TAU, fmt, str::FromStr};

pub use circular::CircularLayout;
pub use hybrid::HybridLayout;
pub use linear::LinearLayout;
pub use radial::RadialLayout;

// ── Size multipliers ─────────────────────────────────────────────────────────

const TARGET_SIZE_FACTOR: f64 = 1.5;
const HIGH_SIZE_FACTOR: f64 = 1.2;
const MEDIUM_SIZE_FACTOR: f64 = 1.1;
const LOW_SIZE_FACTOR: f64 = 0.8;

/// Tolerance used by `Viewport::contains`.
const BOUNDS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Radial,
    Circular,
    Linear,
    Hybrid,
}

impl StrategyKind {
    /// Fixed order, also used to break recommendation ties.
    pub const ALL: [StrategyKind; 4] = [Self::Radial, Self::Circular, Self::Linear, Self::Hybrid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Radial => "radial",
            Self::Circular => "circular",
            Self::Linear => "linear",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "radial" => Ok(Self::Radial),
            "circular" => Ok(Self::Circular),
            "linear" | "timeline" => Ok(Self::Linear),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(AnalysisError::UnknownStrategy { name: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinearSortKey {
    #[default]
    Time,
    Importance,
    Alphabetical,
    Operator,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    #[default]
    FullNumber,
    LastDigits,
    Operator,
    Hidden,
}

const LAST_DIGITS: usize = 4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn on_circle(center: Point, radius: f64, angle: f64) -> Self {
        Self {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> AnalysisResult<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(AnalysisError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Padding shrinks so the usable box never inverts.
    pub fn effective_padding(&self, padding: f64) -> f64 {
        padding.max(0.0).min(self.width.min(self.height) / 2.0)
    }

    /// Largest ring radius that keeps every point inside the padded box.
    pub fn max_radius(&self, padding: f64) -> f64 {
        (self.width.min(self.height) / 2.0 - self.effective_padding(padding)).max(0.0)
    }

    pub fn clamp(&self, point: Point, padding: f64) -> Point {
        let pad = self.effective_padding(padding);
        Point::new(
            point.x.clamp(pad, self.width - pad),
            point.y.clamp(pad, self.height - pad),
        )
    }

    pub fn contains(&self, point: &Point, padding: f64) -> bool {
        let pad = self.effective_padding(padding);
        point.x >= pad - BOUNDS_EPSILON
            && point.x <= self.width - pad + BOUNDS_EPSILON
            && point.y >= pad - BOUNDS_EPSILON
            && point.y <= self.height - pad + BOUNDS_EPSILON
    }
}

/// A node with its computed placement. Built fresh on every layout run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutNode {
    pub id: PhoneNumber,
    pub is_target: bool,
    pub correlation_level: CorrelationLevel,
    pub interaction_count: u64,
    pub position: Point,
    pub size_hint: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    pub requested: StrategyKind,
    /// Differs from `requested` only for hybrid.
    pub applied: StrategyKind,
    pub viewport: Viewport,
    pub nodes: Vec<LayoutNode>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.node(id).map(|n| n.position)
    }
}

/// The seam every layout variant implements.
pub trait LayoutStrategy {
    fn kind(&self) -> StrategyKind;

    /// The strategy that actually places `node_count` nodes.
    fn applied_kind(&self, _node_count: usize, _config: &LayoutConfig) -> StrategyKind {
        self.kind()
    }

    fn compute_positions(
        &self,
        nodes: &[GraphNode],
        viewport: &Viewport,
        config: &LayoutConfig,
    ) -> Vec<LayoutNode>;
}

pub fn strategy_for(kind: StrategyKind) -> Box<dyn LayoutStrategy> {
    match kind {
        StrategyKind::Radial => Box::new(RadialLayout),
        StrategyKind::Circular => Box::new(CircularLayout),
        StrategyKind::Linear => Box::new(LinearLayout),
        StrategyKind::Hybrid => Box::new(HybridLayout),
    }
}

/// Run the configured strategy, then jitter (if enabled) and clamp.
pub fn compute_layout(nodes: &[GraphNode], viewport: &Viewport, config: &LayoutConfig) -> Layout {
    let strategy = strategy_for(config.strategy);
    let requested = strategy.kind();
    let applied = strategy.applied_kind(nodes.len(), config);

    let mut positioned = strategy.compute_positions(nodes, viewport, config);
    if let Some(jitter) = &config.jitter {
        positioned = jitter::apply(positioned, jitter);
    }
    for node in &mut positioned {
        node.position = viewport.clamp(node.position, config.padding);
    }

    log::debug!(
        "layout: {} nodes placed with {applied} (requested {requested}) in {}x{}",
        positioned.len(),
        viewport.width,
        viewport.height
    );

    Layout {
        requested,
        applied,
        viewport: *viewport,
        nodes: positioned,
    }
}

// ── Helpers shared by the strategies ─────────────────────────────────────────

/// Target first, then correlation level, then interaction count
/// descending, then id.
pub(crate) fn importance_order(a: &GraphNode, b: &GraphNode) -> Ordering {
    b.is_target
        .cmp(&a.is_target)
        .then_with(|| a.correlation_level.rank().cmp(&b.correlation_level.rank()))
        .then_with(|| b.interaction_count.cmp(&a.interaction_count))
        .then_with(|| a.id.cmp(&b.id))
}

pub(crate) fn size_hint(node: &GraphNode, config: &LayoutConfig) -> f64 {
    let factor = match node.correlation_level {
        CorrelationLevel::Target => TARGET_SIZE_FACTOR,
        CorrelationLevel::High => HIGH_SIZE_FACTOR,
        CorrelationLevel::Medium => MEDIUM_SIZE_FACTOR,
        CorrelationLevel::Low | CorrelationLevel::Indirect => LOW_SIZE_FACTOR,
    };
    config.node_size * factor
}

pub(crate) fn label_for(node: &GraphNode, mode: LabelMode) -> Option<String> {
    match mode {
        LabelMode::FullNumber => Some(node.id.clone()),
        LabelMode::LastDigits => {
            let skip = node.id.chars().count().saturating_sub(LAST_DIGITS);
            Some(node.id.chars().skip(skip).collect())
        }
        LabelMode::Operator => node.primary_operator().map(str::to_string),
        LabelMode::Hidden => None,
    }
}

pub(crate) fn place(node: &GraphNode, position: Point, config: &LayoutConfig) -> LayoutNode {
    LayoutNode {
        id: node.id.clone(),
        is_target: node.is_target,
        correlation_level: node.correlation_level,
        interaction_count: node.interaction_count,
        position,
        size_hint: size_hint(node, config),
        label: label_for(node, config.label_mode),
    }
}

/// Radius needed to seat `count` nodes side by side on one ring.
pub(crate) fn circumference_radius(count: usize, config: &LayoutConfig) -> f64 {
    count as f64 * (config.node_size + config.node_spacing) / TAU
}

/// Clamp into `[min_radius, max_radius]`. When the viewport cannot fit
/// `min_radius` the viewport wins and the ring shrinks, never below zero.
pub(crate) fn clamp_radius(optimal: f64, viewport: &Viewport, config: &LayoutConfig) -> f64 {
    let upper = viewport.max_radius(config.padding);
    let lower = config.min_radius.max(0.0);
    if upper < lower {
        upper
    } else {
        optimal.clamp(lower, upper)
    }
}
