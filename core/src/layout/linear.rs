//! Linear / timeline layout: nodes along one axis.
//!
//! Fixed spacing centres the row and shrinks the gap until it fits.
//! Time-proportional spacing maps each node's last interaction onto
//! the axis as (t - start) / (end - start); a zero-length range falls
//! back to fixed spacing.

use super::{
    importance_order, place, LayoutNode, LayoutStrategy, LinearSortKey, Orientation, Point,
    StrategyKind, Viewport,
};
use crate::{config::LayoutConfig, graph::GraphNode};
use std::cmp::Ordering;

pub struct LinearLayout;

impl LinearLayout {
    pub fn sort<'a>(nodes: &'a [GraphNode], key: LinearSortKey) -> Vec<&'a GraphNode> {
        let mut ordered: Vec<&GraphNode> = nodes.iter().collect();
        ordered.sort_by(|a, b| match key {
            LinearSortKey::Time => by_time(a, b).then_with(|| a.id.cmp(&b.id)),
            LinearSortKey::Importance => importance_order(a, b),
            LinearSortKey::Alphabetical => a.id.cmp(&b.id),
            LinearSortKey::Operator => by_operator(a, b).then_with(|| importance_order(a, b)),
        });
        ordered
    }

    /// Offsets along the axis, in `[0, axis_len]`, for already sorted nodes.
    /// The flag is true when the offsets are time-proportional.
    fn offsets(ordered: &[&GraphNode], axis_len: f64, config: &LayoutConfig) -> (Vec<f64>, bool) {
        if config.linear.time_proportional {
            if let Some(offsets) = time_offsets(ordered, axis_len) {
                return (offsets, true);
            }
        }
        (even_offsets(ordered.len(), axis_len, config.linear.spacing), false)
    }
}

impl LayoutStrategy for LinearLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Linear
    }

    fn compute_positions(
        &self,
        nodes: &[GraphNode],
        viewport: &Viewport,
        config: &LayoutConfig,
    ) -> Vec<LayoutNode> {
        if nodes.is_empty() {
            return Vec::new();
        }

        let pad = viewport.effective_padding(config.padding);
        let (axis_len, cross_len) = match config.linear.orientation {
            Orientation::Horizontal => (viewport.width - 2.0 * pad, viewport.height),
            Orientation::Vertical => (viewport.height - 2.0 * pad, viewport.width),
        };
        let cross_center = cross_len / 2.0;
        let lane_offset = config
            .linear
            .lane_offset
            .min(cross_center - pad)
            .max(0.0);

        let ordered = Self::sort(nodes, config.linear.sort_key);
        let (offsets, proportional) = Self::offsets(&ordered, axis_len, config);
        let lanes = if proportional {
            crowded_lanes(&offsets, config.node_size)
        } else {
            vec![false; offsets.len()]
        };

        ordered
            .iter()
            .zip(offsets.iter().zip(lanes))
            .map(|(node, (offset, shifted))| {
                let along = pad + offset;
                let across = if shifted { cross_center + lane_offset } else { cross_center };
                let position = match config.linear.orientation {
                    Orientation::Horizontal => Point::new(along, across),
                    Orientation::Vertical => Point::new(across, along),
                };
                place(node, position, config)
            })
            .collect()
    }
}

/// Untimed nodes sort last.
fn by_time(a: &GraphNode, b: &GraphNode) -> Ordering {
    match (a.last_interaction, b.last_interaction) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Nodes without an operator sort last.
fn by_operator(a: &GraphNode, b: &GraphNode) -> Ordering {
    match (a.primary_operator(), b.primary_operator()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Evenly spaced, centred, gap capped at `spacing`.
fn even_offsets(count: usize, axis_len: f64, spacing: f64) -> Vec<f64> {
    if count <= 1 {
        return vec![axis_len / 2.0; count];
    }
    let gaps = (count - 1) as f64;
    let gap = spacing.max(0.0).min(axis_len / gaps);
    let start = (axis_len - gap * gaps) / 2.0;
    (0..count).map(|i| start + gap * i as f64).collect()
}

/// None when fewer than two nodes carry a timestamp or the range is empty.
fn time_offsets(ordered: &[&GraphNode], axis_len: f64) -> Option<Vec<f64>> {
    let stamps: Vec<_> = ordered.iter().filter_map(|n| n.last_interaction).collect();
    if stamps.len() < 2 {
        return None;
    }
    let start = stamps.iter().min()?;
    let end = stamps.iter().max()?;
    let range_ms = (*end - *start).num_milliseconds();
    if range_ms <= 0 {
        return None;
    }
    Some(
        ordered
            .iter()
            .map(|n| match n.last_interaction {
                Some(ts) => (ts - *start).num_milliseconds() as f64 / range_ms as f64 * axis_len,
                None => 0.0,
            })
            .collect(),
    )
}

/// Alternate lanes for nodes that land within one node size of their
/// predecessor along the axis. Evaluated in axis order, not input order.
fn crowded_lanes(offsets: &[f64], node_size: f64) -> Vec<bool> {
    let mut by_offset: Vec<usize> = (0..offsets.len()).collect();
    by_offset.sort_by(|&a, &b| offsets[a].total_cmp(&offsets[b]).then(a.cmp(&b)));

    let mut lanes = vec![false; offsets.len()];
    for pair in by_offset.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if offsets[next] - offsets[prev] < node_size {
            lanes[next] = !lanes[prev];
        }
    }
    lanes
}
