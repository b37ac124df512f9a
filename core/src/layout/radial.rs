//! Radial layout: target at the centre, everyone else on one ring
//! ordered by interaction count.

use super::{clamp_radius, circumference_radius, place, LayoutNode, LayoutStrategy, Point, StrategyKind, Viewport};
use crate::{config::LayoutConfig, graph::GraphNode};
use std::f64::consts::TAU;

pub struct RadialLayout;

impl RadialLayout {
    /// Ring radius before viewport clamping: whatever the ring
    /// circumference needs for `others` nodes, never below `min_radius`.
    pub fn optimal_radius(others: usize, config: &LayoutConfig) -> f64 {
        config.min_radius.max(circumference_radius(others, config))
    }
}

impl LayoutStrategy for RadialLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Radial
    }

    fn compute_positions(
        &self,
        nodes: &[GraphNode],
        viewport: &Viewport,
        config: &LayoutConfig,
    ) -> Vec<LayoutNode> {
        let center = viewport.center();
        let target = nodes.iter().find(|n| n.is_target);
        let mut others: Vec<&GraphNode> = nodes
            .iter()
            .filter(|n| target.map_or(true, |t| t.id != n.id))
            .collect();
        others.sort_by(|a, b| {
            b.interaction_count
                .cmp(&a.interaction_count)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut placed = Vec::with_capacity(nodes.len());
        if let Some(t) = target {
            placed.push(place(t, center, config));
        }

        // A lone node with no target to orbit sits in the middle.
        if target.is_none() && others.len() == 1 {
            placed.push(place(others[0], center, config));
            return placed;
        }
        if others.is_empty() {
            return placed;
        }

        let radius = clamp_radius(Self::optimal_radius(others.len(), config), viewport, config);
        let step = TAU / others.len() as f64;
        for (i, node) in others.iter().enumerate() {
            let angle = config.start_angle + step * i as f64;
            placed.push(place(node, Point::on_circle(center, radius, angle), config));
        }
        placed
    }
}
