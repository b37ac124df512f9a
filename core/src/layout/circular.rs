//! Circular layout: every node, target included, on a single ring.
//! Optionally partitioned into operator sectors.

use super::{
    circumference_radius, clamp_radius, importance_order, place, LayoutNode, LayoutStrategy, Point,
    StrategyKind, Viewport,
};
use crate::{config::LayoutConfig, graph::GraphNode};
use std::{collections::BTreeMap, f64::consts::TAU};

/// Group name for nodes that never reported an operator.
pub const UNKNOWN_OPERATOR: &str = "unknown";

pub struct CircularLayout;

impl CircularLayout {
    pub fn ring_radius(count: usize, viewport: &Viewport, config: &LayoutConfig) -> f64 {
        clamp_radius(circumference_radius(count, config), viewport, config)
    }

    /// (angle, node) pairs with every node at an even step.
    fn uniform<'a>(nodes: &'a [GraphNode], config: &LayoutConfig) -> Vec<(f64, &'a GraphNode)> {
        let mut ordered: Vec<&GraphNode> = nodes.iter().collect();
        ordered.sort_by(|a, b| importance_order(a, b));
        let step = TAU / ordered.len() as f64;
        ordered
            .into_iter()
            .enumerate()
            .map(|(i, node)| (config.start_angle + step * i as f64, node))
            .collect()
    }

    /// (angle, node) pairs with one sector per operator, sized by the
    /// operator's share of nodes.
    fn grouped<'a>(nodes: &'a [GraphNode], config: &LayoutConfig) -> Vec<(f64, &'a GraphNode)> {
        let mut groups: BTreeMap<&str, Vec<&GraphNode>> = BTreeMap::new();
        for node in nodes {
            let operator = node.primary_operator().unwrap_or(UNKNOWN_OPERATOR);
            groups.entry(operator).or_default().push(node);
        }

        let mut sectors: Vec<(&str, Vec<&GraphNode>)> = groups.into_iter().collect();
        for (_, members) in &mut sectors {
            members.sort_by(|a, b| importance_order(a, b));
        }
        // Larger sectors first, then by name.
        sectors.sort_by(|(name_a, a), (name_b, b)| {
            b.len().cmp(&a.len()).then_with(|| name_a.cmp(name_b))
        });

        let total = nodes.len() as f64;
        let mut sector_start = config.start_angle;
        let mut angles = Vec::with_capacity(nodes.len());
        for (_, members) in sectors {
            let span = TAU * members.len() as f64 / total;
            let slot = span / members.len() as f64;
            for (j, node) in members.into_iter().enumerate() {
                angles.push((sector_start + slot * (j as f64 + 0.5), node));
            }
            sector_start += span;
        }
        angles
    }
}

impl LayoutStrategy for CircularLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Circular
    }

    fn compute_positions(
        &self,
        nodes: &[GraphNode],
        viewport: &Viewport,
        config: &LayoutConfig,
    ) -> Vec<LayoutNode> {
        let center = viewport.center();
        match nodes {
            [] => return Vec::new(),
            [only] => return vec![place(only, center, config)],
            _ => {}
        }

        let radius = Self::ring_radius(nodes.len(), viewport, config);
        let angles = if config.group_by_operator {
            Self::grouped(nodes, config)
        } else {
            Self::uniform(nodes, config)
        };
        angles
            .into_iter()
            .map(|(angle, node)| place(node, Point::on_circle(center, radius, angle), config))
            .collect()
    }
}
