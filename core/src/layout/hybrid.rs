//! Hybrid layout: circular for small graphs, radial otherwise.

use super::{
    CircularLayout, LayoutNode, LayoutStrategy, RadialLayout, StrategyKind, Viewport,
};
use crate::{config::LayoutConfig, graph::GraphNode};

pub struct HybridLayout;

/// The strategy hybrid delegates to for `node_count` nodes.
pub fn resolve(node_count: usize, config: &LayoutConfig) -> StrategyKind {
    if node_count <= config.hybrid_threshold {
        StrategyKind::Circular
    } else {
        StrategyKind::Radial
    }
}

impl LayoutStrategy for HybridLayout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    fn applied_kind(&self, node_count: usize, config: &LayoutConfig) -> StrategyKind {
        resolve(node_count, config)
    }

    fn compute_positions(
        &self,
        nodes: &[GraphNode],
        viewport: &Viewport,
        config: &LayoutConfig,
    ) -> Vec<LayoutNode> {
        match resolve(nodes.len(), config) {
            StrategyKind::Circular => CircularLayout.compute_positions(nodes, viewport, config),
            _ => RadialLayout.compute_positions(nodes, viewport, config),
        }
    }
}
