//! Opt-in, seeded position jitter.
//!
//! RULE: layouts never touch a platform RNG. When jitter is enabled each
//! node gets its own PCG stream seeded from (seed XOR hash(node id)), so
//! a node's offset depends only on the seed and its id, never on input
//! order or on the other nodes.

use super::{LayoutNode, Point};
use crate::config::JitterConfig;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A deterministic RNG for a single node.
pub struct NodeRng {
    inner: Pcg64Mcg,
}

impl NodeRng {
    pub fn new(seed: u64, node_id: &str) -> Self {
        let derived_seed = seed ^ stable_hash(node_id).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float in [-amplitude, amplitude).
    pub fn symmetric(&mut self, amplitude: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * amplitude
    }
}

/// FNV-1a. Stable across runs and platforms, unlike `DefaultHasher`.
fn stable_hash(s: &str) -> u64 {
    s.bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Offset every non-target node. The caller clamps afterwards.
pub fn apply(nodes: Vec<LayoutNode>, config: &JitterConfig) -> Vec<LayoutNode> {
    if config.amplitude <= 0.0 {
        return nodes;
    }
    nodes
        .into_iter()
        .map(|mut node| {
            if !node.is_target {
                let mut rng = NodeRng::new(config.seed, &node.id);
                let dx = rng.symmetric(config.amplitude);
                let dy = rng.symmetric(config.amplitude);
                node.position = Point::new(node.position.x + dx, node.position.y + dy);
            }
            node
        })
        .collect()
}
