//! Layout engine: bounds, determinism and the per-strategy geometry.

use callmap_core::{
    aggregate::{Aggregation, DirectionAttribution},
    config::{FilterConfig, JitterConfig, LayoutConfig, ScoringConfig},
    graph::{build_graph, CorrelationGraph, GraphNode},
    layout::{
        compute_layout, hybrid, LabelMode, Layout, Orientation, Point, RadialLayout, StrategyKind,
        Viewport,
    },
    record::{normalize_batch, RawRecord},
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

const TARGET: &str = "+15550100";
const OPERATORS: [&str; 3] = ["alpha", "beta", "gamma"];

/// Target plus `partners` numbers; partner i calls the target i+1 times,
/// one hour apart, on a rotating operator.
fn star(partners: usize) -> CorrelationGraph {
    let mut raw: Vec<RawRecord> = Vec::new();
    for i in 0..partners {
        for n in 0..=i {
            raw.push(
                serde_json::from_value(json!({
                    "origin": format!("+1555{:04}", 1000 + i),
                    "counterpart": TARGET,
                    "timestamp": 1_714_550_400 + (i * 3600 + n * 60) as i64,
                    "duration": 60,
                    "operator": OPERATORS[i % OPERATORS.len()],
                }))
                .expect("raw record"),
            );
        }
    }
    let records = normalize_batch(&raw).records;
    let agg = Aggregation::from_records(&records, TARGET, DirectionAttribution::Caller);
    build_graph(&agg, &FilterConfig::default(), &ScoringConfig::default())
}

/// Just the target, seen through a single data session.
fn lone_target() -> CorrelationGraph {
    let raw: RawRecord = serde_json::from_value(json!({
        "origin": TARGET, "timestamp": "2024-05-01T10:00:00Z", "kind": "data"
    }))
    .expect("raw record");
    let records = normalize_batch(&[raw]).records;
    let agg = Aggregation::from_records(&records, TARGET, DirectionAttribution::Caller);
    build_graph(&agg, &FilterConfig::default(), &ScoringConfig::default())
}

fn config(strategy: StrategyKind) -> LayoutConfig {
    LayoutConfig {
        strategy,
        ..LayoutConfig::default()
    }
}

fn viewport(w: f64, h: f64) -> Viewport {
    Viewport::new(w, h).expect("valid viewport")
}

fn positions(layout: &Layout) -> BTreeMap<String, Point> {
    layout
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.position))
        .collect()
}

fn all_configs() -> Vec<LayoutConfig> {
    let mut configs: Vec<LayoutConfig> = StrategyKind::ALL.into_iter().map(config).collect();
    configs.push(LayoutConfig {
        group_by_operator: true,
        ..config(StrategyKind::Circular)
    });
    let mut timeline = config(StrategyKind::Linear);
    timeline.linear.time_proportional = true;
    configs.push(timeline.clone());
    timeline.linear.orientation = Orientation::Vertical;
    configs.push(timeline);
    configs.push(LayoutConfig {
        jitter: Some(JitterConfig { seed: 9, amplitude: 25.0 }),
        ..config(StrategyKind::Radial)
    });
    configs
}

#[test]
fn every_position_stays_inside_the_viewport() {
    let viewports = [
        viewport(1200.0, 800.0),
        viewport(300.0, 300.0),
        viewport(40.0, 40.0),
        viewport(10.0, 500.0),
        viewport(1.0, 1.0),
    ];
    for partners in [0, 1, 2, 5, 12, 40] {
        let graph = star(partners);
        for vp in &viewports {
            for cfg in all_configs() {
                let layout = compute_layout(&graph.nodes, vp, &cfg);
                assert_eq!(layout.nodes.len(), graph.nodes.len());
                for node in &layout.nodes {
                    assert!(
                        vp.contains(&node.position, cfg.padding),
                        "{} escaped {}x{} under {:?}: {:?}",
                        node.id,
                        vp.width,
                        vp.height,
                        cfg.strategy,
                        node.position
                    );
                }
            }
        }
    }
}

#[test]
fn layout_is_a_pure_function_of_its_inputs() {
    let graph = star(9);
    let vp = viewport(1024.0, 768.0);
    let mut reversed = graph.nodes.clone();
    reversed.reverse();

    for cfg in all_configs() {
        let first = compute_layout(&graph.nodes, &vp, &cfg);
        let second = compute_layout(&graph.nodes, &vp, &cfg);
        assert_eq!(first, second, "{:?} is not idempotent", cfg.strategy);

        let shuffled = compute_layout(&reversed, &vp, &cfg);
        assert_eq!(
            positions(&first),
            positions(&shuffled),
            "{:?} depends on input order",
            cfg.strategy
        );
    }
}

#[test]
fn empty_graph_yields_empty_layout() {
    let vp = viewport(800.0, 600.0);
    for cfg in all_configs() {
        assert!(compute_layout(&[], &vp, &cfg).is_empty());
    }
}

#[test]
fn single_node_sits_at_the_centre() {
    let graph = lone_target();
    assert_eq!(graph.nodes.len(), 1);
    let vp = viewport(800.0, 600.0);
    for kind in StrategyKind::ALL {
        let layout = compute_layout(&graph.nodes, &vp, &config(kind));
        assert_eq!(layout.position(TARGET), Some(vp.center()), "{kind}");
    }
}

#[test]
fn radial_centres_the_target_and_rings_the_rest() {
    let graph = star(5);
    let vp = viewport(1200.0, 800.0);
    let cfg = config(StrategyKind::Radial);
    let layout = compute_layout(&graph.nodes, &vp, &cfg);

    let center = vp.center();
    assert_eq!(layout.position(TARGET), Some(center));

    let expected = RadialLayout::optimal_radius(5, &cfg);
    for node in layout.nodes.iter().filter(|n| !n.is_target) {
        let r = node.position.distance(&center);
        assert!((r - expected).abs() < 1e-6, "{} at radius {r}", node.id);
    }

    // Busiest partner goes first, at the start angle (twelve o'clock).
    let busiest = graph
        .nodes
        .iter()
        .filter(|n| !n.is_target)
        .max_by_key(|n| n.interaction_count)
        .expect("partners");
    let top = layout.position(&busiest.id).expect("placed");
    assert!((top.x - center.x).abs() < 1e-6);
    assert!(top.y < center.y);
}

#[test]
fn radial_ring_shrinks_to_fit_a_small_viewport() {
    let graph = star(6);
    let vp = viewport(100.0, 100.0);
    let cfg = config(StrategyKind::Radial);
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    let limit = vp.max_radius(cfg.padding);
    for node in &layout.nodes {
        assert!(node.position.distance(&vp.center()) <= limit + 1e-9);
    }
}

#[test]
fn circular_puts_everyone_on_one_ring() {
    let graph = star(7);
    let vp = viewport(900.0, 900.0);
    let layout = compute_layout(&graph.nodes, &vp, &config(StrategyKind::Circular));
    let center = vp.center();
    let radii: Vec<f64> = layout
        .nodes
        .iter()
        .map(|n| n.position.distance(&center))
        .collect();
    let first = radii[0];
    assert!(first > 0.0);
    assert!(radii.iter().all(|r| (r - first).abs() < 1e-6), "{radii:?}");
}

#[test]
fn operator_groups_occupy_contiguous_sectors() {
    let graph = star(9);
    let vp = viewport(900.0, 900.0);
    let cfg = LayoutConfig {
        group_by_operator: true,
        ..config(StrategyKind::Circular)
    };
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    let center = vp.center();

    let operator_of: BTreeMap<&str, &str> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.primary_operator().unwrap_or("unknown")))
        .collect();

    let mut around: Vec<(f64, &str)> = layout
        .nodes
        .iter()
        .map(|n| {
            let angle = (n.position.y - center.y).atan2(n.position.x - center.x);
            let from_start = (angle - cfg.start_angle).rem_euclid(TAU);
            (from_start, operator_of[n.id.as_str()])
        })
        .collect();
    around.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut finished: BTreeSet<&str> = BTreeSet::new();
    let mut current = around[0].1;
    for &(_, op) in &around[1..] {
        if op != current {
            assert!(finished.insert(current), "{current} sector is split");
            assert!(!finished.contains(op), "{op} sector is split");
            current = op;
        }
    }

    // "alpha" holds the target plus three partners: the largest sector
    // comes first.
    assert_eq!(operator_of[TARGET], "alpha");
    assert_eq!(around[0].1, "alpha");
}

#[test]
fn hybrid_switches_at_the_threshold() {
    let vp = viewport(1000.0, 800.0);
    let cfg = config(StrategyKind::Hybrid);

    let small = star(cfg.hybrid_threshold - 1);
    assert_eq!(small.nodes.len(), cfg.hybrid_threshold);
    let layout = compute_layout(&small.nodes, &vp, &cfg);
    assert_eq!(layout.requested, StrategyKind::Hybrid);
    assert_eq!(layout.applied, StrategyKind::Circular);
    let circular = compute_layout(&small.nodes, &vp, &config(StrategyKind::Circular));
    assert_eq!(layout.nodes, circular.nodes);

    let large = star(cfg.hybrid_threshold);
    let layout = compute_layout(&large.nodes, &vp, &cfg);
    assert_eq!(layout.applied, StrategyKind::Radial);
    let radial = compute_layout(&large.nodes, &vp, &config(StrategyKind::Radial));
    assert_eq!(layout.nodes, radial.nodes);

    assert_eq!(hybrid::resolve(0, &cfg), StrategyKind::Circular);
}

#[test]
fn linear_spaces_nodes_evenly_along_the_axis() {
    let graph = star(4);
    let vp = viewport(1200.0, 400.0);
    let cfg = config(StrategyKind::Linear);
    let layout = compute_layout(&graph.nodes, &vp, &cfg);

    let mut xs: Vec<f64> = layout.nodes.iter().map(|n| n.position.x).collect();
    xs.sort_by(f64::total_cmp);
    for pair in xs.windows(2) {
        assert!((pair[1] - pair[0] - cfg.linear.spacing).abs() < 1e-9);
    }
    assert!(layout.nodes.iter().all(|n| n.position.y == 200.0));
    // Centred row.
    assert!((xs[0] + xs[xs.len() - 1] - vp.width).abs() < 1e-9);
}

#[test]
fn vertical_orientation_uses_the_y_axis() {
    let graph = star(4);
    let vp = viewport(400.0, 1200.0);
    let mut cfg = config(StrategyKind::Linear);
    cfg.linear.orientation = Orientation::Vertical;
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    assert!(layout.nodes.iter().all(|n| n.position.x == 200.0));
    let ys: BTreeSet<u64> = layout.nodes.iter().map(|n| n.position.y as u64).collect();
    assert_eq!(ys.len(), layout.nodes.len());
}

#[test]
fn time_proportional_spans_the_padded_axis() {
    let graph = star(6);
    let vp = viewport(1000.0, 500.0);
    let mut cfg = config(StrategyKind::Linear);
    cfg.linear.time_proportional = true;
    let layout = compute_layout(&graph.nodes, &vp, &cfg);

    let pad = vp.effective_padding(cfg.padding);
    let min_x = layout.nodes.iter().map(|n| n.position.x).fold(f64::INFINITY, f64::min);
    let max_x = layout.nodes.iter().map(|n| n.position.x).fold(f64::NEG_INFINITY, f64::max);
    assert!((min_x - pad).abs() < 1e-9);
    assert!((max_x - (vp.width - pad)).abs() < 1e-9);

    // Earlier last-interaction means further left.
    let mut by_time: Vec<&GraphNode> = graph.nodes.iter().collect();
    by_time.sort_by_key(|n| (n.last_interaction, n.id.clone()));
    let xs: Vec<f64> = by_time
        .iter()
        .filter_map(|n| layout.position(&n.id))
        .map(|p| p.x)
        .collect();
    assert!(xs.windows(2).all(|w| w[0] <= w[1]), "{xs:?}");
}

#[test]
fn time_proportional_falls_back_when_the_range_is_empty() {
    // Everyone shares one timestamp.
    let raw: Vec<RawRecord> = (0..4)
        .map(|i| {
            serde_json::from_value(json!({
                "origin": format!("+1555{:04}", 2000 + i),
                "counterpart": TARGET,
                "timestamp": "2024-05-01T10:00:00Z",
            }))
            .expect("raw record")
        })
        .collect();
    let records = normalize_batch(&raw).records;
    let agg = Aggregation::from_records(&records, TARGET, DirectionAttribution::Caller);
    let graph = build_graph(&agg, &FilterConfig::default(), &ScoringConfig::default());

    let vp = viewport(1000.0, 500.0);
    let mut proportional = config(StrategyKind::Linear);
    proportional.linear.time_proportional = true;
    let fixed = config(StrategyKind::Linear);

    assert_eq!(
        compute_layout(&graph.nodes, &vp, &proportional).nodes,
        compute_layout(&graph.nodes, &vp, &fixed).nodes
    );
}

#[test]
fn jitter_is_seeded_and_spares_the_target() {
    let graph = star(6);
    let vp = viewport(1200.0, 800.0);
    let plain = config(StrategyKind::Radial);
    let jittered = |seed| LayoutConfig {
        jitter: Some(JitterConfig { seed, amplitude: 10.0 }),
        ..plain.clone()
    };

    let base = compute_layout(&graph.nodes, &vp, &plain);
    let a = compute_layout(&graph.nodes, &vp, &jittered(1));
    let b = compute_layout(&graph.nodes, &vp, &jittered(1));
    let c = compute_layout(&graph.nodes, &vp, &jittered(2));

    assert_eq!(a, b);
    assert_ne!(positions(&a), positions(&c));
    assert_eq!(a.position(TARGET), base.position(TARGET));

    for node in a.nodes.iter().filter(|n| !n.is_target) {
        let original = base.position(&node.id).expect("placed");
        assert!((node.position.x - original.x).abs() <= 10.0);
        assert!((node.position.y - original.y).abs() <= 10.0);
    }
}

#[test]
fn size_hints_and_labels_follow_the_config() {
    let graph = star(3);
    let vp = viewport(800.0, 600.0);
    let mut cfg = config(StrategyKind::Radial);

    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    let target = layout.node(TARGET).expect("target");
    assert_eq!(target.size_hint, cfg.node_size * 1.5);
    assert_eq!(target.label.as_deref(), Some(TARGET));
    assert!(layout.nodes.iter().all(|n| n.size_hint > 0.0));

    cfg.label_mode = LabelMode::LastDigits;
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    assert_eq!(layout.node(TARGET).and_then(|n| n.label.as_deref()), Some("0100"));

    cfg.label_mode = LabelMode::Operator;
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    assert_eq!(layout.node(TARGET).and_then(|n| n.label.as_deref()), Some("alpha"));

    cfg.label_mode = LabelMode::Hidden;
    let layout = compute_layout(&graph.nodes, &vp, &cfg);
    assert!(layout.nodes.iter().all(|n| n.label.is_none()));
}
