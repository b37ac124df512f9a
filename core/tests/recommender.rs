use callmap_core::{
    aggregate::{Aggregation, DirectionAttribution},
    config::{FilterConfig, RecommenderConfig, ScoringConfig, TelemetryThresholds},
    graph::{build_graph, CorrelationGraph},
    layout::{StrategyKind, Viewport},
    recommend::{
        adapt, recommend, score_strategies, DataCharacteristics, InteractionTelemetry,
        Recommendation,
    },
    record::{normalize_batch, RawRecord},
};
use serde_json::json;

const TARGET: &str = "+15550100";

/// Twenty calls between the target and five partners inside one hour.
fn five_partners() -> CorrelationGraph {
    let raw: Vec<RawRecord> = (0..20)
        .map(|i| {
            serde_json::from_value(json!({
                "origin": TARGET,
                "counterpart": format!("+1555020{}", i % 5),
                "timestamp": format!("2024-05-01T10:{:02}:00Z", i * 2),
                "duration": 45,
                "operator": "alpha",
            }))
            .expect("raw record")
        })
        .collect();
    let records = normalize_batch(&raw).records;
    let agg = Aggregation::from_records(&records, TARGET, DirectionAttribution::Caller);
    build_graph(&agg, &FilterConfig::default(), &ScoringConfig::default())
}

fn wide() -> Viewport {
    Viewport::new(1200.0, 800.0).expect("viewport")
}

fn score_of(data: &DataCharacteristics, viewport: &Viewport, kind: StrategyKind) -> f64 {
    score_strategies(data, viewport, &RecommenderConfig::default())
        .into_iter()
        .find(|s| s.strategy == kind)
        .map(|s| s.score)
        .expect("every strategy is scored")
}

fn telemetry(current: StrategyKind) -> InteractionTelemetry {
    InteractionTelemetry {
        current_strategy: current,
        zoom_count: 0,
        pan_count: 0,
        click_count: 0,
        dwell_secs: 30.0,
    }
}

fn radial_recommendation() -> Recommendation {
    recommend(&five_partners(), &wide(), None, &RecommenderConfig::default())
}

#[test]
fn empty_graph_defaults_to_hybrid_with_low_confidence() {
    let rec = recommend(
        &CorrelationGraph::empty(Some(TARGET)),
        &wide(),
        None,
        &RecommenderConfig::default(),
    );
    assert_eq!(rec.recommended_strategy, StrategyKind::Hybrid);
    assert_eq!(rec.confidence, 20);
    assert!(rec.alternatives.is_empty());
    assert!(!rec.reasoning.is_empty());
    assert_eq!(rec.characteristics.map(|c| c.node_count), Some(0));
}

#[test]
fn characteristics_describe_the_graph() {
    let data = DataCharacteristics::from_graph(&five_partners());
    assert_eq!(data.node_count, 6);
    assert_eq!(data.edge_count, 5);
    assert!((data.connection_density - 5.0 / 15.0).abs() < 1e-9);
    assert_eq!(data.target_centrality, 1.0);
    assert_eq!(data.operator_diversity, 1);
    assert!(data.time_spread_days < 1.0);
}

#[test]
fn small_star_recommends_radial() {
    let rec = radial_recommendation();
    assert_eq!(rec.recommended_strategy, StrategyKind::Radial);
    assert_eq!(rec.confidence, 95);
    assert!(rec.reasoning.contains("6 nodes"), "{}", rec.reasoning);

    let alternatives: Vec<(StrategyKind, f64)> =
        rec.alternatives.iter().map(|a| (a.strategy, a.score)).collect();
    assert_eq!(
        alternatives,
        [
            (StrategyKind::Circular, 75.0),
            (StrategyKind::Linear, 65.0),
            (StrategyKind::Hybrid, 60.0),
        ]
    );
}

#[test]
fn radial_score_degrades_past_the_node_threshold() {
    let base = DataCharacteristics::from_graph(&five_partners());
    let vp = wide();
    let at = |n: usize| {
        let data = DataCharacteristics {
            node_count: n,
            ..base
        };
        score_of(&data, &vp, StrategyKind::Radial)
    };

    assert!(at(6) > at(16));
    assert!(at(15) > at(16));
    let scores: Vec<f64> = (1..=60).map(at).collect();
    assert!(
        scores.windows(2).all(|w| w[0] >= w[1]),
        "radial score must never grow with node count: {scores:?}"
    );
    assert!(scores.iter().all(|s| (0.0..=100.0).contains(s)));
}

#[test]
fn scores_come_back_in_fixed_strategy_order() {
    let data = DataCharacteristics::from_graph(&five_partners());
    let kinds: Vec<StrategyKind> = score_strategies(&data, &wide(), &RecommenderConfig::default())
        .into_iter()
        .map(|s| s.strategy)
        .collect();
    assert_eq!(kinds, StrategyKind::ALL);
}

#[test]
fn sparse_long_running_activity_favours_linear() {
    let data = DataCharacteristics {
        node_count: 10,
        edge_count: 4,
        connection_density: 4.0 / 45.0,
        time_spread_days: 5.0,
        operator_diversity: 1,
        target_centrality: 0.25,
    };
    let vp = Viewport::new(1600.0, 600.0).expect("viewport");
    assert_eq!(score_of(&data, &vp, StrategyKind::Linear), 100.0);
    assert_eq!(score_of(&data, &vp, StrategyKind::Radial), 75.0);
    assert_eq!(score_of(&data, &vp, StrategyKind::Circular), 65.0);
}

#[test]
fn crowding_and_operator_mix_move_the_circular_score() {
    let vp = wide();
    let small = DataCharacteristics {
        node_count: 12,
        edge_count: 11,
        connection_density: 11.0 / 66.0,
        time_spread_days: 0.0,
        operator_diversity: 1,
        target_centrality: 1.0,
    };
    let mixed = DataCharacteristics {
        operator_diversity: 3,
        ..small
    };
    let crowded = DataCharacteristics {
        node_count: 31,
        ..small
    };
    assert_eq!(score_of(&mixed, &vp, StrategyKind::Circular) - score_of(&small, &vp, StrategyKind::Circular), 15.0);
    assert!(score_of(&crowded, &vp, StrategyKind::Circular) < score_of(&small, &vp, StrategyKind::Circular));
}

#[test]
fn square_viewport_adds_the_aspect_bonus() {
    let data = DataCharacteristics::from_graph(&five_partners());
    let square = Viewport::new(800.0, 800.0).expect("viewport");
    let tall = Viewport::new(400.0, 800.0).expect("viewport");
    assert_eq!(
        score_of(&data, &square, StrategyKind::Radial) - score_of(&data, &tall, StrategyKind::Radial),
        5.0
    );
}

#[test]
fn override_wins_with_full_confidence() {
    let rec = recommend(
        &five_partners(),
        &wide(),
        Some(StrategyKind::Linear),
        &RecommenderConfig::default(),
    );
    assert_eq!(rec.recommended_strategy, StrategyKind::Linear);
    assert_eq!(rec.confidence, 100);
    assert!(rec.alternatives.is_empty());
    assert!(rec.characteristics.is_none());
}

#[test]
fn alternatives_are_capped() {
    let config = RecommenderConfig {
        max_alternatives: 1,
        ..RecommenderConfig::default()
    };
    let rec = recommend(&five_partners(), &wide(), None, &config);
    assert_eq!(rec.alternatives.len(), 1);
    assert_eq!(rec.alternatives[0].strategy, StrategyKind::Circular);

    let rec = radial_recommendation();
    assert!(rec.alternatives.len() <= 3);
    assert!(rec
        .alternatives
        .iter()
        .all(|a| a.strategy != rec.recommended_strategy));
}

#[test]
fn ties_go_to_the_earlier_strategy() {
    let config = RecommenderConfig {
        hybrid_score: 95.0,
        ..RecommenderConfig::default()
    };
    let rec = recommend(&five_partners(), &wide(), None, &config);
    assert_eq!(rec.recommended_strategy, StrategyKind::Radial);
    assert_eq!(rec.alternatives[0].strategy, StrategyKind::Hybrid);
}

// ── Adaptive advice ─────────────────────────────────────────────────────────

#[test]
fn engaged_users_keep_their_layout() {
    let rec = radial_recommendation();
    let t = InteractionTelemetry {
        click_count: 8,
        dwell_secs: 120.0,
        zoom_count: 50,
        ..telemetry(StrategyKind::Linear)
    };
    let advice = adapt(&rec, &t, &TelemetryThresholds::default());
    assert_eq!(advice.suggested, None);
}

#[test]
fn heavy_zoom_suggests_a_more_spread_out_layout() {
    let rec = radial_recommendation();
    let thresholds = TelemetryThresholds::default();
    for (current, expected) in [
        (StrategyKind::Radial, StrategyKind::Circular),
        (StrategyKind::Circular, StrategyKind::Linear),
        (StrategyKind::Hybrid, StrategyKind::Linear),
    ] {
        let t = InteractionTelemetry {
            zoom_count: 10,
            ..telemetry(current)
        };
        assert_eq!(adapt(&rec, &t, &thresholds).suggested, Some(expected), "{current}");
    }

    let t = InteractionTelemetry {
        zoom_count: 10,
        ..telemetry(StrategyKind::Linear)
    };
    assert_eq!(adapt(&rec, &t, &thresholds).suggested, None);
}

#[test]
fn heavy_panning_suggests_radial() {
    let rec = radial_recommendation();
    let thresholds = TelemetryThresholds::default();
    let t = InteractionTelemetry {
        pan_count: 15,
        ..telemetry(StrategyKind::Circular)
    };
    let advice = adapt(&rec, &t, &thresholds);
    assert_eq!(advice.suggested, Some(StrategyKind::Radial));
    assert!(advice.reason.contains("15 pan"), "{}", advice.reason);

    let t = InteractionTelemetry {
        pan_count: 15,
        ..telemetry(StrategyKind::Radial)
    };
    assert_eq!(adapt(&rec, &t, &thresholds).suggested, None);
}

#[test]
fn short_sessions_point_back_to_the_recommendation() {
    let rec = radial_recommendation();
    let thresholds = TelemetryThresholds::default();
    let t = InteractionTelemetry {
        dwell_secs: 3.0,
        ..telemetry(StrategyKind::Linear)
    };
    assert_eq!(adapt(&rec, &t, &thresholds).suggested, Some(StrategyKind::Radial));

    let t = InteractionTelemetry {
        dwell_secs: 3.0,
        ..telemetry(StrategyKind::Radial)
    };
    assert_eq!(adapt(&rec, &t, &thresholds).suggested, None);
}
