//! The analyzer: drives the pipeline and memoizes every stage.
//!
//! STAGE ORDER (fixed):
//!   1. Normalize + aggregate   key: records, target, attribution
//!   2. Score + build graph     key: stage 1 key, filter, scoring
//!   3. Layout                  key: stage 2 key, viewport, layout config
//!   4. Recommend               not cached; cheap and override-dependent
//!
//! RULES:
//!   - A stage reruns only when its key changes. A viewport change
//!     reruns the layout and nothing before it.
//!   - Keys are SHA-256 digests of the stage inputs' JSON encoding.
//!   - Stage outputs are immutable once cached.

use crate::{
    aggregate::Aggregation,
    config::AnalysisConfig,
    error::{AnalysisResult, MalformedRecordError},
    graph::{build_graph, CorrelationGraph},
    layout::{compute_layout, Layout, StrategyKind, Viewport},
    recommend::{adapt, recommend, AdaptiveAdvice, InteractionTelemetry, Recommendation},
    record::{canonical_number, normalize_batch, RawRecord},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Everything one analysis run depends on.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub records: &'a [RawRecord],
    pub target: &'a str,
    pub config: &'a AnalysisConfig,
    pub viewport: Viewport,
    pub strategy_override: Option<StrategyKind>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ready,
    /// Nothing usable in the input. Graph and layout are empty.
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutput {
    pub status: AnalysisStatus,
    pub graph: CorrelationGraph,
    pub layout: Layout,
    pub recommendation: Recommendation,
    pub skipped_records: Vec<MalformedRecordError>,
}

impl AnalysisOutput {
    pub fn skipped_count(&self) -> usize {
        self.skipped_records.len()
    }
}

/// How often each stage actually ran.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub aggregation_runs: u64,
    pub graph_runs: u64,
    pub layout_runs: u64,
    pub hits: u64,
}

struct AggregationStage {
    aggregation: Aggregation,
    skipped: Vec<MalformedRecordError>,
}

/// Single-slot memo: the last key and the value computed for it.
struct Memo<T> {
    slot: Option<(String, Arc<T>)>,
}

impl<T> Memo<T> {
    fn new() -> Self {
        Self { slot: None }
    }

    fn get(&self, key: &str) -> Option<Arc<T>> {
        match &self.slot {
            Some((k, v)) if k == key => Some(Arc::clone(v)),
            _ => None,
        }
    }

    fn put(&mut self, key: String, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.slot = Some((key, Arc::clone(&value)));
        value
    }
}

pub struct Analyzer {
    aggregation: Memo<AggregationStage>,
    graph: Memo<CorrelationGraph>,
    layout: Memo<Layout>,
    stats: CacheStats,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            aggregation: Memo::new(),
            graph: Memo::new(),
            layout: Memo::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Run the full pipeline, reusing every stage whose inputs are unchanged.
    pub fn analyze(&mut self, input: &AnalysisInput<'_>) -> AnalysisResult<AnalysisOutput> {
        let config = input.config;
        config.validate()?;
        let target = canonical_number(input.target).unwrap_or_default();

        let aggregation_key = cache_key(&(input.records, &target, config.attribution))?;
        let aggregated = match self.aggregation.get(&aggregation_key) {
            Some(stage) => self.hit("aggregation", stage),
            None => {
                self.stats.aggregation_runs += 1;
                let batch = normalize_batch(input.records);
                let aggregation =
                    Aggregation::from_records(&batch.records, &target, config.attribution);
                log::info!(
                    "analyzer: aggregated {} records ({} skipped) for target {target}",
                    aggregation.record_count(),
                    batch.skipped.len()
                );
                self.aggregation.put(
                    aggregation_key.clone(),
                    AggregationStage {
                        aggregation,
                        skipped: batch.skipped,
                    },
                )
            }
        };

        let graph_key = cache_key(&(&aggregation_key, &config.filter, &config.scoring))?;
        let graph = match self.graph.get(&graph_key) {
            Some(graph) => self.hit("graph", graph),
            None => {
                self.stats.graph_runs += 1;
                let graph = build_graph(&aggregated.aggregation, &config.filter, &config.scoring);
                self.graph.put(graph_key.clone(), graph)
            }
        };

        let layout_key = cache_key(&(&graph_key, &input.viewport, &config.layout))?;
        let layout = match self.layout.get(&layout_key) {
            Some(layout) => self.hit("layout", layout),
            None => {
                self.stats.layout_runs += 1;
                let layout = compute_layout(&graph.nodes, &input.viewport, &config.layout);
                self.layout.put(layout_key, layout)
            }
        };

        let recommendation = recommend(
            &graph,
            &input.viewport,
            input.strategy_override,
            &config.recommender,
        );

        let status = if graph.is_empty() {
            AnalysisStatus::NoData
        } else {
            AnalysisStatus::Ready
        };

        Ok(AnalysisOutput {
            status,
            graph: graph.as_ref().clone(),
            layout: layout.as_ref().clone(),
            recommendation,
            skipped_records: aggregated.skipped.clone(),
        })
    }

    /// Advisory follow-up on a previous output. Never changes any state.
    pub fn advise(
        &self,
        output: &AnalysisOutput,
        telemetry: &InteractionTelemetry,
        config: &AnalysisConfig,
    ) -> AdaptiveAdvice {
        adapt(&output.recommendation, telemetry, &config.recommender.telemetry)
    }

    fn hit<T>(&mut self, stage: &str, value: Arc<T>) -> Arc<T> {
        self.stats.hits += 1;
        log::debug!("analyzer: {stage} cache hit");
        value
    }
}

/// Content-derived key: hex SHA-256 of the value's JSON encoding.
pub fn cache_key<T: Serialize + ?Sized>(value: &T) -> AnalysisResult<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
