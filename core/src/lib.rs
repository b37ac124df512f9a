//! callmap-core: correlation graph, scoring and layout for call records.
//!
//! PIPELINE (leaf to root):
//!   record     → normalize raw interaction records
//!   aggregate  → per-number profiles and per-pair connections
//!   score      → correlation level per number
//!   graph      → filtered node and edge lists
//!   layout     → 2D positions per strategy
//!   recommend  → ranked layout strategy for the data and viewport
//!
//! `analyzer::Analyzer` runs the whole chain and memoizes each stage.

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod recommend;
pub mod record;
pub mod score;
pub mod types;
