//! Shared primitive types used across the analysis pipeline.

use chrono::{DateTime, Utc};

/// A canonical phone number. Also used as the node id in the graph.
pub type PhoneNumber = String;

/// Every timestamp in the pipeline is UTC.
pub type Timestamp = DateTime<Utc>;

/// A cell-tower identifier as reported by the operator.
pub type CellId = String;
