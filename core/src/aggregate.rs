//! Aggregator: folds normalized records into per-number profiles and
//! per-pair connections.
//!
//! RULES:
//!   - `fold` consumes the accumulator and returns the next one. Callers
//!     never see a half-updated value.
//!   - Folding is commutative. Any chunking of the input folded separately
//!     and combined with `merge` yields the same totals.
//!   - Every connection endpoint has a profile.

use crate::{
    record::{canonical_number, GeoPoint, InteractionKind, InteractionRecord},
    types::{CellId, PhoneNumber, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Call direction. For profiles it describes one side of a call; for
/// connections it is read from the pair's anchor (see `Connection`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    Bidirectional,
}

/// How incoming/outgoing counts are attributed to the two sides of a record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectionAttribution {
    /// The origin placed the call: origin outgoing, counterpart incoming.
    #[default]
    Caller,
    /// Each side is outgoing if it is the target, incoming otherwise.
    TargetPerspective,
}

/// Fixed-point scale for geo sums: 1e-7 degrees (about 1 cm).
pub const GEO_SCALE: f64 = 1e7;

/// Running geo mean kept as integer sums in `GEO_SCALE` units, so adding
/// points in any order gives the same totals. Divided only when read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoAccumulator {
    latitude_sum: i64,
    longitude_sum: i64,
    count: u64,
}

fn to_fixed(degrees: f64) -> i64 {
    (degrees * GEO_SCALE).round() as i64
}

impl GeoAccumulator {
    pub fn add(self, point: GeoPoint) -> Self {
        Self {
            latitude_sum: self.latitude_sum + to_fixed(point.latitude),
            longitude_sum: self.longitude_sum + to_fixed(point.longitude),
            count: self.count + 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            latitude_sum: self.latitude_sum + other.latitude_sum,
            longitude_sum: self.longitude_sum + other.longitude_sum,
            count: self.count + other.count,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<GeoPoint> {
        (self.count > 0).then(|| {
            let divisor = self.count as f64 * GEO_SCALE;
            GeoPoint {
                latitude: self.latitude_sum as f64 / divisor,
                longitude: self.longitude_sum as f64 / divisor,
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumberProfile {
    pub number: PhoneNumber,
    pub interaction_count: u64,
    pub incoming_count: u64,
    pub outgoing_count: u64,
    pub total_duration_secs: u64,
    pub operators: BTreeSet<String>,
    pub cell_ids: BTreeSet<CellId>,
    pub last_interaction: Option<Timestamp>,
    pub counterparts: BTreeSet<PhoneNumber>,
    pub geo: GeoAccumulator,
    pub is_target: bool,
}

impl NumberProfile {
    pub fn new(number: PhoneNumber, is_target: bool) -> Self {
        Self {
            number,
            interaction_count: 0,
            incoming_count: 0,
            outgoing_count: 0,
            total_duration_secs: 0,
            operators: BTreeSet::new(),
            cell_ids: BTreeSet::new(),
            last_interaction: None,
            counterparts: BTreeSet::new(),
            geo: GeoAccumulator::default(),
            is_target,
        }
    }

    pub fn average_duration_secs(&self) -> f64 {
        if self.interaction_count == 0 {
            0.0
        } else {
            self.total_duration_secs as f64 / self.interaction_count as f64
        }
    }

    pub fn geo_mean(&self) -> Option<GeoPoint> {
        self.geo.mean()
    }

    pub fn has_geo(&self) -> bool {
        self.geo.count() > 0
    }

    /// The operator used for grouping: the smallest name seen.
    pub fn primary_operator(&self) -> Option<&str> {
        self.operators.iter().next().map(String::as_str)
    }

    fn record_side(&mut self, side: SideUpdate<'_>) {
        self.interaction_count += 1;
        match side.direction {
            Direction::Outgoing => self.outgoing_count += 1,
            _ => self.incoming_count += 1,
        }
        self.total_duration_secs += side.duration_secs;
        if !side.operator.is_empty() {
            self.operators.insert(side.operator.to_string());
        }
        if !side.cell_id.is_empty() {
            self.cell_ids.insert(side.cell_id.to_string());
        }
        self.last_interaction = later(self.last_interaction, Some(side.timestamp));
        if let Some(other) = side.counterpart {
            self.counterparts.insert(other.to_string());
        }
        if let Some(point) = side.geo {
            self.geo = self.geo.add(point);
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.interaction_count += other.interaction_count;
        self.incoming_count += other.incoming_count;
        self.outgoing_count += other.outgoing_count;
        self.total_duration_secs += other.total_duration_secs;
        self.operators.extend(other.operators);
        self.cell_ids.extend(other.cell_ids);
        self.last_interaction = later(self.last_interaction, other.last_interaction);
        self.counterparts.extend(other.counterparts);
        self.geo = self.geo.merge(other.geo);
        self.is_target |= other.is_target;
        self
    }
}

/// One side of a record as seen by a profile.
struct SideUpdate<'a> {
    direction: Direction,
    duration_secs: u64,
    operator: &'a str,
    cell_id: &'a str,
    timestamp: Timestamp,
    counterpart: Option<&'a str>,
    geo: Option<GeoPoint>,
}

/// Unordered pair of distinct numbers, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey(PhoneNumber, PhoneNumber);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }

    pub fn contains(&self, number: &str) -> bool {
        self.0 == number || self.1 == number
    }

    /// Stable identifier used for graph edges.
    pub fn edge_id(&self) -> String {
        format!("{}~{}", self.0, self.1)
    }
}

/// Aggregated relationship between two numbers.
///
/// Directions are read from the `anchor`: the target when it is one of
/// the endpoints, otherwise the smaller number of the pair. A call placed
/// by the anchor is outgoing, a call it received is incoming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub key: PairKey,
    pub anchor: PhoneNumber,
    pub other: PhoneNumber,
    pub call_count: u64,
    pub outgoing_calls: u64,
    pub incoming_calls: u64,
    pub total_duration_secs: u64,
    pub cell_ids: BTreeSet<CellId>,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

impl Connection {
    fn new(key: PairKey, target: Option<&str>, seen: Timestamp) -> Self {
        let anchor = match target {
            Some(t) if key.contains(t) => t.to_string(),
            _ => key.first().to_string(),
        };
        let other = if key.first() == anchor {
            key.second().to_string()
        } else {
            key.first().to_string()
        };
        Self {
            key,
            anchor,
            other,
            call_count: 0,
            outgoing_calls: 0,
            incoming_calls: 0,
            total_duration_secs: 0,
            cell_ids: BTreeSet::new(),
            first_seen: seen,
            last_seen: seen,
        }
    }

    pub fn direction(&self) -> Direction {
        match (self.outgoing_calls > 0, self.incoming_calls > 0) {
            (true, true) => Direction::Bidirectional,
            (true, false) => Direction::Outgoing,
            _ => Direction::Incoming,
        }
    }

    pub fn observed_directions(&self) -> BTreeSet<Direction> {
        let mut set = BTreeSet::new();
        if self.outgoing_calls > 0 {
            set.insert(Direction::Outgoing);
        }
        if self.incoming_calls > 0 {
            set.insert(Direction::Incoming);
        }
        set
    }

    fn record_call(&mut self, record: &InteractionRecord) {
        self.call_count += 1;
        if record.origin == self.anchor {
            self.outgoing_calls += 1;
        } else {
            self.incoming_calls += 1;
        }
        self.total_duration_secs += record.duration_secs;
        for cell in [&record.origin_cell, &record.destination_cell] {
            if !cell.is_empty() {
                self.cell_ids.insert(cell.clone());
            }
        }
        self.first_seen = self.first_seen.min(record.timestamp);
        self.last_seen = self.last_seen.max(record.timestamp);
    }

    fn merge(mut self, other: Self) -> Self {
        self.call_count += other.call_count;
        self.outgoing_calls += other.outgoing_calls;
        self.incoming_calls += other.incoming_calls;
        self.total_duration_secs += other.total_duration_secs;
        self.cell_ids.extend(other.cell_ids);
        self.first_seen = self.first_seen.min(other.first_seen);
        self.last_seen = self.last_seen.max(other.last_seen);
        self
    }
}

/// Accumulated statistics for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    target: Option<PhoneNumber>,
    attribution: DirectionAttribution,
    profiles: BTreeMap<PhoneNumber, NumberProfile>,
    connections: BTreeMap<PairKey, Connection>,
    record_count: usize,
}

impl Aggregation {
    pub fn new(target: &str, attribution: DirectionAttribution) -> Self {
        Self {
            target: canonical_number(target),
            attribution,
            profiles: BTreeMap::new(),
            connections: BTreeMap::new(),
            record_count: 0,
        }
    }

    /// Fold a whole slice in one go.
    pub fn from_records(
        records: &[InteractionRecord],
        target: &str,
        attribution: DirectionAttribution,
    ) -> Self {
        let aggregation = records
            .iter()
            .fold(Self::new(target, attribution), Self::fold);
        log::debug!(
            "aggregator: {} records -> {} numbers, {} connections",
            aggregation.record_count,
            aggregation.profiles.len(),
            aggregation.connections.len()
        );
        aggregation
    }

    /// Fold one record into the accumulator.
    pub fn fold(mut self, record: &InteractionRecord) -> Self {
        self.record_count += 1;

        let counterpart = match record.kind {
            InteractionKind::Call => record.counterpart.as_deref(),
            InteractionKind::DataSession => None,
        };

        let origin_direction = self.side_direction(&record.origin, true);
        self.profile_mut(&record.origin).record_side(SideUpdate {
            direction: origin_direction,
            duration_secs: record.duration_secs,
            operator: &record.operator,
            cell_id: &record.origin_cell,
            timestamp: record.timestamp,
            counterpart,
            geo: record.geo,
        });

        let Some(other) = counterpart else {
            return self;
        };

        let other_direction = self.side_direction(other, false);
        self.profile_mut(other).record_side(SideUpdate {
            direction: other_direction,
            duration_secs: record.duration_secs,
            operator: &record.operator,
            cell_id: &record.destination_cell,
            timestamp: record.timestamp,
            counterpart: Some(&record.origin),
            geo: None,
        });

        let key = PairKey::new(&record.origin, other);
        let target = self.target.clone();
        self.connections
            .entry(key.clone())
            .or_insert_with(|| Connection::new(key, target.as_deref(), record.timestamp))
            .record_call(record);

        self
    }

    /// Combine two accumulators built over disjoint chunks of the same run.
    pub fn merge(mut self, other: Aggregation) -> Self {
        debug_assert_eq!(self.target, other.target, "merging runs with different targets");
        self.record_count += other.record_count;
        for (number, profile) in other.profiles {
            let merged = match self.profiles.remove(&number) {
                Some(existing) => existing.merge(profile),
                None => profile,
            };
            self.profiles.insert(number, merged);
        }
        for (key, connection) in other.connections {
            let merged = match self.connections.remove(&key) {
                Some(existing) => existing.merge(connection),
                None => connection,
            };
            self.connections.insert(key, merged);
        }
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn attribution(&self) -> DirectionAttribution {
        self.attribution
    }

    pub fn profiles(&self) -> &BTreeMap<PhoneNumber, NumberProfile> {
        &self.profiles
    }

    pub fn connections(&self) -> &BTreeMap<PairKey, Connection> {
        &self.connections
    }

    pub fn profile(&self, number: &str) -> Option<&NumberProfile> {
        self.profiles.get(number)
    }

    pub fn connection(&self, a: &str, b: &str) -> Option<&Connection> {
        self.connections.get(&PairKey::new(a, b))
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn is_target(&self, number: &str) -> bool {
        self.target.as_deref() == Some(number)
    }

    fn side_direction(&self, number: &str, is_origin: bool) -> Direction {
        let outgoing = match self.attribution {
            DirectionAttribution::Caller => is_origin,
            DirectionAttribution::TargetPerspective => self.is_target(number),
        };
        if outgoing {
            Direction::Outgoing
        } else {
            Direction::Incoming
        }
    }

    fn profile_mut(&mut self, number: &str) -> &mut NumberProfile {
        let is_target = self.is_target(number);
        self.profiles
            .entry(number.to_string())
            .or_insert_with(|| NumberProfile::new(number.to_string(), is_target))
    }
}

fn later(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
