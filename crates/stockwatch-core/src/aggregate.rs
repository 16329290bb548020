//! Flattening and summation over a parsed payload.
//!
//! A pure transformation: no network access, no randomness, total over every
//! well-formed payload including the empty-states case.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::payload::{StateId, StockPayload};

/// One store's availability merged with its parent state's identity.
/// Order matches a stable traversal of the payload: outer state order, then
/// inner location order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AvailabilityRecord {
    pub name: Option<String>,
    pub available: u64,
    #[serde(rename = "stateName")]
    pub state_name: String,
    #[serde(rename = "stateId")]
    pub state_id: StateId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-state rollup entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateSummary {
    pub id: StateId,
    pub name: String,
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_available: u64,
    pub per_state: Vec<StateSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Aggregation {
    pub records: Vec<AvailabilityRecord>,
    pub summary: AggregateSummary,
}

/// Flatten a payload into per-store records and compute derived totals.
pub fn aggregate(payload: &StockPayload) -> Aggregation {
    let mut records = Vec::new();
    let mut per_state = Vec::with_capacity(payload.stocks.len());
    let mut total_available: u64 = 0;

    for state in &payload.stocks {
        let mut state_total: u64 = 0;
        for location in &state.locations {
            state_total = state_total.saturating_add(location.available);
            records.push(AvailabilityRecord {
                name: location.name.clone(),
                available: location.available,
                state_name: state.name.clone(),
                state_id: state.id.clone(),
                extra: location.extra.clone(),
            });
        }
        total_available = total_available.saturating_add(state_total);
        per_state.push(StateSummary {
            id: state.id.clone(),
            name: state.name.clone(),
            total: state_total,
        });
    }

    Aggregation {
        records,
        summary: AggregateSummary {
            total_available,
            per_state,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::parse;

    #[test]
    fn flattens_two_store_state() {
        let payload = parse(
            r#"{"stocks":[{"id":1,"name":"NSW","locations":[
                {"name":"Store A","available":"5"},
                {"name":"Store B","available":"3"}
            ]}]}"#,
        )
        .unwrap();

        let aggregation = aggregate(&payload);
        assert_eq!(aggregation.records.len(), 2);
        assert_eq!(aggregation.summary.total_available, 8);

        let first = &aggregation.records[0];
        assert_eq!(first.name.as_deref(), Some("Store A"));
        assert_eq!(first.available, 5);
        assert_eq!(first.state_name, "NSW");
        assert_eq!(first.state_id, StateId::Int(1));

        let second = &aggregation.records[1];
        assert_eq!(second.name.as_deref(), Some("Store B"));
        assert_eq!(second.available, 3);
    }

    #[test]
    fn record_count_equals_location_count_across_states() {
        let payload = parse(
            r#"{"stocks":[
                {"id":1,"name":"NSW","locations":[{"available":1},{"available":2}]},
                {"id":2,"name":"VIC","locations":[{"available":4}]},
                {"id":3,"name":"QLD","locations":[]}
            ]}"#,
        )
        .unwrap();

        let aggregation = aggregate(&payload);
        let location_count: usize = payload.stocks.iter().map(|s| s.locations.len()).sum();
        assert_eq!(aggregation.records.len(), location_count);
        assert_eq!(
            aggregation.summary.total_available,
            aggregation.records.iter().map(|r| r.available).sum::<u64>()
        );
        assert_eq!(aggregation.summary.per_state.len(), 3);
        assert_eq!(aggregation.summary.per_state[0].total, 3);
        assert_eq!(aggregation.summary.per_state[1].total, 4);
        assert_eq!(aggregation.summary.per_state[2].total, 0);
    }

    #[test]
    fn empty_payload_yields_zero_totals() {
        let payload = parse(r#"{"stocks":[]}"#).unwrap();
        let aggregation = aggregate(&payload);
        assert!(aggregation.records.is_empty());
        assert!(aggregation.summary.per_state.is_empty());
        assert_eq!(aggregation.summary.total_available, 0);
    }

    #[test]
    fn records_preserve_traversal_order_without_dedup() {
        let payload = parse(
            r#"{"stocks":[
                {"id":1,"name":"NSW","locations":[{"name":"Dup","available":1}]},
                {"id":2,"name":"VIC","locations":[{"name":"Dup","available":1}]}
            ]}"#,
        )
        .unwrap();

        let aggregation = aggregate(&payload);
        assert_eq!(aggregation.records.len(), 2);
        assert_eq!(aggregation.records[0].state_name, "NSW");
        assert_eq!(aggregation.records[1].state_name, "VIC");
    }
}
