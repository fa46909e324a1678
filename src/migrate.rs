//! Load-time guard for persisted documents.
//!
//! Older builds wrote the document without a version tag and later added
//! fields by presence checks. Here every known shape is a numbered version
//! with one upgrade step to the next, ending at [`SCHEMA_VERSION`]:
//!
//! - v0: untagged, locations may lack `requests`/`funds`, `userName` may be absent.
//! - v1: untagged, those fields present; expense items carry no `qty`.
//! - v2: tagged with `schemaVersion`, expense items carry `qty`.
//!
//! Anything that cannot be upgraded falls back to [`Document::default`].

use crate::model::{Document, FundLog, DEFAULT_USER_NAME, SCHEMA_VERSION};
use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Empty,
    Unparseable(String),
    NotAnObject,
    NoLocations,
    NewerVersion(u64),
    Invalid(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Empty => f.write_str("no saved document"),
            FallbackReason::Unparseable(err) => write!(f, "saved document is not JSON: {err}"),
            FallbackReason::NotAnObject => f.write_str("saved document is not an object"),
            FallbackReason::NoLocations => f.write_str("saved document has no locations"),
            FallbackReason::NewerVersion(v) => {
                write!(f, "saved document version {v} is newer than {SCHEMA_VERSION}")
            }
            FallbackReason::Invalid(err) => write!(f, "saved document is malformed: {err}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Guarded {
    pub document: Document,
    /// Version the blob was read as, `None` when defaults were used.
    pub from_version: Option<u32>,
    pub fallback: Option<FallbackReason>,
    /// True when the guard changed anything relative to the blob.
    pub repaired: bool,
}

impl Guarded {
    fn fallback(reason: FallbackReason) -> Self {
        Guarded {
            document: Document::default(),
            from_version: None,
            fallback: Some(reason),
            repaired: true,
        }
    }
}

/// Turns whatever the storage returned into a document that satisfies every
/// invariant. Running it on its own output changes nothing.
pub fn guard(raw: Option<&str>) -> Guarded {
    let Some(raw) = raw.filter(|text| !text.trim().is_empty()) else {
        return Guarded::fallback(FallbackReason::Empty);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => guard_value(value),
        Err(err) => Guarded::fallback(FallbackReason::Unparseable(err.to_string())),
    }
}

pub fn guard_value(value: Value) -> Guarded {
    let mut value = value;
    let Some(obj) = value.as_object_mut() else {
        return Guarded::fallback(FallbackReason::NotAnObject);
    };
    let has_locations = obj
        .get("locations")
        .and_then(|v| v.as_object())
        .is_some_and(|locations| !locations.is_empty());
    if !has_locations {
        return Guarded::fallback(FallbackReason::NoLocations);
    }

    let version = match detect_version(obj) {
        Ok(version) => version,
        Err(newer) => return Guarded::fallback(FallbackReason::NewerVersion(newer)),
    };
    let mut repaired = false;
    if !obj.get("currentLocationId").is_some_and(|v| v.is_string()) {
        // Left blank so the repair step points it at the first location.
        obj.insert("currentLocationId".to_string(), json!(""));
        repaired = true;
    }
    let mut step = version;
    while step < SCHEMA_VERSION {
        repaired |= match step {
            0 => upgrade_v0_to_v1(obj),
            _ => upgrade_v1_to_v2(obj),
        };
        step += 1;
    }

    let mut document: Document = match serde_json::from_value(value) {
        Ok(document) => document,
        Err(err) => return Guarded::fallback(FallbackReason::Invalid(err.to_string())),
    };
    repaired |= repair(&mut document);

    Guarded {
        document,
        from_version: Some(version),
        fallback: None,
        repaired,
    }
}

/// Reads the version tag, or infers v0/v1 for untagged documents. A tag newer
/// than this build understands is returned as the error.
fn detect_version(obj: &Map<String, Value>) -> Result<u32, u64> {
    if let Some(tag) = obj.get("schemaVersion").and_then(|v| v.as_u64()) {
        if tag > SCHEMA_VERSION as u64 {
            return Err(tag);
        }
        return Ok(tag as u32);
    }
    let locations_current = obj
        .get("locations")
        .and_then(|v| v.as_object())
        .map(|locations| {
            locations.values().all(|location| {
                location.get("requests").is_some_and(|v| v.is_array())
                    && location.get("funds").is_some_and(|v| v.is_array())
            })
        })
        .unwrap_or(false);
    if locations_current && has_user_name(obj) {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn has_user_name(obj: &Map<String, Value>) -> bool {
    obj.get("userName")
        .and_then(|v| v.as_str())
        .is_some_and(|name| !name.is_empty())
}

fn upgrade_v0_to_v1(obj: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    if let Some(locations) = obj.get_mut("locations").and_then(|v| v.as_object_mut()) {
        for location in locations.values_mut() {
            let Some(location) = location.as_object_mut() else {
                continue;
            };
            if !location.get("requests").is_some_and(|v| v.is_array()) {
                location.insert("requests".to_string(), json!([]));
                changed = true;
            }
            if !location.get("funds").is_some_and(|v| v.is_array()) {
                let slot = serde_json::to_value(FundLog::first_slot()).unwrap_or(json!({}));
                location.insert("funds".to_string(), json!([slot]));
                changed = true;
            }
        }
    }
    if !has_user_name(obj) {
        obj.insert("userName".to_string(), json!(DEFAULT_USER_NAME));
        changed = true;
    }
    if changed {
        log::info!("Upgraded saved document from v0 to v1");
    }
    changed
}

fn upgrade_v1_to_v2(obj: &mut Map<String, Value>) -> bool {
    let mut backfilled = 0_usize;
    if let Some(locations) = obj.get_mut("locations").and_then(|v| v.as_object_mut()) {
        for location in locations.values_mut() {
            let Some(funds) = location.get_mut("funds").and_then(|v| v.as_array_mut()) else {
                continue;
            };
            for fund in funds.iter_mut() {
                let Some(items) = fund.get_mut("items").and_then(|v| v.as_array_mut()) else {
                    continue;
                };
                for item in items.iter_mut() {
                    let Some(item) = item.as_object_mut() else {
                        continue;
                    };
                    if item.get("qty").is_some_and(|v| v.is_number()) {
                        continue;
                    }
                    let price = item.get("price").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    item.insert("qty".to_string(), json!(1.0));
                    item.insert("total".to_string(), json!(price));
                    backfilled += 1;
                }
            }
        }
    }
    obj.insert("schemaVersion".to_string(), json!(SCHEMA_VERSION));
    log::info!(
        "Upgraded saved document from v1 to v2 ({} expense items given a quantity)",
        backfilled
    );
    true
}

/// Invariants that hold regardless of version: a valid active location,
/// non-empty report sections and fund list, and consistent expense totals.
fn repair(document: &mut Document) -> bool {
    let mut changed = document.heal_current_location();
    for location in document.locations.values_mut() {
        changed |= location.ensure_invariants();
        for item in location
            .funds
            .iter_mut()
            .flat_map(|fund| fund.items.iter_mut())
        {
            if item.total != item.qty * item.price {
                item.recompute_total();
                changed = true;
            }
        }
    }
    if document.schema_version != SCHEMA_VERSION {
        document.schema_version = SCHEMA_VERSION;
        changed = true;
    }
    changed
}
