#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel resolution against the county parcel layer.
//!
//! Input is either a parcel identifier (AIN or APN, any punctuation) or a
//! situs address. Identifier queries match both the dashed and undashed
//! spelling against both identifier columns, because the county layer has
//! carried each combination at some point. When several features come back
//! (condo stacks, re-subdivided lots), the one with the largest footprint
//! wins; ties keep the first feature the service returned.

use std::sync::LazyLock;

use parcel_map_geometry::area;
use parcel_map_models::{ParcelFeature, ParcelId, Polygon, is_placeholder};
use parcel_map_query::{FeatureQuery, QueryError, QueryParams};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Trailing unit designators stripped from situs addresses before the
/// prefix search (`"APT 3"`, `"UNIT B"`, `"# 12"`, ...).
static UNIT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:APT|UNIT|STE|SUITE|SPC|#)\s*[A-Z0-9-]*$").expect("valid regex")
});

/// Minimum shape for a searchable street address: a house number followed
/// by at least one street token.
static HOUSE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[A-Z]?\s+\S+").expect("valid regex"));

/// Where and how to query the county parcel layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParcelLayer {
    pub endpoint: String,
    #[serde(default = "default_ain_field")]
    pub ain_field: String,
    #[serde(default = "default_apn_field")]
    pub apn_field: String,
    #[serde(default = "default_address_field")]
    pub address_field: String,
    #[serde(default = "default_city_field")]
    pub city_field: String,
    #[serde(default = "default_zip_field")]
    pub zip_field: String,
    #[serde(default = "default_out_fields")]
    pub out_fields: Vec<String>,
}

fn default_ain_field() -> String {
    "AIN".to_string()
}

fn default_apn_field() -> String {
    "APN".to_string()
}

fn default_address_field() -> String {
    "SitusAddress".to_string()
}

fn default_city_field() -> String {
    "SitusCity".to_string()
}

fn default_zip_field() -> String {
    "SitusZip".to_string()
}

fn default_out_fields() -> Vec<String> {
    vec![
        "AIN".to_string(),
        "APN".to_string(),
        "SitusAddress".to_string(),
        "SitusCity".to_string(),
        "SitusZip".to_string(),
    ]
}

/// Resolve a parcel by identifier.
///
/// Returns `Ok(None)` when nothing matched; that is an answer, not a
/// failure.
///
/// # Errors
///
/// * Propagates [`QueryError`] when the parcel layer could not be queried.
pub async fn resolve_id(
    client: &dyn FeatureQuery,
    layer: &ParcelLayer,
    id: &ParcelId,
) -> Result<Option<ParcelFeature>, QueryError> {
    let params = QueryParams::new()
        .where_clause(&identifier_clause(layer, id))
        .out_fields(&layer.out_fields.join(","))
        .return_geometry(true);
    let body = client.query(&layer.endpoint, params).await?;
    Ok(select_largest(&body, layer, Some(id)))
}

/// Resolve a parcel by situs address prefix.
///
/// The address is cleaned first; input that does not look like a street
/// address (no house number) resolves to `Ok(None)` without a query.
///
/// # Errors
///
/// * Propagates [`QueryError`] when the parcel layer could not be queried.
pub async fn resolve_address(
    client: &dyn FeatureQuery,
    layer: &ParcelLayer,
    address: &str,
) -> Result<Option<ParcelFeature>, QueryError> {
    let Some(street) = clean_situs_address(address) else {
        log::debug!("address {address:?} is not searchable, skipping parcel query");
        return Ok(None);
    };
    let clause = format!(
        "UPPER({}) LIKE '{}%'",
        layer.address_field,
        escape_sql_literal(&street)
    );
    let params = QueryParams::new()
        .where_clause(&clause)
        .out_fields(&layer.out_fields.join(","))
        .return_geometry(true)
        .result_record_count(25);
    let body = client.query(&layer.endpoint, params).await?;
    Ok(select_largest(&body, layer, None))
}

/// Attribute filter matching both identifier spellings against both
/// identifier columns.
fn identifier_clause(layer: &ParcelLayer, id: &ParcelId) -> String {
    format!(
        "{ain} = '{digits}' OR {ain} = '{dashed}' OR {apn} = '{digits}' OR {apn} = '{dashed}'",
        ain = layer.ain_field,
        apn = layer.apn_field,
        digits = id.ain,
        dashed = id.apn,
    )
}

/// Normalize a situs address for the prefix search: uppercase, collapse
/// whitespace, keep only the street line, strip unit designators. Returns
/// `None` when no house-number-shaped address remains.
#[must_use]
pub fn clean_situs_address(raw: &str) -> Option<String> {
    let upper = raw.to_uppercase();
    let street_line = upper.split(',').next().unwrap_or("");
    let collapsed = street_line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let street = UNIT_SUFFIX_RE.replace(&collapsed, "").trim().to_string();
    if HOUSE_NUMBER_RE.is_match(&street) {
        Some(street)
    } else {
        None
    }
}

/// Escape a string for use inside a single-quoted where-clause literal.
fn escape_sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Pick the feature with the largest footprint. Ties keep the first
/// feature in service order.
fn select_largest(
    body: &Value,
    layer: &ParcelLayer,
    requested: Option<&ParcelId>,
) -> Option<ParcelFeature> {
    let features = body.get("features").and_then(Value::as_array)?;
    if features.len() > 1 {
        log::debug!(
            "{} candidate parcels matched, keeping the largest footprint",
            features.len()
        );
    }

    let mut best: Option<(f64, ParcelFeature)> = None;
    for feature in features {
        let Some(parsed) = parse_feature(feature, layer, requested) else {
            continue;
        };
        let size = area(&parsed.polygon).unwrap_or(0.0);
        match &best {
            Some((best_size, _)) if size <= *best_size => {}
            _ => best = Some((size, parsed)),
        }
    }
    best.map(|(_, parcel)| parcel)
}

fn parse_feature(
    feature: &Value,
    layer: &ParcelLayer,
    requested: Option<&ParcelId>,
) -> Option<ParcelFeature> {
    let attributes = feature.get("attributes").cloned().unwrap_or(Value::Null);
    let polygon: Polygon = feature
        .get("geometry")
        .and_then(|geometry| serde_json::from_value(geometry.clone()).ok())
        .unwrap_or_default();

    // The layer's own identifier wins; the requested one backfills features
    // that ship without identifier columns.
    let id = attribute_text(&attributes, &layer.ain_field)
        .or_else(|| attribute_text(&attributes, &layer.apn_field))
        .and_then(|raw| ParcelId::parse(&raw))
        .or_else(|| requested.cloned())?;

    Some(ParcelFeature {
        ain: id.ain,
        apn: id.apn,
        situs_address: attribute_text(&attributes, &layer.address_field),
        situs_city: attribute_text(&attributes, &layer.city_field),
        situs_zip: attribute_text(&attributes, &layer.zip_field),
        polygon,
    })
}

/// Trimmed text of one attribute, with placeholders dropped and numbers
/// stringified (identifier and ZIP columns are numeric on some layers).
fn attribute_text(attributes: &Value, field: &str) -> Option<String> {
    let text = match attributes.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if is_placeholder(&text) { None } else { Some(text) }
}
