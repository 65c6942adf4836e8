#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Assessor roll lookup.
//!
//! The assessor layer is keyed by parcel identifier, not geometry, so this
//! is a plain attribute query. Whatever happens, the caller gets portal
//! links for the parcel; the machine-readable record is the bonus, the
//! links are the floor.

use parcel_map_models::{AssessorOutcome, AssessorRecord, ParcelId, is_placeholder};
use parcel_map_query::{FeatureQuery, QueryParams};
use serde::Deserialize;
use serde_json::Value;

const ADDRESS_FIELDS: &[&str] = &["SitusAddress", "SitusFullAddress", "SITUS_ADDRESS"];
const CITY_FIELDS: &[&str] = &["SitusCity", "SITUS_CITY"];
const ZIP_FIELDS: &[&str] = &["SitusZip", "SitusZIP", "SITUS_ZIP"];
const USE_CODE_FIELDS: &[&str] = &["UseCode", "UseType", "USE_CODE"];
const USE_DESCRIPTION_FIELDS: &[&str] = &["UseDescription", "UseCodeDescChar1", "USE_DESCRIPTION"];
const LAND_VALUE_FIELDS: &[&str] = &["Roll_LandValue", "LandValue", "ROLL_LANDVALUE"];
const IMPROVEMENT_VALUE_FIELDS: &[&str] = &["Roll_ImpValue", "ImprovementValue", "ROLL_IMPVALUE"];
const YEAR_BUILT_FIELDS: &[&str] = &["YearBuilt1", "YearBuilt", "EffectiveYear1"];
const SQFT_FIELDS: &[&str] = &["SQFTmain1", "SqftMain", "BuildingSqft"];
const UNITS_FIELDS: &[&str] = &["Units1", "Units", "NumOfUnits"];

/// The assessor roll layer and the human-facing portal next to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssessorLayer {
    pub endpoint: String,
    #[serde(default = "default_out_fields")]
    pub out_fields: Vec<String>,
    #[serde(default = "default_ain_field")]
    pub ain_field: String,
    #[serde(default = "default_apn_field")]
    pub apn_field: String,
    /// Portal URL template; `{ain}` and `{apn}` are substituted.
    pub portal_url: String,
    /// Additional link templates, substituted the same way.
    #[serde(default)]
    pub extra_links: Vec<String>,
}

fn default_out_fields() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_ain_field() -> String {
    "AIN".to_string()
}

fn default_apn_field() -> String {
    "APN".to_string()
}

/// Portal links for a parcel, with `{ain}`/`{apn}` substituted. Always
/// non-empty: the portal URL itself comes first.
#[must_use]
pub fn portal_links(layer: &AssessorLayer, id: &ParcelId) -> Vec<String> {
    std::iter::once(&layer.portal_url)
        .chain(layer.extra_links.iter())
        .map(|template| template.replace("{ain}", &id.ain).replace("{apn}", &id.apn))
        .collect()
}

/// Fetch the assessor roll record for a parcel.
///
/// Query failures and empty rolls both come back as
/// [`AssessorOutcome::NotFound`] carrying the portal links, so display
/// surfaces always have somewhere to send the user.
pub async fn lookup_assessor(
    client: &dyn FeatureQuery,
    layer: &AssessorLayer,
    id: &ParcelId,
) -> AssessorOutcome {
    let links = portal_links(layer, id);
    let params = QueryParams::new()
        .where_clause(&identifier_clause(layer, id))
        .out_fields(&layer.out_fields.join(","))
        .return_geometry(false);

    let body = match client.query(&layer.endpoint, params).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("assessor query for {id} failed: {e}");
            return AssessorOutcome::NotFound {
                note: format!("assessor lookup failed: {e}"),
                links,
            };
        }
    };

    let features = body
        .get("features")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let Some(feature) = features.first() else {
        return AssessorOutcome::NotFound {
            note: format!("no assessor roll record for {id}"),
            links,
        };
    };
    if features.len() > 1 {
        log::debug!(
            "{} assessor rows matched {id}, keeping the first",
            features.len()
        );
    }

    let attributes = feature.get("attributes").cloned().unwrap_or(Value::Null);
    AssessorOutcome::Found {
        record: parse_record(&attributes, id),
        links,
    }
}

/// Match either identifier column against either identifier spelling.
fn identifier_clause(layer: &AssessorLayer, id: &ParcelId) -> String {
    format!(
        "{ain} = '{digits}' OR {ain} = '{dashed}' OR {apn} = '{digits}' OR {apn} = '{dashed}'",
        ain = layer.ain_field,
        apn = layer.apn_field,
        digits = id.ain,
        dashed = id.apn,
    )
}

fn parse_record(attributes: &Value, id: &ParcelId) -> AssessorRecord {
    AssessorRecord {
        ain: id.ain.clone(),
        apn: id.apn.clone(),
        situs_address: first_text(attributes, ADDRESS_FIELDS),
        situs_city: first_text(attributes, CITY_FIELDS),
        situs_zip: first_text(attributes, ZIP_FIELDS),
        use_code: first_text(attributes, USE_CODE_FIELDS),
        use_description: first_text(attributes, USE_DESCRIPTION_FIELDS),
        land_value: first_number(attributes, LAND_VALUE_FIELDS),
        improvement_value: first_number(attributes, IMPROVEMENT_VALUE_FIELDS),
        // The roll stores 0 for unknown years, sizes, and unit counts.
        year_built: first_int(attributes, YEAR_BUILT_FIELDS).filter(|year| *year > 0),
        building_sqft: first_number(attributes, SQFT_FIELDS).filter(|sqft| *sqft > 0.0),
        units: first_int(attributes, UNITS_FIELDS).filter(|units| *units > 0),
        raw: attributes.clone(),
    }
}

/// First non-placeholder value among the candidates, numbers stringified
/// (ZIP and use-code columns are numeric on some roll vintages).
fn first_text(attributes: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|field| {
        let text = match attributes.get(*field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if is_placeholder(&text) { None } else { Some(text) }
    })
}

fn first_number(attributes: &Value, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|field| number_value(attributes.get(*field)?))
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn first_int(attributes: &Value, candidates: &[&str]) -> Option<i64> {
    candidates
        .iter()
        .find_map(|field| int_value(attributes.get(*field)?))
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
