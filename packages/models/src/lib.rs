#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the parcel lookup pipeline.
//!
//! Every layer of the pipeline (resolution, jurisdiction classification,
//! zoning, overlays, assessor) consumes and produces these types. Geometry
//! coordinates are Web Mercator meters, matching the county services the
//! clients talk to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

/// Attribute values that mean "no data" when they come back from an upstream
/// service. Compared case-insensitively after trimming.
pub const PLACEHOLDER_VALUES: &[&str] = &["null", "none", "n/a", "unknown", "-", "undefined"];

/// Whether an attribute value is empty or one of the placeholder strings
/// upstream services use instead of omitting a field.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || PLACEHOLDER_VALUES
            .iter()
            .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
}

/// A county parcel identifier in both of its conventional spellings.
///
/// The county uses a 10-digit Assessor Identification Number (AIN). The same
/// number formatted `NNNN-NNN-NNN` is the Assessor Parcel Number (APN).
/// Upstream layers disagree about which spelling they store, so both are kept
/// and queries match either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelId {
    /// The 10-digit undashed form, e.g. `"5843004015"`.
    pub ain: String,
    /// The dashed `NNNN-NNN-NNN` form, e.g. `"5843-004-015"`.
    pub apn: String,
}

impl ParcelId {
    /// Parse a parcel identifier from user input.
    ///
    /// Non-digit characters are stripped, so `"5843-004-015"`,
    /// `"5843004015"`, and `"AIN 5843 004 015"` all produce the same
    /// identifier. Returns `None` unless exactly 10 digits remain.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 10 {
            return None;
        }
        let apn = format!("{}-{}-{}", &digits[0..4], &digits[4..7], &digits[7..10]);
        Some(Self { ain: digits, apn })
    }
}

impl std::fmt::Display for ParcelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.apn)
    }
}

/// A point in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// An axis-aligned bounding box in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// A polygon as the county services ship it: a list of rings, each ring a
/// list of `[x, y]` coordinate pairs. The first ring is the outer boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// The outer ring, if the polygon has one.
    #[must_use]
    pub fn outer_ring(&self) -> Option<&[[f64; 2]]> {
        self.rings.first().map(Vec::as_slice)
    }
}

/// A resolved parcel: identifier, situs address fields, and footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelFeature {
    /// 10-digit AIN.
    pub ain: String,
    /// Dashed APN.
    pub apn: String,
    /// Street address on record, if the layer had one.
    pub situs_address: Option<String>,
    /// Situs city, if the layer had one.
    pub situs_city: Option<String>,
    /// Situs ZIP code, if the layer had one.
    pub situs_zip: Option<String>,
    /// Parcel footprint in Web Mercator meters.
    pub polygon: Polygon,
}

impl ParcelFeature {
    /// The parcel identifier in both spellings.
    #[must_use]
    pub fn id(&self) -> ParcelId {
        ParcelId {
            ain: self.ain.clone(),
            apn: self.apn.clone(),
        }
    }
}

/// How a parcel's governing body was classified.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JurisdictionKind {
    /// Inside an incorporated city.
    City,
    /// Unincorporated county land.
    County,
    /// Classification failed; callers must not treat this as county land.
    Error,
}

/// The governing body for a location, as classified against the county
/// boundary layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    /// Display name, e.g. `"Los Angeles"` or `"Unincorporated"`.
    pub name: String,
    /// City, county, or error.
    pub kind: JurisdictionKind,
    /// Raw attributes of the boundary feature that matched, `Null` when no
    /// feature matched or the query failed.
    pub raw: Value,
    /// Human-readable detail when classification failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Which geometry fidelity a spatial lookup ultimately succeeded with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LookupMethod {
    /// Full (rounded) parcel footprint.
    Polygon,
    /// Bounding box of the footprint.
    Envelope,
    /// Single midpoint of the bounding box.
    Centroid,
}

/// A zoning determination normalized to the canonical schema.
///
/// `zone` and `zone_description` are always non-empty: when the source layer
/// had no usable value, `zone` falls back to `"Unknown"` and the description
/// falls back to the zone code, so renderers never null-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoningRecord {
    /// Jurisdiction the attributes were interpreted under.
    pub jurisdiction: String,
    /// Zone code, e.g. `"R-1-10000"`. Never empty.
    pub zone: String,
    /// Human-readable zone description. Never empty.
    pub zone_description: String,
    /// General plan land-use code.
    pub general_plan: Option<String>,
    /// General plan land-use description.
    pub general_plan_description: Option<String>,
    /// Community or planning area name.
    pub community_plan: Option<String>,
    /// Specific plan name, if one applies.
    pub specific_plan: Option<String>,
    /// Geometry fidelity the winning query used.
    pub method: Option<LookupMethod>,
    /// Raw attributes of the zoning feature, for debugging and display.
    pub raw: Value,
}

impl ZoningRecord {
    /// Project this record into the compact display card, dropping fields
    /// whose values are placeholders or redundant with the code they
    /// describe.
    #[must_use]
    pub fn card(&self) -> ZoningCard {
        let keep = |value: &str| {
            if is_placeholder(value) {
                None
            } else {
                Some(value.to_string())
            }
        };
        let keep_opt = |value: &Option<String>| value.as_deref().and_then(keep);
        let keep_desc = |value: &str, code: Option<&str>| {
            keep(value).filter(|v| code.is_none_or(|c| !v.eq_ignore_ascii_case(c)))
        };

        let zone = keep(&self.zone);
        let general_plan = keep_opt(&self.general_plan);
        ZoningCard {
            jurisdiction: self.jurisdiction.clone(),
            zone_description: keep_desc(&self.zone_description, zone.as_deref()),
            general_plan_description: self
                .general_plan_description
                .as_deref()
                .and_then(|v| keep_desc(v, general_plan.as_deref())),
            zone,
            general_plan,
            community_plan: keep_opt(&self.community_plan),
            specific_plan: keep_opt(&self.specific_plan),
            method: self.method,
        }
    }
}

/// Compact zoning projection for display surfaces.
///
/// Unlike [`ZoningRecord`], every field here is optional noise-free output:
/// placeholders and descriptions that merely repeat their code are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoningCard {
    pub jurisdiction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_plan_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<LookupMethod>,
}

/// Outcome of a zoning lookup. Degraded outcomes are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZoningOutcome {
    /// A zoning feature was found and normalized.
    Found {
        record: ZoningRecord,
    },
    /// The jurisdiction publishes zoning through a human viewer only.
    ViewerOnly {
        jurisdiction: String,
        /// Link to the jurisdiction's own viewer, when one is registered.
        #[serde(skip_serializing_if = "Option::is_none")]
        viewer: Option<String>,
        note: String,
    },
    /// No zoning information could be determined.
    NotFound {
        note: String,
    },
}

/// One overlay district covering a parcel (flood zone, fire hazard, historic
/// district, ...). A parcel can have zero or more of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayHit {
    /// Human label of the overlay layer, e.g. `"FEMA Flood Zone"`.
    pub label: String,
    /// Sub-layer identifier within the overlay service, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    /// Single-line summary built from the layer's name/description fields.
    pub summary: String,
    /// Raw attributes of the overlay feature.
    pub raw: Value,
}

/// Assessor roll data for a parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessorRecord {
    /// 10-digit AIN.
    pub ain: String,
    /// Dashed APN.
    pub apn: String,
    /// Situs address on the roll.
    pub situs_address: Option<String>,
    pub situs_city: Option<String>,
    pub situs_zip: Option<String>,
    /// Assessor use code, e.g. `"0100"`.
    pub use_code: Option<String>,
    /// Human-readable use description, e.g. `"Single Family Residence"`.
    pub use_description: Option<String>,
    /// Assessed land value in dollars.
    pub land_value: Option<f64>,
    /// Assessed improvement value in dollars.
    pub improvement_value: Option<f64>,
    pub year_built: Option<i64>,
    /// Main building square footage.
    pub building_sqft: Option<f64>,
    /// Number of dwelling units.
    pub units: Option<i64>,
    /// Raw attributes of the roll feature.
    pub raw: Value,
}

/// Outcome of an assessor lookup. When no machine-readable record exists the
/// caller still gets portal links a human can follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssessorOutcome {
    Found {
        record: AssessorRecord,
        /// Portal links for the parcel, for display next to the record.
        links: Vec<String>,
    },
    NotFound {
        note: String,
        /// Portal links the user can try by hand.
        links: Vec<String>,
    },
}

/// Everything the pipeline knows about one parcel, assembled by the lookup
/// facade from the per-category lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyReport {
    /// Correlation id for the request, echoed in every log line.
    pub request_id: String,
    /// The resolved parcel, `None` when nothing matched the input.
    pub parcel: Option<ParcelFeature>,
    /// Governing body, `None` when no parcel resolved.
    pub jurisdiction: Option<Jurisdiction>,
    pub zoning: ZoningOutcome,
    pub overlays: Vec<OverlayHit>,
    pub assessor: AssessorOutcome,
    /// Human-readable notes accumulated along the way.
    pub notes: Vec<String>,
}
