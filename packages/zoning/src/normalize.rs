//! Attribute normalization into the canonical zoning record.
//!
//! Every jurisdiction publishes a different schema, and the same field
//! name can mean different things in different places. The tables below
//! encode the known dialects per handling profile; each canonical output
//! is extracted from a priority-ordered candidate list, with the
//! provider registry allowed to prepend city-specific spellings.
//!
//! The sharp edge these tables exist for: in City of Los Angeles data,
//! `CATEGORY` holds the human-readable zone description, while on county
//! layers the category-style fields hold zone-code shorthand. Reading one
//! convention with the other's rule produces answers that look right and
//! are wrong.

use parcel_map_jurisdiction::{Profile, Provider};
use parcel_map_models::{ZoningRecord, is_placeholder};
use serde_json::Value;

/// Zone code used when no usable code was found.
pub const UNKNOWN_ZONE: &str = "Unknown";

/// Candidate attribute fields for each canonical output, tried in order.
struct FieldCandidates {
    zone: &'static [&'static str],
    zone_description: &'static [&'static str],
    general_plan: &'static [&'static str],
    general_plan_description: &'static [&'static str],
    community_plan: &'static [&'static str],
    specific_plan: &'static [&'static str],
}

const LOS_ANGELES: FieldCandidates = FieldCandidates {
    zone: &["ZONE_CMPLT", "ZONE_CLASS", "ZONE", "ZONING"],
    // LA city layers put the human description in CATEGORY.
    zone_description: &["CATEGORY", "ZONE_SMRY", "ZONE_DESC", "DESCRIPTION"],
    general_plan: &["GPLU", "GEN_PLAN", "GENERAL_PLAN"],
    general_plan_description: &["GPLU_DESC", "GEN_PLAN_DESC"],
    community_plan: &["CPA", "CPA_NAME", "COMMUNITY", "PLAN_AREA"],
    specific_plan: &["SPECIFIC_PLAN", "SP_NAME", "SPEC_PLAN"],
};

const SANTA_CLARITA: FieldCandidates = FieldCandidates {
    zone: &["ZONE", "ZONING", "ZN_DESIG"],
    // Santa Clarita ships descriptions in a dedicated field.
    zone_description: &["ZONE_DESC", "ZONEDESC", "DESCRIPTION"],
    general_plan: &["GP_DESIG", "GEN_PLAN"],
    general_plan_description: &["GP_DESC", "GEN_PLAN_DESC"],
    community_plan: &["COMMUNITY", "PLANNING_AREA"],
    specific_plan: &["SPECIFIC_PLAN", "SP_NAME"],
};

const UNINCORPORATED: FieldCandidates = FieldCandidates {
    // County layers use category-style fields as zone-code shorthand
    // ("R-1", "A-2"), so they are code candidates here...
    zone: &["ZONE", "ZONING", "ZONE_CODE", "Z_CATEGORY", "CATEGORY"],
    // ...and are deliberately absent from the description candidates.
    zone_description: &["ZONE_DESC", "ZONED_DESC", "DESCRIPTION"],
    general_plan: &["GP_CODE", "GPLU", "GEN_PLAN"],
    general_plan_description: &["GP_DESC", "GEN_PLAN_DESC"],
    community_plan: &["COMMUNITY_NAME", "COMMUNITY", "PLANNING_AREA"],
    specific_plan: &["SPECIFIC_PLAN", "SP_NAME"],
};

const OTHER_CITY: FieldCandidates = FieldCandidates {
    zone: &["ZONE", "ZONING", "ZONE_CLASS", "ZONECODE", "ZONE_CODE"],
    zone_description: &["ZONE_DESC", "DESCRIPTION", "CATEGORY", "ZONE_NAME"],
    general_plan: &["GEN_PLAN", "GENERAL_PLAN", "GP_CODE", "GPLU"],
    general_plan_description: &["GEN_PLAN_DESC", "GP_DESC", "GPLU_DESC"],
    community_plan: &["COMMUNITY", "COMMUNITY_PLAN", "PLANNING_AREA", "CPA"],
    specific_plan: &["SPECIFIC_PLAN", "SP_NAME", "SPECPLAN"],
};

const fn candidates_for(profile: Profile) -> &'static FieldCandidates {
    match profile {
        Profile::LosAngeles => &LOS_ANGELES,
        Profile::SantaClarita => &SANTA_CLARITA,
        Profile::Unincorporated => &UNINCORPORATED,
        Profile::OtherCity => &OTHER_CITY,
    }
}

/// Normalize raw zoning attributes under the jurisdiction's handling
/// profile.
///
/// A queryable provider's field hints, when present, are tried before the
/// profile's candidates; its category hints obey the same per-profile rule
/// as the builtin category columns. The result always has a non-empty
/// `zone` (falling back to [`UNKNOWN_ZONE`]) and a non-empty
/// `zone_description` (falling back to the zone code). `method` is left
/// unset; the lookup that knows which geometry stage answered fills it in.
#[must_use]
pub fn normalize(raw: &Value, jurisdiction: &str, provider: Option<&Provider>) -> ZoningRecord {
    let profile = Profile::for_jurisdiction(jurisdiction);
    let fields = candidates_for(profile);
    let (zone_hints, desc_hints) = provider_hints(provider, profile);
    log::trace!("normalizing attributes for {jurisdiction} under profile {profile}");

    let zone =
        first_field(raw, &zone_hints, fields.zone).unwrap_or_else(|| UNKNOWN_ZONE.to_string());
    let zone_description =
        first_field(raw, &desc_hints, fields.zone_description).unwrap_or_else(|| zone.clone());

    ZoningRecord {
        jurisdiction: jurisdiction.to_string(),
        general_plan: first_field(raw, &[], fields.general_plan),
        general_plan_description: first_field(raw, &[], fields.general_plan_description),
        community_plan: first_field(raw, &[], fields.community_plan),
        specific_plan: first_field(raw, &[], fields.specific_plan),
        method: None,
        raw: raw.clone(),
        zone,
        zone_description,
    }
}

/// Splits a queryable provider's hints into zone and description lanes.
///
/// Category hints are routed by the profile's category rule: a description
/// for Los Angeles and generic cities, zone-code shorthand for
/// unincorporated land, and ignored for Santa Clarita.
fn provider_hints<'a>(
    provider: Option<&'a Provider>,
    profile: Profile,
) -> (Vec<&'a str>, Vec<&'a str>) {
    let Some(Provider::Query {
        name_fields,
        desc_fields,
        category_fields,
        ..
    }) = provider
    else {
        return (Vec::new(), Vec::new());
    };

    let mut zone: Vec<&str> = name_fields.iter().flatten().map(String::as_str).collect();
    let mut description: Vec<&str> = desc_fields.iter().flatten().map(String::as_str).collect();
    let category = category_fields.iter().flatten().map(String::as_str);
    match profile {
        Profile::LosAngeles | Profile::OtherCity => description.extend(category),
        Profile::Unincorporated => zone.extend(category),
        Profile::SantaClarita => {}
    }
    (zone, description)
}

/// First usable value across the provider hints and the profile
/// candidates, in that order.
fn first_field(raw: &Value, hints: &[&str], candidates: &[&str]) -> Option<String> {
    hints
        .iter()
        .chain(candidates.iter())
        .copied()
        .find_map(|field| field_value(raw, field))
}

/// Value of one attribute, trying the exact key, then lowercase, then
/// uppercase. Placeholder values count as absent.
fn field_value(raw: &Value, field: &str) -> Option<String> {
    let variants = [
        field.to_string(),
        field.to_lowercase(),
        field.to_uppercase(),
    ];
    for key in &variants {
        let Some(value) = raw.get(key) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !is_placeholder(&text) {
            return Some(text);
        }
    }
    None
}
