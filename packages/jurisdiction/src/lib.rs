#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Jurisdiction classification against the county boundary layer.
//!
//! A parcel's centroid is probed against the political boundary layer to
//! decide who governs it: an incorporated city, or the county itself for
//! unincorporated land. The answer drives which zoning source is queried
//! and which normalization profile reads the attributes.
//!
//! Classification never raises. A failed boundary query produces a
//! [`JurisdictionKind::Error`] jurisdiction, and callers are required to
//! treat that as "unknown", never as county land.

use parcel_map_models::{Jurisdiction, JurisdictionKind, Point, is_placeholder};
use parcel_map_query::{FeatureQuery, QueryParams};
use serde::Deserialize;
use serde_json::Value;

pub mod profile;
pub mod registry;

pub use profile::Profile;
pub use registry::{PROVIDERS_ENV_VAR, Provider, ProviderRegistry, RegistryError, normalize_name};

/// Display name used for unincorporated county land.
pub const UNINCORPORATED_NAME: &str = "Unincorporated";

/// Display name used when classification failed.
pub const UNKNOWN_JURISDICTION: &str = "Unknown";

/// Where and how to query the county's political boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoundaryLayer {
    pub endpoint: String,
    /// City name fields, tried in order.
    #[serde(default = "default_name_fields")]
    pub name_fields: Vec<String>,
    /// Field distinguishing incorporated cities from county land.
    #[serde(default = "default_type_field")]
    pub type_field: String,
    /// Value of `type_field` (compared case-insensitively) that marks an
    /// incorporated city.
    #[serde(default = "default_city_value")]
    pub city_value: String,
}

fn default_name_fields() -> Vec<String> {
    vec![
        "CITY_NAME".to_string(),
        "CITY_LABEL".to_string(),
        "NAME".to_string(),
    ]
}

fn default_type_field() -> String {
    "CITY_TYPE".to_string()
}

fn default_city_value() -> String {
    "city".to_string()
}

/// Classify the governing body for a point.
///
/// * A boundary feature whose type field says "city" yields
///   [`JurisdictionKind::City`] with the city's display name.
/// * Any other matching feature, or no feature at all, is unincorporated
///   county land.
/// * A failed query yields [`JurisdictionKind::Error`] with a note; the
///   distinction from county land is load-bearing for callers.
pub async fn classify(
    client: &dyn FeatureQuery,
    layer: &BoundaryLayer,
    point: Point,
) -> Jurisdiction {
    let params = QueryParams::new()
        .geometry_point(&point)
        .intersects()
        .out_fields("*")
        .return_geometry(false);

    let body = match client.query(&layer.endpoint, params).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("boundary query failed for ({}, {}): {e}", point.x, point.y);
            return Jurisdiction {
                name: UNKNOWN_JURISDICTION.to_string(),
                kind: JurisdictionKind::Error,
                raw: Value::Null,
                note: Some(format!("boundary query failed: {e}")),
            };
        }
    };

    let feature = body
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first());

    let Some(feature) = feature else {
        return Jurisdiction {
            name: UNINCORPORATED_NAME.to_string(),
            kind: JurisdictionKind::County,
            raw: Value::Null,
            note: None,
        };
    };

    let attributes = feature.get("attributes").cloned().unwrap_or(Value::Null);
    let type_value = first_attribute(&attributes, std::slice::from_ref(&layer.type_field));
    let is_city = type_value
        .as_deref()
        .is_some_and(|value| value.eq_ignore_ascii_case(&layer.city_value));

    if is_city {
        let name = first_attribute(&attributes, &layer.name_fields)
            .unwrap_or_else(|| UNKNOWN_JURISDICTION.to_string());
        Jurisdiction {
            name,
            kind: JurisdictionKind::City,
            raw: attributes,
            note: None,
        }
    } else {
        Jurisdiction {
            name: UNINCORPORATED_NAME.to_string(),
            kind: JurisdictionKind::County,
            raw: attributes,
            note: None,
        }
    }
}

/// First non-placeholder value among `candidates`, as trimmed text.
/// Numbers are stringified; other JSON types are skipped.
fn first_attribute(attributes: &Value, candidates: &[String]) -> Option<String> {
    for key in candidates {
        let Some(value) = attributes.get(key) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !is_placeholder(&text) {
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parcel_map_query::QueryError;
    use serde_json::json;

    struct ScriptedClient {
        response: Option<Value>,
    }

    #[async_trait]
    impl FeatureQuery for ScriptedClient {
        async fn query(&self, endpoint: &str, _params: QueryParams) -> Result<Value, QueryError> {
            self.response
                .clone()
                .ok_or_else(|| QueryError::RetriesExhausted {
                    attempts: 3,
                    endpoint: endpoint.to_string(),
                    last_error: "HTTP 503".to_string(),
                })
        }
    }

    fn layer() -> BoundaryLayer {
        BoundaryLayer {
            endpoint: "https://example.test/boundaries/query".to_string(),
            name_fields: default_name_fields(),
            type_field: default_type_field(),
            city_value: default_city_value(),
        }
    }

    fn probe() -> Point {
        Point {
            x: -13_165_226.0,
            y: 4_035_161.0,
        }
    }

    #[tokio::test]
    async fn city_feature_classifies_as_city() {
        let client = ScriptedClient {
            response: Some(json!({
                "features": [
                    { "attributes": { "CITY_NAME": "Santa Clarita", "CITY_TYPE": "City" } }
                ]
            })),
        };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.kind, JurisdictionKind::City);
        assert_eq!(jurisdiction.name, "Santa Clarita");
        assert_eq!(jurisdiction.note, None);
    }

    #[tokio::test]
    async fn city_type_comparison_is_case_insensitive() {
        let client = ScriptedClient {
            response: Some(json!({
                "features": [
                    { "attributes": { "CITY_NAME": "Burbank", "CITY_TYPE": "CITY" } }
                ]
            })),
        };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.kind, JurisdictionKind::City);
    }

    #[tokio::test]
    async fn placeholder_names_fall_through_to_later_candidates() {
        let client = ScriptedClient {
            response: Some(json!({
                "features": [
                    { "attributes": {
                        "CITY_NAME": " ",
                        "CITY_LABEL": "West Hollywood",
                        "CITY_TYPE": "City",
                    } }
                ]
            })),
        };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.name, "West Hollywood");
    }

    #[tokio::test]
    async fn no_feature_means_unincorporated_county() {
        let client = ScriptedClient {
            response: Some(json!({ "features": [] })),
        };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.kind, JurisdictionKind::County);
        assert_eq!(jurisdiction.name, UNINCORPORATED_NAME);
    }

    #[tokio::test]
    async fn non_city_feature_is_county_land() {
        let client = ScriptedClient {
            response: Some(json!({
                "features": [
                    { "attributes": { "CITY_NAME": "Altadena", "CITY_TYPE": "Unincorporated" } }
                ]
            })),
        };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.kind, JurisdictionKind::County);
        assert_eq!(jurisdiction.name, UNINCORPORATED_NAME);
        // The community name stays available in the raw attributes.
        assert_eq!(jurisdiction.raw["CITY_NAME"], "Altadena");
    }

    #[tokio::test]
    async fn failed_query_is_an_error_not_county() {
        let client = ScriptedClient { response: None };
        let jurisdiction = classify(&client, &layer(), probe()).await;
        assert_eq!(jurisdiction.kind, JurisdictionKind::Error);
        assert_eq!(jurisdiction.name, UNKNOWN_JURISDICTION);
        assert!(jurisdiction.note.as_deref().unwrap().contains("HTTP 503"));
    }
}
