#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zoning determination for a resolved parcel.
//!
//! Which layer answers depends on who governs the parcel: unincorporated
//! land is zoned by the county's own layer, incorporated cities by whatever
//! their registry entry says (a queryable service, or a human viewer link).
//! Spatial queries degrade polygon -> envelope -> centroid, and the winning
//! feature is normalized into the canonical record regardless of which
//! city's schema it came from.

use parcel_map_jurisdiction::{Provider, ProviderRegistry};
use parcel_map_models::{Jurisdiction, JurisdictionKind, Polygon, ZoningOutcome};
use parcel_map_query::{FeatureQuery, QueryParams};
use serde::Deserialize;
use serde_json::Value;

pub mod degrade;
pub mod normalize;
pub mod overlay;

pub use degrade::{OVERLAY_STAGES, StageHit, ZONING_STAGES, degrading_query};
pub use normalize::{UNKNOWN_ZONE, normalize};
pub use overlay::{OverlayLayer, scan_overlays};

/// The county's own zoning layer, answering for unincorporated parcels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoningLayer {
    pub endpoint: String,
    #[serde(default = "default_out_fields")]
    pub out_fields: Vec<String>,
}

fn default_out_fields() -> Vec<String> {
    vec!["*".to_string()]
}

/// Determine zoning for a parcel footprint under its governing body.
///
/// * County parcels query the county layer.
/// * City parcels query the city's registered service, or return a
///   [`ZoningOutcome::ViewerOnly`] pointer when the city has none.
/// * An error-classified jurisdiction short-circuits to
///   [`ZoningOutcome::NotFound`]; the county layer is never used as a guess
///   for land that may be incorporated.
pub async fn lookup_zoning(
    client: &dyn FeatureQuery,
    county_layer: &ZoningLayer,
    registry: &ProviderRegistry,
    jurisdiction: &Jurisdiction,
    polygon: &Polygon,
) -> ZoningOutcome {
    match jurisdiction.kind {
        JurisdictionKind::Error => {
            let detail = jurisdiction
                .note
                .clone()
                .unwrap_or_else(|| "classification failed".to_string());
            ZoningOutcome::NotFound {
                note: format!("jurisdiction unknown ({detail}), zoning lookup skipped"),
            }
        }
        JurisdictionKind::County => {
            query_layer(
                client,
                &county_layer.endpoint,
                &county_layer.out_fields,
                &jurisdiction.name,
                None,
                polygon,
            )
            .await
        }
        JurisdictionKind::City => {
            let name = &jurisdiction.name;
            let provider = registry.resolve(name);
            match provider {
                Some(Provider::Query {
                    endpoint,
                    out_fields,
                    ..
                }) => {
                    let fields = out_fields.clone().unwrap_or_else(default_out_fields);
                    query_layer(client, endpoint, &fields, name, provider, polygon).await
                }
                Some(Provider::ViewerLink { viewer }) => {
                    log::debug!("{name} is viewer-only, skipping feature query");
                    ZoningOutcome::ViewerOnly {
                        jurisdiction: name.clone(),
                        viewer: Some(viewer.clone()),
                        note: format!("{name} publishes zoning through its own viewer"),
                    }
                }
                None => {
                    log::debug!("{name} has no registry entry");
                    ZoningOutcome::ViewerOnly {
                        jurisdiction: name.clone(),
                        viewer: None,
                        note: format!("no zoning service is registered for {name}"),
                    }
                }
            }
        }
    }
}

/// Run the degrading ladder against one zoning layer and normalize the
/// winning feature.
async fn query_layer(
    client: &dyn FeatureQuery,
    endpoint: &str,
    out_fields: &[String],
    jurisdiction_name: &str,
    provider: Option<&Provider>,
    polygon: &Polygon,
) -> ZoningOutcome {
    let base = QueryParams::new()
        .where_clause("1=1")
        .out_fields(&out_fields.join(","))
        .intersects()
        .return_geometry(false);

    let Some(hit) = degrading_query(client, endpoint, &base, polygon, ZONING_STAGES).await else {
        return ZoningOutcome::NotFound {
            note: format!("no zoning feature intersects the parcel ({jurisdiction_name})"),
        };
    };

    if hit.features.len() > 1 {
        log::debug!(
            "{} zoning features intersect the footprint, keeping the first",
            hit.features.len()
        );
    }
    let attributes = hit.features[0]
        .get("attributes")
        .cloned()
        .unwrap_or(Value::Null);
    let mut record = normalize(&attributes, jurisdiction_name, provider);
    record.method = Some(hit.method);
    ZoningOutcome::Found { record }
}
