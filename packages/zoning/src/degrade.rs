//! Degrading spatial lookup.
//!
//! Spatial queries against county and city layers fail for reasons that
//! have nothing to do with the parcel: payload limits, geometry engine
//! hiccups, plain timeouts. Each lookup therefore walks a fixed ladder of
//! geometry fidelities, re-querying with a cheaper shape after each
//! failure and recording which rung finally answered.

use parcel_map_geometry::{centroid, envelope, round_rings};
use parcel_map_models::{LookupMethod, Polygon};
use parcel_map_query::{FeatureQuery, QueryParams};
use serde_json::Value;

/// Stage ladder for zoning layers: full footprint first.
pub const ZONING_STAGES: &[LookupMethod] = &[
    LookupMethod::Polygon,
    LookupMethod::Envelope,
    LookupMethod::Centroid,
];

/// Stage ladder for overlay layers. Overlay services choke on polygon
/// payloads often enough that the envelope is the standard opening bid.
pub const OVERLAY_STAGES: &[LookupMethod] = &[LookupMethod::Envelope, LookupMethod::Centroid];

/// A successful stage: the fidelity that answered and the features it
/// returned (never empty).
#[derive(Debug, Clone, PartialEq)]
pub struct StageHit {
    pub method: LookupMethod,
    pub features: Vec<Value>,
}

/// Walk the stage ladder until a query succeeds.
///
/// * A failed query falls through to the next stage.
/// * A successful response short-circuits the ladder. Features present is
///   a hit; an empty feature set is an authoritative "nothing here", since
///   every later stage probes geometry contained in the current one and
///   could only add false positives.
/// * Stages whose geometry cannot be built from this footprint are
///   skipped.
///
/// Returns `None` when no stage produced a feature, for any reason. That
/// is a degraded answer, not an error; per-stage failures are logged here.
pub async fn degrading_query(
    client: &dyn FeatureQuery,
    endpoint: &str,
    base: &QueryParams,
    polygon: &Polygon,
    stages: &[LookupMethod],
) -> Option<StageHit> {
    for stage in stages {
        let Some(params) = stage_params(base, polygon, *stage) else {
            log::debug!("{stage} geometry unavailable for this footprint, skipping stage");
            continue;
        };
        match client.query(endpoint, params).await {
            Err(e) => {
                log::warn!("{stage} query against {endpoint} failed: {e}");
            }
            Ok(body) => {
                let features = body
                    .get("features")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if features.is_empty() {
                    log::debug!("{stage} query against {endpoint} matched no features");
                    return None;
                }
                return Some(StageHit {
                    method: *stage,
                    features,
                });
            }
        }
    }
    None
}

/// Build the parameter set for one stage, or `None` when the footprint
/// cannot supply that stage's geometry.
fn stage_params(base: &QueryParams, polygon: &Polygon, stage: LookupMethod) -> Option<QueryParams> {
    let params = base.clone();
    match stage {
        LookupMethod::Polygon => {
            let rounded = round_rings(polygon);
            if rounded.outer_ring().is_none_or(|ring| ring.len() < 3) {
                return None;
            }
            Some(params.geometry_polygon(&rounded))
        }
        LookupMethod::Envelope => envelope(polygon).map(|env| params.geometry_envelope(&env)),
        LookupMethod::Centroid => centroid(polygon).map(|point| params.geometry_point(&point)),
    }
}
