//! Overlay district scan.
//!
//! Overlays (flood zones, fire hazard severity, historic districts, ...)
//! live on separate county layers with wildly different schemas and
//! availability. Each layer is scanned independently and concurrently; a
//! layer that is down simply contributes nothing.

use futures::future::join_all;
use parcel_map_models::{OverlayHit, Polygon, is_placeholder};
use parcel_map_query::{FeatureQuery, QueryParams};
use serde::Deserialize;
use serde_json::Value;

use crate::degrade::{OVERLAY_STAGES, degrading_query};

/// One overlay layer in the county catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverlayLayer {
    /// Short stable id, used in logs.
    pub id: String,
    /// Human label carried into every hit.
    pub label: String,
    pub endpoint: String,
    /// Sub-layer identifier within the service, if any.
    #[serde(default)]
    pub layer_id: Option<String>,
    /// Fields naming the district, tried in order.
    #[serde(default)]
    pub name_fields: Vec<String>,
    /// Fields describing the district, tried in order.
    #[serde(default)]
    pub desc_fields: Vec<String>,
    #[serde(default = "default_out_fields")]
    pub out_fields: Vec<String>,
}

fn default_out_fields() -> Vec<String> {
    vec!["*".to_string()]
}

/// Scan every overlay layer for districts covering the footprint.
///
/// Layers are queried concurrently. Failures are logged per layer and
/// produce no hits; one broken layer never hides the others' answers.
pub async fn scan_overlays(
    client: &dyn FeatureQuery,
    layers: &[OverlayLayer],
    polygon: &Polygon,
) -> Vec<OverlayHit> {
    let scans = layers.iter().map(|layer| scan_layer(client, layer, polygon));
    join_all(scans).await.into_iter().flatten().collect()
}

async fn scan_layer(
    client: &dyn FeatureQuery,
    layer: &OverlayLayer,
    polygon: &Polygon,
) -> Vec<OverlayHit> {
    let base = QueryParams::new()
        .where_clause("1=1")
        .out_fields(&layer.out_fields.join(","))
        .intersects()
        .return_geometry(false);

    let Some(hit) = degrading_query(client, &layer.endpoint, &base, polygon, OVERLAY_STAGES).await
    else {
        return Vec::new();
    };

    log::debug!("overlay {}: {} hit(s)", layer.id, hit.features.len());
    hit.features
        .iter()
        .map(|feature| {
            let attributes = feature.get("attributes").cloned().unwrap_or(Value::Null);
            OverlayHit {
                label: layer.label.clone(),
                layer_id: layer.layer_id.clone(),
                summary: summarize(&attributes, layer),
                raw: attributes,
            }
        })
        .collect()
}

/// Single-line summary from the layer's name/description candidates.
/// Falls back to the layer label when the feature carries nothing usable.
fn summarize(attributes: &Value, layer: &OverlayLayer) -> String {
    let name = first_text(attributes, &layer.name_fields);
    let description = first_text(attributes, &layer.desc_fields);
    match (name, description) {
        (Some(name), Some(description)) if !description.eq_ignore_ascii_case(&name) => {
            format!("{name} ({description})")
        }
        (Some(name), _) => name,
        (None, Some(description)) => description,
        (None, None) => layer.label.clone(),
    }
}

/// First non-placeholder value, whitespace collapsed to one line.
fn first_text(attributes: &Value, candidates: &[String]) -> Option<String> {
    for field in candidates {
        let Some(value) = attributes.get(field) else {
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
