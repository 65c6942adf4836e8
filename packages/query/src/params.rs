//! Request parameter builder for the `ArcGIS` REST query dialect.
//!
//! Parameters are kept as a sorted string map until send time so requests
//! are reproducible in logs and tests regardless of builder call order.

use std::collections::BTreeMap;

use parcel_map_models::{Envelope, Point, Polygon};
use serde_json::json;

/// Spatial reference all services in the pipeline use: Web Mercator
/// Auxiliary Sphere, in meters.
pub const WEB_MERCATOR_WKID: u32 = 102_100;

/// Approximate encoded-parameter length above which a query is sent as a
/// form POST instead of a GET. County servers reject URLs much past 2000
/// characters.
pub const GET_PARAM_LENGTH_LIMIT: usize = 1_800;

/// Builder for the parameter set of one feature-service query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, String>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL-ish attribute filter, e.g. `AIN = '5843004015'`.
    #[must_use]
    pub fn where_clause(self, clause: &str) -> Self {
        self.with("where", clause)
    }

    /// Comma-separated attribute list, or `*` for everything.
    #[must_use]
    pub fn out_fields(self, fields: &str) -> Self {
        self.with("outFields", fields)
    }

    #[must_use]
    pub fn return_geometry(self, include: bool) -> Self {
        self.with("returnGeometry", if include { "true" } else { "false" })
    }

    /// Match features that intersect the query geometry.
    #[must_use]
    pub fn intersects(self) -> Self {
        self.with("spatialRel", "esriSpatialRelIntersects")
    }

    #[must_use]
    pub fn result_record_count(self, count: u32) -> Self {
        self.with("resultRecordCount", &count.to_string())
    }

    /// Query by polygon footprint.
    #[must_use]
    pub fn geometry_polygon(self, polygon: &Polygon) -> Self {
        let payload = json!({
            "rings": polygon.rings,
            "spatialReference": { "wkid": WEB_MERCATOR_WKID },
        });
        self.geometry(&payload.to_string(), "esriGeometryPolygon")
    }

    /// Query by bounding envelope.
    #[must_use]
    pub fn geometry_envelope(self, envelope: &Envelope) -> Self {
        let payload = json!({
            "xmin": envelope.xmin,
            "ymin": envelope.ymin,
            "xmax": envelope.xmax,
            "ymax": envelope.ymax,
            "spatialReference": { "wkid": WEB_MERCATOR_WKID },
        });
        self.geometry(&payload.to_string(), "esriGeometryEnvelope")
    }

    /// Query by a single point.
    #[must_use]
    pub fn geometry_point(self, point: &Point) -> Self {
        let payload = json!({
            "x": point.x,
            "y": point.y,
            "spatialReference": { "wkid": WEB_MERCATOR_WKID },
        });
        self.geometry(&payload.to_string(), "esriGeometryPoint")
    }

    fn geometry(self, payload: &str, geometry_type: &str) -> Self {
        self.with("geometry", payload)
            .with("geometryType", geometry_type)
            .with("inSR", &WEB_MERCATOR_WKID.to_string())
    }

    /// Set an arbitrary parameter. Later writes win.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.params.contains_key("geometry")
    }

    /// Approximate length of the parameter set once URL-encoded. Used only
    /// for transport selection, so percent-encoding overhead is ignored.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.params
            .iter()
            .map(|(key, value)| key.len() + value.len() + 2)
            .sum()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Key/value pairs in sorted order, ready for `reqwest`'s `query` or
    /// `form` serializers.
    #[must_use]
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

/// HTTP method a prepared query will be sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Get,
    Post,
}

/// Finalize a parameter set for sending: inject the JSON response format
/// flag and pick the transport.
///
/// Geometry payloads always go over POST (encoded rings routinely blow past
/// URL length limits), and so does any parameter set whose encoded form
/// exceeds [`GET_PARAM_LENGTH_LIMIT`].
#[must_use]
pub fn prepare(params: QueryParams) -> (Transport, QueryParams) {
    let params = params.with("f", "json");
    let transport = if params.has_geometry() || params.encoded_len() > GET_PARAM_LENGTH_LIMIT {
        Transport::Post
    } else {
        Transport::Get
    };
    (transport, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_expected_keys() {
        let params = QueryParams::new()
            .where_clause("AIN = '5843004015'")
            .out_fields("*")
            .return_geometry(true);
        assert_eq!(params.get("where"), Some("AIN = '5843004015'"));
        assert_eq!(params.get("outFields"), Some("*"));
        assert_eq!(params.get("returnGeometry"), Some("true"));
        assert!(!params.has_geometry());
    }

    #[test]
    fn prepare_always_injects_json_format() {
        let (_, params) = prepare(QueryParams::new().where_clause("1=1"));
        assert_eq!(params.get("f"), Some("json"));
    }

    #[test]
    fn short_attribute_queries_use_get() {
        let (transport, _) = prepare(QueryParams::new().where_clause("1=1").out_fields("*"));
        assert_eq!(transport, Transport::Get);
    }

    #[test]
    fn geometry_queries_use_post() {
        let polygon = Polygon {
            rings: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]],
        };
        let (transport, params) = prepare(
            QueryParams::new()
                .geometry_polygon(&polygon)
                .intersects()
                .return_geometry(false),
        );
        assert_eq!(transport, Transport::Post);
        assert_eq!(params.get("geometryType"), Some("esriGeometryPolygon"));
        assert_eq!(params.get("inSR"), Some("102100"));
        assert!(params.get("geometry").unwrap().contains("\"wkid\":102100"));
    }

    #[test]
    fn oversized_parameter_sets_use_post() {
        let huge = "X".repeat(GET_PARAM_LENGTH_LIMIT + 1);
        let (transport, _) = prepare(QueryParams::new().where_clause(&huge));
        assert_eq!(transport, Transport::Post);
    }

    #[test]
    fn point_geometry_payload_is_esri_shaped() {
        let params = QueryParams::new().geometry_point(&Point { x: 3.5, y: -2.0 });
        assert_eq!(params.get("geometryType"), Some("esriGeometryPoint"));
        let payload: serde_json::Value =
            serde_json::from_str(params.get("geometry").unwrap()).unwrap();
        assert!((payload["x"].as_f64().unwrap() - 3.5).abs() < f64::EPSILON);
        assert_eq!(payload["spatialReference"]["wkid"], 102_100);
    }

    #[test]
    fn later_writes_win() {
        let params = QueryParams::new().out_fields("*").out_fields("AIN,APN");
        assert_eq!(params.get("outFields"), Some("AIN,APN"));
    }
}
