#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The lookup engine, one facade over the whole pipeline.
//!
//! [`Engine`] owns the query client, the county layer catalog, the city
//! provider registry, and the cross-request caches, and exposes the
//! operations callers actually ask for: resolve a parcel, classify its
//! governing body, fetch zoning, overlays, or assessor data, or assemble
//! the whole [`PropertyReport`] in one call. Every operation runs under a
//! [`RequestScope`] whose id ties its log lines together.
//!
//! Failure handling at this surface is blunt on purpose: transport errors
//! are logged with their cause and flattened into the same "not found"
//! shapes as genuine absence, so callers render partial data instead of
//! exceptions. The distinction lives in the logs, not the return types.

use std::sync::Arc;

use parcel_map_assessor::portal_links;
use parcel_map_cache::{CacheRegistry, CacheStats};
use parcel_map_geometry::centroid;
use parcel_map_jurisdiction::{ProviderRegistry, UNKNOWN_JURISDICTION, classify};
use parcel_map_models::{
    AssessorOutcome, Jurisdiction, JurisdictionKind, OverlayHit, ParcelFeature, ParcelId, Point,
    PropertyReport, ZoningOutcome,
};
use parcel_map_query::{ArcgisClient, FeatureQuery, QueryError};
use parcel_map_resolver::{clean_situs_address, resolve_address, resolve_id};
use parcel_map_zoning::scan_overlays;
use serde_json::Value;

pub mod config;
pub mod scope;

pub use config::CountyConfig;
pub use scope::RequestScope;

/// The assembled lookup pipeline.
pub struct Engine {
    client: Arc<dyn FeatureQuery>,
    config: CountyConfig,
    registry: ProviderRegistry,
    caches: CacheRegistry,
}

impl Engine {
    /// Wire an engine from parts. Tests inject a scripted client here.
    #[must_use]
    pub fn new(
        client: Arc<dyn FeatureQuery>,
        config: CountyConfig,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            client,
            config,
            registry,
            caches: CacheRegistry::new(),
        }
    }

    /// Engine against the live county services, with the embedded catalog
    /// and the registry from [`ProviderRegistry::load`].
    ///
    /// # Errors
    ///
    /// * Returns [`QueryError`] when the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self, QueryError> {
        Ok(Self::new(
            Arc::new(ArcgisClient::new()?),
            CountyConfig::la_county(),
            ProviderRegistry::load(),
        ))
    }

    /// The layer catalog this engine queries.
    #[must_use]
    pub const fn config(&self) -> &CountyConfig {
        &self.config
    }

    /// Resolve user input, a parcel identifier in either spelling or a
    /// situs address, to its parcel feature.
    ///
    /// Returns `None` both when nothing matched and when the parcel layer
    /// could not be queried; the cause is logged here, and callers get one
    /// uniform "no parcel" outcome to render.
    pub async fn resolve_parcel(&self, input: &str) -> Option<ParcelFeature> {
        let scope = RequestScope::new();
        self.resolve_scoped(&scope, input).await
    }

    /// Classify the governing body for a Web Mercator point.
    pub async fn classify_jurisdiction(&self, point: Point) -> Jurisdiction {
        let scope = RequestScope::new();
        self.classify_scoped(&scope, point).await
    }

    /// Zoning determination for the parcel matching `input`.
    pub async fn lookup_zoning(&self, input: &str) -> ZoningOutcome {
        let scope = RequestScope::new();
        let Some(parcel) = self.resolve_scoped(&scope, input).await else {
            return ZoningOutcome::NotFound {
                note: format!("no parcel matched {input:?}"),
            };
        };
        let jurisdiction = self.jurisdiction_for(&scope, &parcel).await;
        self.zoning_scoped(&parcel, &jurisdiction).await
    }

    /// Overlay districts covering the parcel matching `input`. Empty both
    /// when no overlay applies and when no parcel matched.
    pub async fn lookup_overlays(&self, input: &str) -> Vec<OverlayHit> {
        let scope = RequestScope::new();
        match self.resolve_scoped(&scope, input).await {
            Some(parcel) => self.overlays_scoped(&parcel).await,
            None => Vec::new(),
        }
    }

    /// Assessor roll record for the parcel matching `input`.
    ///
    /// Identifier input goes straight to the roll; the roll is keyed by
    /// AIN, so no footprint is needed. Address input resolves the parcel
    /// first to learn its identifier.
    pub async fn lookup_assessor(&self, input: &str) -> AssessorOutcome {
        let scope = RequestScope::new();
        let id = match ParcelId::parse(input) {
            Some(id) => Some(id),
            None => self
                .resolve_scoped(&scope, input)
                .await
                .map(|parcel| parcel.id()),
        };
        match id {
            Some(id) => self.assessor_scoped(&id).await,
            None => AssessorOutcome::NotFound {
                note: format!("no parcel matched {input:?}"),
                links: Vec::new(),
            },
        }
    }

    /// The full report: parcel, jurisdiction, zoning, overlays, and
    /// assessor data in one pass.
    ///
    /// The parcel is resolved and classified once, then the three
    /// attribute lookups run concurrently. Each phase degrades on its own;
    /// a dead overlay service costs its own section and nothing else.
    pub async fn lookup_property(&self, input: &str) -> PropertyReport {
        let scope = RequestScope::new();
        let request_id = scope.id().to_string();
        log::info!("[{request_id}] property lookup for {input:?}");

        let mut notes = Vec::new();
        let Some(parcel) = self.resolve_scoped(&scope, input).await else {
            notes.push(format!("no parcel matched {input:?}"));
            let links = ParcelId::parse(input)
                .map(|id| portal_links(&self.config.assessor_layer, &id))
                .unwrap_or_default();
            return PropertyReport {
                request_id,
                parcel: None,
                jurisdiction: None,
                zoning: ZoningOutcome::NotFound {
                    note: "no parcel resolved".to_string(),
                },
                overlays: Vec::new(),
                assessor: AssessorOutcome::NotFound {
                    note: "no parcel resolved".to_string(),
                    links,
                },
                notes,
            };
        };

        let jurisdiction = self.jurisdiction_for(&scope, &parcel).await;
        if let Some(note) = &jurisdiction.note {
            notes.push(note.clone());
        }

        let id = parcel.id();
        let (zoning, overlays, assessor) = tokio::join!(
            self.zoning_scoped(&parcel, &jurisdiction),
            self.overlays_scoped(&parcel),
            self.assessor_scoped(&id),
        );

        log::info!(
            "[{request_id}] AIN {} under {}: zoning {}, {} overlay hit(s)",
            parcel.ain,
            jurisdiction.name,
            zoning_summary(&zoning),
            overlays.len()
        );
        PropertyReport {
            request_id,
            parcel: Some(parcel),
            jurisdiction: Some(jurisdiction),
            zoning,
            overlays,
            assessor,
            notes,
        }
    }

    /// Occupancy snapshot of every shared cache.
    #[must_use]
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.caches.stats()
    }

    /// Drop every cached entry across all categories.
    pub fn clear_caches(&self) {
        self.caches.clear_all();
    }

    async fn resolve_scoped(&self, scope: &RequestScope, input: &str) -> Option<ParcelFeature> {
        let key = parcel_key(input);
        if let Some(parcel) = scope.get_as::<ParcelFeature>(&key) {
            return Some(parcel);
        }
        if let Some(parcel) = self.caches.get_parcel(&key) {
            scope.set_as(&key, &parcel);
            return Some(parcel);
        }

        let resolved = match ParcelId::parse(input) {
            Some(id) => resolve_id(self.client.as_ref(), &self.config.parcel_layer, &id).await,
            None => resolve_address(self.client.as_ref(), &self.config.parcel_layer, input).await,
        };
        match resolved {
            Ok(Some(parcel)) => {
                log::debug!("[{}] {input:?} resolved to AIN {}", scope.id(), parcel.ain);
                self.caches.set_parcel(&key, parcel.clone());
                scope.set_as(&key, &parcel);
                Some(parcel)
            }
            Ok(None) => {
                log::debug!("[{}] no parcel matched {input:?}", scope.id());
                None
            }
            Err(e) => {
                // Flattened to `None` here; the log line keeps the cause.
                log::error!("[{}] parcel query for {input:?} failed: {e}", scope.id());
                None
            }
        }
    }

    async fn classify_scoped(&self, scope: &RequestScope, point: Point) -> Jurisdiction {
        let key = jurisdiction_key(point);
        if let Some(jurisdiction) = scope.get_as::<Jurisdiction>(&key) {
            return jurisdiction;
        }
        if let Some(jurisdiction) = self.caches.get_jurisdiction(&key) {
            scope.set_as(&key, &jurisdiction);
            return jurisdiction;
        }

        let jurisdiction = classify(self.client.as_ref(), &self.config.boundary_layer, point).await;
        log::debug!(
            "[{}] ({:.0}, {:.0}) governed by {} ({})",
            scope.id(),
            point.x,
            point.y,
            jurisdiction.name,
            jurisdiction.kind
        );
        scope.set_as(&key, &jurisdiction);
        // Error classifications stay out of the shared cache so the next
        // request re-queries the boundary layer.
        if jurisdiction.kind != JurisdictionKind::Error {
            self.caches.set_jurisdiction(&key, jurisdiction.clone());
        }
        jurisdiction
    }

    async fn jurisdiction_for(&self, scope: &RequestScope, parcel: &ParcelFeature) -> Jurisdiction {
        match centroid(&parcel.polygon) {
            Some(point) => self.classify_scoped(scope, point).await,
            None => Jurisdiction {
                name: UNKNOWN_JURISDICTION.to_string(),
                kind: JurisdictionKind::Error,
                raw: Value::Null,
                note: Some(format!("parcel {} has no usable footprint", parcel.apn)),
            },
        }
    }

    async fn zoning_scoped(
        &self,
        parcel: &ParcelFeature,
        jurisdiction: &Jurisdiction,
    ) -> ZoningOutcome {
        let key = format!("zoning:{}", parcel.ain);
        if let Some(outcome) = self.caches.get_zoning(&key) {
            return outcome;
        }
        let outcome = parcel_map_zoning::lookup_zoning(
            self.client.as_ref(),
            &self.config.zoning_layer,
            &self.registry,
            jurisdiction,
            &parcel.polygon,
        )
        .await;
        // An outcome that only reflects a failed classification is not
        // worth keeping.
        if jurisdiction.kind != JurisdictionKind::Error {
            self.caches.set_zoning(&key, outcome.clone());
        }
        outcome
    }

    async fn overlays_scoped(&self, parcel: &ParcelFeature) -> Vec<OverlayHit> {
        let key = format!("overlays:{}", parcel.ain);
        if let Some(hits) = self.caches.get_overlays(&key) {
            return hits;
        }
        let hits =
            scan_overlays(self.client.as_ref(), &self.config.overlays, &parcel.polygon).await;
        self.caches.set_overlays(&key, hits.clone());
        hits
    }

    async fn assessor_scoped(&self, id: &ParcelId) -> AssessorOutcome {
        let key = format!("assessor:{}", id.ain);
        if let Some(outcome) = self.caches.get_assessor(&key) {
            return outcome;
        }
        let outcome = parcel_map_assessor::lookup_assessor(
            self.client.as_ref(),
            &self.config.assessor_layer,
            id,
        )
        .await;
        self.caches.set_assessor(&key, outcome.clone());
        outcome
    }
}

/// Shared-cache key for parcel lookups. Both identifier spellings and
/// every spelling of one street address land on the same slot.
fn parcel_key(input: &str) -> String {
    if let Some(id) = ParcelId::parse(input) {
        return format!("ain:{}", id.ain);
    }
    let street = clean_situs_address(input).unwrap_or_else(|| input.trim().to_uppercase());
    format!("addr:{street}")
}

/// Shared-cache key for classifications, rounded to whole meters so
/// nearby centroids of the same parcel collapse onto one slot.
fn jurisdiction_key(point: Point) -> String {
    format!("juris:{:.0}:{:.0}", point.x, point.y)
}

const fn zoning_summary(outcome: &ZoningOutcome) -> &'static str {
    match outcome {
        ZoningOutcome::Found { .. } => "found",
        ZoningOutcome::ViewerOnly { .. } => "viewer-only",
        ZoningOutcome::NotFound { .. } => "not found",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use parcel_map_models::LookupMethod;
    use parcel_map_query::QueryParams;
    use serde_json::json;

    use super::*;

    const PARCELS: &str = "https://county.test/parcels/query";
    const BOUNDARIES: &str = "https://county.test/boundaries/query";
    const ZONING: &str = "https://county.test/zoning/query";
    const ROLL: &str = "https://county.test/roll/query";
    const FLOOD: &str = "https://county.test/flood/query";
    const FIRE: &str = "https://county.test/fire/query";
    const CITY_ZONING: &str = "https://city.test/zoning/query";

    const TEST_CATALOG: &str = r#"
        [parcel_layer]
        endpoint = "https://county.test/parcels/query"

        [boundary_layer]
        endpoint = "https://county.test/boundaries/query"

        [zoning_layer]
        endpoint = "https://county.test/zoning/query"

        [assessor_layer]
        endpoint = "https://county.test/roll/query"
        portal_url = "https://portal.county.test/parceldetail/{ain}"

        [[overlay]]
        id = "flood"
        label = "Flood Zone"
        endpoint = "https://county.test/flood/query"
        name_fields = ["FLD_ZONE"]
        desc_fields = ["ZONE_SUBTY"]

        [[overlay]]
        id = "fire"
        label = "Fire Hazard"
        endpoint = "https://county.test/fire/query"
        name_fields = ["HAZ_CLASS"]
    "#;

    /// Answers from a fixed endpoint-to-body table; endpoints without an
    /// entry fail like a service that is down.
    struct CountyMock {
        responses: HashMap<String, serde_json::Value>,
        calls: Mutex<Vec<String>>,
    }

    impl CountyMock {
        fn new(responses: &[(&str, serde_json::Value)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(endpoint, body)| ((*endpoint).to_string(), body.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn hits(&self, endpoint: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|called| *called == endpoint)
                .count()
        }
    }

    #[async_trait]
    impl FeatureQuery for CountyMock {
        async fn query(
            &self,
            endpoint: &str,
            _params: QueryParams,
        ) -> Result<serde_json::Value, QueryError> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            self.responses.get(endpoint).cloned().ok_or_else(|| {
                QueryError::RetriesExhausted {
                    attempts: 3,
                    endpoint: endpoint.to_string(),
                    last_error: "HTTP 503 Service Unavailable".to_string(),
                }
            })
        }
    }

    fn test_registry() -> ProviderRegistry {
        ProviderRegistry::from_json_str(
            r#"{
                "Santa Clarita": {
                    "method": "query",
                    "endpoint": "https://city.test/zoning/query"
                },
                "Pasadena": {
                    "method": "viewer_link",
                    "viewer": "https://city.test/viewer"
                }
            }"#,
        )
        .unwrap()
    }

    fn engine_with(responses: &[(&str, serde_json::Value)]) -> (Arc<CountyMock>, Engine) {
        let client = Arc::new(CountyMock::new(responses));
        let config = CountyConfig::from_toml_str(TEST_CATALOG).unwrap();
        let engine = Engine::new(client.clone(), config, test_registry());
        (client, engine)
    }

    fn parcel_body() -> serde_json::Value {
        json!({
            "features": [{
                "attributes": {
                    "AIN": "5843004015",
                    "SitusAddress": "17523 BRAMBLE CT",
                    "SitusCity": "CANYON COUNTRY",
                    "SitusZip": "91387"
                },
                "geometry": {
                    "rings": [[
                        [-13140050.0, 4070100.0],
                        [-13140000.0, 4070100.0],
                        [-13140000.0, 4070140.0],
                        [-13140050.0, 4070140.0],
                        [-13140050.0, 4070100.0]
                    ]]
                }
            }]
        })
    }

    fn roll_body() -> serde_json::Value {
        json!({
            "features": [{
                "attributes": {
                    "AIN": "5843004015",
                    "UseCode": "0101",
                    "UseType": "Single Family Residence",
                    "Roll_LandValue": 320_000,
                    "Roll_ImpValue": 180_000,
                    "YearBuilt1": 1987,
                    "SQFTmain1": 2_150,
                    "Units1": 1
                }
            }]
        })
    }

    fn empty_features() -> serde_json::Value {
        json!({ "features": [] })
    }

    fn one_feature(attributes: serde_json::Value) -> serde_json::Value {
        json!({ "features": [{ "attributes": attributes }] })
    }

    fn city_boundary(name: &str) -> serde_json::Value {
        one_feature(json!({ "CITY_NAME": name, "CITY_TYPE": "City" }))
    }

    #[tokio::test]
    async fn county_parcel_report_end_to_end() {
        let (client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (BOUNDARIES, empty_features()),
            (ZONING, one_feature(json!({ "ZONE": "R-1-10000", "GP_CODE": "RL1" }))),
            (ROLL, roll_body()),
            (FLOOD, empty_features()),
            (FIRE, empty_features()),
        ]);

        let report = engine.lookup_property("5843-004-015").await;

        let parcel = report.parcel.expect("parcel should resolve");
        assert_eq!(parcel.ain, "5843004015");
        assert_eq!(parcel.apn, "5843-004-015");

        let jurisdiction = report.jurisdiction.expect("jurisdiction should classify");
        assert_eq!(jurisdiction.kind, JurisdictionKind::County);
        assert_eq!(jurisdiction.name, "Unincorporated");

        match report.zoning {
            ZoningOutcome::Found { record } => {
                assert_eq!(record.zone, "R-1-10000");
                assert_eq!(record.jurisdiction, "Unincorporated");
                assert_eq!(record.general_plan.as_deref(), Some("RL1"));
                assert_eq!(record.method, Some(LookupMethod::Polygon));
            }
            other => panic!("expected a zoning record, got {other:?}"),
        }

        assert!(report.overlays.is_empty());
        assert!(matches!(report.assessor, AssessorOutcome::Found { .. }));
        assert!(!report.request_id.is_empty());
        assert_eq!(client.hits(PARCELS), 1);
    }

    #[tokio::test]
    async fn unknown_identifier_reports_not_found_everywhere() {
        let (client, engine) = engine_with(&[
            (PARCELS, empty_features()),
            (ROLL, empty_features()),
        ]);

        assert!(engine.resolve_parcel("9999-999-999").await.is_none());
        assert!(matches!(
            engine.lookup_zoning("9999-999-999").await,
            ZoningOutcome::NotFound { .. }
        ));
        assert!(engine.lookup_overlays("9999-999-999").await.is_empty());
        match engine.lookup_assessor("9999-999-999").await {
            AssessorOutcome::NotFound { links, .. } => {
                assert!(links.iter().any(|link| link.contains("9999999999")));
            }
            other => panic!("expected not found, got {other:?}"),
        }

        let report = engine.lookup_property("9999-999-999").await;
        assert!(report.parcel.is_none());
        assert!(report.jurisdiction.is_none());
        assert!(!report.notes.is_empty());
        assert_eq!(client.hits(BOUNDARIES), 0);
    }

    #[tokio::test]
    async fn identifier_spellings_share_one_cache_slot() {
        let (client, engine) = engine_with(&[(PARCELS, parcel_body())]);

        let first = engine.resolve_parcel("5843-004-015").await.expect("resolves");
        let second = engine.resolve_parcel("5843004015").await.expect("resolves");

        assert_eq!(first, second);
        assert_eq!(client.hits(PARCELS), 1);
    }

    #[tokio::test]
    async fn address_input_resolves_through_the_parcel_layer() {
        let (client, engine) = engine_with(&[(PARCELS, parcel_body())]);

        let parcel = engine
            .resolve_parcel("17523 Bramble Ct, Canyon Country")
            .await;

        assert_eq!(parcel.expect("resolves").ain, "5843004015");
        assert_eq!(client.hits(PARCELS), 1);
    }

    #[tokio::test]
    async fn query_failures_flatten_to_none() {
        let (client, engine) = engine_with(&[]);

        assert!(engine.resolve_parcel("5843004015").await.is_none());
        assert!(engine.resolve_parcel("5843004015").await.is_none());
        // Failures are not cached.
        assert_eq!(client.hits(PARCELS), 2);
    }

    #[tokio::test]
    async fn classification_is_cached_by_rounded_centroid() {
        let (client, engine) = engine_with(&[(BOUNDARIES, city_boundary("Santa Clarita"))]);
        let point = Point {
            x: -13_180_000.3,
            y: 4_058_000.7,
        };

        let first = engine.classify_jurisdiction(point).await;
        let second = engine.classify_jurisdiction(point).await;

        assert_eq!(first.kind, JurisdictionKind::City);
        assert_eq!(first.name, "Santa Clarita");
        assert_eq!(first, second);
        assert_eq!(client.hits(BOUNDARIES), 1);
    }

    #[tokio::test]
    async fn failed_classification_is_not_cached() {
        let (client, engine) = engine_with(&[]);
        let point = Point { x: 0.0, y: 0.0 };

        assert_eq!(
            engine.classify_jurisdiction(point).await.kind,
            JurisdictionKind::Error
        );
        assert_eq!(
            engine.classify_jurisdiction(point).await.kind,
            JurisdictionKind::Error
        );
        assert_eq!(client.hits(BOUNDARIES), 2);
    }

    #[tokio::test]
    async fn viewer_only_city_never_queries_a_zoning_layer() {
        let (client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (BOUNDARIES, city_boundary("Pasadena")),
        ]);

        match engine.lookup_zoning("5843004015").await {
            ZoningOutcome::ViewerOnly {
                jurisdiction,
                viewer,
                ..
            } => {
                assert_eq!(jurisdiction, "Pasadena");
                assert_eq!(viewer.as_deref(), Some("https://city.test/viewer"));
            }
            other => panic!("expected viewer-only, got {other:?}"),
        }
        assert_eq!(client.hits(ZONING), 0);
        assert_eq!(client.hits(CITY_ZONING), 0);
    }

    #[tokio::test]
    async fn city_with_query_provider_uses_its_own_service() {
        let (client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (BOUNDARIES, city_boundary("Santa Clarita")),
            (
                CITY_ZONING,
                one_feature(json!({ "ZONE": "CC", "ZONE_DESC": "Community Commercial" })),
            ),
        ]);

        match engine.lookup_zoning("5843004015").await {
            ZoningOutcome::Found { record } => {
                assert_eq!(record.zone, "CC");
                assert_eq!(record.zone_description, "Community Commercial");
                assert_eq!(record.jurisdiction, "Santa Clarita");
            }
            other => panic!("expected a record, got {other:?}"),
        }
        assert_eq!(client.hits(ZONING), 0);
        assert!(client.hits(CITY_ZONING) >= 1);
    }

    #[tokio::test]
    async fn zoning_outcomes_are_cached_per_parcel() {
        let (client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (BOUNDARIES, empty_features()),
            (
                ZONING,
                json!({ "features": [{ "attributes": { "ZONE": "A-1-1" } }] }),
            ),
        ]);

        let first = engine.lookup_zoning("5843004015").await;
        let second = engine.lookup_zoning("5843004015").await;

        assert_eq!(first, second);
        assert_eq!(client.hits(PARCELS), 1);
        assert_eq!(client.hits(BOUNDARIES), 1);
        assert_eq!(client.hits(ZONING), 1);
    }

    #[tokio::test]
    async fn overlay_hits_are_collected_across_layers() {
        let (_client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (
                FLOOD,
                json!({ "features": [{ "attributes": { "FLD_ZONE": "AE", "ZONE_SUBTY": "FLOODWAY" } }] }),
            ),
            (FIRE, empty_features()),
        ]);

        let hits = engine.lookup_overlays("5843004015").await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "Flood Zone");
        assert_eq!(hits[0].summary, "AE (FLOODWAY)");
    }

    #[tokio::test]
    async fn overlay_failures_do_not_poison_the_report() {
        // Flood and fire endpoints answer HTTP 503 every time.
        let (_client, engine) = engine_with(&[
            (PARCELS, parcel_body()),
            (BOUNDARIES, empty_features()),
            (
                ZONING,
                json!({ "features": [{ "attributes": { "ZONE": "A-1-1" } }] }),
            ),
            (ROLL, roll_body()),
        ]);

        let report = engine.lookup_property("5843004015").await;

        assert!(matches!(report.zoning, ZoningOutcome::Found { .. }));
        assert!(matches!(report.assessor, AssessorOutcome::Found { .. }));
        assert!(report.overlays.is_empty());
    }

    #[tokio::test]
    async fn footprint_without_geometry_skips_classification() {
        let (client, engine) = engine_with(&[
            (
                PARCELS,
                json!({ "features": [{ "attributes": { "AIN": "5843004015" }, "geometry": { "rings": [] } }] }),
            ),
            (ROLL, roll_body()),
        ]);

        let report = engine.lookup_property("5843004015").await;

        let jurisdiction = report.jurisdiction.expect("sentinel jurisdiction");
        assert_eq!(jurisdiction.kind, JurisdictionKind::Error);
        assert!(matches!(report.zoning, ZoningOutcome::NotFound { .. }));
        assert!(matches!(report.assessor, AssessorOutcome::Found { .. }));
        assert_eq!(client.hits(BOUNDARIES), 0);
    }

    #[tokio::test]
    async fn cache_stats_track_occupancy_and_clear() {
        let (_client, engine) = engine_with(&[(PARCELS, parcel_body())]);

        engine.resolve_parcel("5843004015").await;

        let stats = engine.cache_stats();
        assert_eq!(stats.len(), 5);
        let parcels = stats
            .iter()
            .find(|s| s.name == "parcels")
            .expect("parcels cache");
        assert_eq!(parcels.entries, 1);

        engine.clear_caches();
        assert!(engine.cache_stats().iter().all(|s| s.entries == 0));
    }

    #[test]
    fn parcel_keys_normalize_identifier_spellings() {
        assert_eq!(parcel_key("5843-004-015"), parcel_key("5843004015"));
        assert_eq!(
            parcel_key("17523 Bramble Ct, Canyon Country"),
            parcel_key("17523 BRAMBLE CT")
        );
        assert_ne!(parcel_key("5843004015"), parcel_key("5843004016"));
    }

    #[test]
    fn jurisdiction_keys_round_to_whole_meters() {
        let a = jurisdiction_key(Point { x: 100.2, y: 200.8 });
        let b = jurisdiction_key(Point { x: 100.4, y: 201.1 });

        assert_eq!(a, b);
        assert_ne!(a, jurisdiction_key(Point { x: 102.0, y: 201.0 }));
    }
}
