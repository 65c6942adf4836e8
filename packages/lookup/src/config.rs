//! County layer catalog.
//!
//! One TOML document, embedded at compile time, describes every
//! county-wide layer the engine queries: the parcel fabric, the city
//! boundary layer, the county zoning layer, the assessor roll, and the
//! overlay districts. City-specific zoning services are deliberately not
//! here; those live in the provider registry.

use parcel_map_assessor::AssessorLayer;
use parcel_map_jurisdiction::BoundaryLayer;
use parcel_map_resolver::ParcelLayer;
use parcel_map_zoning::{OverlayLayer, ZoningLayer};
use serde::Deserialize;

const LA_COUNTY_TOML: &str = include_str!("../county/la_county.toml");

/// The complete layer catalog for one county.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountyConfig {
    pub parcel_layer: ParcelLayer,
    pub boundary_layer: BoundaryLayer,
    pub zoning_layer: ZoningLayer,
    pub assessor_layer: AssessorLayer,
    /// Overlay district layers, each scanned independently per parcel.
    #[serde(default, rename = "overlay")]
    pub overlays: Vec<OverlayLayer>,
}

impl CountyConfig {
    /// Parses a catalog from a TOML document.
    ///
    /// # Errors
    ///
    /// * If the document is not valid TOML or is missing a required
    ///   layer section.
    pub fn from_toml_str(document: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(document)
    }

    /// The embedded Los Angeles County catalog.
    ///
    /// # Panics
    ///
    /// * If the embedded document is malformed. The catalog is baked in
    ///   at compile time and covered by tests, so a released build cannot
    ///   hit this.
    #[must_use]
    pub fn la_county() -> Self {
        Self::from_toml_str(LA_COUNTY_TOML)
            .unwrap_or_else(|e| panic!("embedded county catalog is malformed: {e}"))
    }
}
