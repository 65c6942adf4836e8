#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query client for `ArcGIS` REST feature services.
//!
//! Every upstream the pipeline talks to (county parcel layer, city zoning
//! layers, overlay layers, assessor roll) speaks the same REST dialect, so
//! one client covers them all: [`params::QueryParams`] builds the request,
//! [`client::ArcgisClient`] sends it with bounded retry, and the
//! [`FeatureQuery`] trait is the seam tests mock the network through.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod client;
pub mod params;

pub use client::ArcgisClient;
pub use params::{QueryParams, Transport, WEB_MERCATOR_WKID};

/// Errors from the query layer.
///
/// This is the only layer of the pipeline that raises: everything above it
/// absorbs failures into degraded results.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No endpoint is configured for the requested layer. Raised before any
    /// network traffic, so callers can tell configuration gaps apart from
    /// transient exhaustion.
    #[error("no query endpoint configured")]
    MissingEndpoint,
    /// Transport-level failure (connect, timeout, body read).
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status.
    #[error("HTTP {status}")]
    Status { status: reqwest::StatusCode },
    /// The service returned HTTP 200 with an embedded `error` object, the
    /// way `ArcGIS` servers report bad queries.
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },
    /// The response body was not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Every attempt failed. Carries the final attempt's error text.
    #[error("query against {endpoint} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        endpoint: String,
        last_error: String,
    },
}

/// Transport seam for feature-service queries.
///
/// Production code uses [`ArcgisClient`]; tests substitute scripted
/// implementations so pipeline behavior can be exercised without a network.
#[async_trait]
pub trait FeatureQuery: Send + Sync {
    /// Execute one logical query against `endpoint`, retrying transient
    /// failures internally.
    ///
    /// # Errors
    ///
    /// * [`QueryError::MissingEndpoint`] when `endpoint` is blank.
    /// * [`QueryError::RetriesExhausted`] when every attempt failed.
    async fn query(&self, endpoint: &str, params: QueryParams) -> Result<Value, QueryError>;
}
