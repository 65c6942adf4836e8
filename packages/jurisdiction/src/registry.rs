//! City provider registry — which jurisdictions publish queryable zoning
//! services and which only offer a human viewer.
//!
//! The default registry is baked into the binary from
//! `providers/providers.json`. Operators can point `PARCEL_MAP_PROVIDERS`
//! at a replacement file; a missing or unparseable override is logged and
//! falls back, it never takes the process down.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Registry JSON embedded at compile time.
const BUILTIN_PROVIDERS_JSON: &str = include_str!("../providers/providers.json");

/// Environment variable naming a JSON file that replaces the builtin
/// registry wholesale.
pub const PROVIDERS_ENV_VAR: &str = "PARCEL_MAP_PROVIDERS";

/// Errors from loading a registry override file.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// How one city's zoning data can be reached, tagged by `method` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Provider {
    /// The city only publishes a human-facing viewer; no machine query is
    /// ever attempted.
    ViewerLink { viewer: String },
    /// The city exposes a feature-service endpoint we can query directly.
    #[serde(rename_all = "camelCase")]
    Query {
        endpoint: String,
        /// Attribute list to request, `*` when absent.
        #[serde(default)]
        out_fields: Option<Vec<String>>,
        /// City-specific zone-code fields, tried before the profile
        /// defaults.
        #[serde(default)]
        name_fields: Option<Vec<String>>,
        /// City-specific description fields, tried before the profile
        /// defaults.
        #[serde(default)]
        desc_fields: Option<Vec<String>>,
        /// City-specific category-style fields. What a category value
        /// means (code or description) is the jurisdiction profile's
        /// call, not the registry's.
        #[serde(default)]
        category_fields: Option<Vec<String>>,
    },
}

/// Lookup table from normalized city name to [`Provider`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    /// Parse a registry from JSON keyed by display city name.
    ///
    /// # Errors
    ///
    /// * Returns the underlying `serde_json` error when the document is not
    ///   a map of provider entries.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, Provider> = serde_json::from_str(json)?;
        let providers = raw
            .into_iter()
            .map(|(name, provider)| (normalize_name(&name), provider))
            .collect();
        Ok(Self { providers })
    }

    /// The compile-time registry. An unparseable builtin is a programming
    /// error caught by tests, but even then the result is an empty registry
    /// rather than a panic.
    #[must_use]
    pub fn builtin() -> Self {
        match Self::from_json_str(BUILTIN_PROVIDERS_JSON) {
            Ok(registry) => registry,
            Err(e) => {
                log::error!("builtin provider registry is unparseable: {e}");
                Self::default()
            }
        }
    }

    /// Load the registry, honoring the `PARCEL_MAP_PROVIDERS` override.
    ///
    /// Any failure to read or parse the override is logged and the builtin
    /// registry is used instead.
    #[must_use]
    pub fn load() -> Self {
        match std::env::var(PROVIDERS_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => match Self::load_file(&path) {
                Ok(registry) => {
                    log::info!(
                        "loaded {} provider(s) from {path} via {PROVIDERS_ENV_VAR}",
                        registry.len()
                    );
                    registry
                }
                Err(e) => {
                    log::error!("could not load providers from {path}: {e}; using builtin");
                    Self::builtin()
                }
            },
            _ => Self::builtin(),
        }
    }

    /// Load a registry from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::Io`] when the file cannot be read.
    /// * [`RegistryError::Json`] when it is not a valid registry document.
    pub fn load_file(path: &str) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }

    /// Look up the provider for a jurisdiction by display name. `None`
    /// means the city is unregistered and callers should fall back to
    /// viewer links only.
    #[must_use]
    pub fn resolve(&self, jurisdiction: &str) -> Option<&Provider> {
        self.providers.get(&normalize_name(jurisdiction))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Provider)> {
        self.providers
            .iter()
            .map(|(name, provider)| (name.as_str(), provider))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Canonical spelling for city names so registry keys and boundary-layer
/// labels agree: lowercase, whitespace collapsed, leading `"city of"` and
/// trailing `"city"` dropped.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let collapsed = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let stripped = collapsed.strip_prefix("city of ").unwrap_or(&collapsed);
    let stripped = stripped.strip_suffix(" city").unwrap_or(stripped);
    stripped.trim().to_string()
}
