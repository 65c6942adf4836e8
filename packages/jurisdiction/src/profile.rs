//! Handling profiles for attribute normalization.
//!
//! A profile says how a jurisdiction's zoning schema should be read. Only
//! jurisdictions with known schema quirks get their own profile; everything
//! else shares the generic city handling.

use strum_macros::{AsRefStr, Display};

use crate::registry::normalize_name;

/// Schema-handling profile for a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Profile {
    /// City of Los Angeles: `CATEGORY` carries the zone description.
    LosAngeles,
    /// Santa Clarita: descriptions live in a dedicated `ZONE_DESC` field.
    SantaClarita,
    /// Unincorporated county land: category-style fields repeat the zone
    /// code and must never be read as descriptions.
    Unincorporated,
    /// Any other incorporated city.
    OtherCity,
}

impl Profile {
    /// Classify a jurisdiction display name into its handling profile.
    #[must_use]
    pub fn for_jurisdiction(name: &str) -> Self {
        match normalize_name(name).as_str() {
            "los angeles" => Self::LosAngeles,
            "santa clarita" => Self::SantaClarita,
            "unincorporated"
            | "los angeles county"
            | "county of los angeles"
            | "unincorporated los angeles county" => Self::Unincorporated,
            _ => Self::OtherCity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_jurisdictions_get_their_own_profile() {
        assert_eq!(
            Profile::for_jurisdiction("Los Angeles"),
            Profile::LosAngeles
        );
        assert_eq!(
            Profile::for_jurisdiction("City of Los Angeles"),
            Profile::LosAngeles
        );
        assert_eq!(
            Profile::for_jurisdiction("Santa Clarita"),
            Profile::SantaClarita
        );
    }

    #[test]
    fn county_spellings_map_to_unincorporated() {
        assert_eq!(
            Profile::for_jurisdiction("Unincorporated"),
            Profile::Unincorporated
        );
        assert_eq!(
            Profile::for_jurisdiction("County of Los Angeles"),
            Profile::Unincorporated
        );
        assert_eq!(
            Profile::for_jurisdiction("LOS ANGELES COUNTY"),
            Profile::Unincorporated
        );
    }

    #[test]
    fn everything_else_is_a_generic_city() {
        assert_eq!(Profile::for_jurisdiction("Pasadena"), Profile::OtherCity);
        assert_eq!(Profile::for_jurisdiction("Vernon"), Profile::OtherCity);
        assert_eq!(Profile::for_jurisdiction("Unknown"), Profile::OtherCity);
    }
}
