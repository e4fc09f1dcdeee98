use std::str::FromStr;

use color_eyre::eyre::{self, eyre};
use serde::{Deserialize, Serialize};

use crate::clients::ACTIVE_CONTEXT_CONFIG;

/// Which fields of a category may reach the AI prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFieldConfig {
    pub include_coordinates: bool,
    pub include_osm_id: bool,
    pub include_geometry: bool,
    pub include_type_details: bool,
    pub include_name: bool,
    pub include_amenity: bool,
    pub include_cuisine: bool,
    pub include_brand: bool,
    pub include_contact: bool,
    pub include_address: bool,
    pub include_hours: bool,
    pub include_accessibility: bool,
    pub max_items: usize,
}

impl ContextFieldConfig {
    /// Everything off, only the name shown
    pub const fn names_only(max_items: usize) -> Self {
        Self {
            include_coordinates: false,
            include_osm_id: false,
            include_geometry: false,
            include_type_details: false,
            include_name: true,
            include_amenity: false,
            include_cuisine: false,
            include_brand: false,
            include_contact: false,
            include_address: false,
            include_hours: false,
            include_accessibility: false,
            max_items,
        }
    }

    pub const fn with_coordinates(self) -> Self {
        Self {
            include_coordinates: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    pub include_location: bool,
    pub include_search_radius: bool,
    pub include_layer_info: bool,
    pub restaurant_fields: ContextFieldConfig,
    pub street_fields: ContextFieldConfig,
    pub poi_fields: ContextFieldConfig,
    pub use_structured_format: bool,
    pub include_data_count: bool,
}

impl ContextConfig {
    /// Names, categories and counts. Coordinates and ids stay out, models don't use them well.
    pub const DEFAULT: ContextConfig = ContextConfig {
        include_location: true,
        include_search_radius: true,
        include_layer_info: true,
        restaurant_fields: ContextFieldConfig {
            include_type_details: true,
            include_amenity: true,
            include_cuisine: true,
            include_brand: true,
            ..ContextFieldConfig::names_only(15)
        },
        street_fields: ContextFieldConfig {
            include_type_details: true,
            ..ContextFieldConfig::names_only(20)
        },
        poi_fields: ContextFieldConfig {
            include_type_details: true,
            include_amenity: true,
            include_brand: true,
            ..ContextFieldConfig::names_only(15)
        },
        use_structured_format: true,
        include_data_count: true,
    };

    pub const COORDINATES: ContextConfig = ContextConfig {
        restaurant_fields: Self::DEFAULT.restaurant_fields.with_coordinates(),
        street_fields: Self::DEFAULT.street_fields.with_coordinates(),
        poi_fields: Self::DEFAULT.poi_fields.with_coordinates(),
        ..Self::DEFAULT
    };

    pub const MINIMAL: ContextConfig = ContextConfig {
        include_location: false,
        include_search_radius: false,
        restaurant_fields: ContextFieldConfig::names_only(10),
        street_fields: ContextFieldConfig::names_only(10),
        poi_fields: ContextFieldConfig::names_only(10),
        ..Self::DEFAULT
    };

    pub const DETAILED: ContextConfig = ContextConfig {
        restaurant_fields: DETAILED_PLACE_FIELDS,
        street_fields: ContextFieldConfig {
            include_osm_id: true,
            include_type_details: true,
            ..ContextFieldConfig::names_only(30)
        },
        poi_fields: ContextFieldConfig {
            include_cuisine: false,
            ..DETAILED_PLACE_FIELDS
        },
        ..Self::DEFAULT
    };
}

const DETAILED_PLACE_FIELDS: ContextFieldConfig = ContextFieldConfig {
    include_coordinates: false,
    include_osm_id: true,
    include_geometry: false,
    include_type_details: true,
    include_name: true,
    include_amenity: true,
    include_cuisine: true,
    include_brand: true,
    include_contact: true,
    include_address: true,
    include_hours: true,
    include_accessibility: true,
    max_items: 25,
};

impl Default for ContextConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Named configuration, selected through SLO_VIEW_CONTEXT_PRESET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPreset {
    #[default]
    Default,
    Coordinates,
    Minimal,
    Detailed,
}

impl ContextPreset {
    pub fn config(self) -> ContextConfig {
        match self {
            ContextPreset::Default => ContextConfig::DEFAULT,
            ContextPreset::Coordinates => ContextConfig::COORDINATES,
            ContextPreset::Minimal => ContextConfig::MINIMAL,
            ContextPreset::Detailed => ContextConfig::DETAILED,
        }
    }
}

impl FromStr for ContextPreset {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(ContextPreset::Default),
            "coordinates" => Ok(ContextPreset::Coordinates),
            "minimal" => Ok(ContextPreset::Minimal),
            "detailed" => Ok(ContextPreset::Detailed),
            other => Err(eyre!("Unknown context preset: {other}")),
        }
    }
}

/// The configuration chosen at startup, or the default when none was chosen
pub fn get_active_config() -> ContextConfig {
    ACTIVE_CONTEXT_CONFIG
        .get()
        .copied()
        .unwrap_or(ContextConfig::DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_matches_documented_policy() {
        let config = ContextConfig::default();
        assert!(config.include_location && config.include_search_radius);
        assert!(config.include_layer_info && config.include_data_count);

        let restaurants = config.restaurant_fields;
        assert!(!restaurants.include_coordinates && !restaurants.include_osm_id);
        assert!(restaurants.include_amenity && restaurants.include_cuisine);
        assert!(!restaurants.include_contact && !restaurants.include_hours);
        assert_eq!(restaurants.max_items, 15);

        assert_eq!(config.street_fields.max_items, 20);
        assert!(!config.street_fields.include_amenity);
        assert!(config.poi_fields.include_brand && !config.poi_fields.include_cuisine);
        assert_eq!(config.poi_fields.max_items, 15);
    }

    #[test]
    fn coordinates_preset_only_adds_coordinates() {
        let coords = ContextConfig::COORDINATES;
        let default = ContextConfig::DEFAULT;
        assert!(coords.restaurant_fields.include_coordinates);
        assert!(coords.street_fields.include_coordinates);
        assert!(coords.poi_fields.include_coordinates);
        assert_eq!(
            ContextFieldConfig {
                include_coordinates: false,
                ..coords.poi_fields
            },
            default.poi_fields
        );
    }

    #[test]
    fn detailed_preset_limits() {
        let detailed = ContextConfig::DETAILED;
        assert_eq!(detailed.restaurant_fields.max_items, 25);
        assert_eq!(detailed.street_fields.max_items, 30);
        assert!(detailed.poi_fields.include_osm_id);
        assert!(!detailed.poi_fields.include_cuisine);
        assert!(detailed.restaurant_fields.include_accessibility);
    }

    #[rstest]
    #[case("default", ContextPreset::Default)]
    #[case("", ContextPreset::Default)]
    #[case("Coordinates", ContextPreset::Coordinates)]
    #[case(" minimal ", ContextPreset::Minimal)]
    #[case("detailed", ContextPreset::Detailed)]
    fn parses_preset_names(#[case] input: &str, #[case] expected: ContextPreset) {
        assert_eq!(input.parse::<ContextPreset>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_preset() {
        assert!("verbose".parse::<ContextPreset>().is_err());
    }

    #[test]
    fn minimal_drops_location_and_radius() {
        let minimal = ContextPreset::Minimal.config();
        assert!(!minimal.include_location && !minimal.include_search_radius);
        assert!(minimal.include_layer_info);
        assert_eq!(minimal.street_fields, ContextFieldConfig::names_only(10));
    }

    #[test]
    fn active_config_defaults_without_selection() {
        assert_eq!(get_active_config(), ContextConfig::DEFAULT);
    }
}
