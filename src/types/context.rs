use serde::{Deserialize, Serialize};

use super::osm::{Layer, OsmPoint};

/// Point-in-time view of what the map is showing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapContext {
    pub selected_layer: Layer,
    // [lat, lon]
    pub center_position: [f64; 2],
    // metres
    pub search_radius: f64,
    #[serde(default)]
    pub data: Option<LayerData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<Vec<OsmPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streets: Option<Vec<OsmPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pois: Option<Vec<OsmPoint>>,
}

impl LayerData {
    /// The fetched array for a layer, if that layer has one
    pub fn for_layer(&self, layer: &Layer) -> Option<&[OsmPoint]> {
        match layer {
            Layer::Restaurants => self.restaurants.as_deref(),
            Layer::Streets => self.streets.as_deref(),
            Layer::Pois => self.pois.as_deref(),
            Layer::None | Layer::Unknown(_) => None,
        }
    }
}

impl MapContext {
    pub fn latitude(&self) -> f64 {
        self.center_position[0]
    }

    pub fn longitude(&self) -> f64 {
        self.center_position[1]
    }

    pub fn radius_km(&self) -> f64 {
        self.search_radius / 1000.0
    }

    /// Points for the active layer only; other layers may be stale
    pub fn active_points(&self) -> Option<&[OsmPoint]> {
        self.data
            .as_ref()
            .and_then(|data| data.for_layer(&self.selected_layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_the_active_layer_is_visible() {
        let context: MapContext = serde_json::from_value(json!({
            "selectedLayer": "streets",
            "centerPosition": [35.2828, -120.6596],
            "searchRadius": 500,
            "data": {
                "restaurants": [{ "osmId": 1, "name": "Stale" }],
                "streets": []
            }
        }))
        .unwrap();

        assert_eq!(context.active_points().map(<[OsmPoint]>::len), Some(0));
        assert_eq!(context.radius_km(), 0.5);
    }

    #[test]
    fn missing_data_container_is_allowed() {
        let context: MapContext = serde_json::from_value(json!({
            "selectedLayer": "pois",
            "centerPosition": [35.3, -120.7],
            "searchRadius": 1000
        }))
        .unwrap();
        assert!(context.data.is_none());
        assert!(context.active_points().is_none());
    }
}
