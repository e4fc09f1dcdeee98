use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Map data category the browser can switch between
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Layer {
    None,
    Restaurants,
    Streets,
    Pois,
    /// Anything the browser sends that we don't recognise
    Unknown(String),
}

impl Layer {
    pub fn as_str(&self) -> &str {
        match self {
            Layer::None => "none",
            Layer::Restaurants => "restaurants",
            Layer::Streets => "streets",
            Layer::Pois => "pois",
            Layer::Unknown(name) => name,
        }
    }
}

impl From<String> for Layer {
    fn from(value: String) -> Self {
        match value.as_str() {
            "none" => Layer::None,
            "restaurants" => Layer::Restaurants,
            "streets" => Layer::Streets,
            "pois" => Layer::Pois,
            _ => Layer::Unknown(value),
        }
    }
}

impl From<&str> for Layer {
    fn from(value: &str) -> Self {
        Layer::from(value.to_string())
    }
}

impl From<Layer> for String {
    fn from(value: Layer) -> Self {
        match value {
            Layer::Unknown(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

/// One OpenStreetMap entity as the browser sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsmPoint {
    pub osm_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub geometry: Option<GeometryKind>,
    // [lon, lat] pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<[f64; 2]>>,
    // polygon holes, same pair layout as the exterior ring in `coordinates`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior_rings: Option<Vec<Vec<[f64; 2]>>>,
    #[serde(default, rename = "type")]
    pub point_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(flatten)]
    pub tags: OsmTags,
    /// Attributes outside the known tag vocabulary
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OsmPoint {
    /// Latitude/longitude of the entity, falling back to the first vertex of its path
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self
                .coordinates
                .as_ref()
                .and_then(|coords| coords.first())
                .map(|[lon, lat]| (*lat, *lon)),
        }
    }

    /// Name with surrounding whitespace ignored, None when blank
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmTags {
    #[serde(default)]
    pub amenity: Option<String>,
    #[serde(default)]
    pub tourism: Option<String>,
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub highway: Option<String>,
    #[serde(default)]
    pub natural: Option<String>,
    #[serde(default)]
    pub leisure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, rename = "addr:housenumber", skip_serializing_if = "Option::is_none")]
    pub addr_housenumber: Option<String>,
    #[serde(default, rename = "addr:street", skip_serializing_if = "Option::is_none")]
    pub addr_street: Option<String>,
    #[serde(default, rename = "addr:city", skip_serializing_if = "Option::is_none")]
    pub addr_city: Option<String>,
    #[serde(default, rename = "addr:postcode", skip_serializing_if = "Option::is_none")]
    pub addr_postcode: Option<String>,
    #[serde(default, rename = "addr:country", skip_serializing_if = "Option::is_none")]
    pub addr_country: Option<String>,
    #[serde(default, rename = "addr:state", skip_serializing_if = "Option::is_none")]
    pub addr_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdoor_seating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking: Option<String>,
}

impl OsmTags {
    /// Set a tag by its OSM key. Returns false if the key isn't one we model.
    pub fn set(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "amenity" => &mut self.amenity,
            "tourism" => &mut self.tourism,
            "shop" => &mut self.shop,
            "highway" => &mut self.highway,
            "natural" => &mut self.natural,
            "leisure" => &mut self.leisure,
            "cuisine" => &mut self.cuisine,
            "brand" => &mut self.brand,
            "phone" => &mut self.phone,
            "website" => &mut self.website,
            "opening_hours" => &mut self.opening_hours,
            "addr:housenumber" => &mut self.addr_housenumber,
            "addr:street" => &mut self.addr_street,
            "addr:city" => &mut self.addr_city,
            "addr:postcode" => &mut self.addr_postcode,
            "addr:country" => &mut self.addr_country,
            "addr:state" => &mut self.addr_state,
            "wheelchair" => &mut self.wheelchair,
            "outdoor_seating" => &mut self.outdoor_seating,
            "smoking" => &mut self.smoking,
            "wifi" => &mut self.wifi,
            "parking" => &mut self.parking,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}
