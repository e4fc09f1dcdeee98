use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Every GIS API response wraps its payload in `data`
#[derive(Deserialize, Debug)]
pub struct GisEnvelope<T> {
    pub data: T,
}

pub type NearbyResponse = GisEnvelope<FeatureCollection>;

/// One page of `/api/v1/restaurants`, points in EPSG:3857
pub type RestaurantPage = GisEnvelope<FeatureCollection>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpatialSummary {
    pub restaurants: u64,
    pub roads: u64,
    pub pois: u64,
}
