use serde::Deserialize;

pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_DISTANCE: f64 = 1000.0;
// map viewer start center, downtown San Luis Obispo
pub const DEFAULT_LAT: f64 = 35.2828;
pub const DEFAULT_LON: f64 = -120.6596;

/// Query string of the nearby-feature endpoints
#[derive(Deserialize, Clone, Debug)]
pub struct NearbyQuery {
    #[serde(default = "default_lon")]
    pub lon: f64,
    #[serde(default = "default_lat")]
    pub lat: f64,
    // metres
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Nearby search against a named GIS table. Kept flat rather than flattening
/// [`NearbyQuery`], since urlencoded numbers don't survive `#[serde(flatten)]`.
#[derive(Deserialize, Clone, Debug)]
pub struct TableNearbyQuery {
    #[serde(default = "default_lon")]
    pub lon: f64,
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub table: String,
}

#[derive(Deserialize, Clone, Copy, Debug, Default)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

fn default_lon() -> f64 {
    DEFAULT_LON
}

fn default_lat() -> f64 {
    DEFAULT_LAT
}

fn default_distance() -> f64 {
    DEFAULT_DISTANCE
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl NearbyQuery {
    pub fn center(&self) -> geo_types::Point {
        geo_types::Point::new(self.lon, self.lat)
    }
}

impl TableNearbyQuery {
    pub fn nearby(&self) -> NearbyQuery {
        NearbyQuery {
            lon: self.lon,
            lat: self.lat,
            distance: self.distance,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_default_to_start_center() {
        let query: NearbyQuery = serde_json::from_str(r#"{ "limit": 10 }"#).unwrap();
        assert_eq!((query.lon, query.lat), (DEFAULT_LON, DEFAULT_LAT));
        assert_eq!(query.distance, DEFAULT_DISTANCE);
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn table_query_keeps_search_parameters() {
        let query: TableNearbyQuery =
            serde_json::from_str(r#"{ "lon": -120.7, "lat": 35.3, "table": "mv_pois" }"#).unwrap();
        assert_eq!(query.table, "mv_pois");
        let nearby = query.nearby();
        assert_eq!((nearby.lon, nearby.lat), (-120.7, 35.3));
        assert_eq!(nearby.limit, DEFAULT_LIMIT);
    }
}
