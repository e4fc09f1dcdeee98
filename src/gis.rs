use std::{f64::consts::PI, fmt, str::FromStr, time::Duration};

use color_eyre::eyre::{self, eyre, Result};
use geo::{Centroid, HaversineDistance};
use geo_types::Point;
use geojson::{feature::Id, Feature, JsonObject};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::{
    clients::{get_gis_url, get_reqwest_client},
    types::{
        dto::{
            geom::NearbyQuery,
            gis::{GisEnvelope, NearbyResponse, RestaurantPage, SpatialSummary},
        },
        osm::{GeometryKind, OsmPoint, OsmTags},
    },
};

// sphere radius of EPSG:3857
const WEB_MERCATOR_RADIUS: f64 = 6378137.0;
pub const RESTAURANT_PAGE_SIZE: usize = 10;
// the GIS API rate limits hard
const PAGE_DELAY: Duration = Duration::from_millis(500);
pub const RESTAURANT_REFRESH: Duration = Duration::from_secs(60 * 60);

/// Map layers the browser can load, named as they appear in the url
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLayer {
    Restaurants,
    Roads,
    Pois,
}

impl MapLayer {
    /// Materialised view the GIS API searches for this layer
    pub fn table(self) -> &'static str {
        match self {
            MapLayer::Restaurants => "mv_restaurants",
            MapLayer::Roads => "mv_roads",
            MapLayer::Pois => "mv_pois",
        }
    }
}

impl FromStr for MapLayer {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restaurants" => Ok(MapLayer::Restaurants),
            "roads" => Ok(MapLayer::Roads),
            "pois" => Ok(MapLayer::Pois),
            other => Err(eyre!("Unknown map layer: {other}")),
        }
    }
}

impl fmt::Display for MapLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MapLayer::Restaurants => "restaurants",
            MapLayer::Roads => "roads",
            MapLayer::Pois => "pois",
        })
    }
}

/// Ask the GIS API for features of a layer near a point
pub async fn fetch_nearby(layer: MapLayer, query: &NearbyQuery) -> Result<Vec<OsmPoint>> {
    let points = fetch_nearby_in_table(layer.table(), query).await?;
    info!("{} {layer} features from GIS API", points.len());
    Ok(points)
}

/// Nearby search against any table the GIS API knows
#[instrument]
pub async fn fetch_nearby_in_table(table: &str, query: &NearbyQuery) -> Result<Vec<OsmPoint>> {
    let url = format!("{}/api/v1/spatial/optimized/nearby", get_gis_url()?);
    let response = get_reqwest_client()?
        .get(url)
        .query(&[
            ("lon", query.lon.to_string()),
            ("lat", query.lat.to_string()),
            ("distance", query.distance.to_string()),
            ("table", table.to_string()),
            ("limit", query.limit.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<NearbyResponse>()
        .await?;

    let center = query.center();
    Ok(response
        .data
        .features
        .iter()
        .map(|feature| feature_to_point(feature, center))
        .collect())
}

/// Nearby features, or the sample set when the GIS API can't be reached
pub async fn nearby_or_sample(layer: MapLayer, query: &NearbyQuery) -> Vec<OsmPoint> {
    match fetch_nearby(layer, query).await {
        Ok(points) => points,
        Err(err) => {
            warn!("Failed to fetch nearby {layer} from GIS API: {err}");
            sample_nearby_features(query.limit)
        }
    }
}

pub async fn nearby_in_table_or_sample(table: &str, query: &NearbyQuery) -> Vec<OsmPoint> {
    match fetch_nearby_in_table(table, query).await {
        Ok(points) => points,
        Err(err) => {
            warn!("Failed to fetch nearby features in {table} from GIS API: {err}");
            sample_nearby_features(query.limit)
        }
    }
}

/// GET a GIS API path and unwrap the `data` envelope
async fn fetch_data<T: DeserializeOwned>(path: &str) -> Result<T> {
    let url = format!("{}{path}", get_gis_url()?);
    let response = get_reqwest_client()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<GisEnvelope<T>>()
        .await?;
    Ok(response.data)
}

#[instrument]
pub async fn fetch_spatial_summary() -> Result<SpatialSummary> {
    fetch_data("/api/v1/spatial/summary").await
}

pub async fn spatial_summary_or_sample() -> SpatialSummary {
    fetch_spatial_summary().await.unwrap_or_else(|err| {
        warn!("Failed to fetch spatial summary from GIS API: {err}");
        SpatialSummary {
            restaurants: 710,
            roads: 54534,
            pois: 3629,
        }
    })
}

#[instrument]
pub async fn fetch_data_status() -> Result<Value> {
    fetch_data("/api/v1/data/status").await
}

/// Database health and record counts, passed through as the GIS API reports them
pub async fn data_status_or_sample() -> Value {
    fetch_data_status().await.unwrap_or_else(|err| {
        warn!("Failed to fetch data status from GIS API: {err}");
        json!({
            "database": { "status": "healthy", "database_size": "591 MB" },
            "record_counts": { "restaurants": 710, "roads": 54534, "pois": 3629 },
            "health": "healthy",
        })
    })
}

#[instrument]
pub async fn fetch_data_metadata() -> Result<Value> {
    fetch_data("/api/v1/data/metadata").await
}

/// Layer descriptions and coordinate systems, passed through as the GIS API reports them
pub async fn data_metadata_or_sample() -> Value {
    fetch_data_metadata().await.unwrap_or_else(|err| {
        warn!("Failed to fetch data metadata from GIS API: {err}");
        json!({
            "layers": [
                { "name": "restaurants", "description": "Restaurant locations", "geometry_type": "point" },
                { "name": "roads", "description": "Road network", "geometry_type": "linestring" },
                { "name": "pois", "description": "Points of Interest", "geometry_type": "point" },
            ],
            "coordinate_systems": ["EPSG:3857", "EPSG:4326"],
        })
    })
}

/// Spherical web mercator metres to (longitude, latitude) degrees
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / WEB_MERCATOR_RADIUS * 180.0 / PI;
    let lat = (y / WEB_MERCATOR_RADIUS).sinh().atan() * 180.0 / PI;
    (lon, lat)
}

/// One page of restaurants, converted to WGS84
#[instrument]
pub async fn fetch_restaurant_page(page: usize, limit: usize) -> Result<Vec<OsmPoint>> {
    let url = format!("{}/api/v1/restaurants", get_gis_url()?);
    let response = get_reqwest_client()?
        .get(url)
        .query(&[("page", page), ("limit", limit)])
        .send()
        .await?
        .error_for_status()?
        .json::<RestaurantPage>()
        .await?;
    Ok(response.data.features.iter().map(restaurant_from_feature).collect())
}

/// Walk the restaurant pages until an empty one. A failing page ends the walk
/// with whatever was collected so far.
pub async fn fetch_all_restaurants() -> Vec<OsmPoint> {
    let mut restaurants = Vec::new();
    for page in 1.. {
        match fetch_restaurant_page(page, RESTAURANT_PAGE_SIZE).await {
            Ok(batch) if batch.is_empty() => break,
            Ok(batch) => restaurants.extend(batch),
            Err(err) => {
                warn!("Error fetching restaurant page {page}: {err}");
                break;
            }
        }
        tokio::time::sleep(PAGE_DELAY).await;
    }
    restaurants
}

fn restaurant_from_feature(feature: &Feature) -> OsmPoint {
    let mut point = OsmPoint {
        osm_id: feature_osm_id(feature),
        geometry: Some(GeometryKind::Point),
        ..Default::default()
    };
    if let Some(properties) = &feature.properties {
        point.name = properties
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        point.tags.amenity = properties
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if let Some(geojson::Value::Point(pos)) = feature.geometry.as_ref().map(|geom| &geom.value) {
        if let Some([x, y]) = pair(pos) {
            let (lon, lat) = web_mercator_to_wgs84(x, y);
            point.longitude = Some(lon);
            point.latitude = Some(lat);
        }
    }
    point
}

/// Every restaurant the GIS API serves, reloaded in the background
#[derive(Default)]
pub struct RestaurantCache {
    restaurants: RwLock<Vec<OsmPoint>>,
}

impl RestaurantCache {
    /// Reload all pages. An empty result keeps what was cached before.
    pub async fn refresh(&self) {
        let restaurants = fetch_all_restaurants().await;
        if restaurants.is_empty() {
            warn!("No restaurants loaded, keeping previous cache");
            return;
        }
        info!("Loaded {} restaurants into cache", restaurants.len());
        *self.restaurants.write().await = restaurants;
    }

    pub async fn keep_fresh(&self) {
        let mut interval = tokio::time::interval(RESTAURANT_REFRESH);
        loop {
            interval.tick().await;
            self.refresh().await;
        }
    }

    async fn cached(&self, limit: Option<usize>) -> Option<Vec<OsmPoint>> {
        let restaurants = self.restaurants.read().await;
        if restaurants.is_empty() {
            return None;
        }
        let limit = limit.unwrap_or(restaurants.len());
        Some(restaurants.iter().take(limit).cloned().collect())
    }
}

/// Cached restaurants, else the first page straight from the GIS API, else samples
pub async fn restaurants_or_sample(cache: &RestaurantCache, limit: Option<usize>) -> Vec<OsmPoint> {
    if let Some(restaurants) = cache.cached(limit).await {
        return restaurants;
    }
    let page_size = limit.map_or(RESTAURANT_PAGE_SIZE, |limit| limit.min(RESTAURANT_PAGE_SIZE));
    match fetch_restaurant_page(1, page_size).await {
        Ok(restaurants) => restaurants,
        Err(err) => {
            warn!("Failed to fetch restaurants from GIS API: {err}");
            sample_restaurants(limit)
        }
    }
}

/// WGS84 points for an amenity. Only restaurants have a source, anything
/// else is an empty list.
pub async fn amenity_points_or_sample(
    cache: &RestaurantCache,
    amenity: &str,
    limit: Option<usize>,
) -> Vec<OsmPoint> {
    match amenity {
        "restaurant" => restaurants_or_sample(cache, limit).await,
        other => {
            info!("No WGS84 source for amenity {other}");
            Vec::new()
        }
    }
}

/// Flatten a GeoJSON feature into the record shape the browser expects.
/// Lines keep their path and use the first vertex as position. Polygons keep
/// their exterior ring in `coordinates`, any holes in `interior_rings`, and
/// use the area centroid.
pub fn feature_to_point(feature: &Feature, center: Point) -> OsmPoint {
    let mut point = OsmPoint {
        osm_id: feature_osm_id(feature),
        ..Default::default()
    };

    if let Some(properties) = &feature.properties {
        apply_properties(&mut point, properties);
    }

    let geometry = feature.geometry.as_ref().map(|geom| &geom.value);
    match geometry {
        Some(geojson::Value::LineString(line)) => {
            let coordinates: Vec<[f64; 2]> = line.iter().filter_map(|pos| pair(pos)).collect();
            if let Some([lon, lat]) = coordinates.first() {
                point.longitude = Some(*lon);
                point.latitude = Some(*lat);
            }
            point.coordinates = Some(coordinates);
            point.geometry = Some(GeometryKind::LineString);
        }
        Some(geojson::Value::Polygon(rings)) => {
            let mut rings = rings
                .iter()
                .map(|ring| ring.iter().filter_map(|pos| pair(pos)).collect::<Vec<_>>());
            point.coordinates = rings.next();
            let holes: Vec<_> = rings.collect();
            if !holes.is_empty() {
                point.interior_rings = Some(holes);
            }
            let centroid = geometry
                .and_then(|value| geo_types::Polygon::<f64>::try_from(value).ok())
                .and_then(|polygon| polygon.centroid());
            if let Some(centroid) = centroid {
                point.longitude = Some(centroid.x());
                point.latitude = Some(centroid.y());
            }
            point.geometry = Some(GeometryKind::Polygon);
        }
        Some(geojson::Value::Point(pos)) => {
            if let Some([lon, lat]) = pair(pos) {
                point.longitude = Some(lon);
                point.latitude = Some(lat);
            }
            point.geometry = Some(GeometryKind::Point);
        }
        _ => point.geometry = Some(GeometryKind::Point),
    }

    if point.distance.is_none() {
        if let Some((lat, lon)) = point.position() {
            point.distance = Some(center.haversine_distance(&Point::new(lon, lat)));
        }
    }

    point
}

fn feature_osm_id(feature: &Feature) -> i64 {
    match &feature.id {
        Some(Id::String(id)) => id.parse().unwrap_or(0),
        Some(Id::Number(id)) => id.as_i64().unwrap_or(0),
        None => 0,
    }
}

fn apply_properties(point: &mut OsmPoint, properties: &JsonObject) {
    for (key, value) in properties {
        match (key.as_str(), value) {
            (_, serde_json::Value::Null) => {}
            ("name", serde_json::Value::String(name)) => point.name = Some(name.clone()),
            ("type", serde_json::Value::String(kind)) => point.point_type = Some(kind.clone()),
            ("distance", value) => point.distance = value.as_f64(),
            (key, serde_json::Value::String(tag)) => {
                if !point.tags.set(key, tag.clone()) {
                    point.extra.insert(key.to_string(), value.clone());
                }
            }
            (key, value) => {
                point.extra.insert(key.to_string(), value.clone());
            }
        }
    }
}

fn pair(position: &[f64]) -> Option<[f64; 2]> {
    match position {
        [lon, lat, ..] => Some([*lon, *lat]),
        _ => None,
    }
}

/// Stand-in data for when the GIS API is down
pub fn sample_nearby_features(limit: usize) -> Vec<OsmPoint> {
    let sample = |osm_id, name: &str, kind: &str, latitude, longitude, distance| OsmPoint {
        osm_id,
        name: Some(name.to_string()),
        latitude: Some(latitude),
        longitude: Some(longitude),
        geometry: Some(GeometryKind::Point),
        point_type: Some(kind.to_string()),
        distance: Some(distance),
        ..Default::default()
    };
    vec![
        sample(1, "Sample Restaurant", "restaurant", 35.2828, -120.6596, 0.0),
        sample(2, "Sample POI", "atm", 35.2830, -120.6598, 25.5),
    ]
    .into_iter()
    .take(limit)
    .collect()
}

pub fn sample_restaurants(limit: Option<usize>) -> Vec<OsmPoint> {
    let sample = |osm_id, amenity: &str, latitude, longitude| OsmPoint {
        osm_id,
        name: Some(format!("Sample Restaurant {osm_id}")),
        latitude: Some(latitude),
        longitude: Some(longitude),
        tags: OsmTags {
            amenity: Some(amenity.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let samples = [
        sample(1, "restaurant", 35.2828, -120.6596),
        sample(2, "fast_food", 35.2900, -120.6500),
        sample(3, "bar", 35.2700, -120.6700),
        sample(4, "restaurant", 35.3000, -120.6400),
        sample(5, "fast_food", 35.2600, -120.6800),
    ];
    samples.into_iter().take(limit.unwrap_or(usize::MAX)).collect()
}
