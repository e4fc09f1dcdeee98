mod clients;
mod context_config;
mod context_formatter;
mod gemini;
mod gis;
mod net;
mod types;

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use clients::{get_gis_url, ACTIVE_CONTEXT_CONFIG, GIS_URL, REQWEST};
use color_eyre::eyre::eyre;
use context_config::{get_active_config, ContextConfig, ContextPreset};
use context_formatter::{format_for_prompt, summarize};
use gemini::{GeminiService, GeminiSettings};
use gis::{MapLayer, RestaurantCache};
use net::response::{ResponseError, Result};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, instrument, warn};
use types::{
    context::MapContext,
    dto::{
        chat::{ChatRequest, ChatResponse, ContextPreview},
        geom::{LimitQuery, NearbyQuery, TableNearbyQuery},
        gis::SpatialSummary,
    },
    osm::OsmPoint,
};

const DEFAULT_PORT: u16 = 8080;

pub struct AppState {
    pub gemini: GeminiService,
    pub context_config: ContextConfig,
    pub restaurants: RestaurantCache,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // initialize tracing
    tracing_subscriber::fmt::init();

    init_reqwest_client()?;
    init_gis_url()?;
    init_context_config()?;

    let state = Arc::new(AppState {
        gemini: GeminiService::new(GeminiSettings::from_env()),
        context_config: get_active_config(),
        restaurants: RestaurantCache::default(),
    });

    if get_gis_url().is_ok() {
        let refresher = state.clone();
        tokio::spawn(async move { refresher.restaurants.keep_fresh().await });
    }

    let port = match std::env::var("SLO_VIEW_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Running on port {port}");

    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/map/spatial/summary", get(map_summary))
        .route("/api/map/spatial/nearby", get(nearby_in_table))
        .route("/api/map/data/status", get(data_status))
        .route("/api/map/data/metadata", get(data_metadata))
        .route(
            "/api/map/points/amenity/:amenity/wgs84",
            get(amenity_points_wgs84),
        )
        .route("/api/map/:layer", get(nearby_features))
        .route("/api/chat", post(chat))
        .route("/api/context", post(preview_context))
        .route("/api/context/config", get(active_context_config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn init_reqwest_client() -> color_eyre::Result<()> {
    REQWEST
        .set(reqwest::Client::new())
        .map_err(|_| eyre!("reqwest client already initialised"))
}

fn init_gis_url() -> color_eyre::Result<()> {
    match std::env::var("SLO_VIEW_GIS_URL") {
        Ok(url) => {
            info!("Using GIS API at {url}");
            GIS_URL
                .set(url.trim_end_matches('/').to_string())
                .map_err(|_| eyre!("GIS url already initialised"))
        }
        Err(_) => {
            warn!("SLO_VIEW_GIS_URL not set, map layers will serve sample data");
            Ok(())
        }
    }
}

fn init_context_config() -> color_eyre::Result<()> {
    let preset: ContextPreset = std::env::var("SLO_VIEW_CONTEXT_PRESET")
        .unwrap_or_default()
        .parse()?;
    info!("Using {preset:?} context preset");
    ACTIVE_CONTEXT_CONFIG
        .set(preset.config())
        .map_err(|_| eyre!("context config already initialised"))
}

async fn health() -> Json<Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis())
        .unwrap_or_default();
    Json(json!({
        "status": "UP",
        "service": "slo-view-backend",
        "timestamp": timestamp.to_string(),
    }))
}

#[instrument]
async fn nearby_features(
    Path(layer): Path<String>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<OsmPoint>>> {
    let layer: MapLayer = layer
        .parse()
        .map_err(|_| ResponseError::not_found(format!("No map layer named {layer}")))?;
    Ok(Json(gis::nearby_or_sample(layer, &query).await))
}

#[instrument]
async fn nearby_in_table(Query(query): Query<TableNearbyQuery>) -> Json<Vec<OsmPoint>> {
    Json(gis::nearby_in_table_or_sample(&query.table, &query.nearby()).await)
}

async fn map_summary() -> Json<SpatialSummary> {
    Json(gis::spatial_summary_or_sample().await)
}

async fn data_status() -> Json<Value> {
    Json(gis::data_status_or_sample().await)
}

async fn data_metadata() -> Json<Value> {
    Json(gis::data_metadata_or_sample().await)
}

#[instrument(skip(state))]
async fn amenity_points_wgs84(
    State(state): State<Arc<AppState>>,
    Path(amenity): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<OsmPoint>> {
    Json(gis::amenity_points_or_sample(&state.restaurants, &amenity, query.limit).await)
}

#[instrument(skip_all)]
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        Err(ResponseError::bad_request("message must not be empty"))?;
    }
    let map_context = request.map_context.as_ref();
    let reply = state
        .gemini
        .send_message(&request.message, map_context, &state.context_config)
        .await;
    let summary = map_context.map_or_else(
        || "No map layer selected".to_string(),
        |context| summarize(context, &state.context_config),
    );
    Ok(Json(ChatResponse { reply, summary }))
}

async fn preview_context(
    State(state): State<Arc<AppState>>,
    Json(context): Json<MapContext>,
) -> Json<ContextPreview> {
    Json(ContextPreview {
        prompt_context: format_for_prompt(&context, &state.context_config),
        summary: summarize(&context, &state.context_config),
    })
}

async fn active_context_config(State(state): State<Arc<AppState>>) -> Json<ContextConfig> {
    Json(state.context_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn test_app(config: ContextConfig) -> Router {
        app(Arc::new(AppState {
            gemini: GeminiService::new(GeminiSettings {
                api_key: None,
                model: gemini::DEFAULT_MODEL.to_string(),
                base_url: "http://localhost:0".to_string(),
            }),
            context_config: config,
            restaurants: RestaurantCache::default(),
        }))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_up() {
        let (status, body) = send(test_app(ContextConfig::DEFAULT), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
        assert_eq!(body["service"], "slo-view-backend");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn map_layers_fall_back_to_samples() {
        let (status, body) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/restaurants?lon=-120.6596&lat=35.2828&distance=500&limit=1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["osmId"], 1);
        assert_eq!(body[0]["geometry"], "Point");
    }

    #[tokio::test]
    async fn unknown_map_layer_is_not_found() {
        let (status, _) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/streets?lon=-120.6596&lat=35.2828"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn map_layers_default_to_start_center() {
        let (status, body) = send(test_app(ContextConfig::DEFAULT), get_request("/api/map/roads?limit=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));

        let (status, body) = send(test_app(ContextConfig::DEFAULT), get_request("/api/map/pois")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_array());
    }

    #[tokio::test]
    async fn map_summary_falls_back_to_samples() {
        let (status, body) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/spatial/summary"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "restaurants": 710, "roads": 54534, "pois": 3629 }));
    }

    #[tokio::test]
    async fn table_search_falls_back_to_samples() {
        let (status, body) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/spatial/nearby?lon=-120.6596&lat=35.2828&distance=1000&table=mv_restaurants&limit=1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["name"], "Sample Restaurant");
        assert_eq!(body[0]["type"], "restaurant");
        assert_eq!(body[0]["distance"], 0.0);
    }

    #[tokio::test]
    async fn table_search_needs_a_table() {
        let (status, _) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/spatial/nearby?lon=-120.6596&lat=35.2828"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn data_status_and_metadata_fall_back_to_samples() {
        let (status, body) = send(test_app(ContextConfig::DEFAULT), get_request("/api/map/data/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["health"], "healthy");
        assert_eq!(body["database"]["status"], "healthy");
        assert_eq!(body["record_counts"]["restaurants"], 710);

        let (status, body) = send(test_app(ContextConfig::DEFAULT), get_request("/api/map/data/metadata")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["layers"][0]["name"], "restaurants");
        assert_eq!(body["coordinate_systems"][0], "EPSG:3857");
    }

    #[tokio::test]
    async fn restaurant_points_in_wgs84() {
        let (status, body) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/points/amenity/restaurant/wgs84?limit=2"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[0]["osmId"], 1);
        assert_eq!(body[0]["name"], "Sample Restaurant 1");
        assert_eq!(body[0]["amenity"], "restaurant");
        assert_eq!(body[0]["latitude"], 35.2828);
        assert_eq!(body[0]["longitude"], -120.6596);
    }

    #[tokio::test]
    async fn unsupported_amenity_is_empty() {
        let (status, body) = send(
            test_app(ContextConfig::DEFAULT),
            get_request("/api/map/points/amenity/shop/wgs84"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn context_preview_uses_state_config() {
        let context = json!({
            "selectedLayer": "pois",
            "centerPosition": [35.3, -120.7],
            "searchRadius": 500,
            "data": { "pois": [{ "osmId": 1, "name": "Mission Plaza", "latitude": 35.28, "longitude": -120.66 }] }
        });
        let (status, body) = send(
            test_app(ContextConfig::MINIMAL),
            post_json("/api/context", context),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Viewing pois within 0.5km radius - 1 items found");
        assert_eq!(
            body["promptContext"],
            "\n\n--- MAP CONTEXT ---\nActive Layer: pois\n\nPOINTS OF INTEREST (1 found):\n1. **Mission Plaza**\n\n--- END MAP CONTEXT ---\n"
        );
    }

    #[tokio::test]
    async fn chat_without_api_key_reports_failure() {
        let request = json!({
            "message": "What's nearby?",
            "mapContext": {
                "selectedLayer": "restaurants",
                "centerPosition": [35.28276, -120.65961],
                "searchRadius": 200,
                "data": { "restaurants": [] }
            }
        });
        let (status, body) = send(test_app(ContextConfig::DEFAULT), post_json("/api/chat", request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "SLO_VIEW_GEMINI_API_KEY is not defined");
        assert_eq!(
            body["summary"],
            "Viewing restaurants within 0.2km of (35.2828, -120.6596) - 0 items found"
        );
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let (status, _) = send(
            test_app(ContextConfig::DEFAULT),
            post_json("/api/chat", json!({ "message": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exposes_active_config() {
        let (status, body) = send(test_app(ContextConfig::DETAILED), get_request("/api/context/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["streetFields"]["maxItems"], 30);
        assert_eq!(body["restaurantFields"]["includeOsmId"], true);
    }
}
