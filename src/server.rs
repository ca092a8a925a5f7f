use crate::config::AppConfig;
use crate::error::MapError;
use crate::render::project;
use crate::session::MapSession;
use crate::surface::LayerStore;
use crate::types::Dataset;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// Wrapper for RTree indexing; `point` is in Web Mercator pixels at the map zoom
pub struct SymbolIndex {
    symbol: usize,
    point: [f64; 2],
}

impl RTreeObject for SymbolIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SymbolIndex {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

pub struct LoadedMap {
    pub session: Mutex<MapSession<LayerStore>>,
    pub tree: RTree<SymbolIndex>,
}

pub struct AppState {
    pub config: AppConfig,
    // Err holds the load failure shown to the user
    pub map: std::result::Result<LoadedMap, String>,
}

impl AppState {
    pub fn ready(config: AppConfig, session: MapSession<LayerStore>) -> Self {
        let items = session
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, symbol)| {
                let point = session.dataset().features()[symbol.feature].point;
                let (x, y) = project(point.y(), point.x(), config.map.zoom);
                SymbolIndex {
                    symbol: i,
                    point: [x, y],
                }
            })
            .collect();
        Self {
            config,
            map: Ok(LoadedMap {
                session: Mutex::new(session),
                tree: RTree::bulk_load(items),
            }),
        }
    }

    pub fn failed(config: AppConfig, error: &MapError) -> Self {
        Self {
            config,
            map: Err(error.to_string()),
        }
    }

    fn loaded(&self) -> std::result::Result<&LoadedMap, ApiError> {
        self.map
            .as_ref()
            .map_err(|message| ApiError(StatusCode::SERVICE_UNAVAILABLE, message.clone()))
    }
}

pub struct ApiError(StatusCode, String);

impl From<MapError> for ApiError {
    fn from(error: MapError) -> Self {
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct MapInfo {
    center: [f64; 2],
    zoom: u8,
    max_zoom: u8,
    tile_url: String,
    attribution: String,
    slider_min: usize,
    slider_max: usize,
    years: Vec<String>,
}

#[derive(Serialize)]
pub struct StateResponse {
    index: usize,
    year: String,
    temporal_label: String,
    symbols: FeatureCollection,
}

#[derive(Deserialize)]
pub struct SeekParams {
    index: i64,
}

#[derive(Deserialize)]
pub struct ColorParams {
    value: String,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    name: String,
    year: String,
    popup: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/map", get(map_handler))
        .route("/api/state", get(state_handler))
        .route("/api/forward", post(forward_handler))
        .route("/api/reverse", post(reverse_handler))
        .route("/api/seek", post(seek_handler))
        .route("/api/color", post(color_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/query", get(query_handler))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the viewer; a fetch failure still starts the server so the page can report it.
pub async fn start_server(config: AppConfig, loaded: std::result::Result<Dataset, MapError>) -> Result<()> {
    let state = match loaded {
        Ok(dataset) => {
            let session = MapSession::initialize(dataset, &config, LayerStore::default())?;
            AppState::ready(config.clone(), session)
        }
        Err(e) if e.is_fetch() => {
            tracing::error!("{}", e);
            AppState::failed(config.clone(), &e)
        }
        Err(e) => return Err(e.into()),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    tracing::info!("Starting server on http://{}", addr);

    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn map_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<MapInfo>> {
    let session = state.loaded()?.session.lock().await;
    let map = &state.config.map;
    Ok(Json(MapInfo {
        center: map.center,
        zoom: map.zoom,
        max_zoom: map.max_zoom,
        tile_url: map.tile_url.clone(),
        attribution: map.attribution.clone(),
        slider_min: 0,
        slider_max: session.attributes().last_index(),
        years: session.attributes().keys().to_vec(),
    }))
}

fn state_response(session: &MapSession<LayerStore>) -> StateResponse {
    StateResponse {
        index: session.index(),
        year: session.current_year().to_string(),
        temporal_label: session.temporal_label(),
        symbols: session.surface().to_feature_collection(),
    }
}

async fn state_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<StateResponse>> {
    let session = state.loaded()?.session.lock().await;
    Ok(Json(state_response(&session)))
}

async fn forward_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<StateResponse>> {
    let mut session = state.loaded()?.session.lock().await;
    session.forward()?;
    Ok(Json(state_response(&session)))
}

async fn reverse_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<StateResponse>> {
    let mut session = state.loaded()?.session.lock().await;
    session.reverse()?;
    Ok(Json(state_response(&session)))
}

async fn seek_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeekParams>,
) -> ApiResult<Json<StateResponse>> {
    let mut session = state.loaded()?.session.lock().await;
    session.seek(params.index)?;
    Ok(Json(state_response(&session)))
}

async fn color_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ColorParams>,
) -> ApiResult<Json<StateResponse>> {
    let mut session = state.loaded()?.session.lock().await;
    if !session.set_fill_color(&params.value) {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            format!("not a #rrggbb colour: {}", params.value),
        ));
    }
    Ok(Json(state_response(&session)))
}

async fn legend_handler(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let session = state.loaded()?.session.lock().await;
    let svg = session.legend().to_svg();
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Option<QueryResponse>>> {
    let loaded = state.loaded()?;
    let session = loaded.session.lock().await;
    let (qx, qy) = project(params.lat, params.lon, state.config.map.zoom);
    let max_radius = session
        .symbols()
        .iter()
        .map(|symbol| symbol.radius)
        .fold(0.0, f64::max);

    // Every centre a circle could reach the point from, then the closest actual hit
    let hit = loaded
        .tree
        .locate_within_distance([qx, qy], max_radius * max_radius)
        .filter_map(|candidate| {
            let symbol = session.symbols().get(candidate.symbol)?;
            let d = candidate.distance_2(&[qx, qy]).sqrt();
            (d <= symbol.radius).then_some((d, symbol))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, symbol)| symbol);

    Ok(Json(hit.map(|symbol| QueryResponse {
        name: session.dataset().features()[symbol.feature].name.clone(),
        year: session.current_year().to_string(),
        popup: symbol.content.clone(),
    })))
}
