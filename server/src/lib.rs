use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bookrank_core::asset::{AssetHandle, AssetStore};
use bookrank_core::fusion::{rank, rank_by_centrality, Candidate, FusionConfig, RankedHit};
use bookrank_core::RankError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub handle: Arc<AssetHandle>,
    pub store: Arc<AssetStore>,
    pub fusion: FusionConfig,
    pub admin_token: Option<String>,
}

/// How a candidate set should be ordered.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Blend normalized lexical score with centrality.
    #[default]
    Blend,
    /// Centrality only; used for regex search, which carries no lexical
    /// score worth normalizing.
    Centrality,
}

#[derive(Deserialize)]
pub struct RankRequest {
    pub candidates: Vec<Candidate>,
    /// Per-request override of the lexical blend weight.
    pub alpha: Option<f64>,
    #[serde(default)]
    pub mode: RankMode,
}

#[derive(Serialize)]
pub struct RankResponse {
    pub asset_version: u64,
    pub took_s: f64,
    pub results: Vec<RankedHit>,
}

#[derive(Deserialize)]
pub struct NeighborParams {
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct NeighborHit {
    pub id: String,
    pub weight: f64,
}

#[derive(Serialize)]
pub struct NeighborResponse {
    pub id: String,
    pub asset_version: u64,
    pub neighbors: Vec<NeighborHit>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    /// Set on 503 so the caller knows lexical-only fallback is appropriate.
    stale_asset: bool,
}

fn error_response(err: &RankError) -> (StatusCode, Json<serde_json::Value>) {
    let (status, stale) = match err {
        RankError::StaleAsset => (StatusCode::SERVICE_UNAVAILABLE, true),
        RankError::NotFound { .. } => (StatusCode::NOT_FOUND, false),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, false),
    };
    let body = serde_json::json!(ErrorBody { error: err.to_string(), stale_asset: stale });
    (status, Json(body))
}

/// Build the serving router. A missing store is not fatal: the server comes
/// up stale and answers 503 until an asset is published and reloaded.
pub fn build_app(store_root: String) -> Result<Router> {
    let store = AssetStore::new(&store_root);
    let handle = match store.load_current() {
        Ok(asset) => {
            tracing::info!(version = asset.meta.version, "ranking asset loaded");
            AssetHandle::with_asset(asset)
        }
        Err(RankError::StaleAsset) => {
            tracing::warn!(store = %store_root, "no published ranking asset; serving stale until reload");
            AssetHandle::empty()
        }
        Err(other) => return Err(other.into()),
    };
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState {
        handle: Arc::new(handle),
        store: Arc::new(store),
        fusion: FusionConfig::default(),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/rank", post(rank_handler))
        .route("/neighbors/:id", get(neighbors_handler))
        .route("/assets/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn rank_handler(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankResponse>, (StatusCode, Json<serde_json::Value>)> {
    let start = std::time::Instant::now();
    let asset = state.handle.get().map_err(|e| error_response(&e))?;

    let results = match req.mode {
        RankMode::Blend => {
            let fusion = FusionConfig {
                alpha: req.alpha.unwrap_or(state.fusion.alpha),
                ..state.fusion.clone()
            };
            rank(&asset, &req.candidates, &fusion)
        }
        RankMode::Centrality => {
            let ids: Vec<String> = req.candidates.into_iter().map(|c| c.id).collect();
            rank_by_centrality(&asset, &ids)
        }
    };

    Ok(Json(RankResponse {
        asset_version: asset.meta.version,
        took_s: start.elapsed().as_secs_f64(),
        results,
    }))
}

pub async fn neighbors_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<NeighborParams>,
) -> Result<Json<NeighborResponse>, (StatusCode, Json<serde_json::Value>)> {
    let asset = state.handle.get().map_err(|e| error_response(&e))?;
    let k = params.k.max(1).min(100);
    let neighbors = asset
        .neighbors(&id, k)
        .map_err(|e| error_response(&e))?
        .into_iter()
        .map(|(id, weight)| NeighborHit { id, weight })
        .collect();
    Ok(Json(NeighborResponse {
        id,
        asset_version: asset.meta.version,
        neighbors,
    }))
}

/// Swap in the latest published asset. The handle is only written after a
/// fully successful load, so a broken store never disturbs serving.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    match state.store.load_current() {
        Ok(asset) => {
            let version = asset.meta.version;
            state.handle.install(asset);
            tracing::info!(version, "ranking asset reloaded");
            Ok(Json(serde_json::json!({ "reloaded": true, "version": version })))
        }
        Err(err) => Err((StatusCode::CONFLICT, format!("reload failed: {err}"))),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
