use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use recipebox_core::models::{
    ImportSummary, Ingredient, Recipe, ScaledRecipe, decode_collection, validate_portions,
    validate_recipe,
};

use crate::commands::Store;

const BODY_LIMIT: usize = 5 * 1024 * 1024; // 5 MB

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Store>>,
    api_key: Option<String>,
}

impl AppState {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RecipeRequest {
    name: String,
    portions: u32,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
}

impl RecipeRequest {
    fn into_recipe(self, id: String) -> Result<Recipe, ApiError> {
        let recipe = Recipe {
            id,
            name: self.name,
            ingredients: self.ingredients,
            portions: self.portions,
        };
        validate_recipe(&recipe).map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
        Ok(recipe)
    }
}

#[derive(Deserialize)]
struct ScaleQuery {
    portions: u32,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn recipe_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Recipe {id} not found"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Recipe handlers ---

async fn list_recipes(State(state): State<AppState>) -> Json<Vec<Recipe>> {
    Json(state.store().recipes().to_vec())
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let store = state.store();
    let recipe = store.get(&id).ok_or_else(|| recipe_not_found(&id))?;
    Ok(Json(recipe.clone()))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<RecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = req.into_recipe(String::new())?;
    let mut store = state.store();
    let saved = store.save(recipe).context("failed to save recipe")?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecipeRequest>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = req.into_recipe(id.clone())?;
    let mut store = state.store();
    if store.get(&id).is_none() {
        return Err(recipe_not_found(&id));
    }
    let saved = store.save(recipe).context("failed to save recipe")?;
    Ok(Json(saved))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store();
    if store.delete(&id).context("failed to delete recipe")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(recipe_not_found(&id))
    }
}

async fn scale_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ScaleQuery>,
) -> Result<Json<ScaledRecipe>, ApiError> {
    validate_portions(params.portions).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let store = state.store();
    let recipe = store.get(&id).ok_or_else(|| recipe_not_found(&id))?;
    let scaled = ScaledRecipe::from_recipe(recipe, params.portions)?;
    Ok(Json(scaled))
}

// --- Export / Import handlers ---

async fn export_recipes(State(state): State<AppState>) -> Result<Response, ApiError> {
    let contents = state.store().export()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"recipes.json\"",
            ),
        ],
        contents,
    )
        .into_response())
}

async fn import_recipes(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportSummary>, ApiError> {
    let recipes = decode_collection(&body).map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    for recipe in &recipes {
        validate_recipe(recipe).map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    }
    let mut store = state.store();
    let summary = store.import(recipes).context("failed to import recipes")?;
    Ok(Json(summary))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/recipes/{id}/scale", get(scale_recipe))
        .route("/api/export", get(export_recipes))
        .route("/api/import", post(import_recipes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key, or a mask when the key is too
/// short to abbreviate.
fn key_hint(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    store: Store,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            key_hint(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        warn!(bind, "listening on a non-loopback address without authentication");
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(bind, port, "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
