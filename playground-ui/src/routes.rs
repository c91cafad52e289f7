//! HTTP route handlers for the UI API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use playground::core::catalog::{Favorite, NewFavorite, Pattern};
use playground::core::markdown::render_markdown;
use playground::io::identity::random_id;
use playground::session::{SessionController, SessionSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::state::AppState;

/// Header carrying the anonymous visitor id, in both directions.
pub const USER_ID_HEADER: &str = "userid";

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/patterns", get(list_patterns))
        .route("/patterns/{slug}", get(get_pattern))
        .route("/patterns/{slug}/markdown", get(export_markdown))
        .route("/categories/{category}", get(patterns_by_category))
        .route("/search", get(search_patterns))
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route(
            "/favorites/{pattern_id}",
            get(check_favorite).delete(remove_favorite),
        )
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/source", put(update_source))
        .route("/sessions/{id}/run", post(run_session))
}

/// JSON error body: `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// Anonymous visitor id resolved by [`anonymous_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Middleware: take the visitor id from the `userid` header or mint one,
/// expose it to handlers and echo it back so the client can keep it.
pub async fn anonymous_identity(mut request: Request, next: Next) -> Response {
    let user_id = resolve_user_id(request.headers());
    request.extensions_mut().insert(UserId(user_id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&user_id) {
        response.headers_mut().insert(USER_ID_HEADER, value);
    }
    response
}

fn resolve_user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(random_id)
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/patterns
async fn list_patterns(State(state): State<AppState>) -> Json<Vec<Pattern>> {
    Json(state.store.all_patterns())
}

/// GET /api/patterns/:slug
async fn get_pattern(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Pattern>, ApiError> {
    find_pattern(&state, &slug).map(Json)
}

/// GET /api/patterns/:slug/markdown - download the article as markdown.
async fn export_markdown(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let pattern = find_pattern(&state, &slug)?;
    let markdown = render_markdown(&pattern).map_err(|err| {
        warn!(error = %err, slug = %slug, "markdown export failed");
        ApiError::internal("Failed to export pattern")
    })?;
    Ok((
        [
            (CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.md\"", pattern.slug),
            ),
        ],
        markdown,
    )
        .into_response())
}

/// GET /api/categories/:category
async fn patterns_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Json<Vec<Pattern>> {
    Json(state.store.patterns_by_category(&category))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

/// GET /api/search?q=
async fn search_patterns(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Pattern>>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'q' is required"))?;
    Ok(Json(state.store.search_patterns(&query)))
}

/// GET /api/favorites
async fn list_favorites(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<Json<Vec<Pattern>>, ApiError> {
    state.store.favorites(&user_id).map(Json).map_err(|err| {
        warn!(error = %err, "favorites lookup failed");
        ApiError::internal("Failed to fetch favorites")
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFavorite {
    pattern_id: u32,
}

/// POST /api/favorites
async fn add_favorite(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    payload: Result<Json<AddFavorite>, JsonRejection>,
) -> Result<(StatusCode, Json<Favorite>), ApiError> {
    let Json(AddFavorite { pattern_id }) =
        payload.map_err(|_| ApiError::bad_request("Invalid favorite data"))?;
    if state.store.pattern_by_id(pattern_id).is_none() {
        return Err(ApiError::not_found("Pattern not found"));
    }
    if state.store.is_favorite(pattern_id, &user_id) {
        return Err(ApiError::bad_request("Pattern is already a favorite"));
    }
    let favorite = state.store.add_favorite(NewFavorite {
        pattern_id,
        user_id,
    });
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// DELETE /api/favorites/:pattern_id
async fn remove_favorite(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let pattern_id = parse_pattern_id(&raw)?;
    if state.store.remove_favorite(pattern_id, &user_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Favorite not found"))
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct FavoriteStatus {
    is_favorite: bool,
}

/// GET /api/favorites/:pattern_id
async fn check_favorite(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(raw): Path<String>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let pattern_id = parse_pattern_id(&raw)?;
    Ok(Json(FavoriteStatus {
        is_favorite: state.store.is_favorite(pattern_id, &user_id),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct CreateSession {
    slug: Option<String>,
    source: Option<String>,
    language: Option<String>,
}

/// POST /api/sessions - open an editor seeded from a pattern or raw source.
async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSession>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let language = body.language.unwrap_or_else(|| "javascript".to_string());
    let seed = match (body.slug, body.source) {
        (Some(slug), _) => find_pattern(&state, &slug)?.code_template,
        (None, Some(source)) => source,
        (None, None) => return Err(ApiError::bad_request("Either slug or source is required")),
    };
    let session = state.host.open_session(seed, language);
    let snapshot = session.snapshot();
    state.insert_session(session);
    info!(session_id = %snapshot.id, sessions = state.session_count(), "session created");
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(find_session(&state, &id)?.snapshot()))
}

#[derive(Debug, Deserialize)]
struct UpdateSource {
    source: String,
}

/// PUT /api/sessions/:id/source
async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSource>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = find_session(&state, &id)?;
    session.update_source(body.source);
    Ok(Json(session.snapshot()))
}

/// POST /api/sessions/:id/run - start a run; results arrive over `/events`.
async fn run_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let session = find_session(&state, &id)?;
    match session.run() {
        Some(_) => Ok((StatusCode::ACCEPTED, Json(session.snapshot()))),
        None => Err(ApiError::new(
            StatusCode::CONFLICT,
            "Session is already running",
        )),
    }
}

/// DELETE /api/sessions/:id
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.remove_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Session not found"))
    }
}

fn find_pattern(state: &AppState, slug: &str) -> Result<Pattern, ApiError> {
    state
        .store
        .pattern_by_slug(slug)
        .ok_or_else(|| ApiError::not_found("Pattern not found"))
}

fn find_session(state: &AppState, id: &str) -> Result<SessionController, ApiError> {
    state
        .session(id)
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

fn parse_pattern_id(raw: &str) -> Result<u32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid pattern ID"))
}
