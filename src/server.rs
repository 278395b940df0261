//! HTTP API for browsing cards.
//!
//! Read-only JSON endpoints over the card store, plus the extracted audio
//! served as static files under `/media`.

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cards::{CardOut, CardStore, ListParams, DEFAULT_LIST_LIMIT, MEDIA_URL_PREFIX};

/// Server state shared across requests.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<Mutex<CardStore>>,
}

impl ServerState {
    pub fn new(store: CardStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, CardStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("Card store lock poisoned".to_string()))
    }
}

/// Query parameters for `GET /cards`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListQuery> for ListParams {
    fn from(query: ListQuery) -> Self {
        ListParams::new(
            query.q,
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            query.offset.unwrap_or(0),
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Errors surfaced to API clients.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Internal(String),
}

impl<E: std::error::Error> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail.to_string()),
            ApiError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn list_cards(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<CardOut>> {
    let params = ListParams::from(query);
    let cards = state.store()?.list_cards(&params)?;
    Ok(Json(cards.into_iter().map(CardOut::from).collect()))
}

async fn random_card(State(state): State<ServerState>) -> ApiResult<CardOut> {
    let card = state
        .store()?
        .random_card()?
        .ok_or(ApiError::NotFound("No cards in database"))?;
    Ok(Json(card.into()))
}

async fn get_card(
    State(state): State<ServerState>,
    UrlPath(card_id): UrlPath<i64>,
) -> ApiResult<CardOut> {
    let card = state
        .store()?
        .get_card(card_id)?
        .ok_or(ApiError::NotFound("Card not found"))?;
    Ok(Json(card.into()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub cards: i64,
}

async fn health(State(state): State<ServerState>) -> ApiResult<Health> {
    let cards = state.store()?.count_cards()?;
    Ok(Json(Health {
        status: "ok".to_string(),
        cards,
    }))
}

/// Build the API router.
///
/// `/media` is only mounted when `media_dir` exists at this point, matching
/// how the directory is populated by imports before the server starts.
pub fn router(state: ServerState, media_dir: &Path) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/cards", get(list_cards))
        .route("/cards/random", get(random_card))
        .route("/cards/{id}", get(get_card))
        .with_state(state);

    if media_dir.is_dir() {
        log::info!("Serving media from {:?} at {}", media_dir, MEDIA_URL_PREFIX);
        app = app.nest_service(MEDIA_URL_PREFIX, ServeDir::new(media_dir));
    } else {
        log::warn!("Media directory {:?} not found, audio will not be served", media_dir);
    }

    app
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Card API listening on http://{}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Card API shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::NewCard;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn seeded_state() -> ServerState {
        let mut store = CardStore::open_in_memory().unwrap();
        store
            .replace_all(vec![
                NewCard {
                    word: Some("kat".to_string()),
                    english: Some("cat".to_string()),
                    audio: Some("kat.mp3".to_string()),
                    ..Default::default()
                },
                NewCard {
                    word: Some("hond".to_string()),
                    english: Some("dog".to_string()),
                    ..Default::default()
                },
            ])
            .unwrap();
        ServerState::new(store)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_cards() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(seeded_state(), &temp_dir.path().join("missing"));

        let (status, json) = get_json(app.clone(), "/cards").await;
        assert_eq!(status, StatusCode::OK);
        let cards = json.as_array().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0]["word"], "kat");
        assert_eq!(cards[0]["audio_url"], "/media/kat.mp3");
        assert!(cards[1]["audio_url"].is_null());

        let (_, json) = get_json(app.clone(), "/cards?q=DOG").await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["word"], "hond");

        let (_, json) = get_json(app.clone(), "/cards?limit=0&offset=-3").await;
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (_, json) = get_json(app, "/cards?limit=9999&offset=1").await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_card_and_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let state = seeded_state();
        let first_id = state.store.lock().unwrap().list_cards(&ListParams::default()).unwrap()[0].id;
        let app = router(state, temp_dir.path());

        let (status, json) = get_json(app.clone(), &format!("/cards/{}", first_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], first_id);

        let (status, json) = get_json(app, "/cards/424242").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "Card not found");
    }

    #[tokio::test]
    async fn test_random_card() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(seeded_state(), temp_dir.path());
        let (status, json) = get_json(app, "/cards/random").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["word"] == "kat" || json["word"] == "hond");

        let empty = ServerState::new(CardStore::open_in_memory().unwrap());
        let app = router(empty, temp_dir.path());
        let (status, json) = get_json(app, "/cards/random").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "No cards in database");
    }

    #[tokio::test]
    async fn test_serves_media() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("kat.mp3"), b"meow").unwrap();
        let app = router(seeded_state(), temp_dir.path());

        let (status, body) = get(app.clone(), "/media/kat.mp3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"meow");

        let (status, _) = get(app, "/media/nope.mp3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(seeded_state(), temp_dir.path());
        let (status, json) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cards"], 2);
    }
}
