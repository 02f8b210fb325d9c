use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use glance_engine::{Article, ArticleService, ErrorClass, LoadError};
use glance_logging::{glance_error, glance_info, glance_warn};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone)]
struct AppState {
    service: Arc<ArticleService>,
}

pub fn router(service: Arc<ArticleService>) -> Router {
    Router::new()
        .route("/api/article", post(post_article))
        .route("/api/extract", post(post_article))
        .route("/healthz", get(healthz))
        .with_state(AppState { service })
}

#[derive(Debug, PartialEq, Eq)]
struct ArticleRequest {
    url: String,
    session: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A failed request: status plus the message shown to the reader.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        Self {
            status: status_for(err.class()),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::InvalidInput | ErrorClass::Forbidden => StatusCode::BAD_REQUEST,
        ErrorClass::Superseded => StatusCode::CONFLICT,
        ErrorClass::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorClass::ExtractionFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorClass::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorClass::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn post_article(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Article>, ApiError> {
    let request = parse_request(&body)?;
    glance_info!("Article requested: {}", request.url);

    match state
        .service
        .load(request.session.as_deref(), &request.url)
        .await
    {
        Ok(article) => Ok(Json(article)),
        Err(err) => {
            let err = ApiError::from(err);
            if err.status.is_server_error() {
                glance_error!("Article request failed ({}): {}", err.status, err.message);
            } else {
                glance_warn!("Article request rejected ({}): {}", err.status, err.message);
            }
            Err(err)
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Malformed bodies answer 400 with the usual `{ error }` body.
fn parse_request(body: &[u8]) -> Result<ArticleRequest, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?;

    let url = match value.get("url") {
        Some(Value::String(url)) if !url.trim().is_empty() => url.trim().to_string(),
        _ => return Err(ApiError::bad_request("URL is required")),
    };
    let session = value
        .get("session")
        .and_then(Value::as_str)
        .filter(|session| !session.is_empty())
        .map(str::to_string);

    Ok(ArticleRequest { url, session })
}
