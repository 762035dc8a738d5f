use anyhow::Context;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use translator_core::config::ServiceConfig;
use translator_core::service::{
    BatchTranslateResponse, BatchTranslationRequest, TranslateResponse, TranslationError,
    TranslationRequest, TranslationService,
};
use translator_core::translate::Translator;

const LOG_TARGET: &str = "translator::serve";

type Service = TranslationService<dyn Translator>;

#[derive(Clone)]
struct AppState {
    service: Service,
    request_timeout: Duration,
}

#[derive(Debug)]
enum ApiError {
    Translation(TranslationError),
    DeadlineExceeded,
    /// The body could not be read as the route's JSON request type.
    Rejected { status: StatusCode, message: String },
}

impl From<TranslationError> for ApiError {
    fn from(e: TranslationError) -> Self {
        ApiError::Translation(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Translation(TranslationError::InvalidLanguageTag(_)) => StatusCode::BAD_REQUEST,
            ApiError::Translation(TranslationError::Provider(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Translation(TranslationError::UnitAborted { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Translation(TranslationError::Cancelled) | ApiError::DeadlineExceeded => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Translation(e) => e.to_string(),
            ApiError::DeadlineExceeded => "request deadline exceeded".to_owned(),
            ApiError::Rejected { message, .. } => message.clone(),
        };
        if status.is_server_error() {
            tracing::warn!(target: LOG_TARGET, status = status.as_u16(), error = %message, "request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// `Json` whose rejections use the same `{ "error": ... }` body as every
/// other failure.
struct ApiJson<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

fn router(service: Service, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/translate", post(translate))
        .route("/v1/batch-translate", post(batch_translate))
        .with_state(AppState {
            service,
            request_timeout,
        })
}

pub async fn run(service: Service, cfg: &ServiceConfig) -> anyhow::Result<()> {
    let app = router(service, cfg.request_timeout.duration());
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", cfg.listen_addr))?;

    tracing::info!(target: LOG_TARGET, addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: LOG_TARGET, error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!(target: LOG_TARGET, "shutting down");
}

async fn healthz() -> &'static str {
    "ok"
}

/// Runs `fut` under the request deadline. Units observe `cancel`, which the
/// handler's drop guard fires once the request is over, so an expired
/// deadline stops them too.
async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TranslationError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::DeadlineExceeded),
    }
}

async fn translate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TranslationRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let translated_text = with_deadline(
        state.request_timeout,
        state.service.translate_with_cancel(req, cancel),
    )
    .await?;
    Ok(Json(TranslateResponse { translated_text }))
}

async fn batch_translate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BatchTranslationRequest>,
) -> Result<Json<BatchTranslateResponse>, ApiError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let translated_texts = with_deadline(
        state.request_timeout,
        state.service.batch_translate_with_cancel(req, cancel),
    )
    .await?;
    Ok(Json(BatchTranslateResponse { translated_texts }))
}
