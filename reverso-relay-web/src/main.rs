use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use reverso_relay::relay::{DEFAULT_FROM, DEFAULT_TO};
use reverso_relay::{FinalResponse, Relay, RelayConfig, RelayError, init_tracing};

#[derive(Debug, Default, Deserialize)]
pub struct TranslateParams {
    pub text: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let config = RelayConfig::from_env()
        .map_err(|e| format!("Failed to load configuration: {}", e))?;
    let relay = Relay::from_config(&config)
        .map_err(|e| format!("Failed to initialize relay: {}", e))?;
    let state = AppState {
        relay: Arc::new(relay),
    };

    info!(
        "Starting reverso-relay web server (browser tier {})",
        if config.browser_enabled { "enabled" } else { "disabled" }
    );

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Server running at http://{}", config.listen_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/translate", get(translate))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

async fn translate(
    State(state): State<AppState>,
    Query(params): Query<TranslateParams>,
) -> Result<Json<FinalResponse>, (StatusCode, Json<ErrorResponse>)> {
    let text = params
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing text parameter"))?;
    let from = params.from.unwrap_or_else(|| DEFAULT_FROM.to_string());
    let to = params.to.unwrap_or_else(|| DEFAULT_TO.to_string());

    info!("Translating '{}' {} → {}", &text, &from, &to);

    let response = state
        .relay
        .handle_translate(&text, &from, &to)
        .await
        .map_err(|e| match e {
            RelayError::MissingText => {
                error_response(StatusCode::BAD_REQUEST, "Missing text parameter")
            }
            RelayError::UnsupportedLanguage(_) => {
                error_response(StatusCode::BAD_REQUEST, "Unsupported language code")
            }
            other => {
                error!("Unexpected error: {}", other);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        })?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use reverso_relay::relay::{MockMode, MockTier, Tier, TierClient, TierResult, TierSet};
    use reverso_relay::{RelayResult, TranslationRequest};
    use serde_json::Value;
    use tower::ServiceExt;

    struct PanickingTier;

    #[async_trait]
    impl TierClient for PanickingTier {
        fn tier(&self) -> Tier {
            Tier::Context
        }

        async fn fetch(&self, _request: &TranslationRequest) -> RelayResult<TierResult> {
            panic!("upstream client bug");
        }

        fn client_name(&self) -> &str {
            "Panicking"
        }
    }

    fn app(context: Arc<MockTier>, strict: bool) -> Router {
        let config = RelayConfig {
            strict_languages: strict,
            ..RelayConfig::default()
        };
        let relay = Relay::with_tiers(
            &config,
            TierSet {
                context,
                translation: Arc::new(MockTier::new(Tier::Translation, MockMode::Empty)),
                scrape: Some(Arc::new(MockTier::new(Tier::Scrape, MockMode::Empty))),
            },
        );
        router(AppState {
            relay: Arc::new(relay),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_success() {
        let context = Arc::new(MockTier::new(
            Tier::Context,
            MockMode::Fixed(TierResult::from_content(
                vec!["привет".to_string(), "".to_string()],
                vec![reverso_relay::ExamplePair::new(0, "Hello.", "Привет.")],
            )),
        ));
        let (status, body) =
            get_json(app(context, false), "/api/translate?text=hello&from=en&to=ru").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["source"], "en");
        assert_eq!(body["target"], "ru");
        assert_eq!(body["translations"], serde_json::json!(["привет"]));
        assert_eq!(body["examples"][0]["id"], 0);
        assert_eq!(body["examples"][0]["target"], "Привет.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_languages() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Echo));
        let (status, body) = get_json(app(context, false), "/api/translate?text=hello").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "en");
        assert_eq!(body["target"], "ru");
        assert_eq!(body["translations"][0], "hello_russian");
    }

    #[tokio::test]
    async fn test_missing_text_is_bad_request() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Echo));
        let (status, body) = get_json(app(context.clone(), false), "/api/translate?from=en").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing text parameter");
        assert_eq!(context.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_is_bad_request() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Echo));
        let (status, _) = get_json(app(context.clone(), false), "/api/translate?text=%20%20").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(context.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_in_strict_mode() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Echo));
        let (status, body) =
            get_json(app(context.clone(), true), "/api/translate?text=hello&to=xx").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported language code");
        assert_eq!(context.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_tiers_fail_is_still_ok() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Empty));
        let (status, body) =
            get_json(app(context, false), "/api/translate?text=xyz123&from=en&to=fr").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translations"], serde_json::json!([]));
        assert_eq!(body["examples"], serde_json::json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_fault_is_generic_500() {
        let relay = Relay::with_tiers(
            &RelayConfig::default(),
            TierSet {
                context: Arc::new(PanickingTier),
                translation: Arc::new(MockTier::new(Tier::Translation, MockMode::Empty)),
                scrape: None,
            },
        );
        let app = router(AppState {
            relay: Arc::new(relay),
        });
        let (status, body) = get_json(app, "/api/translate?text=hello").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_health() {
        let context = Arc::new(MockTier::new(Tier::Context, MockMode::Echo));
        let response = app(context, false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
