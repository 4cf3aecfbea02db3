use crate::agent::{ AgentError, ChatAgent };
use crate::cli::Args;
use crate::models::conversation::{ ConversationRequest, ErrorBody };
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::{ header, HeaderValue, Method, StatusCode },
};
use log::error;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{ AllowOrigin, Any, CorsLayer };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub verbose_errors: bool,
}

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterConfigError {
    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),
    #[error("Route path {0} is reserved for the health check")]
    ReservedRoute(String),
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub route_path: String,
    pub allowed_origins: Vec<String>,
    pub verbose_errors: bool,
}

impl RouterConfig {
    pub fn new(
        route_path: &str,
        allowed_origins: Vec<String>,
        verbose_errors: bool
    ) -> Result<Self, RouterConfigError> {
        let route_path = normalize_route(route_path);
        if route_path == HEALTH_PATH {
            return Err(RouterConfigError::ReservedRoute(route_path));
        }
        Ok(Self {
            route_path,
            allowed_origins,
            verbose_errors,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, RouterConfigError> {
        Self::new(&args.route_path, args.origins(), args.verbose_errors)
    }
}

fn normalize_route(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// `*` (or nothing) opens the endpoint to any origin without credentials;
/// explicit origins get credentials, matching browser rules. Any origin that
/// is not a valid header value is a startup error.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, RouterConfigError> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let explicit = origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .map(|o| HeaderValue::from_str(o).map_err(|_| RouterConfigError::InvalidOrigin(o.clone())))
        .collect::<Result<Vec<HeaderValue>, _>>()?;

    if explicit.is_empty() || origins.iter().any(|o| o == "*") {
        Ok(CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any))
    } else {
        Ok(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(explicit))
                .allow_methods(methods)
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true)
        )
    }
}

pub fn build_router(agent: Arc<ChatAgent>, config: &RouterConfig) -> Result<Router, RouterConfigError> {
    let cors = cors_layer(&config.allowed_origins)?;
    let app_state = AppState {
        agent,
        verbose_errors: config.verbose_errors,
    };

    Ok(
        Router::new()
            .route(&config.route_path, post(chat_handler))
            .route(HEALTH_PATH, get(health_handler))
            .layer(cors)
            .with_state(app_state)
    )
}

fn internal_error(message: &str, details: String, verbose: bool) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: message.to_string(),
            details: if verbose { Some(details) } else { None },
        }),
    ).into_response()
}

pub fn error_response(err: AgentError, verbose: bool) -> Response {
    match err {
        AgentError::ClientInput(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        AgentError::Provider(e) => {
            error!("Provider error: {}", e);
            internal_error("Failed to generate a reply", e.to_string(), verbose)
        }
        AgentError::Timeout(d) => {
            error!("Provider timed out after {:?}", d);
            internal_error("Failed to generate a reply", format!("timed out after {:?}", d), verbose)
        }
        AgentError::Unhandled(msg) => {
            error!("Unhandled error: {}", msg);
            internal_error("Internal server error", msg, verbose)
        }
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ConversationRequest>, JsonRejection>
) -> Response {
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            return (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", rejection.body_text())).into_response();
        }
    };

    match state.agent.respond(&req).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_response(e, state.verbose_errors),
    }
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{ agent, FailingStore, Reply, StubChat };
    use crate::models::conversation::AssistantReply;
    use crate::store::MemoryRecordStore;
    use axum::body::{ to_bytes, Body };
    use axum::http::Request;
    use clap::Parser;
    use serde_json::{ json, Value };
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn router(chat: Arc<StubChat>, verbose: bool) -> Router {
        let agent = Arc::new(agent(chat, Arc::new(MemoryRecordStore::default())));
        build_router(agent, &RouterConfig::new("/chat", vec!["*".into()], verbose).unwrap()).unwrap()
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[test]
    fn routes_get_a_leading_slash() {
        assert_eq!(normalize_route("chatDogeFunction"), "/chatDogeFunction");
        assert_eq!(normalize_route("/chat/"), "/chat");
        assert_eq!(normalize_route(""), "/");
    }

    #[test]
    fn health_route_cannot_be_the_chat_route() {
        for route in ["/health", "health", "/health/"] {
            assert_eq!(
                RouterConfig::new(route, vec!["*".into()], false).unwrap_err(),
                RouterConfigError::ReservedRoute("/health".into())
            );
        }
        assert!(RouterConfig::new("/healthz", vec![], false).is_ok());
    }

    #[test]
    fn route_is_checked_when_read_from_args() {
        let args = Args::try_parse_from(["persona-chat-relay", "--route-path", "/health"]).unwrap();
        assert!(matches!(RouterConfig::from_args(&args), Err(RouterConfigError::ReservedRoute(_))));

        let args = Args::try_parse_from(["persona-chat-relay", "--route-path", "chatDogeFunction"]).unwrap();
        assert_eq!(RouterConfig::from_args(&args).unwrap().route_path, "/chatDogeFunction");
    }

    #[test]
    fn invalid_origins_fail_instead_of_opening_cors() {
        let bad = "https://bad\nexample".to_string();
        assert_eq!(
            cors_layer(&[bad.clone()]).unwrap_err(),
            RouterConfigError::InvalidOrigin(bad.clone())
        );
        assert!(cors_layer(&["https://app.example".into(), bad]).is_err());
        assert!(cors_layer(&["*".into()]).is_ok());
        assert!(cors_layer(&[]).is_ok());
    }

    #[test]
    fn build_router_rejects_invalid_origins() {
        let agent = Arc::new(
            agent(Arc::new(StubChat::new(Reply::Empty)), Arc::new(MemoryRecordStore::default()))
        );
        let config = RouterConfig::new("/chat", vec!["bad\u{7f}origin".into()], false).unwrap();
        assert!(matches!(build_router(agent, &config), Err(RouterConfigError::InvalidOrigin(_))));
    }

    #[tokio::test]
    async fn missing_birth_datetime_is_plain_400() {
        let chat = Arc::new(StubChat::new(Reply::Text("hi")));
        let response = router(chat.clone(), false)
            .oneshot(post_json(json!({ "subjectId": "u-1", "priorUserTexts": ["Q1"] }))).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(body, "birthDateTime is required");
        assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router(Arc::new(StubChat::new(Reply::Empty)), false)
            .oneshot(request).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn success_returns_assistant_json() {
        let chat = Arc::new(StubChat::new(Reply::Text("A bright year.")));
        let response = router(chat, false)
            .oneshot(
                post_json(
                    json!({
                    "subjectId": "u-1",
                    "birthDateTime": "1990-01-01 08:00",
                    "priorUserTexts": ["How is my year?"]
                })
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reply: AssistantReply = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(reply.assistant, "A bright year.");
    }

    #[tokio::test]
    async fn store_failure_does_not_fail_request() {
        let chat = Arc::new(StubChat::new(Reply::Text("Still here.")));
        let agent = Arc::new(agent(chat, Arc::new(FailingStore::default())));
        let app = build_router(agent, &RouterConfig::new("/chat", vec![], false).unwrap()).unwrap();

        let response = app
            .oneshot(
                post_json(
                    json!({ "subjectId": "u", "birthDateTime": "b", "priorUserTexts": ["Q"] })
                )
            ).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn provider_failure_hides_details_by_default() {
        let response = router(Arc::new(StubChat::new(Reply::Fail)), false)
            .oneshot(
                post_json(
                    json!({ "subjectId": "u", "birthDateTime": "b", "priorUserTexts": ["Q"] })
                )
            ).await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, json!({ "error": "Failed to generate a reply" }));
    }

    #[tokio::test]
    async fn verbose_errors_include_details() {
        let response = router(Arc::new(StubChat::new(Reply::Fail)), true)
            .oneshot(
                post_json(
                    json!({ "subjectId": "u", "birthDateTime": "b", "priorUserTexts": ["Q"] })
                )
            ).await
            .unwrap();

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body["details"].as_str().unwrap().contains("rate limited"));
    }

    #[tokio::test]
    async fn health_endpoint() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(Arc::new(StubChat::new(Reply::Empty)), false)
            .oneshot(request).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn explicit_origin_is_echoed_with_credentials() {
        let agent = Arc::new(
            agent(Arc::new(StubChat::new(Reply::Empty)), Arc::new(MemoryRecordStore::default()))
        );
        let config = RouterConfig::new("/chat", vec!["https://app.example".into()], false).unwrap();
        let app = build_router(agent, &config).unwrap();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header("origin", "https://app.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "https://app.example");
        assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
    }
}
