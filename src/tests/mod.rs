// End-to-end scenarios: request context, logger facade, sink worker and router together

pub mod test_utils {
    use std::{ net::SocketAddr, sync::Arc };

    use axum::{ body::Body, extract::{ ConnectInfo, Request }, http::header };
    use tokio::task::JoinHandle;

    use crate::{
        config::{ Config, ServerConfig, SinkConfig },
        context::RequestContext,
        sink::{ spawn_logger, MemoryLogStore, RetryPolicy },
        utils::token::{ create_token, ACCESS_TOKEN_EXPIRATION },
        AppState,
    };

    pub const JWT_SECRET: &str = "test-secret";
    pub const CLIENT_IP: [u8; 4] = [203, 0, 113, 5];

    pub fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
            },
            sink: SinkConfig::default(),
            jwt_secret: JWT_SECRET.to_string(),
        }
    }

    pub async fn test_state(store: &MemoryLogStore) -> (Arc<AppState>, JoinHandle<()>) {
        let (logger, worker) = spawn_logger(Box::new(store.clone()), RetryPolicy::default(), 64);
        logger.wait_until_settled().await;
        (Arc::new(AppState::new(test_config(), logger)), worker)
    }

    pub fn bearer(user_id: &str, is_super_user: bool) -> String {
        let token = create_token(user_id, is_super_user, JWT_SECRET.as_bytes(), ACCESS_TOKEN_EXPIRATION).unwrap();
        format!("Bearer {}", token)
    }

    pub fn request(method: &str, uri: &str, auth: Option<String>, body: Option<&str>) -> Request {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "api.recipes.test");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }

        let mut request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(SocketAddr::from((CLIENT_IP, 52000))));
        request
    }

    pub fn post_recipes_context() -> RequestContext {
        RequestContext {
            ip_address: Some("203.0.113.5".to_string()),
            host: Some("api.recipes.test".to_string()),
            full_url: Some("http://api.recipes.test/v1/recipes".to_string()),
            path: Some("/v1/recipes".to_string()),
            http_method: Some("POST".to_string()),
            protocol: Some("http".to_string()),
            user_id: None,
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::time::Duration;

    use axum::{
        body::to_bytes,
        http::StatusCode,
        middleware::{ from_fn, from_fn_with_state },
        routing::get,
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    use super::test_utils::*;
    use crate::{
        context::{ self, ContextField },
        create_app,
        dto::recipe_dtos::CreateRecipeRequest,
        logger::LogLevel,
        middleware::{ error_log::{ log_errors, panic_response }, request_context::request_context },
        sink::{ spawn_logger, MemoryLogStore, RetryPolicy, SinkState },
        AppState,
    };

    const WAIT: Duration = Duration::from_secs(2);

    fn recipe(title: &str) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_records_carry_request_context_and_late_user_id() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;

        context::run(post_recipes_context(), async {
            let rejected = state.recipes.create_recipe(None, recipe("")).await;
            assert!(rejected.is_err());

            context::set_field(ContextField::UserId, "u-42");
            let user = context::user_id();
            state.recipes.create_recipe(user.as_deref(), recipe("Ragu")).await.unwrap();
        }).await;

        let records = store.wait_for_records(2, WAIT).await;
        assert_eq!(records.len(), 2);

        let warn = &records[0];
        assert_eq!(warn.level(), LogLevel::Warn);
        assert_eq!(warn.status_code(), Some(400));
        assert_eq!(warn.context().ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(warn.context().http_method.as_deref(), Some("POST"));
        assert_eq!(warn.context().path.as_deref(), Some("/v1/recipes"));
        assert_eq!(warn.context().user_id, None);

        let created = &records[1];
        assert_eq!(created.level(), LogLevel::Log);
        assert_eq!(created.status_code(), Some(201));
        assert_eq!(created.context().user_id.as_deref(), Some("u-42"));
        assert_eq!(created.context().ip_address.as_deref(), Some("203.0.113.5"));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_fail_the_request() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        store.fail_next_writes(1, false);

        let created = context::run(post_recipes_context(), async {
            state.recipes.create_recipe(Some("u-1"), recipe("Ragu")).await
        }).await;
        assert!(created.is_ok());

        state.logger.log("after the failed write", None, None);

        let records = store.wait_for_records(1, WAIT).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), "after the failed write");
    }

    #[tokio::test]
    async fn test_unreachable_sink_never_blocks_callers() {
        let store = MemoryLogStore::failing_connects(u32::MAX);
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), RetryPolicy::default(), 2);
        let state = AppState::new(test_config(), logger);

        let outcome = tokio::time::timeout(Duration::from_millis(500), async {
            for i in 0..50 {
                state.logger.warn(format!("attempt {}", i), None, None);
            }
            state.recipes.create_recipe(Some("u-1"), recipe("Ragu")).await
        }).await;

        assert!(matches!(outcome, Ok(Ok(_))));
        assert_ne!(state.logger.state(), SinkState::Connected);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_router_create_recipe_logs_with_user() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        let app = create_app(state);

        let response = app
            .oneshot(
                request(
                    "POST",
                    "/v1/recipes",
                    Some(bearer("u-42", false)),
                    Some(r#"{"title":"Ragu","description":"Sunday sauce"}"#)
                )
            ).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["data"]["userId"], "u-42");
        assert_eq!(body["data"]["title"], "Ragu");

        let records = store.wait_for_records(1, WAIT).await;
        assert_eq!(records.len(), 1);
        let ctx = records[0].context();
        assert_eq!(records[0].status_code(), Some(201));
        assert_eq!(ctx.user_id.as_deref(), Some("u-42"));
        assert_eq!(ctx.ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(ctx.full_url.as_deref(), Some("http://api.recipes.test/v1/recipes"));
    }

    #[tokio::test]
    async fn test_router_rejected_token_is_logged_once_as_error() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        let app = create_app(state);

        let response = app
            .clone()
            .oneshot(request("POST", "/v1/recipes", None, Some(r#"{"title":"Ragu"}"#))).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                request(
                    "POST",
                    "/v1/recipes",
                    Some("Bearer not-a-jwt".to_string()),
                    Some(r#"{"title":"Ragu"}"#)
                )
            ).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let records = store.wait_for_records(2, WAIT).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.records().len(), 2);

        for record in &records {
            assert_eq!(record.level(), LogLevel::Error);
            assert_eq!(record.origin_tag(), Some("HttpError"));
            assert_eq!(record.status_code(), Some(401));
            assert_eq!(record.context().user_id, None);
            assert_eq!(record.context().ip_address.as_deref(), Some("203.0.113.5"));
        }
    }

    #[tokio::test]
    async fn test_router_delete_by_stranger_is_forbidden() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        let created = state.recipes.create_recipe(Some("u-1"), recipe("Ragu")).await.unwrap();
        let app = create_app(state.clone());

        let uri = format!("/v1/recipes/{}", created.id);
        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, Some(bearer("u-2", false)), None)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.recipes.count().await, 1);

        let response = app
            .oneshot(request("DELETE", &uri, Some(bearer("u-1", false)), None)).await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.recipes.count().await, 0);

        // created, ownership denied, 403 error, ownership passed, deleted
        let records = store.wait_for_records(5, WAIT).await;
        assert_eq!(records.len(), 5);
        assert_eq!(records[1].level(), LogLevel::Warn);
        assert_eq!(records[1].context().user_id.as_deref(), Some("u-2"));
        assert_eq!(records[2].level(), LogLevel::Error);
        assert_eq!(records[2].status_code(), Some(403));
        assert_eq!(records[4].context().user_id.as_deref(), Some("u-1"));
        assert_eq!(records[4].context().http_method.as_deref(), Some("DELETE"));
    }

    #[tokio::test]
    async fn test_router_unknown_route_is_logged() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        let app = create_app(state);

        let response = app.oneshot(request("GET", "/nowhere?x=1", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let records = store.wait_for_records(1, WAIT).await;
        assert_eq!(records[0].level(), LogLevel::Error);
        assert_eq!(records[0].status_code(), Some(404));
        assert_eq!(records[0].context().path.as_deref(), Some("/nowhere?x=1"));
    }

    #[tokio::test]
    async fn test_health_reports_sink_state() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;
        let app = create_app(state);

        let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["logSink"].is_string());
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_logged_500_with_trace() {
        let store = MemoryLogStore::new();
        let (state, _worker) = test_state(&store).await;

        let app = Router::new()
            .route(
                "/boom",
                get(|| async {
                    if context::current().is_some() {
                        panic!("recipe index corrupted");
                    }
                    "unreachable"
                })
            )
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(from_fn_with_state(state.clone(), log_errors))
            .layer(from_fn(request_context))
            .with_state(state);

        let response = app.oneshot(request("GET", "/boom", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let records = store.wait_for_records(1, WAIT).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level(), LogLevel::Error);
        assert_eq!(records[0].status_code(), Some(500));
        assert_eq!(records[0].trace(), Some("panicked: recipe index corrupted"));
        assert_eq!(records[0].context().path.as_deref(), Some("/boom"));
    }
}
