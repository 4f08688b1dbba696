//! Route definitions for the API.

use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;
use crate::auth::{require_auth, GateState};
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::status,
        handlers::register_user,
        handlers::current_user,
        handlers::login,
        handlers::logout,
        handlers::get_reset_password_token,
        handlers::update_password,
    ),
    components(schemas(
        crate::api::types::StatusResponse,
        crate::api::types::CredentialsRequest,
        crate::api::types::RegisterResponse,
        crate::api::types::UserInfo,
        crate::api::types::ResetTokenRequest,
        crate::api::types::ResetTokenResponse,
        crate::api::types::UpdatePasswordRequest,
        crate::api::types::MessageResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Session login and logout"),
        (name = "users", description = "Registration, profile and password reset"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Warden Core API",
        version = "0.1.0",
        description = "Pluggable authentication for HTTP APIs",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    let mut doc = ApiDoc::openapi();
    if let Some(components) = doc.components.as_mut() {
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                state.auth_config.session_name.clone(),
            ))),
        );
    }
    Json(doc)
}

/// Build the API router with every request passing through the access gate.
pub fn build_router(state: AppState, gate: GateState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/status", get(handlers::status))
        .route("/api/v1/users", post(handlers::register_user))
        .route("/api/v1/users/me", get(handlers::current_user))
        .route("/api/v1/auth_session/login", post(handlers::login))
        .route("/api/v1/auth_session/logout", delete(handlers::logout))
        .route(
            "/api/v1/reset_password",
            post(handlers::get_reset_password_token).put(handlers::update_password),
        )
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(middleware::from_fn_with_state(gate, require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        response::Response,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{
        AccountService, AuthStrategy, BasicAuth, ExclusionRule, SessionAuth, SessionDbAuth,
        SessionExpiry, SessionStore, SystemClock,
    };
    use crate::config::AuthConfig;
    use crate::logging;
    use crate::storage::{testing::setup_test_db, UserStore, WardenRepository};

    fn exclusions() -> Vec<ExclusionRule> {
        [
            "/api/v1/status/",
            "/api/v1/users/",
            "/api/v1/auth_session/login/",
            "/api/v1/reset_password/",
            "/api-docs/*",
        ]
        .into_iter()
        .map(ExclusionRule::parse)
        .collect()
    }

    fn app(repository: WardenRepository, strategy: Arc<dyn AuthStrategy>) -> Router {
        app_with_config(repository, strategy, AuthConfig::default())
    }

    fn app_with_config(
        repository: WardenRepository,
        strategy: Arc<dyn AuthStrategy>,
        auth_config: AuthConfig,
    ) -> Router {
        let gate = GateState {
            strategy: strategy.clone(),
            exclusions: Arc::new(exclusions()),
            session_name: auth_config.session_name.clone(),
        };
        let state = AppState {
            strategy,
            accounts: AccountService::new(repository),
            auth_config: Arc::new(auth_config),
        };
        build_router(state, gate)
    }

    async fn session_app() -> (Router, WardenRepository) {
        logging::init_test();
        let repository = setup_test_db().await;
        let users: Arc<dyn UserStore> = Arc::new(repository.clone());
        let clock = Arc::new(SystemClock);
        let base = SessionAuth::new(SessionStore::new(), "_my_session_id", users, clock.clone());
        let strategy = SessionDbAuth::new(
            base,
            Arc::new(repository.clone()),
            SessionExpiry::new(0, clock),
        );
        (app(repository.clone(), Arc::new(strategy)), repository)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn register(app: &Router, email: &str, password: &str) {
        let response = send(
            app,
            json_request(
                "POST",
                "/api/v1/users",
                serde_json::json!({"email": email, "password": password}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    fn session_cookie_of(response: &Response) -> String {
        let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_status_is_public() {
        let (app, _) = session_app().await;

        let response = send(
            &app,
            Request::get("/api/v1/status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_without_credentials() {
        let (app, _) = session_app().await;

        let response = send(
            &app,
            Request::get("/api/v1/users/me").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            Request::get("/api/v1/users/me")
                .header(COOKIE, "_my_session_id=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_session_login_flow() {
        let (app, _) = session_app().await;
        register(&app, "bob@example.com", "pw").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth_session/login",
                serde_json::json!({"email": "bob@example.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie_of(&response);
        assert!(cookie.starts_with("_my_session_id="));

        let me = send(
            &app,
            Request::get("/api/v1/users/me")
                .header(COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::OK);

        let logout = send(
            &app,
            Request::delete("/api/v1/auth_session/logout")
                .header(COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(logout.status(), StatusCode::OK);

        let me = send(
            &app,
            Request::get("/api/v1/users/me")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_login_errors() {
        let (app, _) = session_app().await;
        register(&app, "bob@example.com", "pw").await;

        let cases = [
            (serde_json::json!({"password": "pw"}), StatusCode::BAD_REQUEST),
            (serde_json::json!({"email": "bob@example.com"}), StatusCode::BAD_REQUEST),
            (
                serde_json::json!({"email": "alice@example.com", "password": "pw"}),
                StatusCode::NOT_FOUND,
            ),
            (
                serde_json::json!({"email": "bob@example.com", "password": "bad"}),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (body, status) in cases {
            let response = send(&app, json_request("POST", "/api/v1/auth_session/login", body)).await;
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let (app, _) = session_app().await;
        register(&app, "bob@example.com", "pw").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                serde_json::json!({"email": "bob@example.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (app, _) = session_app().await;
        register(&app, "bob@example.com", "old").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/v1/reset_password",
                serde_json::json!({"email": "bob@example.com"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let token = body["reset_token"].as_str().unwrap().to_string();

        let response = send(
            &app,
            json_request(
                "PUT",
                "/api/v1/reset_password",
                serde_json::json!({
                    "email": "bob@example.com",
                    "reset_token": token,
                    "new_password": "new"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app,
            json_request(
                "PUT",
                "/api/v1/reset_password",
                serde_json::json!({
                    "email": "bob@example.com",
                    "reset_token": "bogus",
                    "new_password": "new"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/v1/reset_password",
                serde_json::json!({"email": "ghost@example.com"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_basic_auth_app() {
        logging::init_test();
        let repository = setup_test_db().await;
        let strategy = Arc::new(BasicAuth::new(Arc::new(repository.clone())));
        let app = app(repository, strategy);
        register(&app, "bob@example.com", "pw").await;

        let good = format!("Basic {}", STANDARD.encode("bob@example.com:pw"));
        let response = send(
            &app,
            Request::get("/api/v1/users/me")
                .header(AUTHORIZATION, good)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let bad = format!("Basic {}", STANDARD.encode("bob@example.com:nope"));
        let response = send(
            &app,
            Request::get("/api/v1/users/me")
                .header(AUTHORIZATION, bad)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // No session support behind basic auth
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth_session/login",
                serde_json::json!({"email": "bob@example.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (app, _) = session_app().await;

        let response = send(
            &app,
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_cookie_scheme_uses_configured_name() {
        logging::init_test();
        let repository = setup_test_db().await;
        let strategy = Arc::new(BasicAuth::new(Arc::new(repository.clone())));
        let auth_config = AuthConfig {
            session_name: "warden_sid".to_string(),
            ..AuthConfig::default()
        };
        let app = app_with_config(repository, strategy, auth_config);

        let response = send(
            &app,
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let scheme = &doc["components"]["securitySchemes"]["session_cookie"];
        assert_eq!(scheme["in"], "cookie");
        assert_eq!(scheme["name"], "warden_sid");
        assert_eq!(doc["components"]["securitySchemes"]["basic_auth"]["scheme"], "basic");
    }
}
