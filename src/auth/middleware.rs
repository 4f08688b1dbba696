//! Authentication middleware for axum.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{requires_auth, AuthStrategy, ExclusionRule};
use crate::domain::AuthResult;

/// Error response for authentication failures.
#[derive(Debug, Serialize)]
pub struct AuthError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    pub code: String,
}

impl AuthError {
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "Unauthorized".to_string(),
            code: "UNAUTHORIZED".to_string(),
        }
    }

    fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "Forbidden".to_string(),
            code: "FORBIDDEN".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Everything the gate needs per request.
#[derive(Clone)]
pub struct GateState {
    pub strategy: Arc<dyn AuthStrategy>,
    pub exclusions: Arc<Vec<ExclusionRule>>,
    pub session_name: String,
}

/// Enforce authentication on every path not excluded by configuration.
///
/// No credential at all gives 401, a credential that does not resolve gives
/// 403. Store outages surface as 500 rather than as a failed login.
pub async fn require_auth(
    State(gate): State<GateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !requires_auth(Some(path.as_str()), Some(gate.exclusions.as_slice())) {
        return next.run(request).await;
    }

    let result = match gate
        .strategy
        .authenticate(request.headers(), &gate.session_name)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            if e.is_infrastructure() {
                tracing::error!(
                    error = %e,
                    strategy = gate.strategy.name(),
                    "Authentication backend failure"
                );
            }
            return e.into_response();
        }
    };

    match result {
        AuthResult::Authenticated(user) => {
            tracing::debug!(user_id = %user.id, path = %path, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        AuthResult::Unauthenticated => AuthError::unauthorized().into_response(),
        AuthResult::Rejected => {
            tracing::warn!(
                path = %path,
                strategy = gate.strategy.name(),
                "Rejected credentials"
            );
            AuthError::forbidden().into_response()
        }
    }
}
