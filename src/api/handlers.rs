//! HTTP request handlers.

use axum::{
    extract::State,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    Extension, Json,
};

use crate::api::types::*;
use crate::auth::{LoginOutcome, SessionStrategy};
use crate::config::AuthConfig;
use crate::domain::User;
use crate::error::{WardenError, WardenResult};
use crate::AppState;

fn required(value: Option<String>, field: &str) -> WardenResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| WardenError::BadRequest(format!("{} missing", field)))
}

fn session_strategy(state: &AppState) -> WardenResult<&dyn SessionStrategy> {
    state
        .strategy
        .as_session()
        .ok_or_else(|| WardenError::NotFound("Session authentication is not enabled".to_string()))
}

/// Build the `Set-Cookie` value carrying a session id.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    session_id: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        config.session_name, session_id
    );
    if config.session_duration > 0 {
        cookie.push_str(&format!("; Max-Age={}", config.session_duration));
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.session_name
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Liveness check.
///
/// GET /api/v1/status
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
    tag = "health"
)]
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// Register a new user.
///
/// POST /api/v1/users
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "User created", body = RegisterResponse),
        (status = 400, description = "Missing field or email already registered")
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> WardenResult<Json<RegisterResponse>> {
    let email = required(request.email, "email")?;
    let password = required(request.password, "password")?;

    state
        .accounts
        .register_user(&email, &password)
        .await
        .map_err(|e| match e {
            WardenError::BadRequest(_) => {
                WardenError::BadRequest("email already registered".to_string())
            }
            other => other,
        })?;

    Ok(Json(RegisterResponse {
        email,
        message: "user created".to_string(),
    }))
}

/// The authenticated user.
///
/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "No credentials"),
        (status = 403, description = "Invalid credentials")
    ),
    security(("basic_auth" = []), ("session_cookie" = [])),
    tag = "users"
)]
pub async fn current_user(Extension(user): Extension<User>) -> Json<UserInfo> {
    Json(UserInfo::from(&user))
}

/// Log in and receive a session cookie.
///
/// POST /api/v1/auth_session/login
#[utoipa::path(
    post,
    path = "/api/v1/auth_session/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = UserInfo),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No user for this email")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> WardenResult<(HeaderMap, Json<UserInfo>)> {
    let email = required(request.email, "email")?;
    let password = required(request.password, "password")?;
    let sessions = session_strategy(&state)?;

    let user = match state.accounts.login(&email, &password).await? {
        LoginOutcome::Authenticated(user) => user,
        LoginOutcome::NoUser => {
            return Err(WardenError::NotFound(
                "no user found for this email".to_string(),
            ))
        }
        LoginOutcome::WrongPassword => {
            tracing::warn!("Failed login attempt");
            return Err(WardenError::Unauthorized("wrong password".to_string()));
        }
    };

    let session_id = sessions
        .create_session(&user.id.to_string())
        .await?
        .ok_or_else(|| WardenError::Internal("Session was not created".to_string()))?;

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(&state.auth_config, &session_id)
        .map_err(|e| WardenError::Internal(format!("Invalid session cookie: {}", e)))?;
    headers.insert(SET_COOKIE, cookie);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((headers, Json(UserInfo::from(&user))))
}

/// Destroy the current session.
///
/// DELETE /api/v1/auth_session/logout
#[utoipa::path(
    delete,
    path = "/api/v1/auth_session/logout",
    responses(
        (status = 200, description = "Session destroyed"),
        (status = 404, description = "No active session")
    ),
    security(("session_cookie" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> WardenResult<(HeaderMap, Json<serde_json::Value>)> {
    let sessions = session_strategy(&state)?;

    if !sessions.destroy_session(&request_headers).await? {
        return Err(WardenError::NotFound("No active session".to_string()));
    }

    let mut headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&state.auth_config) {
        headers.insert(SET_COOKIE, cookie);
    }

    Ok((headers, Json(serde_json::json!({}))))
}

/// Issue a password reset token.
///
/// POST /api/v1/reset_password
#[utoipa::path(
    post,
    path = "/api/v1/reset_password",
    request_body = ResetTokenRequest,
    responses(
        (status = 200, description = "Reset token issued", body = ResetTokenResponse),
        (status = 403, description = "Unknown email")
    ),
    tag = "users"
)]
pub async fn get_reset_password_token(
    State(state): State<AppState>,
    Json(request): Json<ResetTokenRequest>,
) -> WardenResult<Json<ResetTokenResponse>> {
    let email = request
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| WardenError::Forbidden("email missing".to_string()))?;

    let reset_token = state
        .accounts
        .get_reset_password_token(&email)
        .await
        .map_err(|e| match e {
            WardenError::NotFound(_) => WardenError::Forbidden("unknown email".to_string()),
            other => other,
        })?;

    Ok(Json(ResetTokenResponse { email, reset_token }))
}

/// Set a new password with a reset token.
///
/// PUT /api/v1/reset_password
#[utoipa::path(
    put,
    path = "/api/v1/reset_password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Missing field"),
        (status = 403, description = "Invalid reset token")
    ),
    tag = "users"
)]
pub async fn update_password(
    State(state): State<AppState>,
    Json(request): Json<UpdatePasswordRequest>,
) -> WardenResult<Json<MessageResponse>> {
    let email = required(request.email, "email")?;
    let reset_token = required(request.reset_token, "reset_token")?;
    let new_password = required(request.new_password, "new_password")?;

    state
        .accounts
        .update_password(&reset_token, &new_password)
        .await?;

    Ok(Json(MessageResponse {
        email,
        message: "Password updated".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = AuthConfig::default();
        let cookie = session_cookie(&config, "abc").unwrap();
        assert_eq!(cookie, "_my_session_id=abc; Path=/; HttpOnly; SameSite=Lax");

        config.session_duration = 60;
        config.cookie_secure = true;
        let cookie = session_cookie(&config, "abc").unwrap();
        assert_eq!(
            cookie,
            "_my_session_id=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(required(Some("x".into()), "email").unwrap(), "x");
        assert!(matches!(
            required(Some(String::new()), "email"),
            Err(WardenError::BadRequest(msg)) if msg == "email missing"
        ));
        assert!(required(None, "password").is_err());
    }
}
