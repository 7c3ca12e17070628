//! Operator session auth: bcrypt-checked login, cookie sessions in Postgres,
//! and an audit trail in `user_logs`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

const SESSION_COOKIE: &str = "session_id";
const REMEMBER_SECONDS: i64 = 604_800;
const DEFAULT_SECONDS: i64 = 86_400;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

/// POST /api/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(login): Json<LoginRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let client_ip = client_ip(&headers);

    let user: Option<User> = sqlx::query_as(
        "SELECT user_id, email, password_hash, created_at
         FROM contract_pkwt.users WHERE email = $1",
    )
    .bind(&login.email)
    .fetch_optional(&state.db)
    .await?;
    let user = user.ok_or(AppError::Unauthorized)?;

    let password_ok = bcrypt::verify(&login.password, &user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt: {e}")))?;
    if !password_ok {
        log_user_action(
            &state.db,
            user.user_id,
            "failed_login",
            client_ip.as_deref(),
            Some(&format!("Failed login attempt for {}", user.email)),
        )
        .await;
        return Err(AppError::Unauthorized);
    }

    let session_id = Uuid::new_v4().to_string();
    let lifetime_seconds = session_lifetime_seconds(login.remember);

    // Expiry is written and checked on the database clock, so the API
    // host's timezone never shortens or stretches a session.
    sqlx::query(
        "INSERT INTO contract_pkwt.user_sessions (session_id, user_id, expires_at)
         VALUES ($1, $2, NOW() + make_interval(secs => $3))",
    )
    .bind(&session_id)
    .bind(user.user_id)
    .bind(lifetime_seconds as f64)
    .execute(&state.db)
    .await?;

    log_user_action(
        &state.db,
        user.user_id,
        "login",
        client_ip.as_deref(),
        Some(&format!("Successful login for {}", user.email)),
    )
    .await;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(lifetime_seconds))
        .build();

    Ok((jar.add(cookie), Json(json!({"message": "Login successful"}))))
}

/// POST /api/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let session_id = cookie.value().to_string();

        if let Some(user) = current_user(&state.db, &session_id).await? {
            log_user_action(
                &state.db,
                user.user_id,
                "logout",
                client_ip(&headers).as_deref(),
                Some(&format!("Logout for {}", user.email)),
            )
            .await;
        }

        sqlx::query("DELETE FROM contract_pkwt.user_sessions WHERE session_id = $1")
            .bind(&session_id)
            .execute(&state.db)
            .await?;
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    Ok((jar, Json(json!({"message": "Logged out"}))))
}

/// Resolves a session cookie to its user, ignoring expired sessions.
pub async fn current_user(db: &PgPool, session_id: &str) -> Result<Option<User>, AppError> {
    let user: Option<User> = sqlx::query_as(
        "SELECT u.user_id, u.email, u.password_hash, u.created_at
         FROM contract_pkwt.users u
         JOIN contract_pkwt.user_sessions s ON u.user_id = s.user_id
         WHERE s.session_id = $1 AND s.expires_at > NOW()",
    )
    .bind(session_id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Appends to the audit log. Auditing never fails the request.
pub async fn log_user_action(
    db: &PgPool,
    user_id: i32,
    action: &str,
    ip_address: Option<&str>,
    details: Option<&str>,
) {
    let result = sqlx::query(
        "INSERT INTO contract_pkwt.user_logs (user_id, action, ip_address, details)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(action)
    .bind(ip_address)
    .bind(details)
    .execute(db)
    .await;
    if let Err(err) = result {
        warn!("audit log write failed for user {user_id} ({action}): {err}");
    }
}

fn session_lifetime_seconds(remember: bool) -> i64 {
    if remember {
        REMEMBER_SECONDS
    } else {
        DEFAULT_SECONDS
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 172.16.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_client_ip_absent_header() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn test_remember_me_extends_session_lifetime() {
        assert_eq!(session_lifetime_seconds(false), 86_400);
        assert_eq!(session_lifetime_seconds(true), 604_800);
    }
}
