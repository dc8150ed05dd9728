use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
};

/// Name of the cookie carrying the signed admin session token.
pub const SESSION_COOKIE: &str = "admin_session";

/// Session lifetime: seven days.
const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims
///
/// Payload of the admin session JWT stored in the `admin_session` cookie.
/// The token is signed with the server's session secret and validated on
/// every admin request; there is no per-user identity, only the single
/// admin role.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: always "admin".
    pub sub: String,
    /// Expiration timestamp; tokens past this are rejected.
    pub exp: usize,
    /// Issued-at timestamp.
    pub iat: usize,
}

/// AdminSession
///
/// The resolved identity of an authenticated admin request. Handlers take
/// this as an argument; the extractor rejects with 401 before the handler
/// runs if verification fails. The business layer treats this as an opaque
/// boolean gate and never sees the verification mechanism.
#[derive(Debug, Clone)]
pub struct AdminSession {
    /// When the session token was issued (unix seconds).
    pub issued_at: usize,
}

/// AdminSession Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AdminSession usable as a
/// function argument in any admin handler and inside the admin middleware.
///
/// The process:
/// 1. Dependency Resolution: pull AppConfig from the application state.
/// 2. Local Bypass: in `Env::Local`, an `x-admin-token` header matching the
///    configured admin password grants a session. Guarded by the Env check,
///    so it is inert in production.
/// 3. Cookie Verification: locate the `admin_session` cookie and validate
///    the JWT signature and expiry.
///
/// Rejection: `ApiError::Unauthorized` (HTTP 401) on any failure.
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Local development bypass.
        if config.env == Env::Local {
            if let Some(token) = parts.headers.get("x-admin-token") {
                if token.to_str().is_ok_and(|t| t == config.admin_password) {
                    return Ok(AdminSession {
                        issued_at: Utc::now().timestamp() as usize,
                    });
                }
            }
        }

        let token =
            cookie_value(&parts.headers, SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.session_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(&token, &decoding_key, &validation)
            .map_err(|_| ApiError::Unauthorized)?;

        if token_data.claims.sub != "admin" {
            return Err(ApiError::Unauthorized);
        }

        Ok(AdminSession {
            issued_at: token_data.claims.iat,
        })
    }
}

/// cookie_value
///
/// Pulls a single cookie out of the request's Cookie header. The header is a
/// `name=value` list separated by `"; "`; the first matching name wins.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// issue_session_cookie
///
/// Signs a fresh session token and renders the Set-Cookie value used by the
/// login handler. HttpOnly keeps the token away from scripts, SameSite=Lax
/// pairs with the Origin/Referer CSRF check, and Secure is added outside of
/// local development.
pub fn issue_session_cookie(config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "admin".to_string(),
        iat: now as usize,
        exp: (now + SESSION_TTL_SECS) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("failed to sign session token: {:?}", e);
        ApiError::Unauthorized
    })?;

    Ok(format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE,
        token,
        SESSION_TTL_SECS,
        secure_suffix(config)
    ))
}

/// clear_session_cookie
///
/// Renders the Set-Cookie value that invalidates the admin session (logout).
pub fn clear_session_cookie(config: &AppConfig) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        SESSION_COOKIE,
        secure_suffix(config)
    )
}

fn secure_suffix(config: &AppConfig) -> &'static str {
    match config.env {
        Env::Production => "; Secure",
        Env::Local => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_session=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn issued_cookie_round_trips_through_validation() {
        let config = AppConfig::default();
        let cookie = issue_session_cookie(&config).unwrap();
        let token = cookie
            .strip_prefix("admin_session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();

        let decoding_key = DecodingKey::from_secret(config.session_secret.as_bytes());
        let data = decode::<Claims>(token, &decoding_key, &Validation::default()).unwrap();
        assert_eq!(data.claims.sub, "admin");
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let config = AppConfig::default();
        let cookie = clear_session_cookie(&config);
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("admin_session=;"));
    }
}
