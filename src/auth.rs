//! Admin authentication: argon2 password hashes and cookie-backed sessions.

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::Payload,
    web, FromRequest, HttpRequest,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::database::Database;
use crate::error::ApiError;
use crate::models::AdminPrincipal;

pub const SESSION_COOKIE: &str = "admin_session";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Returns false for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            log::warn!("Stored password hash could not be parsed: {err}");
            false
        }
    }
}

pub fn session_cookie(token: Uuid, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(ttl_hours))
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

fn session_token(req: &HttpRequest) -> Option<Uuid> {
    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Extractor gating admin-only routes. Rejects with 401 when the cookie is
/// missing, malformed, unknown or expired.
pub struct AdminSession(pub AdminPrincipal);

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = session_token(req);
        let db = req.app_data::<web::Data<Database>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| ApiError::Unauthorized("Login required".into()))?;
            let db = db.ok_or_else(|| ApiError::Internal("Database not configured".into()))?;

            match db.find_session(token).await? {
                Some(principal) => Ok(AdminSession(principal)),
                None => Err(ApiError::Unauthorized("Session expired or invalid".into())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("Ha$h3d01").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Ha$h3d01", &hash));
        assert!(!verify_password("wrongpassword", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "plain-text-password"));
    }

    #[test]
    fn session_token_is_read_from_cookie() {
        let token = Uuid::new_v4();
        let req = TestRequest::default()
            .cookie(session_cookie(token, 1))
            .to_http_request();
        assert_eq!(session_token(&req), Some(token));

        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "not-a-uuid"))
            .to_http_request();
        assert_eq!(session_token(&req), None);
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = expired_session_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }
}
