use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// JWT payload. `sub` is the user id; everything else about the user is
/// loaded from storage on each request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Invalid token")]
    Invalid,
    #[error("Token expired")]
    Expired,
}

/// Issues and verifies signed session tokens and the cookie that carries them
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    cookie_days: i64,
    secure_cookie: bool,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration, cookie_days: i64, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            cookie_days,
            secure_cookie,
        }
    }

    /// Sign a token for `user`
    pub fn issue(&self, user: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encoding)
    }

    /// Check signature and expiry, returning the user id
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Add the session cookie for `token` to `jar`
    pub fn set_cookie(&self, jar: CookieJar, token: String) -> CookieJar {
        let cookie = Cookie::build((TOKEN_COOKIE, token))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::days(self.cookie_days));
        jar.add(cookie)
    }

    /// Replace the session cookie with an already expired one
    pub fn expire_cookie(&self, jar: CookieJar) -> CookieJar {
        let cookie = Cookie::build((TOKEN_COOKIE, ""))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::ZERO);
        jar.add(cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(ttl: Duration) -> TokenIssuer {
        TokenIssuer::new("0123456789abcdef0123456789abcdef", ttl, 7, false)
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = issuer(Duration::hours(1));
        let user = Uuid::new_v4();
        let token = tokens.issue(user).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_expired_token() {
        let tokens = issuer(Duration::seconds(-120));
        let token = tokens.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issuer(Duration::hours(1)).issue(Uuid::new_v4()).unwrap();
        let other = TokenIssuer::new("another-secret-another-secret-xx", Duration::hours(1), 7, false);
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
        assert!(matches!(other.verify("garbage"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_cookie_attributes() {
        let tokens = issuer(Duration::hours(1));
        let jar = tokens.set_cookie(CookieJar::new(), "abc".to_string());
        let cookie = jar.get(TOKEN_COOKIE).unwrap();
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_expired_cookie_is_always_sent() {
        let tokens = issuer(Duration::hours(1));
        let jar = tokens.expire_cookie(CookieJar::new());
        let cookie = jar.get(TOKEN_COOKIE).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
