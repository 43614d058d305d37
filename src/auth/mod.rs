// Login resolution: credential cookie -> AuthContext.
use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by the signed cookie token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Membership flag. Tokens minted before the flag existed omit it; the
    /// gate treats that the same as `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<bool>,
    pub exp: usize,
}

/// Per-request authentication context. Read-only downstream of the resolver.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub is_authenticated: bool,
    /// `None` when the resolver could not determine membership at all.
    pub is_member: Option<bool>,
    pub user_identity: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            is_member: None,
            user_identity: None,
        }
    }

    /// The gate check: only an explicit `true` grants access.
    pub fn member(&self) -> bool {
        self.is_member.unwrap_or(false)
    }
}

/// Maps a request to an AuthContext. Never fails: a missing or invalid
/// credential yields the anonymous context.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> AuthContext;
}

/// Production resolver: reads the configured cookie and validates its HMAC
/// claims token.
pub struct CookieAuthResolver {
    cookie_name: String,
    decoding_key: DecodingKey,
}

impl CookieAuthResolver {
    pub fn new(cookie_name: impl Into<String>, secret: &str) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get("cookie")?.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
    }
}

#[async_trait]
impl AuthResolver for CookieAuthResolver {
    async fn resolve(&self, headers: &HeaderMap) -> AuthContext {
        let Some(token) = self.cookie_value(headers) else {
            return AuthContext::anonymous();
        };

        match decode::<Claims>(&token, &self.decoding_key, &Validation::default()) {
            Ok(data) => AuthContext {
                is_authenticated: true,
                is_member: data.claims.member,
                user_identity: Some(data.claims.sub),
            },
            Err(e) => {
                tracing::debug!("rejected credential cookie: {}", e);
                AuthContext::anonymous()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(member: Option<bool>) -> String {
        let claims = Claims {
            sub: "staff@example.com".to_string(),
            member,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", cookie.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn missing_cookie_is_anonymous() {
        let resolver = CookieAuthResolver::new("session", SECRET);
        let ctx = resolver.resolve(&HeaderMap::new()).await;
        assert!(!ctx.is_authenticated);
        assert_eq!(ctx.is_member, None);
        assert!(!ctx.member());
    }

    #[tokio::test]
    async fn garbage_cookie_is_anonymous_not_an_error() {
        let resolver = CookieAuthResolver::new("session", SECRET);
        let headers = headers_with_cookie("session=not-a-token");
        let ctx = resolver.resolve(&headers).await;
        assert!(!ctx.is_authenticated);
        assert!(!ctx.member());
    }

    #[tokio::test]
    async fn member_token_resolves_membership() {
        let resolver = CookieAuthResolver::new("session", SECRET);
        let headers = headers_with_cookie(&format!("other=1; session={}", token(Some(true))));
        let ctx = resolver.resolve(&headers).await;
        assert!(ctx.is_authenticated);
        assert_eq!(ctx.is_member, Some(true));
        assert_eq!(ctx.user_identity.as_deref(), Some("staff@example.com"));
    }

    #[tokio::test]
    async fn token_without_member_claim_does_not_grant_access() {
        let resolver = CookieAuthResolver::new("session", SECRET);
        let headers = headers_with_cookie(&format!("session={}", token(None)));
        let ctx = resolver.resolve(&headers).await;
        assert!(ctx.is_authenticated);
        assert_eq!(ctx.is_member, None);
        assert!(!ctx.member());
    }
}
