//! Bearer-token authentication middleware for the REST API.
//!
//! Verifies inbound `Authorization: Bearer <jwt>` tokens against the
//! tenant's configured HS256 secret, audience, and issuer. Provisioning
//! and rotation of tokens is out of scope; this module only verifies.

use std::collections::HashSet;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use sieve_core::SieveSettings;

/// The claims this service expects in a verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated subject, used as the `actor` on audit entries.
    pub sub: String,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

/// Authentication configuration, built once from [`SieveSettings`] at
/// startup and shared across requests via an [`axum::Extension`].
#[derive(Clone)]
pub struct AuthConfig {
    /// Whether verification is enforced. Disabled only in tests.
    pub enabled: bool,
    pub secret: String,
    pub audience: String,
    pub issuer: String,
    /// Paths that bypass verification (health checks).
    pub exempt_paths: HashSet<String>,
}

impl AuthConfig {
    /// Build the auth config this process enforces from its settings.
    pub fn from_settings(settings: &SieveSettings) -> Self {
        Self {
            enabled: true,
            secret: settings.jwt_secret.clone(),
            audience: settings.jwt_audience.clone(),
            issuer: settings.jwt_issuer.clone(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        }
    }

    /// An auth config that lets every request through. Used by tests that
    /// exercise the routing layer without minting tokens.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            audience: String::new(),
            issuer: String::new(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        }
    }
}

/// Verify the bearer token on every request except exempt paths, and
/// insert the decoded [`Claims`] into the request's extensions for
/// handlers to read the acting subject from.
pub async fn auth_middleware(
    axum::Extension(config): axum::Extension<AuthConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !config.enabled {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if config.exempt_paths.contains(path) {
        return next.run(request).await;
    }

    let token = match extract_bearer_token(&request) {
        Some(token) => token,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "missing bearer token",
            )
                .into_response()
        }
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&config.audience]);
    validation.set_issuer(&[&config.issuer]);

    match decode::<Claims>(
        &token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            request.extensions_mut().insert(data.claims);
            next.run(request).await
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            "invalid or expired bearer token",
        )
            .into_response(),
    }
}

fn extract_bearer_token(request: &Request<Body>) -> Option<String> {
    let header_value = request.headers().get(header::AUTHORIZATION)?;
    let header_str = header_value.to_str().ok()?;
    header_str.strip_prefix("Bearer ").map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "ok"
    }

    fn test_router(config: AuthConfig) -> Router {
        Router::new()
            .route("/scoreInvoice", get(test_handler))
            .route("/healthz", get(test_handler))
            .layer(middleware::from_fn(auth_middleware))
            .layer(axum::Extension(config))
    }

    fn token(secret: &str, aud: &str, iss: &str, exp: usize) -> String {
        #[derive(Serialize)]
        struct RawClaims<'a> {
            sub: &'a str,
            aud: &'a str,
            iss: &'a str,
            exp: usize,
        }
        encode(
            &Header::new(Algorithm::HS256),
            &RawClaims { sub: "tester", aud, iss, exp },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn auth_disabled_lets_requests_through() {
        let router = test_router(AuthConfig::disabled());
        let request = Request::builder().uri("/scoreInvoice").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn exempt_path_bypasses_verification() {
        let config = AuthConfig {
            enabled: true,
            secret: "s".to_string(),
            audience: "a".to_string(),
            issuer: "i".to_string(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        };
        let router = test_router(config);
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_token_is_accepted() {
        let config = AuthConfig {
            enabled: true,
            secret: "topsecret".to_string(),
            audience: "invoice.sieve".to_string(),
            issuer: "local.sieve".to_string(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        };
        let router = test_router(config);
        let jwt = token("topsecret", "invoice.sieve", "local.sieve", 9_999_999_999);
        let request = Request::builder()
            .uri("/scoreInvoice")
            .header(header::AUTHORIZATION, format!("Bearer {jwt}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let config = AuthConfig {
            enabled: true,
            secret: "s".to_string(),
            audience: "a".to_string(),
            issuer: "i".to_string(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        };
        let router = test_router(config);
        let request = Request::builder().uri("/scoreInvoice").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let config = AuthConfig {
            enabled: true,
            secret: "topsecret".to_string(),
            audience: "invoice.sieve".to_string(),
            issuer: "local.sieve".to_string(),
            exempt_paths: HashSet::from(["/healthz".to_string()]),
        };
        let router = test_router(config);
        let jwt = token("wrong", "invoice.sieve", "local.sieve", 9_999_999_999);
        let request = Request::builder()
            .uri("/scoreInvoice")
            .header(header::AUTHORIZATION, format!("Bearer {jwt}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
