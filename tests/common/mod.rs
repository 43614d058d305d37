// Shared harness: the assembled router over injected test collaborators.
// No database and no network; requests are driven through the router with
// tower's oneshot.
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::util::ServiceExt;

use admin_crud::auth::{Claims, CookieAuthResolver};
use admin_crud::render::ShellRenderer;
use admin_crud::storage::MemoryStore;
use admin_crud::views::{admin_router, AppState};

pub const SECRET: &str = "integration-test-secret";
pub const COOKIE_NAME: &str = "admin_session";

pub fn test_app() -> Router {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        renderer: Arc::new(ShellRenderer),
        resolver: Arc::new(CookieAuthResolver::new(COOKIE_NAME, SECRET)),
    };
    admin_router(state)
}

fn cookie_for(member: Option<bool>) -> String {
    let claims = Claims {
        sub: "staff@example.com".to_string(),
        member,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encoding");
    format!("{}={}", COOKIE_NAME, token)
}

pub fn member_cookie() -> String {
    cookie_for(Some(true))
}

pub fn non_member_cookie() -> String {
    cookie_for(Some(false))
}

pub fn flagless_cookie() -> String {
    cookie_for(None)
}

pub async fn request(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    form_body: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match form_body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    app.clone().oneshot(request).await.expect("response")
}

/// Request with an arbitrary content type, for submissions that are not
/// well-formed forms.
pub async fn raw_request(
    app: &Router,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    content_type: &str,
    body: &str,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).expect("request");
    app.clone().oneshot(request).await.expect("response")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

/// Asserts the response is a rendered page for the given template and
/// returns its body.
pub async fn expect_template(
    response: Response<Body>,
    template: &str,
    status: StatusCode,
) -> String {
    assert_eq!(response.status(), status);
    let body = body_string(response).await;
    assert!(
        body.contains(&format!("data-template=\"{}\"", template)),
        "expected template {} in body: {}",
        template,
        body
    );
    body
}

/// Convenience: POST a form as a member and return the response.
pub async fn member_post(app: &Router, path: &str, form: &str) -> Response<Body> {
    let cookie = member_cookie();
    request(app, "POST", path, Some(&cookie), Some(form)).await
}

pub async fn member_get(app: &Router, path: &str) -> Response<Body> {
    let cookie = member_cookie();
    request(app, "GET", path, Some(&cookie), None).await
}
