//! Helpers for driving the router in tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Raw `Set-Cookie` header value, attributes included.
pub fn session_cookie_from(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    Some(raw.to_string())
}

/// `name=value` part of a `Set-Cookie` value, ready to send back as `Cookie`.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

/// Signs up and logs in a user, returning the `Cookie` header value for the session.
pub async fn logged_in(app: &Router, email: &str) -> String {
    let res = send(
        app,
        Method::POST,
        "/api/auth/signup",
        Some(json!({
            "firstName": "Sam",
            "lastName": "Seeker",
            "email": email,
            "password": "hunting-for-jobs",
        })),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = send(
        app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": email, "password": "hunting-for-jobs" })),
        None,
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    cookie_pair(&session_cookie_from(&res.headers).expect("session cookie"))
}
