//! Authentication and role gating through the HTTP router.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use tower::ServiceExt;

use sneakersku_api::middleware::{InterceptorChain, authenticate, enforce, require_role};
use sneakersku_core::Role;
use sneakersku_integration_tests::{ADMIN_TOKEN, TestContext, USER_1_TOKEN, error_code};

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let ctx = TestContext::new();

    let (status, body) = ctx.request(Method::GET, "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
    assert_eq!(body["error"]["status"], 401);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .request(Method::GET, "/orders", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthenticated() {
    let ctx = TestContext::new();
    let request = Request::get("/cart")
        .header(header::AUTHORIZATION, format!("Basic {USER_1_TOKEN}"))
        .body(Body::empty())
        .unwrap();

    let response = ctx.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthenticated_request_never_touches_cart() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .request(
            Method::POST,
            "/cart/items",
            None,
            Some(serde_json::json!({ "shoe_id": 1, "variant_key": "42-red", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(ctx.orders.orders().is_empty());
}

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let ctx = TestContext::new();

    let (status, _) = ctx.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let ctx = TestContext::new();
    let request = Request::get("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();

    let response = ctx.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_role_interceptor_forbids_other_roles() {
    let ctx = TestContext::new();
    let staff_only = InterceptorChain::new().then(require_role(&[Role::Admin]));
    let router: Router = Router::new()
        .route("/staff", get(|| async { "ok" }))
        .route_layer(from_fn_with_state(staff_only, enforce))
        .route_layer(from_fn_with_state(ctx.state.clone(), authenticate))
        .with_state(ctx.state.clone());

    let call = |token: &'static str| {
        let router = router.clone();
        async move {
            let request = Request::get("/staff")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap();
            let response = router.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, bytes)
        }
    };

    let (status, bytes) = call(USER_1_TOKEN).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error_code(&body), "FORBIDDEN");
    assert_eq!(
        body["error"]["message"],
        "Insufficient permissions to access this resource"
    );

    let (status, _) = call(ADMIN_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
}
