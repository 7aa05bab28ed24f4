mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use flashdeck_api::app;

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let set_id = "00000000-0000-0000-0000-000000000000";
    let routes = [
        (Method::GET, "/sets".to_string()),
        (Method::POST, "/sets".to_string()),
        (Method::GET, format!("/sets/{}", set_id)),
        (Method::PUT, format!("/sets/{}", set_id)),
        (Method::DELETE, format!("/sets/{}", set_id)),
    ];

    for (method, uri) in routes {
        let response = app(common::test_state())
            .oneshot(
                Request::builder()
                    .method(method.clone())
                    .uri(&uri)
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should be rejected",
            method,
            uri
        );
    }
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let response = app(common::test_state())
        .oneshot(
            Request::builder()
                .uri("/sets")
                .header("Token", "garbage")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_rejects_malformed_json() -> Result<()> {
    let response = app(common::test_state())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/users/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_not_found() -> Result<()> {
    let response = app(common::test_state())
        .oneshot(Request::builder().uri("/nope").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
