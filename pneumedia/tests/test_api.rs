use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pneumedia::api::media_api_router;
use pneumedia::{PlaylistItem, PlaylistStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> Router {
    media_api_router(PlaylistStore::in_memory().unwrap())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_playlist_crud() {
    let router = setup();

    let (status, body) = send(
        &router,
        json_request(
            "POST",
            "/playlist",
            json!({"kind": "image", "source": "/media/promo.jpg", "duration_secs": 8}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item: PlaylistItem = serde_json::from_value(body).unwrap();
    assert_eq!(item.min_interval_minutes, 0);

    let (status, body) = send(
        &router,
        json_request(
            "PUT",
            &format!("/playlist/{}", item.id),
            json!({"kind": "video", "source": "/media/promo.mp4", "min_interval_minutes": 5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "video");
    assert_eq!(body["min_interval_minutes"], 5);

    let (status, body) = send(
        &router,
        Request::get("/playlist").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/playlist/{}", item.id);
    let (status, _) = send(
        &router,
        Request::delete(uri.as_str()).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &router,
        Request::delete(uri.as_str()).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_item_is_rejected() {
    let router = setup();
    let (status, body) = send(
        &router,
        json_request("POST", "/playlist", json!({"kind": "image", "source": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");
}
