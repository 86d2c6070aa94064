use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tower::ServiceExt;

use presence_cell::*;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn live_feed() -> (Arc<PresenceFeed>, PresenceHandle) {
    let channel = LocalPresenceChannel::with_roster(vec![
        OnlineSpecialist::new("s1", "Cardiology", "Dr. One"),
        OnlineSpecialist::new("s2", "Dermatology", "Dr. Two"),
        OnlineSpecialist::new("s3", "Cardiology", "Dr. Three"),
    ]);
    let feed = Arc::new(PresenceFeed::new(Arc::new(channel)));
    let handle = feed.connect().await.unwrap();

    for _ in 0..50 {
        if handle.status() == FeedStatus::Live {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(handle.status(), FeedStatus::Live);

    (feed, handle)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn status_is_public() {
    let (feed, _handle) = live_feed().await;
    let app = presence_routes(feed, TestConfig::default().to_arc());

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "live");
    assert_eq!(json["online_count"], 3);
    assert_eq!(json["subscribers"], 1);
    assert_eq!(json["channel"], "local");
}

#[tokio::test]
async fn specialists_require_a_token() {
    let (feed, _handle) = live_feed().await;
    let app = presence_routes(feed, TestConfig::default().to_arc());

    let response = app
        .oneshot(Request::builder().uri("/specialists").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn specialists_filtered_by_category() {
    let (feed, _handle) = live_feed().await;
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(&TestUser::default(), &config.jwt_secret, None);
    let app = presence_routes(feed, config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/specialists?category=Cardiology")
                .header("authorization", JwtTestUtils::bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stale"], false);
    assert_eq!(json["category"], "Cardiology");
    let ids: Vec<&str> = json["specialists"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["s1", "s3"]);
    assert_eq!(json["specialists"][0]["displayName"], "Dr. One");
}
