//! Integration tests for player registration.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_reregistering_replaces_profile() {
    // Arrange
    let state = common::seeded_state().await;
    let body = serde_json::json!({ "group_tag": "Ember Court", "in_game_name": "Renamed" });

    // Act
    let (put_status, _) =
        common::send_json(common::build_test_app(state.clone()), "PUT", "/api/v1/profiles/2", &body)
            .await;
    let (get_status, json) =
        common::get_json(common::build_test_app(state), "/api/v1/profiles/2").await;

    // Assert
    assert_eq!(put_status, StatusCode::OK);
    assert_eq!(get_status, StatusCode::OK);
    assert_eq!(json["in_game_name"], "Renamed");
    assert_eq!(json["group_tag"], "Ember Court");
}

#[tokio::test]
async fn test_blank_guild_is_rejected() {
    let app = common::build_test_app(common::seeded_state().await);
    let body = serde_json::json!({ "group_tag": "  ", "in_game_name": "Aldric" });

    let (status, json) = common::send_json(app, "PUT", "/api/v1/profiles/9", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}
