mod common;

use axum::http::{Method, StatusCode};
use common::{ADMIN_KEY, test_app, test_app_with};
use serde_json::json;
use storage::models::{CompletedAnalysis, NewOpponentRating};
use storage::repository::AnalysisRepository;
use storage::services::ranking::compute_ranking;
use uuid::Uuid;
use web::payment::PaymentPolicy;

async fn complete(store: &storage::memory::InMemoryStore, id: &str) {
    let id: Uuid = id.parse().unwrap();
    store.begin_processing(id).await.unwrap();
    let ratings = [1600, 1500, 1400, 1300];
    store
        .complete(
            id,
            &CompletedAnalysis {
                user_current_rating: 1500,
                ranking: compute_ranking(1500, &ratings).unwrap(),
                opponents: ratings
                    .iter()
                    .enumerate()
                    .map(|(i, rating)| NewOpponentRating {
                        opponent_handle: format!("opponent{i}"),
                        current_rating: *rating,
                    })
                    .collect(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn analyses_require_a_session() {
    let app = test_app();

    let (status, _) = app.request(Method::GET, "/api/analyses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/analyses", "not-a-session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn short_handles_are_rejected() {
    let app = test_app();
    let token = app.register("carlsen").await;

    for handle in ["ab", "  ab  "] {
        let (status, body) = app
            .post(
                "/api/analyses",
                &token,
                json!({"chess_handle": handle, "end_date": "2024-06-30", "game_mode": "blitz"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
    }
    assert_eq!(app.store.queued(), 0);
}

#[tokio::test]
async fn created_analysis_is_pending_and_queued() {
    let app = test_app();
    let token = app.register("carlsen").await;

    let (status, body) = app
        .post(
            "/api/analyses",
            &token,
            json!({"chess_handle": " abc ", "end_date": "2024-06-30", "game_mode": "rapid"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["chess_handle"], "abc");
    assert_eq!(body["game_mode"], "rapid");
    assert_eq!(body["end_date"], "2024-06-30");
    assert_eq!(body["message"], "Analysis created successfully!");
    assert_eq!(app.store.queued(), 1);

    let id = body["analysis_id"].as_str().unwrap();
    let (status, detail) = app.get(&format!("/api/analyses/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["progress"], 0);
    assert!(detail["percentile"].is_null());
    assert!(detail["user_current_rating"].is_null());
    assert_eq!(detail["opponent_ratings"], json!([]));
}

#[tokio::test]
async fn list_is_scoped_to_owner_and_newest_first() {
    let app = test_app();
    let alice = app.register("alice").await;
    let bob = app.register("bobby").await;

    let first = app.submit(&alice, "hikaru").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.submit(&alice, "magnus").await;
    app.submit(&bob, "firouzja").await;

    let (status, body) = app.get("/api/analyses", &alice).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["analysis_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn other_users_analyses_are_not_found() {
    let app = test_app();
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;
    let id = app.submit(&alice, "hikaru").await;

    for suffix in ["", "/status", "/opponents"] {
        let (status, _) = app.get(&format!("/api/analyses/{id}{suffix}"), &mallory).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "suffix {suffix:?}");
    }

    let (_, body) = app.get("/api/analyses", &mallory).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn status_reports_progress() {
    let app = test_app();
    let token = app.register("carlsen").await;
    let id = app.submit(&token, "hikaru").await;
    let uri = format!("/api/analyses/{id}/status");

    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["chess_handle"], "hikaru");
    assert_eq!(body["game_mode"], "blitz");
    assert!(body.get("opponent_ratings").is_none());

    let uuid: Uuid = id.parse().unwrap();
    app.store.begin_processing(uuid).await.unwrap();
    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["status"], "processing");
    let processing = body["progress"].as_u64().unwrap();
    assert!(processing > 0 && processing < 100);

    app.store.fail(uuid, "no comparable opponents").await.unwrap();
    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["error_message"], "no comparable opponents");
    assert!(!body["completed_at"].is_null());
}

#[tokio::test]
async fn completed_analysis_exposes_ranking_and_opponents() {
    let app = test_app();
    let token = app.register("carlsen").await;
    let id = app.submit(&token, "hikaru").await;
    complete(&app.store, &id).await;

    let (status, body) = app.get(&format!("/api/analyses/{id}/opponents"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_opponents"], 4);
    assert_eq!(body["user_rating"], 1500);
    assert_eq!(body["user_position"], 2);
    assert_eq!(body["percentile"], 75.0);
    assert_eq!(body["opponents"].as_array().unwrap().len(), 4);
    assert_eq!(body["opponents"][0]["current_rating"], 1600);

    let (_, detail) = app.get(&format!("/api/analyses/{id}"), &token).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["progress"], 100);
    assert_eq!(detail["opponent_ratings"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unpaid_results_are_withheld_when_payment_is_required() {
    let app = test_app_with(PaymentPolicy::RequirePaid);
    let token = app.register("carlsen").await;
    let id = app.submit(&token, "hikaru").await;
    complete(&app.store, &id).await;
    let uri = format!("/api/analyses/{id}/opponents");

    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["results_withheld"], true);
    assert!(body["percentile"].is_null());
    assert!(body["opponents"].is_null());
    assert!(body["user_position"].is_null());
    assert!(body["total_opponents"].is_null());
    assert_eq!(body["user_rating"], 1500);

    let (_, detail) = app.get(&format!("/api/analyses/{id}"), &token).await;
    assert_eq!(detail["results_withheld"], true);
    assert!(detail["percentile"].is_null());
    assert!(detail["user_position_in_ranking"].is_null());
    assert!(detail["total_opponents"].is_null());
    assert!(detail["opponent_ratings"].is_null());

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/admin/analyses/{id}/payment"),
            Some(ADMIN_KEY),
            Some(json!({"payment_reference": "pi_123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["results_withheld"], false);
    assert_eq!(body["percentile"], 75.0);
    assert_eq!(body["user_position"], 2);
    assert_eq!(body["total_opponents"], 4);
    assert_eq!(body["opponents"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn results_are_visible_when_payment_is_not_required() {
    let app = test_app();
    let token = app.register("carlsen").await;
    let id = app.submit(&token, "hikaru").await;
    complete(&app.store, &id).await;

    let (_, body) = app.get(&format!("/api/analyses/{id}"), &token).await;
    assert_eq!(body["is_paid"], false);
    assert_eq!(body["results_withheld"], false);
    assert_eq!(body["percentile"], 75.0);
}
