use std::sync::Arc;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::NaiveDate;
use provider::{ChessComClient, OpponentResolver, ProviderError, RateLimiter, RatingFetcher};
use serde_json::json;
use storage::models::GameMode;

async fn archives(Path(handle): Path<String>) -> Response {
    match handle.as_str() {
        "hikaru" => Json(json!({
            "archives": [
                "https://api.chess.com/pub/player/hikaru/games/2024/01",
                "https://api.chess.com/pub/player/hikaru/games/2024/02",
                "https://api.chess.com/pub/player/hikaru/games/2024/04"
            ]
        }))
        .into_response(),
        "busy" => StatusCode::TOO_MANY_REQUESTS.into_response(),
        "broken" => StatusCode::BAD_GATEWAY.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn monthly(Path((_handle, year, month)): Path<(String, i32, String)>) -> Response {
    let games = match (year, month.as_str()) {
        (2024, "01") => json!([
            {"white": {"username": "hikaru"}, "black": {"username": "Alice"},
             "time_class": "blitz", "rules": "chess", "end_time": 1704153600},
            {"white": {"username": "Bob"}, "black": {"username": "Hikaru"},
             "time_class": "blitz", "rules": "chess", "end_time": 1704240000}
        ]),
        (2024, "02") => json!([
            {"white": {"username": "alice"}, "black": {"username": "hikaru"},
             "time_class": "blitz", "rules": "chess", "end_time": 1706918400},
            {"white": {"username": "hikaru"}, "black": {"username": "Carol"},
             "time_class": "rapid", "rules": "chess", "end_time": 1706918400}
        ]),
        (2024, "04") => json!([
            {"white": {"username": "hikaru"}, "black": {"username": "Dave"},
             "time_class": "blitz", "rules": "chess", "end_time": 1712275200}
        ]),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "games": games })).into_response()
}

async fn stats(Path(handle): Path<String>) -> Response {
    match handle.as_str() {
        "alice" => Json(json!({"chess_blitz": {"last": {"rating": 1712}}})).into_response(),
        "bob" => Json(json!({"chess_rapid": {"last": {"rating": 1400}}})).into_response(),
        "garbled" => (StatusCode::OK, "<html>").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_provider() -> String {
    let app = Router::new()
        .route("/pub/player/:handle/games/archives", get(archives))
        .route("/pub/player/:handle/games/:year/:month", get(monthly))
        .route("/pub/player/:handle/stats", get(stats));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/pub")
}

async fn client() -> ChessComClient {
    let base_url = spawn_provider().await;
    ChessComClient::new(base_url, Arc::new(RateLimiter::unlimited())).unwrap()
}

#[tokio::test]
async fn resolves_distinct_opponents_up_to_end_date() {
    let client = client().await;
    let end_date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

    let opponents = client
        .resolve_opponents("Hikaru", GameMode::Blitz, end_date)
        .await
        .unwrap();

    assert_eq!(opponents, vec!["alice", "bob"]);
}

#[tokio::test]
async fn unknown_player_is_reported_as_such() {
    let client = client().await;
    let end_date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

    let err = client
        .resolve_opponents("ghost", GameMode::Blitz, end_date)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::UnknownPlayer(ref handle) if handle == "ghost"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn throttling_and_outages_are_transient() {
    let client = client().await;
    let end_date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

    let busy = client
        .resolve_opponents("busy", GameMode::Blitz, end_date)
        .await
        .unwrap_err();
    assert!(matches!(busy, ProviderError::RateLimited));

    let broken = client
        .resolve_opponents("broken", GameMode::Blitz, end_date)
        .await
        .unwrap_err();
    assert!(broken.is_transient());
}

#[tokio::test]
async fn fetches_rating_or_reports_absence() {
    let client = client().await;

    assert_eq!(client.fetch_rating("Alice", GameMode::Blitz).await.unwrap(), Some(1712));
    assert_eq!(client.fetch_rating("bob", GameMode::Blitz).await.unwrap(), None);
    assert_eq!(client.fetch_rating("ghost", GameMode::Blitz).await.unwrap(), None);

    let err = client.fetch_rating("garbled", GameMode::Blitz).await.unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)));
}
