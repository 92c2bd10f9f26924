use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use war_core::{EventEnvelope, ScoreCard, ScoreCategory, Side};

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let origin = cors_origin
        .parse::<axum::http::HeaderValue>()
        .unwrap_or_else(|_| axum::http::HeaderValue::from_static("http://localhost:5173"));
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/scores", get(scores_handler))
        .route("/api/v1/stream", get(stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let game = &sim.game_state;
    let ships = war_core::registry::live_ship_ids(game).len();
    Json(serde_json::json!({
        "game_id": game.meta.game_id,
        "seed": game.meta.seed,
        "content_version": game.meta.content_version,
        "stardate": game.clock.stardate,
        "sweeps": game.clock.sweeps,
        "now_ms": game.meta.now_ms,
        "ships": ships,
        "romulan_present": game.romulan.actor.is_some(),
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match serde_json::to_string(&sim.game_state) {
        Ok(json) => {
            drop(sim);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

fn card_json(card: &ScoreCard) -> serde_json::Value {
    let categories: serde_json::Map<String, serde_json::Value> = ScoreCategory::ALL
        .iter()
        .map(|c| (c.label().to_string(), card.get(*c).into()))
        .collect();
    serde_json::json!({ "total": card.total(), "categories": categories })
}

pub async fn scores_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    let game = &sim.game_state;
    let sides: serde_json::Map<String, serde_json::Value> = [Side::Federation, Side::Empire]
        .iter()
        .map(|side| (side.to_string(), card_json(&game.ledger.side(*side))))
        .collect();
    let actors: Vec<serde_json::Value> = game
        .actors
        .values()
        .filter_map(|a| {
            let ship = a.ship.as_ref()?;
            let card = game.ledger.actor(a.id);
            Some(serde_json::json!({
                "actor": a.id,
                "name": a.name,
                "ship": ship.name,
                "side": ship.side.to_string(),
                "score": card_json(&card),
            }))
        })
        .collect();
    Json(serde_json::json!({ "sides": sides, "ships": actors }))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let stardate = sim.lock().game_state.clock.stardate;
                    let hb = serde_json::json!({"heartbeat": true, "stardate": stardate});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SimState;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use war_core::test_fixtures::{add_ship, base_content, base_state, make_rng};
    use war_core::Position;

    fn make_test_state() -> AppState {
        let content = base_content();
        let mut state = base_state(&content);
        let lex = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
        add_ship(&mut state, &content, "COBRA", Side::Empire, Position::new(9, 9));
        state
            .ledger
            .credit(Some(lex), Side::Federation, ScoreCategory::EnemiesDestroyed, 5000);
        AppState::new(SimState::new(state, content, make_rng()))
    }

    async fn get_json(app: AppState, uri: &str) -> serde_json::Value {
        let response = make_router(app)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_meta_reports_clock_and_ships() {
        let json = get_json(make_test_state(), "/api/v1/meta").await;
        assert_eq!(json["stardate"], 0);
        assert_eq!(json["ships"], 2);
        assert_eq!(json["romulan_present"], false);
    }

    #[tokio::test]
    async fn test_snapshot_is_valid_json() {
        let json = get_json(make_test_state(), "/api/v1/snapshot").await;
        assert!(json["actors"].is_object());
        assert!(json["planets"].is_array());
    }

    #[tokio::test]
    async fn test_scores_by_side_and_ship() {
        let json = get_json(make_test_state(), "/api/v1/scores").await;
        assert_eq!(json["sides"]["Federation"]["total"], 5000);
        assert_eq!(json["sides"]["Empire"]["total"], 0);
        let ships = json["ships"].as_array().unwrap();
        assert_eq!(ships.len(), 2);
        let lex = ships.iter().find(|s| s["ship"] == "LEXINGTON").unwrap();
        assert_eq!(lex["score"]["total"], 5000);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = make_router(make_test_state())
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
