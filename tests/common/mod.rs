//! In-process fake of every upstream provider, with per-endpoint call counters

#![allow(dead_code)]

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use travelcrew::config::{AmadeusConfig, ExchangeConfig, LlmConfig, PlacesConfig};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const API_KEY: &str = "test-key";

#[derive(Default)]
pub struct Counters {
    pub token: AtomicUsize,
    pub flights: AtomicUsize,
    pub hotel_list: AtomicUsize,
    pub hotel_offers: AtomicUsize,
    pub text_search: AtomicUsize,
    pub nearby: AtomicUsize,
    pub details: AtomicUsize,
    pub exchange: AtomicUsize,
    pub chat: AtomicUsize,
}

pub struct FakeState {
    pub calls: Counters,
    /// `expires_in` handed out by the token endpoint
    pub token_ttl: AtomicI64,
    /// User prompts received by the chat endpoint, in order
    pub prompts: Mutex<Vec<String>>,
}

type Shared = Arc<FakeState>;

pub struct FakeProviders {
    pub base_url: String,
    pub state: Shared,
}

impl FakeProviders {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState {
            calls: Counters::default(),
            token_ttl: AtomicI64::new(1799),
            prompts: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/security/oauth2/token", post(token))
            .route("/v2/shopping/flight-offers", get(flight_offers))
            .route("/v1/reference-data/locations/hotels/by-city", get(hotels_by_city))
            .route("/v3/shopping/hotel-offers", get(hotel_offers))
            .route("/maps/api/place/textsearch/json", get(text_search))
            .route("/maps/api/place/nearbysearch/json", get(nearby_search))
            .route("/maps/api/place/details/json", get(place_details))
            .route("/v6/{key}/pair/{from}/{to}/{amount}", get(pair))
            .route("/v1/chat/completions", post(chat))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn count(&self, counter: impl Fn(&Counters) -> &AtomicUsize) -> usize {
        counter(&self.state.calls).load(Ordering::SeqCst)
    }

    pub fn set_token_ttl(&self, seconds: i64) {
        self.state.token_ttl.store(seconds, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    pub fn amadeus(&self) -> AmadeusConfig {
        AmadeusConfig {
            client_id: Some(CLIENT_ID.into()),
            client_secret: Some(CLIENT_SECRET.into()),
            base_url: self.base_url.clone(),
            ..AmadeusConfig::default()
        }
    }

    pub fn places(&self) -> PlacesConfig {
        PlacesConfig {
            api_key: Some(API_KEY.into()),
            base_url: self.base_url.clone(),
            ..PlacesConfig::default()
        }
    }

    pub fn exchange(&self) -> ExchangeConfig {
        ExchangeConfig {
            api_key: Some(API_KEY.into()),
            base_url: self.base_url.clone(),
            ..ExchangeConfig::default()
        }
    }

    pub fn llm(&self) -> LlmConfig {
        LlmConfig {
            api_key: Some(API_KEY.into()),
            base_url: format!("{}/v1", self.base_url),
            ..LlmConfig::default()
        }
    }
}

type Reply = (StatusCode, Json<Value>);

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer token-"))
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"errors": [{"title": "Invalid access token"}]})),
    )
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Reply {
    let n = state.calls.token.fetch_add(1, Ordering::SeqCst) + 1;
    let valid = form.get("grant_type").map(String::as_str) == Some("client_credentials")
        && form.get("client_id").map(String::as_str) == Some(CLIENT_ID)
        && form.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET);
    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client", "error_description": "Client credentials are invalid"})),
        );
    }
    ok(json!({
        "type": "amadeusOAuth2Token",
        "access_token": format!("token-{n}"),
        "expires_in": state.token_ttl.load(Ordering::SeqCst),
    }))
}

fn segment(carrier: &str, number: &str, departs: &str, arrives: &str) -> Value {
    json!({
        "carrierCode": carrier,
        "number": number,
        "departure": {"at": departs},
        "arrival": {"at": arrives}
    })
}

async fn flight_offers(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Reply {
    state.calls.flights.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    match q.get("destinationLocationCode").map(String::as_str) {
        // No availability on this route
        Some("FUK") => ok(json!({"meta": {"count": 0}, "data": []})),
        Some("OSA") => ok(json!({"data": [
            {"price": {"total": "245000", "currency": "KRW"},
             "itineraries": [{"segments": [
                segment("KE", "723", "2025-04-25T08:00:00", "2025-04-25T09:45:00")
             ]}]},
            {"price": {"total": "1", "currency": "KRW"},
             "itineraries": [{"segments": []}]},
            {"price": {"total": "198000", "currency": "KRW"},
             "itineraries": [{"segments": [
                segment("7C", "1301", "2025-04-25T11:00:00", "2025-04-25T12:00:00"),
                segment("7C", "1302", "2025-04-25T13:00:00", "2025-04-25T14:10:00")
             ]}]}
        ]})),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"errors": [{"title": "INVALID FORMAT"}]})),
        ),
    }
}

async fn hotels_by_city(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Reply {
    state.calls.hotel_list.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    match q.get("cityCode").map(String::as_str) {
        Some("TYO") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"errors": [{"title": "SYSTEM ERROR HAS OCCURRED"}]})),
        ),
        Some("FUK") => ok(json!({"data": []})),
        Some("SPK") => ok(json!({"meta": {"count": 0}})),
        Some(_) => {
            let hotels: Vec<Value> = (1..=12)
                .map(|i| json!({"hotelId": format!("H{i:02}"), "name": format!("Hotel {i}")}))
                .collect();
            ok(json!({"data": hotels}))
        }
        None => (StatusCode::BAD_REQUEST, Json(json!({}))),
    }
}

async fn hotel_offers(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Reply {
    state.calls.hotel_offers.fetch_add(1, Ordering::SeqCst);
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let id = q.get("hotelIds").cloned().unwrap_or_default();
    match id.as_str() {
        "H02" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"errors": [{"title": "NO ROOMS AVAILABLE AT REQUESTED PROPERTY"}]})),
        ),
        "H03" => ok(json!({"data": []})),
        _ => ok(json!({"data": [{
            "hotel": {"hotelId": id, "name": format!("Hotel {id}")},
            "offers": [{
                "checkInDate": q.get("checkInDate"),
                "room": {"description": {"text": "Standard double room"}},
                "price": {"currency": "JPY", "total": "18000.00"}
            }]
        }]})),
    }
}

fn key_ok(q: &HashMap<String, String>) -> bool {
    q.get("key").map(String::as_str) == Some(API_KEY)
}

async fn text_search(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Reply {
    state.calls.text_search.fetch_add(1, Ordering::SeqCst);
    if !key_ok(&q) {
        return ok(json!({"status": "REQUEST_DENIED", "results": []}));
    }
    if q.get("query").map(String::as_str) == Some("아무데도없는곳") {
        return ok(json!({"status": "ZERO_RESULTS", "results": []}));
    }
    ok(json!({"status": "OK", "results": [
        {"place_id": "origin", "geometry": {"location": {"lat": 34.6873, "lng": 135.5262}}}
    ]}))
}

async fn nearby_search(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Reply {
    state.calls.nearby.fetch_add(1, Ordering::SeqCst);
    if !key_ok(&q) || q.get("type").map(String::as_str) != Some("tourist_attraction") {
        return ok(json!({"status": "INVALID_REQUEST", "results": []}));
    }
    // A radius of 1 m makes the second hit unresolvable.
    let ids: Vec<String> = if q.get("radius").map(String::as_str) == Some("1") {
        vec!["P1".into(), "GONE".into(), "P3".into()]
    } else {
        (1..=8).map(|i| format!("P{i}")).collect()
    };
    let results: Vec<Value> = ids.iter().map(|id| json!({"place_id": id})).collect();
    ok(json!({"status": "OK", "results": results}))
}

async fn place_details(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Reply {
    state.calls.details.fetch_add(1, Ordering::SeqCst);
    let id = q.get("place_id").cloned().unwrap_or_default();
    if !key_ok(&q) || id == "GONE" {
        return ok(json!({"status": "NOT_FOUND"}));
    }
    ok(json!({"status": "OK", "result": {
        "name": format!("Attraction {id}"),
        "rating": 4.4,
        "formatted_address": "Osaka, Japan",
        "opening_hours": {"weekday_text": ["Monday: 9:00 AM - 5:00 PM"]},
        "reviews": [
            {"text": "great", "rating": 5},
            {"text": "good", "rating": 4},
            {"text": "fine", "rating": 3},
            {"text": "crowded", "rating": 2}
        ]
    }}))
}

async fn pair(
    State(state): State<Shared>,
    Path((key, from, to, amount)): Path<(String, String, String, String)>,
) -> Reply {
    state.calls.exchange.fetch_add(1, Ordering::SeqCst);
    if key != API_KEY {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"result": "error", "error-type": "invalid-key"})),
        );
    }
    if to == "XXX" {
        return ok(json!({"result": "error", "error-type": "unsupported-code"}));
    }
    let Ok(amount) = amount.parse::<f64>() else {
        return (StatusCode::NOT_FOUND, Json(json!({"result": "error"})));
    };
    let rate = 0.1077;
    ok(json!({
        "result": "success",
        "base_code": from,
        "target_code": to,
        "conversion_rate": rate,
        "conversion_result": amount * rate
    }))
}

async fn chat(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let n = state.calls.chat.fetch_add(1, Ordering::SeqCst) + 1;
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {API_KEY}")[..]);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad key"}})));
    }
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
    state.prompts.lock().unwrap().push(prompt);
    ok(json!({
        "id": format!("chatcmpl-{n}"),
        "choices": [{"index": 0, "message": {"role": "assistant", "content": format!("# Stage {n} output")}}]
    }))
}
