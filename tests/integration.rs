use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use haul_dispatch::api::rest::router;
use haul_dispatch::config::Config;
use haul_dispatch::models::user::{Role, User};
use haul_dispatch::models::vehicle::VehicleType;
use haul_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    state: Arc<AppState>,
    app: axum::Router,
    customer: String,
    driver: String,
    driver_id: String,
}

fn setup_with(config: Config) -> TestApp {
    let state = Arc::new(AppState::new(&config));
    let customer = state
        .users
        .insert(User::new("Asha", "9876543210", Role::Customer));
    let driver = state.users.insert(User::driver(
        "Ravi",
        "9000000001",
        VehicleType::Auto,
        "MP09AB1234",
    ));

    TestApp {
        app: router(state.clone()),
        customer: state.sessions.issue(customer.identity()).to_string(),
        driver: state.sessions.issue(driver.identity()).to_string(),
        driver_id: driver.id.to_string(),
        state,
    }
}

fn setup() -> TestApp {
    setup_with(Config::default())
}

fn add_driver(t: &TestApp, phone: &str, vehicle_type: VehicleType) -> String {
    let driver = t
        .state
        .users
        .insert(User::driver("Extra", phone, vehicle_type, "MP09ZZ0000"));
    t.state.sessions.issue(driver.identity()).to_string()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn booking_body(vehicle_type: &str) -> Value {
    json!({
        "pickup": { "name": "Rajwada", "area": "Old City", "lat": 22.7196, "lng": 75.8577 },
        "delivery": { "name": "Vijay Nagar", "area": "Scheme 54", "lat": 22.7532, "lng": 75.8937 },
        "vehicle_type": vehicle_type,
        "payment_method": "upi"
    })
}

async fn create_booking(t: &TestApp) -> Value {
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/bookings", Some(t.customer.as_str()), booking_body("auto")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn get(t: &TestApp, uri: &str, token: &str) -> Value {
    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", uri, Some(token)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

/// Signs in through `/auth/otp` + `/auth/verify`; needs `expose_dev_otp`.
async fn login(t: &TestApp, phone: &str, role: &str) -> String {
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/otp", None, json!({ "phone": phone })))
        .await
        .unwrap();
    let code = body_json(res).await["otp"].as_str().unwrap().to_string();

    let verify = json!({ "phone": phone, "otp": code, "role": role });
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/verify", None, verify))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["token"].as_str().unwrap().to_string()
}

fn dev_config() -> Config {
    Config {
        expose_dev_otp: true,
        ..Config::default()
    }
}

async fn put(t: &TestApp, uri: &str, token: &str, body: Value) -> axum::response::Response {
    t.app
        .clone()
        .oneshot(json_request("PUT", uri, Some(token), body))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let t = setup();
    let response = t
        .app
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 2);
    assert_eq!(body["bookings"], 0);
    assert_eq!(body["pending_bookings"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let t = setup();
    let response = t
        .app
        .oneshot(empty_request("GET", "/metrics", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("realtime_subscribers"));
    assert!(body.contains("accept_conflicts_total"));
}

#[tokio::test]
async fn vehicles_lists_active_catalog() {
    let t = setup();
    let response = t
        .app
        .oneshot(empty_request("GET", "/vehicles", None))
        .await
        .unwrap();

    let body = body_json(response).await;
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["vehicle_type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["auto", "tempo", "truck"]);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let t = setup();

    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", "/bookings", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(res).await["error"].is_string());

    let res = t
        .app
        .oneshot(empty_request("GET", "/bookings", Some("not-a-token")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_creates_priced_pending_booking() {
    let t = setup();
    let booking = create_booking(&t).await;

    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["vehicle_type"], "auto");
    assert_eq!(booking["payment_method"], "upi");
    assert_eq!(booking["distance_km"], 5.3);
    assert_eq!(booking["base_price"], 50);
    assert_eq!(booking["distance_charge"], 64);
    assert_eq!(booking["total_price"], 114);
    assert_eq!(booking["estimated_time_minutes"], 21);
    assert_eq!(booking["customer_name"], "Asha");
    assert!(booking["driver_id"].is_null());
    assert_eq!(booking["otp"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn create_booking_validates_input_and_role() {
    let t = setup();

    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/bookings", Some(t.driver.as_str()), booking_body("auto")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookings",
            Some(t.customer.as_str()),
            booking_body("rocket"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["error"]
        .as_str()
        .unwrap()
        .contains("vehicle type"));

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/bookings",
            Some(t.customer.as_str()),
            json!({ "vehicle_type": "auto" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", t.customer))
        .body(Body::from("{ not json"))
        .unwrap();
    let res = t.app.clone().oneshot(malformed).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    t.state
        .vehicles
        .set_active(VehicleType::Truck, false)
        .unwrap();
    let res = t
        .app
        .oneshot(json_request(
            "POST",
            "/bookings",
            Some(t.customer.as_str()),
            booking_body("truck"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_pool_is_filtered_by_driver_vehicle() {
    let t = setup();
    create_booking(&t).await;
    let tempo_driver = add_driver(&t, "9000000005", VehicleType::Tempo);

    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", "/bookings/pending", Some(t.driver.as_str())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", "/bookings/pending", Some(tempo_driver.as_str())))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);

    let res = t
        .app
        .oneshot(empty_request("GET", "/bookings/pending", Some(t.customer.as_str())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn second_accept_gets_conflict() {
    let t = setup();
    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap();
    let rival = add_driver(&t, "9000000002", VehicleType::Auto);

    let res = put(&t, &format!("/bookings/{id}/accept"), &t.driver, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["driver_id"], t.driver_id.as_str());
    assert_eq!(accepted["driver_vehicle_number"], "MP09AB1234");

    let res = put(&t, &format!("/bookings/{id}/accept"), &rival, json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert!(body_json(res).await["error"].is_string());
}

#[tokio::test]
async fn concurrent_accepts_through_http_have_single_winner() {
    let t = setup();
    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let tokens: Vec<String> = (0..10)
        .map(|i| add_driver(&t, &format!("90000002{i:02}"), VehicleType::Auto))
        .collect();

    let handles: Vec<_> = tokens
        .iter()
        .map(|token| {
            let app = t.app.clone();
            let uri = format!("/bookings/{id}/accept");
            let request = json_request("PUT", &uri, Some(token.as_str()), json!({}));
            tokio::spawn(async move { app.oneshot(request).await.unwrap().status() })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        9
    );

    let res = t
        .app
        .oneshot(empty_request("GET", &format!("/bookings/{id}"), Some(t.customer.as_str())))
        .await
        .unwrap();
    let stored = body_json(res).await;
    assert_eq!(stored["status"], "accepted");
    assert!(stored["driver_id"].is_string());
}

#[tokio::test]
async fn full_trip_flow() {
    let t = setup();
    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap();
    let otp = booking["otp"].as_str().unwrap().to_string();
    let wrong = if otp == "0000" { "1111" } else { "0000" };

    put(&t, &format!("/bookings/{id}/accept"), &t.driver, json!({})).await;

    let res = put(&t, &format!("/bookings/{id}/start"), &t.driver, json!({ "otp": wrong })).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["error"], "invalid trip code");

    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", &format!("/bookings/{id}"), Some(t.driver.as_str())))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["status"], "accepted");

    let res = put(&t, &format!("/bookings/{id}/start"), &t.driver, json!({ "otp": otp })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "in_progress");

    let res = put(&t, &format!("/bookings/{id}/cancel"), &t.customer, json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = put(&t, &format!("/bookings/{id}/complete"), &t.driver, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let completed = body_json(res).await;
    assert_eq!(completed["status"], "completed");
    assert!(completed["completed_at"].is_string());

    let res = t
        .app
        .clone()
        .oneshot(empty_request("GET", "/auth/me", Some(t.driver.as_str())))
        .await
        .unwrap();
    let driver = body_json(res).await;
    assert_eq!(driver["total_trips"], 1);
    assert_eq!(driver["total_earnings"], 114);

    let res = put(&t, &format!("/bookings/{id}/rate"), &t.customer, json!({ "rating": 6 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = put(
        &t,
        &format!("/bookings/{id}/rate"),
        &t.customer,
        json!({ "rating": 4, "comment": "on time" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let rated = body_json(res).await;
    assert_eq!(rated["rating"], 4);
    assert_eq!(rated["rating_comment"], "on time");
    assert_eq!(rated["status"], "completed");

    let res = t
        .app
        .oneshot(empty_request("GET", "/bookings", Some(t.driver.as_str())))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn customer_cancels_pending_booking_without_body() {
    let t = setup();
    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap();
    let uri = format!("/bookings/{id}/cancel");

    let res = t
        .app
        .clone()
        .oneshot(empty_request("PUT", &uri, Some(t.customer.as_str())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled = body_json(res).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["cancel_reason"].is_null());

    let res = put(&t, &uri, &t.customer, json!({ "reason": "again" })).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_booking_returns_404() {
    let t = setup();
    for id in ["00000000-0000-0000-0000-000000000000", "garbage"] {
        let res = t
            .app
            .clone()
            .oneshot(empty_request("GET", &format!("/bookings/{id}"), Some(t.customer.as_str())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn phone_login_code_is_single_use() {
    let t = setup_with(dev_config());

    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/otp", None, json!({ "phone": "9123456780" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let code = body_json(res).await["otp"].as_str().unwrap().to_string();

    let verify = json!({ "phone": "9123456780", "otp": code, "role": "driver" });
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/verify", None, verify.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["is_new"], true);
    assert_eq!(body["user"]["role"], "driver");
    let token = body["token"].as_str().unwrap().to_string();

    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/verify", None, verify))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = t
        .app
        .oneshot(empty_request("GET", "/auth/me", Some(token.as_str())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["phone"], "9123456780");
}

#[tokio::test]
async fn login_code_is_hidden_outside_dev_mode() {
    let t = setup();
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/otp", None, json!({ "phone": "9123456780" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await.get("otp").is_none());

    let res = t
        .app
        .oneshot(json_request("POST", "/auth/otp", None, json!({ "phone": "123" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_presence_updates_are_broadcast() {
    let t = setup();
    let mut events = t.state.broadcaster.subscribe();

    let res = put(&t, "/drivers/online", &t.driver, json!({ "online": true })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["is_online"], true);

    let res = put(&t, "/drivers/location", &t.driver, json!({ "lat": 22.72, "lng": 75.86 })).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = put(&t, "/drivers/online", &t.customer, json!({ "online": true })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(events.recv().await.unwrap().name(), "driver:status");
    assert_eq!(events.recv().await.unwrap().name(), "driver:location:update");
}

#[tokio::test]
async fn lifecycle_events_reach_subscribers() {
    let t = setup();
    let mut events = t.state.broadcaster.subscribe();

    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap();
    put(&t, &format!("/bookings/{id}/accept"), &t.driver, json!({})).await;

    let created = serde_json::to_value(events.recv().await.unwrap()).unwrap();
    assert_eq!(created["event"], "booking:new");
    assert_eq!(created["data"]["id"], id);

    let updated = serde_json::to_value(events.recv().await.unwrap()).unwrap();
    assert_eq!(updated["event"], "booking:updated");
    assert_eq!(updated["data"]["status"], "accepted");
}

#[tokio::test]
async fn trip_code_is_visible_only_to_the_customer() {
    let t = setup();
    let mut events = t.state.broadcaster.subscribe();

    let booking = create_booking(&t).await;
    let id = booking["id"].as_str().unwrap();
    let code = booking["otp"].as_str().unwrap().to_string();

    let pool = get(&t, "/bookings/pending", &t.driver).await;
    assert_eq!(pool.as_array().unwrap().len(), 1);
    assert!(pool[0].get("otp").is_none());

    let res = put(&t, &format!("/bookings/{id}/accept"), &t.driver, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await.get("otp").is_none());

    let seen_by_driver = get(&t, &format!("/bookings/{id}"), &t.driver).await;
    assert_eq!(seen_by_driver["status"], "accepted");
    assert!(seen_by_driver.get("otp").is_none());

    let driver_list = get(&t, "/bookings", &t.driver).await;
    assert!(driver_list[0].get("otp").is_none());

    let seen_by_customer = get(&t, &format!("/bookings/{id}"), &t.customer).await;
    assert_eq!(seen_by_customer["otp"], code.as_str());

    for expected in ["booking:new", "booking:updated"] {
        let event = serde_json::to_value(events.recv().await.unwrap()).unwrap();
        assert_eq!(event["event"], expected);
        assert!(event["data"].get("otp").is_none());
    }
}

#[tokio::test]
async fn driver_profile_vehicle_drives_pool_filter() {
    let t = setup_with(dev_config());
    let driver = login(&t, "9300000001", "driver").await;
    let customer = login(&t, "9300000002", "customer").await;

    let profile = json!({
        "name": "Sunil",
        "vehicle_type": "auto",
        "vehicle_number": " mp09ab4321 "
    });
    let res = put(&t, "/users/profile", &driver, profile).await;
    assert_eq!(res.status(), StatusCode::OK);
    let user = body_json(res).await;
    assert_eq!(user["vehicle_type"], "auto");
    assert_eq!(user["vehicle_number"], "MP09AB4321");

    for vehicle_type in ["auto", "truck"] {
        let res = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/bookings",
                Some(customer.as_str()),
                booking_body(vehicle_type),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let pool = get(&t, "/bookings/pending", &driver).await;
    let pool = pool.as_array().unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0]["vehicle_type"], "auto");

    let id = pool[0]["id"].as_str().unwrap();
    let res = put(&t, &format!("/bookings/{id}/accept"), &driver, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["driver_name"], "Sunil");
    assert_eq!(accepted["driver_vehicle_number"], "MP09AB4321");
}

#[tokio::test]
async fn profile_rejects_bad_vehicle_details() {
    let t = setup_with(dev_config());
    let driver = login(&t, "9300000003", "driver").await;

    let res = put(&t, "/users/profile", &driver, json!({ "vehicle_type": "rickshaw" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = put(&t, "/users/profile", &driver, json!({ "name": "   " })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = put(&t, "/users/profile", &t.customer, json!({ "vehicle_type": "auto" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = put(&t, "/users/profile", &t.customer, json!({ "name": "Asha K" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["name"], "Asha K");
}
