//! End-to-end tests of the REST API against an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tower::ServiceExt;

use aura_backend::api::{auth::bootstrap_super_admin, create_router, AppState};
use aura_backend::chain::{explorer_url_for, CertificationRegistry, DisabledRegistry};
use aura_backend::config::{AppConfig, Network};
use aura_backend::models::Certification;
use aura_backend::storage::Database;

const ADMIN_EMAIL: &str = "root@aura.test";
const ADMIN_PASSWORD: &str = "rootpass1";

fn test_config(ml_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.root_admin_email = Some(ADMIN_EMAIL.to_string());
    config.auth.root_admin_password = ADMIN_PASSWORD.to_string();
    config.ml.api_url = ml_url.to_string();
    config.ml.timeout_secs = 2;
    config
}

async fn test_app_with(config: AppConfig) -> Router {
    test_app_with_registry(config, Arc::new(DisabledRegistry)).await
}

async fn test_app_with_registry(
    config: AppConfig,
    registry: Arc<dyn CertificationRegistry>,
) -> Router {
    let db = Database::in_memory();
    bootstrap_super_admin(&db, &config.auth).await.unwrap();
    let state = AppState::new(db, config, registry).unwrap();
    create_router(state)
}

const TX_HASH: &str = "0xfeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedfacefeedface";

/// Registry that accepts every write with a fixed hash, as a Sepolia node would
struct AcceptingRegistry;

#[async_trait]
impl CertificationRegistry for AcceptingRegistry {
    async fn record(&self, _certification: &Certification) -> Option<String> {
        Some(TX_HASH.to_string())
    }

    fn explorer_url(&self, tx_hash: &str) -> Option<String> {
        explorer_url_for(Network::Sepolia, tx_hash)
    }

    fn name(&self) -> &'static str {
        "accepting"
    }
}

/// App whose model service is unreachable, so every score comes from the fallback
async fn test_app() -> Router {
    test_app_with(test_config("http://127.0.0.1:9")).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register a farmer and return (id, token)
async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Asha Patil",
            "email": email,
            "phone": "9876543210",
            "password": "groundnut42",
            "location": {"latitude": 15.3, "longitude": 75.7, "district": "Dharwad"},
            "crops": [{"type": "groundnut", "area": 2.5}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["farmer"]["_id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn predict(app: &Router, token: &str, farmer_id: &str, extra: Value) -> Value {
    let mut request = json!({"farmerId": farmer_id, "latitude": 15.3, "longitude": 75.7});
    if let (Some(target), Some(fields)) = (request.as_object_mut(), extra.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    let (status, body) = send(app, Method::POST, "/api/predictions", Some(token), Some(request)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

fn risky() -> Value {
    json!({"storageType": "open", "storageQuality": "Poor", "moistureContent": 15.0})
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/nothing/here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app().await;
    let (id, token) = register(&app, "Asha@Example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], id.as_str());
    assert_eq!(body["email"], "asha@example.com");
    assert_eq!(body["role"], "farmer");
    assert!(body.get("password").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "asha@example.com", "password": "groundnut42"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["farmer"]["_id"], id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "asha@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = test_app().await;
    register(&app, "dup@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Other",
            "email": "DUP@example.com",
            "phone": "9876543210",
            "password": "secret99",
            "location": {"latitude": 1.0, "longitude": 1.0}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already registered");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "No Email", "password": "secret99"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields");
    let fields = body["details"]["fields"].as_array().unwrap();
    assert!(fields.contains(&json!("email")));
    assert!(fields.contains(&json!("location")));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Bad",
            "email": "not-an-email",
            "phone": "9876543210",
            "password": "secret99",
            "location": {"latitude": 1.0, "longitude": 1.0}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_required_and_checked() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}

#[tokio::test]
async fn test_farmers_cannot_read_each_other() {
    let app = test_app().await;
    let (asha, asha_token) = register(&app, "asha@example.com").await;
    let (ravi, _) = register(&app, "ravi@example.com").await;

    let uri = format!("/api/farmers/{}", ravi);
    let (status, _) = send(&app, Method::GET, &uri, Some(&asha_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;
    let (status, body) = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], ravi.as_str());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/farmers/{}", asha),
        Some(&asha_token),
        Some(json!({"name": "Asha P.", "alertPreferences": {"sms": false, "email": true, "push": true}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "Asha P.");
    assert_eq!(body["alertPreferences"]["sms"], false);
}

#[tokio::test]
async fn test_invite_is_admin_only() {
    let app = test_app().await;
    let (_, farmer_token) = register(&app, "asha@example.com").await;
    let invite = json!({
        "name": "Inspector",
        "email": "inspector@aura.test",
        "password": "inspect1",
        "role": "certifier"
    });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/invite",
        Some(&farmer_token),
        Some(invite.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied: Admins only");

    let admin = admin_token(&app).await;
    let (status, body) =
        send(&app, Method::POST, "/api/auth/invite", Some(&admin), Some(invite.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created with role certifier");

    let (status, body) =
        send(&app, Method::POST, "/api/auth/invite", Some(&admin), Some(invite)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User exists");
}

#[tokio::test]
async fn test_fallback_prediction_raises_alert() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;

    let calm = predict(&app, &token, &id, json!({})).await;
    assert_eq!(calm["prediction"]["riskScore"], 3.0);
    assert_eq!(calm["prediction"]["riskLevel"], "LOW");
    assert_eq!(calm["prediction"]["source"], "fallback");
    assert!(calm.get("alert").is_none());

    let hot = predict(&app, &token, &id, risky()).await;
    assert_eq!(hot["prediction"]["riskScore"], 8.5);
    assert_eq!(hot["prediction"]["riskLevel"], "CRITICAL");
    assert_eq!(hot["recommendations"]["priority"], "URGENT");
    assert_eq!(hot["alert"]["severity"], "CRITICAL");
    let alert_id = hot["alert"]["_id"].as_str().unwrap().to_string();

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/predictions/history/{}?limit=1", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["riskScore"], 8.5);

    let (status, alerts) = send(
        &app,
        Method::GET,
        &format!("/api/alerts/{}?unreadOnly=true", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["prediction"]["riskScore"], 8.5);

    let (status, alert) = send(
        &app,
        Method::PUT,
        &format!("/api/alerts/{}/acknowledge", alert_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["acknowledged"], true);
    assert_eq!(alert["read"], true);

    let (status, stats) = send(
        &app,
        Method::GET,
        &format!("/api/alerts/{}/stats", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["unread"], 0);
    assert_eq!(stats["bySeverity"]["critical"], 1);
}

#[tokio::test]
async fn test_prediction_validation() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/predictions",
        Some(&token),
        Some(json!({"farmerId": id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/predictions",
        Some(&token),
        Some(json!({"farmerId": id, "latitude": 120.0, "longitude": 0.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/predictions",
        Some(&token),
        Some(json!({"farmerId": "someone-else", "latitude": 1.0, "longitude": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

async fn spawn_model_service() -> String {
    async fn predict_handler(Json(request): Json<Value>) -> Json<Value> {
        assert_eq!(request["storage_type"], "silo");
        Json(json!({
            "prediction": {"risk_score": 7.4, "risk_level": "HIGH", "confidence": 0.86},
            "recommendations": {"actions": ["Dry grain below 12% moisture"], "priority": "HIGH"},
            "risk_factors": {"temperature_risk": 1.4, "humidity_risk": 1.9, "crop_stress_risk": 1.1},
            "data_sources": {},
            "forecast": {"days": [7.4, 7.8]}
        }))
    }

    let app = Router::new().route("/api/predict", post(predict_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_model_service_prediction() {
    let ml_url = spawn_model_service().await;
    let app = test_app_with(test_config(&ml_url)).await;
    let (id, token) = register(&app, "asha@example.com").await;

    let body = predict(&app, &token, &id, json!({"storageType": "silo"})).await;
    assert_eq!(body["prediction"]["source"], "ml");
    assert_eq!(body["prediction"]["riskScore"], 7.4);
    assert_eq!(body["prediction"]["riskLevel"], "HIGH");
    assert_eq!(body["prediction"]["confidence"], 0.86);
    assert_eq!(body["recommendations"]["actions"][0], "Dry grain below 12% moisture");
    assert_eq!(body["forecast"]["days"][1], 7.8);
    assert_eq!(body["alert"]["severity"], "HIGH");
}

#[tokio::test]
async fn test_certification_lifecycle() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;

    let first = predict(&app, &token, &id, json!({})).await;
    let second = predict(&app, &token, &id, json!({})).await;
    let predictions = vec![
        first["prediction"]["_id"].clone(),
        second["prediction"]["_id"].clone(),
    ];

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(json!({
            "farmerId": id,
            "cropType": "groundnut",
            "quantity": 1200,
            "harvestDate": "2025-01-15",
            "predictions": predictions,
            "interventions": "Sun dried for three days"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "Certification generated successfully");
    let certification = &body["certification"];
    assert_eq!(certification["status"], "CERTIFIED");
    assert_eq!(certification["averageRiskScore"], 3.0);
    assert_eq!(certification["interventionsTaken"][0]["action"], "Sun dried for three days");
    assert!(body["qrCode"].as_str().unwrap().starts_with("data:image/svg+xml;base64,"));
    assert!(body["explorerUrl"].is_null());
    let batch_id = certification["batchId"].as_str().unwrap().to_string();
    assert!(batch_id.starts_with("AURA-"));

    let (status, verified) = send(
        &app,
        Method::GET,
        &format!("/api/certifications/verify/{}", batch_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["farmer"]["name"], "Asha Patil");
    assert_eq!(verified["predictions"].as_array().unwrap().len(), 2);

    let (status, listed) = send(
        &app,
        Method::GET,
        &format!("/api/certifications/farmer/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["batchId"], batch_id.as_str());

    let (status, profile) =
        send(&app, Method::GET, &format!("/api/farmers/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["certifications"][0]["batchId"], batch_id.as_str());

    let status_uri = format!("/api/certifications/{}/status", batch_id);
    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&token),
        Some(json!({"status": "REJECTED"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;
    let (status, revoked) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&admin),
        Some(json!({"status": "rejected"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["status"], "REJECTED");

    let (status, body) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(&admin),
        Some(json!({"status": "CERTIFIED"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Invalid status transition");

    let (_, verified) = send(
        &app,
        Method::GET,
        &format!("/api/certifications/verify/{}", batch_id),
        None,
        None,
    )
    .await;
    assert_eq!(verified["valid"], false);
}

#[tokio::test]
async fn test_certification_risk_gates() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;
    let (other, other_token) = register(&app, "ravi@example.com").await;

    let moderate = predict(
        &app,
        &token,
        &id,
        json!({"storageQuality": 0.3, "moistureContent": 13.5}),
    )
    .await;
    let hot = predict(&app, &token, &id, risky()).await;
    let foreign = predict(&app, &other_token, &other, json!({})).await;

    let certify = |predictions: Vec<Value>| {
        json!({
            "farmerId": id,
            "cropType": "maize",
            "quantity": 500,
            "predictions": predictions
        })
    };

    // 5.5 lands between the auto-certify and rejection thresholds
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(certify(vec![moderate["prediction"]["_id"].clone()])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["certification"]["status"], "PENDING");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(certify(vec![hot["prediction"]["_id"].clone()])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["averageRiskScore"], 8.5);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(certify(vec![foreign["prediction"]["_id"].clone()])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No predictions found");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/certifications/verify/AURA-0-deadbeef",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Certification not found");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = test_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_alert_read() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;
    let (_, other_token) = register(&app, "ravi@example.com").await;

    let hot = predict(&app, &token, &id, risky()).await;
    let read_uri = format!("/api/alerts/{}/read", hot["alert"]["_id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PUT, &read_uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, alert) = send(&app, Method::PUT, &read_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alert["read"], true);
    assert_eq!(alert["acknowledged"], false);

    let (_, unread) = send(
        &app,
        Method::GET,
        &format!("/api/alerts/{}?unreadOnly=true", id),
        Some(&token),
        None,
    )
    .await;
    assert!(unread.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::PUT, "/api/alerts/missing/read", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Alert not found");
}

#[tokio::test]
async fn test_repeated_prediction_ids_count_once() {
    let app = test_app().await;
    let (id, token) = register(&app, "asha@example.com").await;

    let mut hot = Vec::new();
    for _ in 0..5 {
        hot.push(predict(&app, &token, &id, risky()).await["prediction"]["_id"].clone());
    }
    let low = predict(
        &app,
        &token,
        &id,
        json!({"storageType": "silo", "storageQuality": 0.9, "moistureContent": 11.0}),
    )
    .await["prediction"]["_id"]
        .clone();

    let certify = |predictions: Vec<Value>| {
        json!({
            "farmerId": id,
            "cropType": "maize",
            "quantity": 500,
            "predictions": predictions
        })
    };

    // Five 8.5s and one 1.0 average 7.25, above the rejection threshold
    let mut distinct = hot.clone();
    distinct.push(low.clone());
    let mut padded = distinct.clone();
    padded.extend(std::iter::repeat(low.clone()).take(5));

    for predictions in [distinct, padded] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/certifications",
            Some(&token),
            Some(certify(predictions)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(body["details"]["averageRiskScore"], 7.25);
    }

    // Three 8.5s and one 1.0 average 6.625: pending, whatever the padding
    let mut padded = hot[..3].to_vec();
    padded.push(low.clone());
    padded.extend(std::iter::repeat(low).take(5));
    padded.push(hot[0].clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(certify(padded)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let certification = &body["certification"];
    assert_eq!(certification["status"], "PENDING");
    assert_eq!(certification["averageRiskScore"], 6.625);
    assert_eq!(certification["predictions"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_chain_hash_persisted_with_certification() {
    let app = test_app_with_registry(test_config("http://127.0.0.1:9"), Arc::new(AcceptingRegistry))
        .await;
    let (id, token) = register(&app, "asha@example.com").await;
    let prediction = predict(&app, &token, &id, json!({})).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/certifications",
        Some(&token),
        Some(json!({
            "farmerId": id,
            "cropType": "groundnut",
            "quantity": 900,
            "predictions": [prediction["prediction"]["_id"].clone()]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["certification"]["blockchainTxHash"], TX_HASH);
    assert_eq!(
        body["explorerUrl"],
        format!("https://sepolia.etherscan.io/tx/{}", TX_HASH).as_str()
    );

    let batch_id = body["certification"]["batchId"].as_str().unwrap();
    let (status, verified) = send(
        &app,
        Method::GET,
        &format!("/api/certifications/verify/{}", batch_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["certification"]["blockchainTxHash"], TX_HASH);
}
