//! Black-box API tests over the in-memory wiring.

use reqwest::StatusCode;
use serde_json::{json, Value};

use hallbook_api::app::services::build_in_memory_services;
use hallbook_booking::TransitionPolicy;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with_policy(TransitionPolicy::Permissive).await
    }

    async fn spawn_with_policy(policy: TransitionPolicy) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = hallbook_api::app::build_app(build_in_memory_services(policy));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn booking_body(email: &str, name: &str, from: &str, to: &str) -> Value {
    json!({
        "contact": { "email_address": email, "name": name },
        "event": {
            "from": from,
            "to": to,
            "name": "Spring Fair",
            "details": "stalls and a bouncy castle",
            "publicly_visible": true
        },
        "privacy_policy": true,
        "terms_of_hire": true,
        "cleaning_and_damage": true,
        "car_parking": true,
        "adhesives": true
    })
}

async fn submit_booking(client: &reqwest::Client, base: &str, body: &Value) -> reqwest::Response {
    client
        .post(format!("{base}/api/v1/events"))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_answers() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn overlapping_submission_gets_a_distinct_conflict() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let first = booking_body(
        "first@example.org",
        "First",
        "2026-06-20T10:00:00Z",
        "2026-06-20T11:00:00Z",
    );
    let res = submit_booking(&client, &server.base_url, &first).await;
    assert_eq!(res.status(), StatusCode::OK);

    let second = booking_body(
        "second@example.org",
        "Second",
        "2026-06-20T10:30:00Z",
        "2026-06-20T11:30:00Z",
    );
    let res = submit_booking(&client, &server.base_url, &second).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "a booking exists for these dates");
}

#[tokio::test]
async fn unticked_policies_are_rejected_with_a_reason() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut body = booking_body(
        "a@example.org",
        "A",
        "2026-06-20T10:00:00Z",
        "2026-06-20T11:00:00Z",
    );
    body["adhesives"] = json!(false);

    let res = submit_booking(&client, &server.base_url, &body).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "adhesives policy was not ticked");
}

#[tokio::test]
async fn malformed_timestamps_are_bad_requests() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body = booking_body("a@example.org", "A", "next tuesday", "2026-06-20T11:00:00Z");
    let res = submit_booking(&client, &server.base_url, &body).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_listing_redacts_private_events() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut private = booking_body(
        "a@example.org",
        "A",
        "2026-06-20T10:00:00Z",
        "2026-06-20T11:00:00Z",
    );
    private["event"]["name"] = json!("Closed Committee Meeting");
    private["event"]["publicly_visible"] = json!(false);
    submit_booking(&client, &server.base_url, &private).await;

    let res = client
        .get(format!(
            "{}/api/v1/events?from=2026-06-01&to=2026-06-30",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["events"][0]["name"], "Private Event");

    // The admin view keeps the real name (and the contact).
    let res = client
        .get(format!(
            "{}/api/v1/admin/events?from=2026-06-01&to=2026-06-30",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["events"][0]["name"], "Closed Committee Meeting");
    assert_eq!(body["events"][0]["contact"], "A");
}

#[tokio::test]
async fn listing_can_be_restricted_to_one_contact() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    submit_booking(
        &client,
        &server.base_url,
        &booking_body(
            "a@example.org",
            "A",
            "2026-06-20T10:00:00Z",
            "2026-06-20T11:00:00Z",
        ),
    )
    .await;
    submit_booking(
        &client,
        &server.base_url,
        &booking_body(
            "b@example.org",
            "B",
            "2026-06-21T10:00:00Z",
            "2026-06-21T11:00:00Z",
        ),
    )
    .await;

    let body: Value = client
        .get(format!(
            "{}/api/v1/events?from=2026-06-01&to=2026-06-30&contact=b@example.org",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn calendar_feed_serves_text_calendar() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    submit_booking(
        &client,
        &server.base_url,
        &booking_body(
            "a@example.org",
            "A",
            "2026-06-20T10:00:00Z",
            "2026-06-20T11:00:00Z",
        ),
    )
    .await;

    let res = client
        .get(format!(
            "{}/api/v1/events/calendar.ics?from=2026-06-01&to=2026-06-30",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "text/calendar"
    );

    let feed = res.text().await.unwrap();
    assert!(feed.contains("BEGIN:VCALENDAR"));
    assert!(feed.contains("SUMMARY:Spring Fair"));
}

async fn submitted_event_id(client: &reqwest::Client, base: &str) -> String {
    let res = submit_booking(
        client,
        base,
        &booking_body(
            "hirer@example.org",
            "A. Hirer",
            "2026-06-20T10:00:00Z",
            "2026-06-20T12:00:00Z",
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn lifecycle_actions_move_the_event_through_its_states() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let id = submitted_event_id(&client, &server.base_url).await;

    let res = client
        .post(format!(
            "{}/api/v1/admin/events/{id}/request-documents",
            server.base_url
        ))
        .json(&json!({ "food_safety": true, "risk_assessment": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let event: Value = client
        .get(format!("{}/api/v1/admin/events/{id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(event["status"], "awaiting documents");

    let res = client
        .post(format!("{}/api/v1/admin/events/{id}/approve", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let event: Value = client
        .get(format!("{}/api/v1/admin/events/{id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(event["status"], "approved");

    let res = client
        .post(format!("{}/api/v1/admin/events/{id}/cancel", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_events_are_not_found() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/api/v1/admin/events/00000000-0000-0000-0000-000000000000",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invoice_flow_raises_dispatches_and_settles() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let event_id = submitted_event_id(&client, &server.base_url).await;

    let res = client
        .post(format!("{}/api/v1/admin/send-invoice", server.base_url))
        .json(&json!({
            "contact": "hirer@example.org",
            "items": [
                { "event_id": event_id, "description": "Spring Fair - 2.0 hours", "cost": "50.00" },
                { "event_id": event_id, "description": "Discount", "cost": "-10.00" },
                { "description": "Refundable deposit", "cost": "100.00" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let invoice: Value = res.json().await.unwrap();
    let reference = invoice["reference"].as_str().unwrap();
    assert_eq!(reference.len(), 6);
    assert!(reference
        .chars()
        .all(|c| "ABCDEFGHJLMPQRSTUVWYZ23456789".contains(c)));
    assert_eq!(invoice["total"], "140.00");
    assert!(invoice["sent"].is_string());
    assert!(invoice["paid"].is_null());

    // The event view links back to the invoice.
    let event: Value = client
        .get(format!("{}/api/v1/admin/events/{event_id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(event["invoices"][0]["reference"], reference);

    // Settle it.
    let invoice_id = invoice["id"].as_str().unwrap();
    let res = client
        .post(format!(
            "{}/api/v1/admin/invoices/{invoice_id}/paid",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let paid: Value = client
        .get(format!(
            "{}/api/v1/admin/invoices/{invoice_id}",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid"].is_string());
}

#[tokio::test]
async fn series_with_a_conflicting_instance_rolls_back_whole() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    submit_booking(
        &client,
        &server.base_url,
        &booking_body(
            "a@example.org",
            "A",
            "2026-06-21T10:00:00Z",
            "2026-06-21T11:00:00Z",
        ),
    )
    .await;

    let res = client
        .post(format!("{}/api/v1/admin/events", server.base_url))
        .json(&json!({
            "contact": { "email_address": "club@example.org", "name": "Club" },
            "event": {
                "name": "Weekly club",
                "publicly_visible": false,
                "status": "approved",
                "rate": "default",
                "instances": [
                    { "from": "2026-06-20T10:00:00Z", "to": "2026-06-20T11:00:00Z" },
                    { "from": "2026-06-21T10:00:00Z", "to": "2026-06-21T11:00:00Z" }
                ]
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The clear first instance did not land either.
    let body: Value = client
        .get(format!(
            "{}/api/v1/events?from=2026-06-01&to=2026-06-30",
            server.base_url
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn strict_mode_blocks_reviving_a_cancelled_event() {
    let server = TestServer::spawn_with_policy(TransitionPolicy::Strict).await;
    let client = reqwest::Client::new();
    let id = submitted_event_id(&client, &server.base_url).await;

    client
        .post(format!("{}/api/v1/admin/events/{id}/cancel", server.base_url))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/api/v1/admin/events/{id}/approve", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
