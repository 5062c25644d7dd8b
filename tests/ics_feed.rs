//! HTTP-level tests for the feed token endpoints and the public ICS feed.

use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{App, test};
use conges::integration::caldav::{CalendarGateway, DavClient};
use conges::model::leave::{LeaveStatus, LeaveType};
use conges::routes;
use conges::service::{CalendarPush, LeaveService, NotificationFanout};
use conges::settings::SettingsStore;
use conges::store::LeaveStore;
use conges::test_utils::{
    CountingCalendar, MemoryDirectory, RecordingChat, RecordingNotifier, jwt_for, test_config,
    test_pool,
};
use chrono::NaiveDate;
use serde_json::Value;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct TestApp {
    service: Data<LeaveService>,
    store: Data<LeaveStore>,
    settings: Data<SettingsStore>,
    config: Data<conges::config::Config>,
}

async fn test_app() -> TestApp {
    let pool = test_pool().await;
    let store = LeaveStore::new(pool.clone());
    let settings = SettingsStore::new(pool.clone());
    let config = test_config();

    let directory = MemoryDirectory::new()
        .with_user("alice", "Alice Martin", "alice@example.com")
        .with_group("admin", &["root"]);
    let fanout = NotificationFanout::new(
        Arc::new(directory),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingChat::default()),
        settings.clone(),
    );
    let gateway: Arc<dyn CalendarGateway> = Arc::new(CountingCalendar::default());
    let dav = DavClient::new(reqwest::Client::new(), "http://127.0.0.1:1", "svc", "svc");
    let push = CalendarPush::new(Some(gateway), dav, store.clone(), &config.host);
    let service = LeaveService::new(store.clone(), fanout, push);

    TestApp {
        service: Data::new(service),
        store: Data::new(store),
        settings: Data::new(settings),
        config: Data::new(config),
    }
}

macro_rules! init_service {
    ($app:expr) => {
        test::init_service(
            App::new()
                .app_data($app.service.clone())
                .app_data($app.store.clone())
                .app_data($app.settings.clone())
                .app_data($app.config.clone())
                .configure(|cfg| routes::configure(cfg, $app.config.get_ref())),
        )
        .await
    };
}

fn bearer(uid: &str) -> String {
    format!("Bearer {}", jwt_for(uid, &[], "test-secret"))
}

#[actix_web::test]
async fn token_is_minted_once_and_rotated_on_demand() {
    let app = test_app().await;
    let srv = init_service!(app);

    let req = test::TestRequest::get()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    let first = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["uid"], "alice");
    assert_eq!(first.len(), 32);
    assert!(
        body["url"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/ics/alice/{first}"))
    );

    // stable across fetches
    let req = test::TestRequest::get()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    assert_eq!(body["token"].as_str().unwrap(), first);

    // rotation mints a different token
    let req = test::TestRequest::post()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    assert_ne!(body["token"].as_str().unwrap(), first);
}

#[actix_web::test]
async fn token_endpoints_require_authentication() {
    let app = test_app().await;
    let srv = init_service!(app);

    let req = test::TestRequest::get().uri("/api/ics/token").to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn feed_serves_only_approved_leaves_sorted_by_start() {
    let app = test_app().await;

    // one approved early, one approved late, one pending
    let late = app
        .service
        .create_leave("alice", d("2025-06-01"), d("2025-06-02"), LeaveType::Paid, "", "")
        .await
        .unwrap();
    let early = app
        .service
        .create_leave("alice", d("2025-02-01"), d("2025-02-02"), LeaveType::Paid, "", "")
        .await
        .unwrap();
    app.service
        .create_leave("alice", d("2025-09-01"), d("2025-09-02"), LeaveType::Paid, "", "")
        .await
        .unwrap();
    app.service.set_status(late.id, LeaveStatus::Approved, "").await.unwrap();
    app.service.set_status(early.id, LeaveStatus::Approved, "").await.unwrap();

    let srv = init_service!(app);
    let req = test::TestRequest::get()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/ics/alice/{token}"))
        .peer_addr("127.0.0.1:8080".parse().unwrap())
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/calendar"));

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 2);
    // early leave comes first
    let first_event = body.find("DTSTART;VALUE=DATE:20250201").unwrap();
    let second_event = body.find("DTSTART;VALUE=DATE:20250601").unwrap();
    assert!(first_event < second_event);
    // the pending one is absent
    assert!(!body.contains("20250901"));
}

#[actix_web::test]
async fn feed_rejects_wrong_missing_and_rotated_tokens() {
    let app = test_app().await;
    let srv = init_service!(app);

    // no token provisioned yet: any guess is refused
    let req = test::TestRequest::get()
        .uri("/ics/alice/0000000000000000")
        .peer_addr("127.0.0.1:8080".parse().unwrap())
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    let old = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/ics/alice/wrong-token")
        .peer_addr("127.0.0.1:8080".parse().unwrap())
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 403);

    // rotating invalidates the previous token immediately
    let req = test::TestRequest::post()
        .uri("/api/ics/token")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    let fresh = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/ics/alice/{old}"))
        .peer_addr("127.0.0.1:8080".parse().unwrap())
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::get()
        .uri(&format!("/ics/alice/{fresh}"))
        .peer_addr("127.0.0.1:8080".parse().unwrap())
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn create_endpoint_validates_date_order() {
    let app = test_app().await;
    let srv = init_service!(app);

    let req = test::TestRequest::post()
        .uri("/api/leaves")
        .insert_header(("Authorization", bearer("alice")))
        .set_json(serde_json::json!({
            "startDate": "2025-03-10",
            "endDate": "2025-03-01"
        }))
        .to_request();
    let resp = test::call_service(&srv, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn create_then_list_round_trips_over_http() {
    let app = test_app().await;
    let srv = init_service!(app);

    let req = test::TestRequest::post()
        .uri("/api/leaves")
        .insert_header(("Authorization", bearer("alice")))
        .set_json(serde_json::json!({
            "startDate": "2025-03-01",
            "endDate": "2025-03-05",
            "type": "sick",
            "reason": "grippe",
            "dayParts": {"2025-03-01": "pm"}
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    assert_eq!(body["leave"]["status"], "pending");
    assert_eq!(body["leave"]["type"], "sick");

    let req = test::TestRequest::get()
        .uri("/api/leaves")
        .insert_header(("Authorization", bearer("alice")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&srv, req).await;
    assert_eq!(body["leaves"].as_array().unwrap().len(), 1);
    assert_eq!(body["leaves"][0]["reason"], "grippe");
}
