//! Wire-level tests of the degraded paths: the blind DAV calendar fallback
//! and the Talk room-creation fallback chain, against a mock platform.

use chrono::NaiveDate;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use conges::integration::caldav::DavClient;
use conges::integration::talk::{ChatGateway, TalkClient};
use conges::service::CalendarPush;
use conges::store::LeaveStore;
use conges::test_utils::test_pool;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[actix_web::test]
async fn dav_fallback_walks_collections_until_one_accepts() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/calendars/alice/personal/leave-1.ics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/calendars/alice/default/leave-1.ics"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let pool = test_pool().await;
    let store = LeaveStore::new(pool);
    let id = store
        .insert("alice", d("2025-01-10"), d("2025-01-12"), "paid", "", "")
        .await
        .unwrap();
    assert_eq!(id, 1);
    store.set_status_if_pending(id, "approved", "").await.unwrap();
    let leave = store.get_by_id(id).await.unwrap().unwrap();

    let dav = DavClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    let push = CalendarPush::new(None, dav, store.clone(), "cloud.example.org");
    let report = push.push(&leave).await;

    assert!(report.pushed, "trace: {:?}", report.trace);
    let row = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.calendar_object_uri, "default/leave-1.ics");
    assert_eq!(row.calendar_component_uid, "leave-1@cloud.example.org");

    // a second push is a no-op
    let report = push.push(&row).await;
    assert!(!report.pushed);
    assert_eq!(report.trace, vec!["skip: already has calendar_object_uri"]);
}

#[actix_web::test]
async fn dav_fallback_gives_up_when_every_collection_refuses() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let pool = test_pool().await;
    let store = LeaveStore::new(pool);
    let id = store
        .insert("alice", d("2025-01-10"), d("2025-01-12"), "paid", "", "")
        .await
        .unwrap();
    store.set_status_if_pending(id, "approved", "").await.unwrap();
    let leave = store.get_by_id(id).await.unwrap().unwrap();

    let dav = DavClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    let push = CalendarPush::new(None, dav, store.clone(), "cloud.example.org");
    let report = push.push(&leave).await;

    assert!(!report.pushed);
    let row = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(row.calendar_object_uri, "");
}

#[actix_web::test]
async fn direct_message_uses_token_from_the_first_create_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .and(body_string_contains("invite=bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ocs": {"data": {"token": "tok-primary"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v1/chat/tok-primary"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "ocs": {"data": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let talk = TalkClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    talk.send_direct("bob", "bonjour").await.unwrap();
}

#[actix_web::test]
async fn direct_message_falls_back_to_alternate_encoding() {
    let server = MockServer::start().await;

    // Primary encoding is refused without a token
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .and(body_string_contains("invite=bob"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ocs": {"data": {}}
        })))
        .mount(&server)
        .await;
    // Alternate bracketed encoding succeeds
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .and(body_string_contains("invite%5B%5D=bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ocs": {"data": {"conversation": {"token": "tok-alt"}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v1/chat/tok-alt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "ocs": {"data": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let talk = TalkClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    talk.send_direct("bob", "bonjour").await.unwrap();
}

#[actix_web::test]
async fn direct_message_matches_an_existing_room_as_last_resort() {
    let server = MockServer::start().await;

    // Both create attempts yield no token
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ocs": {"data": {}}
        })))
        .mount(&server)
        .await;
    // The room list holds an existing one-to-one conversation with bob
    Mock::given(method("GET"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ocs": {"data": [
                {"type": 2, "name": "general", "token": "tok-group"},
                {"type": 1, "name": "bob", "token": "tok-existing"}
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ocs/v2.php/apps/spreed/api/v1/chat/tok-existing"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "ocs": {"data": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let talk = TalkClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    talk.send_direct("bob", "bonjour").await.unwrap();
}

#[actix_web::test]
async fn channel_listing_excludes_direct_rooms_and_sorts_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocs/v2.php/apps/spreed/api/v4/room"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ocs": {"data": [
                {"type": 3, "displayName": "Zèbre", "token": "tok-z"},
                {"type": 1, "displayName": "bob", "token": "tok-direct"},
                {"type": 2, "displayName": "annonces", "token": "tok-a"},
                {"type": 2, "displayName": "", "name": "RH", "token": "tok-rh"}
            ]}
        })))
        .mount(&server)
        .await;

    let talk = TalkClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    let channels = talk.list_channels().await.unwrap();
    let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["annonces", "RH", "Zèbre"]);
}

#[actix_web::test]
async fn dav_paths_percent_encode_reserved_characters_in_uids() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/calendars/john.doe%40corp/personal/leave-1.ics"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dav = DavClient::new(reqwest::Client::new(), &server.uri(), "svc", "svc");
    let status = dav
        .put_event("john.doe@corp", "personal", "leave-1.ics", "BEGIN:VCALENDAR")
        .await
        .unwrap();
    assert_eq!(status, 201);
}

#[actix_web::test]
async fn broadcast_with_empty_token_is_a_no_op() {
    // no server at all: an empty token must short-circuit before any request
    let talk = TalkClient::new(reqwest::Client::new(), "http://127.0.0.1:1", "svc", "svc");
    talk.send_to_room("", "message").await.unwrap();
    talk.send_to_room("   ", "message").await.unwrap();
}
