mod common;

use actix_web::{http::header, test};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{admin_token, TestApp, CLIENT_ID};
use quote_desk_api::{
    db::ClientRecordStore, models::share_link::ShareLink,
    services::share_link_service::ShareLinkGateway,
};

async fn issue_link(test_app: &TestApp) -> String {
    test_app
        .links
        .issue(CLIENT_ID, Some(30))
        .await
        .unwrap()
        .token
}

fn share_uri(client_id: &str, token: &str) -> String {
    format!("/api/share/{client_id}/{token}")
}

#[actix_rt::test]
async fn test_issued_link_opens_priced_document() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/admin/clients/{CLIENT_ID}/share-links"))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let link: Value = test::read_body_json(resp).await;
    assert_eq!(link["active"], true);
    assert!(link["expires_at"].is_string());
    let token = link["token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri(&share_uri(CLIENT_ID, token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["document"]["currency"], "NZD");
    assert_eq!(body["breakdown"]["final_quote"].as_f64(), Some(1100.0));
}

#[actix_rt::test]
async fn test_disabled_link_is_denied_without_data() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let token = issue_link(&test_app).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/clients/{CLIENT_ID}/share-links/{token}"))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .set_json(json!({ "active": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&share_uri(CLIENT_ID, &token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({ "error": "access_denied", "reason": "This share link has been disabled" })
    );
}

#[actix_rt::test]
async fn test_unknown_and_foreign_tokens_are_denied() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let token = issue_link(&test_app).await;

    let req = test::TestRequest::get()
        .uri(&share_uri(CLIENT_ID, "made-up-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::get()
        .uri(&share_uri("c2", &token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "Invalid share link");
    assert!(body.get("document").is_none());
}

#[actix_rt::test]
async fn test_expired_link_is_denied() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    test_app.links.insert(ShareLink {
        client_id: CLIENT_ID.to_string(),
        token: "stale".to_string(),
        active: true,
        created_at: Utc::now() - Duration::days(60),
        expires_at: Some(Utc::now() - Duration::days(30)),
    });

    let req = test::TestRequest::get()
        .uri(&share_uri(CLIENT_ID, "stale"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "This share link has expired");
}

#[actix_rt::test]
async fn test_confirm_takes_only_client_selections() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let token = issue_link(&test_app).await;

    let req = test::TestRequest::get()
        .uri(&share_uri(CLIENT_ID, &token))
        .to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;

    let mut document = view["document"].clone();
    document["base_quote"] = json!(1);
    document["currency"] = json!("USD");
    document["properties"][0]["selected"] = json!(false);
    document["properties"][0]["price"] = json!(-5000);
    document["properties"][1]["selected"] = json!(true);
    document["flights"] = json!([]);
    document["activities"][0]["base_price"] = json!(0);

    let req = test::TestRequest::post()
        .uri(&format!("{}/confirm", share_uri(CLIENT_ID, &token)))
        .set_json(&document)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["breakdown"]["final_quote"].as_f64(), Some(850.0));

    let stored = test_app.store.get(CLIENT_ID).await.unwrap().unwrap();
    assert_eq!(stored.base_quote, Decimal::from(1000));
    assert_eq!(stored.currency, "NZD");
    assert!(!stored.properties[0].selected);
    assert!(stored.properties[1].selected);
    assert_eq!(stored.properties[0].price, Decimal::from(200));
    assert_eq!(stored.activities[0].base_price, Decimal::from(200));
    assert_eq!(stored.flights.len(), 1);
    assert_eq!(stored.flights[0].id, "f1");
}

#[actix_rt::test]
async fn test_unknown_link_cannot_be_toggled() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/clients/{CLIENT_ID}/share-links/nope"))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .set_json(json!({ "active": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
