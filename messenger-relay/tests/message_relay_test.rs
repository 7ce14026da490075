mod common;

use common::{page_payload, reply_body, TestApp, INFERENCE_PATH, SEND_API_PATH, TEST_HF_TOKEN};
use messenger_relay::services::{INFERENCE_FALLBACK_REPLY, REJECTED_MESSAGE_REPLY};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn message_is_answered_with_generated_text() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path(INFERENCE_PATH))
        .and(header("authorization", format!("Bearer {}", TEST_HF_TOKEN).as_str()))
        .and(body_json(json!({"inputs": "hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "hello!"}])))
        .expect(1)
        .mount(&app.mock_server)
        .await;
    app.mock_send_api().await;

    let response = app
        .post_webhook(&json!({
            "object": "page",
            "entry": [{"messaging": [{"sender": {"id": "U1"}, "message": {"text": "hi"}}]}]
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", "hello!")]
    );
}

#[tokio::test]
async fn non_page_object_is_acknowledged_without_outbound_calls() {
    let app = TestApp::spawn().await;

    let response = app
        .post_webhook(&json!({
            "object": "instagram",
            "entry": [{"messaging": [{"sender": {"id": "U1"}, "message": {"text": "hi"}}]}]
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert!(app.mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn incomplete_events_are_skipped() {
    let app = TestApp::spawn().await;
    app.mock_inference(
        ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "answer"}])),
    )
    .await;
    app.mock_send_api().await;

    let response = app
        .post_webhook(&json!({
            "object": "page",
            "entry": [
                {"messaging": [
                    {"message": {"text": "who am I?"}},
                    {"sender": {"id": "U1"}, "delivery": {"watermark": 1}},
                    {"sender": {"id": "U2"}, "message": {"text": ""}}
                ]},
                {"messaging": [
                    {"sender": {"id": "U3"}, "message": {"text": "question"}}
                ]}
            ]
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.received_bodies(INFERENCE_PATH).await,
        vec![json!({"inputs": "question"})]
    );
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U3", "answer")]
    );
}

#[tokio::test]
async fn oversized_message_gets_apology_without_inference() {
    let app = TestApp::spawn().await;
    app.mock_send_api().await;

    let response = app
        .post_webhook(&page_payload(&[("U1", json!("x".repeat(501)))]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.received_bodies(INFERENCE_PATH).await.is_empty());
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", REJECTED_MESSAGE_REPLY)]
    );
}

#[tokio::test]
async fn non_string_text_gets_apology() {
    let app = TestApp::spawn().await;
    app.mock_send_api().await;

    let response = app.post_webhook(&page_payload(&[("U1", json!(42))])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.received_bodies(INFERENCE_PATH).await.is_empty());
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", REJECTED_MESSAGE_REPLY)]
    );
}

#[tokio::test]
async fn inference_error_status_sends_fallback() {
    let app = TestApp::spawn().await;
    app.mock_inference(ResponseTemplate::new(503).set_body_string("model is loading"))
        .await;
    app.mock_send_api().await;

    let response = app.post_webhook(&page_payload(&[("U1", json!("hi"))])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", INFERENCE_FALLBACK_REPLY)]
    );
}

#[tokio::test]
async fn inference_timeout_sends_fallback() {
    let app = TestApp::spawn_with_timeout(1).await;
    app.mock_inference(
        ResponseTemplate::new(200)
            .set_body_json(json!([{"generated_text": "too late"}]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    app.mock_send_api().await;

    let response = app.post_webhook(&page_payload(&[("U1", json!("hi"))])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", INFERENCE_FALLBACK_REPLY)]
    );
}

#[tokio::test]
async fn send_failure_is_still_acknowledged() {
    let app = TestApp::spawn().await;
    app.mock_inference(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "ok"}])))
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_API_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "(#100) No matching user found", "code": 100}
        })))
        .expect(2)
        .mount(&app.mock_server)
        .await;

    let response = app
        .post_webhook(&page_payload(&[("U1", json!("one")), ("U2", json!("two"))]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn messages_are_relayed_in_order() {
    let app = TestApp::spawn().await;
    app.mock_inference(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "ack"}])))
        .await;
    app.mock_send_api().await;

    app.post_webhook(&page_payload(&[
        ("U1", json!("first")),
        ("U2", json!("second")),
        ("U3", json!("third")),
    ]))
    .await;

    assert_eq!(
        app.received_bodies(INFERENCE_PATH).await,
        vec![
            json!({"inputs": "first"}),
            json!({"inputs": "second"}),
            json!({"inputs": "third"})
        ]
    );
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![
            reply_body("U1", "ack"),
            reply_body("U2", "ack"),
            reply_body("U3", "ack")
        ]
    );
}

#[tokio::test]
async fn invalid_json_body_is_server_error() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/webhook", app.address))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Error");
    assert!(app.mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn odd_event_does_not_block_the_rest_of_the_batch() {
    let app = TestApp::spawn().await;
    app.mock_inference(ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "hey"}])))
        .await;
    app.mock_send_api().await;

    let response = app
        .post_webhook(&json!({
            "object": "page",
            "entry": [{"messaging": [
                {"sender": {"id": "U1"}, "message": {"text": "hi"}},
                {"sender": {"id": 99}, "message": {"mid": 7, "text": "yo"}}
            ]}]
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.received_bodies(SEND_API_PATH).await,
        vec![reply_body("U1", "hey")]
    );
}

#[tokio::test]
async fn non_object_body_is_server_error() {
    let app = TestApp::spawn().await;

    for body in [json!([]), json!(null), json!("x"), json!(5)] {
        let response = app.post_webhook(&body).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "body = {body}");
        assert_eq!(response.text().await.unwrap(), "Error");
    }
    assert!(app.mock_server.received_requests().await.unwrap().is_empty());
}
