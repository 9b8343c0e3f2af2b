//! Tests for the Mailgun sender against a stubbed HTTP API.

use mailer_mailgun::{
    Action, Composer, DeliveryConfig, DeliveryOutcome, Dispatcher, Event, MailError, MailSender,
    MailgunClient, OutgoingMail,
};
use serde_json::json;
use std::time::Duration;
use time::UtcOffset;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mail() -> OutgoingMail {
    OutgoingMail {
        from: "sensu@example.com".to_string(),
        to: "ops@example.com".to_string(),
        subject: "ALERT - web01/disk_full: disk 95% full".to_string(),
        text: "DISK CRITICAL\nHost: web01\n".to_string(),
    }
}

fn queued() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "<20231114221320.1.ABC@mg.example.com>",
        "message": "Queued. Thank you."
    }))
}

#[tokio::test]
async fn test_send_message_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mg.example.com/messages"))
        .and(header("authorization", "Basic YXBpOmtleS0xMjM="))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("from=sensu%40example.com"))
        .and(body_string_contains("to=ops%40example.com"))
        .and(body_string_contains(
            "subject=ALERT+-+web01%2Fdisk_full%3A+disk+95%25+full",
        ))
        .and(body_string_contains("text=DISK+CRITICAL%0AHost%3A+web01%0A"))
        .respond_with(queued())
        .expect(1)
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("key-123", server.uri()).unwrap();
    client
        .send_message("mg.example.com", &mail())
        .await
        .expect("send failed");
}

#[tokio::test]
async fn test_rejected_message_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mg.example.com/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("wrong-key", server.uri()).unwrap();
    let err = client
        .send_message("mg.example.com", &mail())
        .await
        .unwrap_err();

    match err {
        MailError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Forbidden");
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("key-123", server.uri()).unwrap();
    let err = client
        .send_message("mg.example.com", &mail())
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::Api { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    // Nothing listens on the discard port on loopback.
    let client = MailgunClient::with_base_url("key-123", "http://127.0.0.1:9").unwrap();
    let err = client
        .send_message("mg.example.com", &mail())
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::Transport(_)));
}

#[tokio::test]
async fn test_invalid_base_url_is_request_error() {
    let client = MailgunClient::with_base_url("key-123", "not a url").unwrap();
    let err = client
        .send_message("mg.example.com", &mail())
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::Request(_)));
}

// =============================================================================
// Dispatcher + Mailgun end to end
// =============================================================================

fn event() -> Event {
    Event {
        client_name: "web01".to_string(),
        client_address: "10.0.0.5".to_string(),
        check_name: "disk_full".to_string(),
        check_output: "DISK CRITICAL".to_string(),
        check_command: "check-disk".to_string(),
        check_status: "2".to_string(),
        check_issued: 1_700_000_000,
        notification: "disk 95% full".to_string(),
        occurrences: 3,
        action: Action::Create,
    }
}

fn delivery() -> DeliveryConfig {
    DeliveryConfig {
        mail_from: "sensu@example.com".to_string(),
        mail_to: "ops@example.com".to_string(),
        mg_apikey: "key-123".to_string(),
        mg_domain: "mg.example.com".to_string(),
        subject_prefix: None,
    }
}

#[tokio::test]
async fn test_dispatch_through_mailgun_stub() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mg.example.com/messages"))
        .and(body_string_contains("Occurrences%3A++3"))
        .respond_with(queued())
        .expect(1)
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("key-123", server.uri()).unwrap();
    let dispatcher = Dispatcher::new(client, Duration::from_secs(5));
    let outcome = dispatcher
        .notify(&Composer::with_offset(UtcOffset::UTC), &event(), &delivery())
        .await
        .unwrap();

    assert!(outcome.is_sent());
}

#[tokio::test]
async fn test_slow_mailgun_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(queued().set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("key-123", server.uri()).unwrap();
    let dispatcher = Dispatcher::new(client, Duration::from_millis(200));
    let outcome = dispatcher
        .notify(&Composer::with_offset(UtcOffset::UTC), &event(), &delivery())
        .await
        .unwrap();

    match outcome {
        DeliveryOutcome::TimedOut { short_name, action } => {
            assert_eq!(short_name, "web01/disk_full");
            assert_eq!(action, Action::Create);
        }
        other => panic!("Unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_dispatch_reports_rejection_as_send_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("'to' parameter is not a valid address"))
        .mount(&server)
        .await;

    let client = MailgunClient::with_base_url("key-123", server.uri()).unwrap();
    let dispatcher = Dispatcher::new(client, Duration::from_secs(5));
    let outcome = dispatcher
        .notify(&Composer::with_offset(UtcOffset::UTC), &event(), &delivery())
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DeliveryOutcome::SendFailed {
            error: MailError::Api { status: 400, .. },
            ..
        }
    ));
}
