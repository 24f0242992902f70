//! Unit tests for the HTTP OTP client

use reqwest::StatusCode;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use otp_core::domain::Channel;
use otp_core::errors::ServiceError;
use otp_core::services::verification::{CodeDeliveryService, CodeVerificationService};
use otp_shared::config::OtpServiceConfig;

use crate::otp::http_client::parse_reply;
use crate::otp::HttpOtpClient;

fn create_test_client(mock_server: &MockServer) -> HttpOtpClient {
    HttpOtpClient::new(OtpServiceConfig::http(mock_server.uri())).expect("failed to create client")
}

#[tokio::test]
async fn test_send_sms_posts_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send-otp"))
        .and(body_string("phone=%2B919876543210&method=sms"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"success":true,"status":"pending"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client
        .send("+919876543210", Channel::Sms)
        .await
        .expect("send failed");

    assert!(reply.success);
    assert_eq!(reply.status.as_deref(), Some("pending"));
}

#[tokio::test]
async fn test_send_voice_uses_call_method() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send-otp"))
        .and(body_string("phone=%2B919876543210&method=call"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client.send("+919876543210", Channel::Voice).await.unwrap();

    assert!(reply.success);
    assert_eq!(reply.status, None);
}

#[tokio::test]
async fn test_configurable_voice_method() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/otp/send"))
        .and(body_string("phone=%2B919876543210&method=voice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = OtpServiceConfig {
        send_path: "/otp/send".to_string(),
        voice_method: "voice".to_string(),
        ..OtpServiceConfig::http(mock_server.uri())
    };
    let client = HttpOtpClient::new(config).unwrap();

    assert_eq!(client.wire_method(Channel::Sms), "sms");
    assert!(client.send("+919876543210", Channel::Voice).await.unwrap().success);
}

#[tokio::test]
async fn test_verify_posts_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/verify-otp"))
        .and(body_string("phone=%2B919876543210&code=123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true,"status":"approved"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client.verify("+919876543210", "123456").await.unwrap();

    assert!(reply.success);
}

#[tokio::test]
async fn test_verify_rejection_carries_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/verify-otp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"success":false,"status":"Invalid OTP"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client.verify("+919876543210", "000000").await.unwrap();

    assert!(!reply.success);
    assert_eq!(reply.status.as_deref(), Some("Invalid OTP"));
}

#[tokio::test]
async fn test_error_status_with_json_is_an_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send-otp"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string(r#"{"success":false,"status":"Too many requests"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client.send("+919876543210", Channel::Sms).await.unwrap();

    assert!(!reply.success);
    assert_eq!(reply.status.as_deref(), Some("Too many requests"));
}

#[tokio::test]
async fn test_server_error_without_json_is_unreachable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send-otp"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.send("+919876543210", Channel::Sms).await;

    assert!(matches!(result, Err(ServiceError::Unreachable(_))));
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let client = HttpOtpClient::new(OtpServiceConfig::http(uri)).unwrap();
    let result = client.verify("+919876543210", "123456").await;

    assert!(matches!(result, Err(ServiceError::Unreachable(_))));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send-otp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"success":true}"#)
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = OtpServiceConfig {
        timeout_secs: 1,
        ..OtpServiceConfig::http(mock_server.uri())
    };
    let client = HttpOtpClient::new(config).unwrap();
    let result = client.send("+919876543210", Channel::Sms).await;

    assert!(matches!(result, Err(ServiceError::Timeout(_))));
}

#[test]
fn test_parse_reply_malformed_success_body() {
    let result = parse_reply(StatusCode::OK, "<html>ok</html>");
    assert!(matches!(result, Err(ServiceError::MalformedResponse(_))));

    let result = parse_reply(StatusCode::OK, r#"{"status":"missing success"}"#);
    assert!(matches!(result, Err(ServiceError::MalformedResponse(_))));
}

#[test]
fn test_parse_reply_ignores_extra_fields() {
    let reply = parse_reply(
        StatusCode::OK,
        r#"{"success":true,"status":"pending","sid":"VE123","valid":false}"#,
    )
    .unwrap();
    assert!(reply.success);
    assert_eq!(reply.status.as_deref(), Some("pending"));
}
