//! Integration tests for the verification flow against the OTP providers

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use otp_core::domain::{Channel, FlowPhase};
    use otp_core::errors::{messages, ErrorKind};
    use otp_core::services::verification::{
        CodeDeliveryService, CodeVerificationService, FlowConfig, TokioScheduler,
        VerificationFlow,
    };
    use otp_infra::{create_otp_services, HttpOtpClient, MockOtpService, OtpServices};
    use otp_shared::config::{Environment, OtpServiceConfig};

    type DynFlow = VerificationFlow<dyn CodeDeliveryService, dyn CodeVerificationService>;

    fn fast_config() -> FlowConfig {
        FlowConfig {
            sms_countdown_secs: 2,
            voice_countdown_secs: 3,
            tick_interval: Duration::from_millis(20),
            request_timeout: Some(Duration::from_secs(5)),
            ..FlowConfig::default()
        }
    }

    fn build_flow(services: &OtpServices) -> DynFlow {
        VerificationFlow::new(
            services.delivery.clone(),
            services.verifier.clone(),
            Arc::new(TokioScheduler::try_current().expect("runtime")),
            fast_config(),
        )
    }

    async fn wait_for_phase(flow: &DynFlow, phase: FlowPhase) {
        let mut snapshots = flow.subscribe();
        tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.phase == phase))
            .await
            .expect("phase not reached in time")
            .expect("flow dropped");
    }

    #[tokio::test]
    async fn test_http_provider_voice_fallback_and_verification() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send-otp"))
            .and(body_string("phone=%2B919876543210&method=sms"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true,"status":"pending"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send-otp"))
            .and(body_string("phone=%2B919876543210&method=call"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true,"status":"pending"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/verify-otp"))
            .and(body_string("phone=%2B919876543210&code=246810"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true,"status":"approved"}"#))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/verify-otp"))
            .and(body_string("phone=%2B919876543210&code=111111"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":false,"status":"Invalid OTP"}"#))
            .mount(&mock_server)
            .await;

        let client = Arc::new(HttpOtpClient::new(OtpServiceConfig::http(mock_server.uri())).unwrap());
        let services = OtpServices::from_provider(client, "http");
        let flow = build_flow(&services);

        flow.submit_phone_number("98765 43210").await.unwrap();
        assert_eq!(flow.snapshot().phase, FlowPhase::AwaitingCode);

        let mut snapshots = flow.subscribe();
        tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.fallback_offered))
            .await
            .expect("countdown did not expire")
            .unwrap();

        assert!(flow.switch_to_voice().await);
        assert_eq!(flow.snapshot().channel, Channel::Voice);

        assert!(flow.paste_code("111111").await.is_err());
        let session = flow.snapshot();
        assert_eq!(session.last_error_message.as_deref(), Some("Invalid OTP"));
        assert!(session.code_digits.is_blank());

        for (index, digit) in "246810".chars().enumerate() {
            let _ = flow.set_digit(index, &digit.to_string()).await;
        }
        assert_eq!(flow.snapshot().phase, FlowPhase::Verified);
    }

    #[tokio::test]
    async fn test_http_provider_outage_surfaces_network_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/send-otp"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        let config = OtpServiceConfig::http(mock_server.uri());
        let services = create_otp_services(&config, Environment::Production).unwrap();
        let flow = build_flow(&services);

        assert!(flow.submit_phone_number("9876543210").await.is_err());

        let session = flow.snapshot();
        assert_eq!(session.phase, FlowPhase::AwaitingPhone);
        assert_eq!(session.last_error, Some(ErrorKind::DeliveryUnavailable));
        assert_eq!(
            session.last_error_message.as_deref(),
            Some(messages::DELIVERY_UNREACHABLE)
        );
    }

    #[tokio::test]
    async fn test_mock_provider_end_to_end() {
        let mock = Arc::new(MockOtpService::new());
        let services = OtpServices::from_provider(mock.clone(), "mock");
        let flow = build_flow(&services);

        flow.submit_phone_number("+91 6123456789").await.unwrap();
        let code = mock.last_code("+916123456789").expect("code delivered");

        // Let the countdown run out, then ask for a fresh code
        wait_until_resend(&flow).await;
        assert!(flow.resend().await);
        let fresh = mock.last_code("+916123456789").unwrap();
        assert_eq!(mock.deliveries().len(), 2);

        if fresh != code {
            assert!(flow.paste_code(&code).await.is_err());
        }
        flow.paste_code(&fresh).await.unwrap();
        wait_for_phase(&flow, FlowPhase::Verified).await;
    }

    async fn wait_until_resend(flow: &DynFlow) {
        let mut snapshots = flow.subscribe();
        tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(|s| s.resend_available))
            .await
            .expect("resend never offered")
            .unwrap();
    }
}
