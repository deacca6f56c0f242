//! Identity API client against a mock server

use std::time::Duration;

use portal::PortalError;
use portal::identity::{IdentityApi, IdentityClient};
use portal::models::{Credentials, OtpVerification, User};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> IdentityClient {
    IdentityClient::new(&server.uri(), Duration::from_secs(5)).expect("client")
}

fn credentials() -> Credentials {
    Credentials {
        email: "ana@example.com".to_string(),
        password: "s3cret!".to_string(),
    }
}

#[tokio::test]
async fn test_login_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ana@example.com", "password": "s3cret!"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "OTP sent"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pending = client(&server).login(&credentials()).await.unwrap();
    assert_eq!(pending.message.as_deref(), Some("OTP sent"));
}

#[tokio::test]
async fn test_register_accepts_empty_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let pending = client(&server).register(&credentials()).await.unwrap();
    assert_eq!(pending.message, None);
}

#[tokio::test]
async fn test_credential_error_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Contraseña incorrecta"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).login(&credentials()).await.unwrap_err();
    match err {
        PortalError::Api { status, message } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "Contraseña incorrecta");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_without_message_uses_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .verify_otp(&OtpVerification {
            email: "ana@example.com".to_string(),
            code: "123456".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.to_string(), "Invalid OTP code");
}

#[tokio::test]
async fn test_verify_otp_returns_user_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verify-otp"))
        .and(body_json(json!({"email": "ana@example.com", "code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "42", "email": "ana@example.com", "role": "admin"},
            "token": "jwt-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = client(&server)
        .verify_otp(&OtpVerification {
            email: "ana@example.com".to_string(),
            code: "123456".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        auth.user,
        User::new("42")
            .with_email("ana@example.com")
            .with_role("admin")
    );
    assert_eq!(auth.token, "jwt-token");
}

#[tokio::test]
async fn test_request_otp_posts_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/request-otp"))
        .and(body_json(json!({"email": "ana@example.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .request_otp("ana@example.com")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validate_token_uses_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(header("authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.validate_token("42", "good").await.is_ok());

    let err = client.validate_token("42", "revoked").await.unwrap_err();
    assert!(matches!(err, PortalError::Api { status, .. } if status == StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_register_tolerates_unreadable_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let pending = client(&server).register(&credentials()).await.unwrap();
    assert_eq!(pending.message, None);
}

#[tokio::test]
async fn test_validate_token_keeps_user_id_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/users/[^/]+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .validate_token("../admin?all=1", "tok")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = IdentityClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();

    let err = client.validate_token("42", "tok").await.unwrap_err();
    assert!(matches!(err, PortalError::Http(_)));
}
