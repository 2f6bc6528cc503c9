#![allow(clippy::unwrap_used)]
// Integration tests for `ReolinkClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use certship_api::{Error, ReolinkClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ReolinkClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ReolinkClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn login_ok(token: &str) -> serde_json::Value {
    json!([{
        "cmd": "Login",
        "code": 0,
        "value": { "Token": { "leaseTime": 3600, "name": token } }
    }])
}

fn secret(s: &str) -> SecretString {
    s.to_owned().into()
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_ok(token)))
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_stores_token() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1").await;

    assert!(!client.is_logged_in());
    client.login("admin", &secret("camera-pass")).await.unwrap();
    assert!(client.is_logged_in());
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "Login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "Login",
            "code": 1,
            "error": { "rspCode": -7, "detail": "login failed" }
        }])))
        .mount(&server)
        .await;

    let result = client.login("admin", &secret("wrong")).await;

    match result {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("-7"), "missing rspCode in: {message}");
            assert!(message.contains("login failed"));
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn test_commands_require_login() {
    let (_server, client) = setup().await;

    let result = client.device_info().await;
    assert!(matches!(result, Err(Error::NotLoggedIn)));
}

// ── Device info ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_info() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-2").await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "GetDevInfo"))
        .and(query_param("token", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "GetDevInfo",
            "code": 0,
            "value": { "DevInfo": {
                "name": "Driveway",
                "model": "RLC-810A",
                "firmVer": "v3.1.0.764"
            }}
        }])))
        .mount(&server)
        .await;

    client.login("admin", &secret("pw")).await.unwrap();
    let info = client.device_info().await.unwrap();

    assert_eq!(info.name, "Driveway");
    assert_eq!(info.model, "RLC-810A");
}

// ── Certificate operations ──────────────────────────────────────────

#[tokio::test]
async fn test_import_certificate_accepted() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-3").await;

    // The payload must carry base64 content under importCertificate.
    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "ImportCertificate"))
        .and(body_partial_json(json!([{
            "cmd": "ImportCertificate",
            "param": { "importCertificate": {
                "crt": { "name": "server.crt" },
                "key": { "name": "server.key" }
            }}
        }])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "cmd": "ImportCertificate", "code": 0 }])),
        )
        .mount(&server)
        .await;

    client.login("admin", &secret("pw")).await.unwrap();
    let ok = client
        .import_certificate("CERT PEM", &secret("KEY PEM"), "server")
        .await
        .unwrap();

    assert!(ok);
}

#[tokio::test]
async fn test_import_certificate_rejected_is_ok_false() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-4").await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "ImportCertificate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "ImportCertificate",
            "code": 1,
            "error": { "rspCode": -502, "detail": "cert check failed" }
        }])))
        .mount(&server)
        .await;

    client.login("admin", &secret("pw")).await.unwrap();
    let ok = client
        .import_certificate("CERT PEM", &secret("KEY PEM"), "server")
        .await
        .unwrap();

    // Device verdict is authoritative, not a transport error.
    assert!(!ok);
}

#[tokio::test]
async fn test_clear_certificates_error_code() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-5").await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "CertificateClear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "cmd": "CertificateClear",
            "code": 1,
            "error": { "rspCode": -9, "detail": "not supported" }
        }])))
        .mount(&server)
        .await;

    client.login("admin", &secret("pw")).await.unwrap();
    let result = client.clear_certificates().await;

    match result {
        Err(Error::CameraApi {
            command, rsp_code, ..
        }) => {
            assert_eq!(command, "CertificateClear");
            assert_eq!(rsp_code, -9);
        }
        other => panic!("expected CameraApi error, got: {other:?}"),
    }
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_token_even_on_error() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-6").await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .and(query_param("cmd", "Logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    client.login("admin", &secret("pw")).await.unwrap();
    let result = client.logout().await;

    assert!(result.is_err());
    assert!(!client.is_logged_in());
}

// ── Envelope edge cases ─────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = client.login("admin", &secret("pw")).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}
