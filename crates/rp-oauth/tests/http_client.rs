//! ReqwestHttpClient against a local mock token endpoint

use rp_oauth::{HttpClient, ReqwestHttpClient};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn post_form_sends_urlencoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"access_token":"bearer-token"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let response = client
        .post_form(
            &format!("{}/token", server.uri()),
            &[
                ("grant_type", "authorization_code"),
                ("client_id", "0000000040170455"),
                ("code", "abc123"),
                ("redirect_uri", "https://login.live.com/oauth20_desktop.srf"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.body.contains("bearer-token"));
}

#[tokio::test]
async fn post_form_passes_error_statuses_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestHttpClient::new();
    let response = client
        .post_form(&format!("{}/token", server.uri()), &[("code", "expired")])
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    assert!(response.body.contains("invalid_grant"));
}
