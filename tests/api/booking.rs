use crate::helpers::{booking_body, spawn_app, spawn_unconfigured_app, TestApp};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mailgun_messages() -> wiremock::matchers::PathExactMatcher {
    path("/v3/sandbox.mailgun.test/messages")
}

fn accepted_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "abc123",
        "message": "Queued. Thank you."
    }))
}

/// The form fields of the one request the mock provider received.
async fn sent_form_fields(email_server: &MockServer) -> HashMap<String, String> {
    let requests = email_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_urlencoded::from_bytes(&requests[0].body).expect("Provider body was not form-encoded")
}

fn assert_cors_headers(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert_eq!(headers["access-control-max-age"], "86400");
}

async fn options_request(app: &TestApp, origin: Option<&str>) -> reqwest::Response {
    let mut request = reqwest::Client::new().request(
        reqwest::Method::OPTIONS,
        &format!("{}/booking-email", &app.address),
    );
    if let Some(origin) = origin {
        request = request.header("Origin", origin);
    }
    request.send().await.expect("Failed to execute request.")
}

#[tokio::test]
async fn preflight_returns_204_with_cors_headers_and_no_body() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = options_request(&app, None).await;

    // Assert
    assert_eq!(204, response.status().as_u16());
    assert_cors_headers(&response);
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn preflight_ignores_the_origin_allow_list() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = options_request(&app, Some("https://evil.example.com")).await;

    // Assert
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
async fn non_post_methods_are_rejected_with_a_405() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let test_cases = vec![
        reqwest::Method::GET,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
        reqwest::Method::PATCH,
    ];

    for invalid_method in test_cases {
        // Act
        let response = client
            .request(
                invalid_method.clone(),
                &format!("{}/booking-email", &app.address),
            )
            .send()
            .await
            .expect("Failed to execute request.");

        // Assert
        assert_eq!(
            405,
            response.status().as_u16(),
            "The API did not return a 405 for {}.",
            invalid_method
        );
        assert_cors_headers(&response);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Method not allowed");
    }
}

#[tokio::test]
async fn submissions_from_an_unknown_origin_are_rejected_with_a_403() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(accepted_response())
        .expect(0)
        .mount(&app.email_server)
        .await;

    // Act
    let response = reqwest::Client::new()
        .post(&format!("{}/booking-email", &app.address))
        .header("Origin", "https://evil.example.com")
        .json(&booking_body())
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(403, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Origin not allowed");
}

#[tokio::test]
async fn allowed_null_and_absent_origins_are_all_accepted() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    // `http://localhost:5173` is on the local allow-list; an empty or
    // literal-"null" origin covers curl and server-to-server callers.
    let test_cases = vec![
        Some("http://localhost:5173"),
        Some("null"),
        Some(""),
        None,
    ];

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .expect(test_cases.len() as u64)
        .mount(&app.email_server)
        .await;

    for origin in test_cases {
        // Act
        let mut request = client
            .post(&format!("{}/booking-email", &app.address))
            .json(&booking_body());
        if let Some(origin) = origin {
            request = request.header("Origin", origin);
        }
        let response = request.send().await.expect("Failed to execute request.");

        // Assert
        assert_eq!(
            200,
            response.status().as_u16(),
            "The API rejected origin {:?}.",
            origin
        );
    }
}

#[tokio::test]
async fn a_non_json_content_type_is_rejected_with_a_415() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = reqwest::Client::new()
        .post(&format!("{}/booking-email", &app.address))
        .header("Content-Type", "text/plain")
        .body(booking_body().to_string())
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(415, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid content type");
}

#[tokio::test]
async fn a_malformed_body_surfaces_as_a_generic_500() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let test_cases = vec![
        ("{not json", "truncated document"),
        ("[1, 2, 3]", "non-object document"),
        ("", "empty body"),
    ];

    for (invalid_body, description) in test_cases {
        // Act
        let response = client
            .post(&format!("{}/booking-email", &app.address))
            .header("Content-Type", "application/json")
            .body(invalid_body)
            .send()
            .await
            .expect("Failed to execute request.");

        // Assert
        assert_eq!(
            500,
            response.status().as_u16(),
            "The API did not return a 500 for a {}.",
            description
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Server error");
    }
}

#[tokio::test]
async fn a_filled_honeypot_gets_a_fake_success_and_no_email_is_sent() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(accepted_response())
        .expect(0)
        .mount(&app.email_server)
        .await;

    let mut body = booking_body();
    body["hp_trap"] = serde_json::json!("https://spam.example.com");

    // Act
    let response = app.post_booking(&body).await;

    // Assert
    // Indistinguishable from a real success: the bot must learn nothing.
    assert_eq!(200, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Thanks!");
    assert_eq!(body.get("note"), None);
}

#[tokio::test]
async fn a_valid_submission_is_relayed_and_the_provider_id_is_surfaced() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_booking(&booking_body()).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["mailgunId"], "abc123");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn the_relayed_email_carries_the_submitted_fields() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .mount(&app.email_server)
        .await;

    // Act
    app.post_booking(&booking_body()).await;

    // Assert
    let fields = sent_form_fields(&app.email_server).await;
    assert_eq!(
        fields["subject"],
        "[ViBE Design] Website Consultation Request from Ada Lovelace"
    );
    assert!(fields["text"].contains("Name: Ada Lovelace"));
    assert!(fields["text"].contains("Selected Plan: Launch"));
    assert!(fields["html"].contains("Ada Lovelace"));
    assert!(!fields["from"].is_empty());
    assert!(!fields["to"].is_empty());
}

#[tokio::test]
async fn an_empty_name_falls_back_to_unknown_in_the_subject() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .mount(&app.email_server)
        .await;

    // Act
    app.post_booking(&serde_json::json!({
        "projectDetails": "No name given."
    }))
    .await;

    // Assert
    let fields = sent_form_fields(&app.email_server).await;
    assert_eq!(
        fields["subject"],
        "[ViBE Design] Website Consultation Request from Unknown"
    );
}

#[tokio::test]
async fn oversized_fields_are_capped_before_they_reach_the_provider() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .mount(&app.email_server)
        .await;

    let mut body = booking_body();
    body["projectDetails"] = serde_json::json!("x".repeat(3000));

    // Act
    app.post_booking(&body).await;

    // Assert
    let fields = sent_form_fields(&app.email_server).await;
    assert!(fields["text"].contains(&"x".repeat(2000)));
    assert!(!fields["text"].contains(&"x".repeat(2001)));
}

#[tokio::test]
async fn user_supplied_markup_is_escaped_in_the_html_body_only() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(accepted_response())
        .mount(&app.email_server)
        .await;

    let mut body = booking_body();
    body["name"] = serde_json::json!("<script>alert(1)</script>");

    // Act
    app.post_booking(&body).await;

    // Assert
    let fields = sent_form_fields(&app.email_server).await;
    assert!(fields["html"].contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!fields["html"].contains("<script>"));
    assert!(fields["text"].contains("Name: <script>alert(1)</script>"));
}

#[tokio::test]
async fn a_provider_rejection_surfaces_as_a_502() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(mailgun_messages())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_booking(&booking_body()).await;

    // Assert
    assert_eq!(502, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to send email via Mailgun");
}

#[tokio::test]
async fn missing_credentials_soft_degrade_to_a_logged_submission() {
    // Arrange
    let app = spawn_unconfigured_app().await;

    Mock::given(method("POST"))
        .respond_with(accepted_response())
        .expect(0)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_booking(&booking_body()).await;

    // Assert
    // The public form must never fail because operator setup is incomplete.
    assert_eq!(200, response.status().as_u16());
    assert_cors_headers(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert!(body["note"].as_str().unwrap().contains("not configured"));
}
