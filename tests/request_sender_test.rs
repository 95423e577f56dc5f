//! Request Sender Integration Tests
//!
//! Verifies that `HttpRequestSender` injects authentication and client
//! identification, encodes bodies and maps failures.

#[cfg(test)]
mod tests {
    use asset_uploadr::client::{HttpRequestSender, RequestOptions, RequestSender, SendError};
    use asset_uploadr::config::ApiConfig;
    use bytes::Bytes;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_bytes, body_string, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sender_for(server: &MockServer) -> HttpRequestSender {
        HttpRequestSender::builder()
            .base_url(&server.uri())
            .token("secret-token")
            .user_agent("asset-uploadr-test/1.0")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_injects_auth_and_client_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/prepare"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header("user-agent", "asset-uploadr-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "abc" })))
            .expect(1)
            .mount(&server)
            .await;

        let response = sender_for(&server)
            .send(
                Method::POST,
                "v7/file_cmds/upload/prepare",
                RequestOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(response["fileId"], "abc");
    }

    #[tokio::test]
    async fn test_no_token_sends_no_authorization() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pong": true })))
            .mount(&server)
            .await;

        let sender = HttpRequestSender::builder()
            .base_url(&server.uri())
            .build()
            .unwrap();
        let response = sender
            .send(Method::GET, "/ping", RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(response, json!({ "pong": true }));
    }

    #[tokio::test]
    async fn test_bytes_body_and_custom_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/f1/chunk/0"))
            .and(header("content-sha256", "deadbeef"))
            .and(body_bytes(b"raw chunk".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let options = RequestOptions::new()
            .header("content-sha256", "deadbeef")
            .bytes(Bytes::from_static(b"raw chunk"));
        let response = sender_for(&server)
            .send(Method::POST, "v7/file_cmds/upload/f1/chunk/0", options)
            .await
            .unwrap();

        assert_eq!(response, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_form_body_is_urlencoded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/media/save/f1"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("brandId=b1&name=Summer+2024"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let options = RequestOptions::new().form([("brandId", "b1"), ("name", "Summer 2024")]);
        let response = sender_for(&server)
            .send(Method::POST, "api/v4/media/save/f1", options)
            .await
            .unwrap();

        assert_eq!(response["success"], true);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let result = sender_for(&server)
            .send(Method::POST, "anything", RequestOptions::new())
            .await;

        match result {
            Err(SendError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&server)
            .await;

        let result = sender_for(&server)
            .send(Method::POST, "anything", RequestOptions::new())
            .await;

        assert!(matches!(result, Err(SendError::Decode(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_request_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let sender = HttpRequestSender::builder()
            .base_url(&server.uri())
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let result = sender
            .send(Method::POST, "slow", RequestOptions::new())
            .await;

        assert!(matches!(result, Err(SendError::Request(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let sender = HttpRequestSender::builder()
            .base_url("http://127.0.0.1:19999")
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();

        let result = sender
            .send(Method::POST, "v7/file_cmds/upload/prepare", RequestOptions::new())
            .await;

        assert!(matches!(result, Err(SendError::Request(_))));
    }

    #[tokio::test]
    async fn test_from_config() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v7/file_cmds/upload/prepare"))
            .and(header("authorization", "Bearer cfg-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "x" })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiConfig {
            base_url: server.uri(),
            token: Some("cfg-token".into()),
            timeout_seconds: 5,
            user_agent: "asset-uploadr/test".into(),
        };
        let sender = HttpRequestSender::from_config(&config).unwrap();
        let response = sender
            .send(
                Method::POST,
                "v7/file_cmds/upload/prepare",
                RequestOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(response["fileId"], "x");
    }
}
