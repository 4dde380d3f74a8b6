//! Integration tests for the Langbase backend
//!
//! Tests HTTP client behavior and the step generator using wiremock for
//! request/response mocking.

use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use deep_thinking::config::{LangbaseConfig, RequestConfig};
use deep_thinking::error::{LangbaseError, ProviderError};
use deep_thinking::generation::{GenerationRequest, TextGenerator};
use deep_thinking::langbase::{LangbaseClient, LangbaseGenerator, Message, PipeRequest};

/// Create a test client pointing to mock server
fn create_test_client(base_url: &str, max_retries: u32) -> LangbaseClient {
    let config = LangbaseConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries,
        retry_delay_ms: 10,
    };

    LangbaseClient::new(&config, request_config).expect("Failed to create client")
}

fn create_test_request(content: &str) -> PipeRequest {
    PipeRequest::new("step-pipe", vec![Message::user(content)])
}

fn step_body(completion: &str, completion_tokens: u32) -> serde_json::Value {
    json!({
        "success": true,
        "completion": completion,
        "threadId": "thread-1",
        "raw": {
            "model": "gpt-4o-mini",
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": completion_tokens,
                "total_tokens": 120 + completion_tokens
            }
        }
    })
}

mod pipe_call_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_pipe_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(json!({"name": "step-pipe", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(step_body("A step.", 12)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        let response = client
            .call_pipe(create_test_request("Next step"))
            .await
            .expect("Pipe call should succeed");

        assert!(response.success);
        assert_eq!(response.completion, "A step.");
        assert_eq!(response.completion_tokens(), Some(12));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 3);
        let result = client.call_pipe(create_test_request("x")).await;

        match result {
            Err(LangbaseError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_on_server_error_then_succeed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(step_body("Recovered.", 5)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2);
        let response = client.call_pipe(create_test_request("x")).await.unwrap();
        assert_eq!(response.completion, "Recovered.");
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 2);
        let result = client.call_pipe(create_test_request("x")).await;

        match result {
            Err(LangbaseError::Unavailable { retries, .. }) => assert_eq!(retries, 2),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        let result = client.call_pipe(create_test_request("x")).await;
        assert!(matches!(result, Err(LangbaseError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(step_body("late", 1))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&mock_server)
            .await;

        let config = LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: mock_server.uri(),
        };
        let request_config = RequestConfig {
            timeout_ms: 100,
            max_retries: 0,
            retry_delay_ms: 10,
        };
        let client = LangbaseClient::new(&config, request_config).unwrap();

        let result = client.call_pipe(create_test_request("x")).await;
        assert!(result.is_err(), "Should timeout");
    }
}

mod pipe_setup_tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_reasoning_pipe_upserts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .and(body_partial_json(json!({
                "name": "deep-thinking-step-v1",
                "upsert": true,
                "json": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "deep-thinking-step-v1",
                "status": "private",
                "url": "https://langbase.com/p/deep-thinking-step-v1"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        client
            .ensure_reasoning_pipe("deep-thinking-step-v1")
            .await
            .expect("pipe should be ensured");
    }

    #[tokio::test]
    async fn test_ensure_reasoning_pipe_accepts_conflict() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .respond_with(ResponseTemplate::new(409).set_body_string("exists"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        assert!(client.ensure_reasoning_pipe("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_reasoning_pipe_propagates_other_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri(), 0);
        let result = client.ensure_reasoning_pipe("p").await;
        assert!(matches!(result, Err(LangbaseError::Api { status: 403, .. })));
    }
}

mod generator_tests {
    use super::*;

    #[tokio::test]
    async fn test_generator_parses_json_step() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .and(body_partial_json(json!({"name": "step-pipe", "max_tokens": 64})))
            .respond_with(ResponseTemplate::new(200).set_body_json(step_body(
                r#"{"step": "Therefore the energy is stored as ATP.", "confidence": 0.82}"#,
                21,
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generator =
            LangbaseGenerator::new(create_test_client(&mock_server.uri(), 0), "step-pipe");
        let generation = generator
            .generate(GenerationRequest::reasoning("prompt", 64))
            .await
            .unwrap();

        assert_eq!(generation.content, "Therefore the energy is stored as ATP.");
        assert_eq!(generation.confidence, Some(0.82));
        assert_eq!(generation.tokens_used, Some(21));
    }

    #[tokio::test]
    async fn test_generator_falls_back_to_raw_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "completion": "Consider the light reactions first.",
                "threadId": null,
                "raw": null
            })))
            .mount(&mock_server)
            .await;

        let generator =
            LangbaseGenerator::new(create_test_client(&mock_server.uri(), 0), "step-pipe");
        let generation = generator
            .generate(GenerationRequest::reasoning("prompt", 64))
            .await
            .unwrap();

        assert_eq!(generation.content, "Consider the light reactions first.");
        assert_eq!(generation.confidence, None);
        assert_eq!(generation.tokens_used, None);
    }

    #[tokio::test]
    async fn test_generator_rejects_empty_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(step_body("   ", 0)))
            .mount(&mock_server)
            .await;

        let generator =
            LangbaseGenerator::new(create_test_client(&mock_server.uri(), 0), "step-pipe");
        let result = generator
            .generate(GenerationRequest::reasoning("prompt", 64))
            .await;
        assert!(matches!(result, Err(ProviderError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_generator_maps_backend_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/pipes/run"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&mock_server)
            .await;

        let generator =
            LangbaseGenerator::new(create_test_client(&mock_server.uri(), 0), "step-pipe");
        let result = generator
            .generate(GenerationRequest::reasoning("prompt", 64))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Langbase(LangbaseError::Api { status: 400, .. }))
        ));
    }
}
