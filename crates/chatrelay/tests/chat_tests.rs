//! Integration tests for the streaming chat route
//!
//! Covers engine routing, the two stream dialects, credential checks and
//! verbatim relay of upstream errors.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use chatrelay::config::Credentials;
use chatrelay::relay::create_router;
use chatrelay::testing::{
    TEST_OPENAI_KEY, TEST_VENICE_KEY, VENICE_PATH, chunk_line, responses_delta_line, sse_body,
    test_config, test_credentials, test_state,
};

// =============================================================================
// Test Fixtures
// =============================================================================

fn chat_request(engine: &str) -> Request<Body> {
    let body = json!({
        "engine": engine,
        "messages": [
            {"role": "system", "content": "You are terse."},
            {"role": "user", "content": "Say hi"}
        ]
    });

    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Chat Completions Streaming
// =============================================================================

mod chat_completions_tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_engine_streams_concatenated_fragments() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let first = chunk_line("H");
        let second = chunk_line("i");
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/chat/completions"))
            .and(matchers::header(
                "authorization",
                format!("Bearer {TEST_OPENAI_KEY}").as_str(),
            ))
            .and(matchers::body_partial_json(json!({
                "model": "gpt-4o",
                "stream": true,
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "Say hi"}
                ]
            })))
            .respond_with(event_stream(sse_body(&[
                first.as_str(),
                "",
                second.as_str(),
                "",
                "data: [DONE]",
                "",
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state).oneshot(chat_request("gpt-4o")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_string(response).await, "Hi");
    }

    #[tokio::test]
    async fn test_root_path_is_chat() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let line = chunk_line("root");
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/chat/completions"))
            .respond_with(event_stream(sse_body(&[line.as_str()])))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(
                r#"{"engine":"gpt-4o-mini","messages":[{"role":"user","content":"x"}]}"#,
            ))
            .unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(body_string(response).await, "root");
    }

    #[tokio::test]
    async fn test_unlisted_engine_goes_to_venice() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let line = chunk_line("from venice");
        Mock::given(matchers::method("POST"))
            .and(matchers::path(VENICE_PATH))
            .and(matchers::header(
                "authorization",
                format!("Bearer {TEST_VENICE_KEY}").as_str(),
            ))
            .and(matchers::body_partial_json(json!({"model": "llama-3.3-70b"})))
            .respond_with(event_stream(sse_body(&[line.as_str()])))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state)
            .oneshot(chat_request("llama-3.3-70b"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "from venice");
    }

    #[tokio::test]
    async fn test_attachments_are_folded_into_content() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/chat/completions"))
            .and(matchers::body_partial_json(json!({
                "messages": [
                    {"role": "user", "content": "Summarize\nFile: notes.txt\nbuy milk"}
                ]
            })))
            .respond_with(event_stream(sse_body(&[chunk_line("ok").as_str()])))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!({
            "engine": "gpt-4.1",
            "messages": [{
                "role": "user",
                "content": "Summarize",
                "files": [{"name": "notes.txt", "extension": "txt", "content": "buy milk"}]
            }]
        });
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .body(Body::from(body.to_string()))
            .unwrap();

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_chunk_split_across_lines_is_reassembled() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/chat/completions"))
            .respond_with(event_stream(sse_body(&[
                ": keep-alive",
                r#"data: {"choices":[{"delta":"#,
                r#"{"content":"joined"}}]}"#,
                chunk_line(" up").as_str(),
            ])))
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state).oneshot(chat_request("gpt-4o")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "joined up");
    }
}

// =============================================================================
// Responses API Streaming
// =============================================================================

mod responses_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_gpt5_engine_uses_responses_endpoint() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let hello = responses_delta_line("Hel");
        let world = responses_delta_line("lo");
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/responses"))
            .and(matchers::body_partial_json(json!({
                "model": "gpt-5.1",
                "stream": true,
                "input": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "Say hi"}
                ]
            })))
            .respond_with(event_stream(sse_body(&[
                "event: response.created",
                r#"data: {"type":"response.created"}"#,
                "",
                hello.as_str(),
                world.as_str(),
                r#"data: {"type":"response.completed"}"#,
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state).oneshot(chat_request("gpt-5.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Hello");
    }
}

// =============================================================================
// Error Handling
// =============================================================================

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_openai_key_never_calls_upstream() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let credentials = Credentials {
            openai_key: None,
            venice_key: Some(TEST_VENICE_KEY.to_string()),
        };
        let state = test_state(test_config(&server.uri(), dir.path()), credentials, None);
        let response = create_router(state).oneshot(chat_request("gpt-4o")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("export OPEN_AI_SK=THEKEY"));
        assert!(body.contains("export VENICE_AI_SK=THEKEY"));
    }

    #[tokio::test]
    async fn test_missing_venice_key_for_unlisted_engine() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let credentials = Credentials {
            openai_key: Some(TEST_OPENAI_KEY.to_string()),
            venice_key: None,
        };
        let state = test_state(test_config(&server.uri(), dir.path()), credentials, None);
        let response = create_router(state)
            .oneshot(chat_request("mistral-31-24b"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .body(Body::from("{\"engine\": "))
            .unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_relayed_verbatim() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let upstream_error = json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        });
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(upstream_error.clone()))
            .mount(&server)
            .await;

        let state = test_state(test_config(&server.uri(), dir.path()), test_credentials(), None);
        let response = create_router(state).oneshot(chat_request("gpt-4o")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, upstream_error);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_500() {
        let dir = tempfile::tempdir().unwrap();

        // Nothing listens on port 9 locally
        let state = test_state(
            test_config("http://127.0.0.1:9", dir.path()),
            test_credentials(),
            None,
        );
        let response = create_router(state).oneshot(chat_request("gpt-4o")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
