// Integration tests for the OpenAI client against a mock server

use playground_openai::{ChatMessage, OpenAiClient, OpenAiError, TokenUsage};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_chat_completion_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "What is 2 + 2?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 1, "total_tokens": 21}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri());
    let completion = client
        .chat_completion(
            "gpt-4o-mini",
            &[
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user("What is 2 + 2?"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(completion.content.as_deref(), Some("4"));
    assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
    assert_eq!(
        completion.usage,
        Some(TokenUsage {
            prompt_tokens: 20,
            completion_tokens: 1,
            total_tokens: 21
        })
    );
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = OpenAiClient::with_base_url("bad", server.uri())
        .chat_completion("gpt-4o", &[ChatMessage::user("hi")])
        .await
        .unwrap_err();

    match err {
        OpenAiError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": []
        })))
        .mount(&server)
        .await;

    let err = OpenAiClient::with_base_url("k", server.uri())
        .chat_completion("gpt-4o", &[ChatMessage::user("hi")])
        .await
        .unwrap_err();

    assert!(matches!(err, OpenAiError::NoChoices));
}
