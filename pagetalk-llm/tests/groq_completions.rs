use pagetalk_llm::groq::GroqClient;
use pagetalk_llm::{ChatMessage, CompletionClient};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn make_client(server: &MockServer) -> GroqClient {
    let endpoint = format!("{}/", server.uri());
    GroqClient::with_endpoint(&endpoint, "sk-test".into(), "llama3-8b-8192".into())
        .expect("client builds")
}

#[tokio::test]
async fn complete_returns_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3-8b-8192"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3-8b-8192",
            "choices": [
                { "message": { "role": "assistant", "content": "Hello there." } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = make_client(&server);
    let messages = [
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("Say hello"),
    ];

    let text = client.complete(&messages).await.expect("completion works");
    assert_eq!(text, "Hello there.");
}

#[tokio::test]
async fn empty_choices_is_a_completion_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama3-8b-8192",
            "choices": []
        })))
        .mount(&server)
        .await;

    let client = make_client(&server);
    let err = client
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("no choices should fail");
    assert!(err.to_string().contains("no choices"));
}

#[tokio::test]
async fn provider_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "invalid api key" }
        })))
        .mount(&server)
        .await;

    let client = make_client(&server);
    let err = client
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("401 should fail");
    assert!(err.to_string().contains("invalid api key"));
}
