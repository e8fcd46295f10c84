#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Provider wire-format tests against a mock HTTP backend.
// Run with: cargo test --test integration_providers

use plsql_chat::config::{ModelParams, OllamaConfig, RemoteConfig};
use plsql_chat::providers::{ChatModel, LlmProvider, OllamaProvider, RemoteProvider};
use serde_json::json;
use serial_test::serial;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_config_for(uri: &str) -> OllamaConfig {
    let url = Url::parse(uri).expect("mock server uri parses");
    OllamaConfig {
        protocol: url.scheme().to_string(),
        host: url.host_str().expect("mock server has a host").to_string(),
        port: url.port().expect("mock server has a port"),
        model: "llama3.2:latest".to_string(),
    }
}

fn remote_config_for(uri: &str, api_key_env: &str) -> RemoteConfig {
    RemoteConfig {
        endpoint: Some(uri.to_string()),
        region: "us-east-1".to_string(),
        model_id: "anthropic.claude-v2".to_string(),
        api_key_env: api_key_env.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_health_check_succeeds_against_live_tags_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&ollama_config_for(&server.uri())).expect("provider constructs");

    let healthy = tokio::task::spawn_blocking(move || provider.health_check())
        .await
        .expect("task completes");
    assert!(healthy);
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_lists_advertised_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "llama3.2:latest" },
                { "name": "mistral:7b" }
            ]
        })))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&ollama_config_for(&server.uri())).expect("provider constructs");

    let models = tokio::task::spawn_blocking(move || provider.available_models())
        .await
        .expect("task completes");
    assert_eq!(models, vec!["llama3.2:latest", "mistral:7b"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_generation_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("\"stream\":false"))
        .and(body_string_contains("llama3.2:latest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "The evaluator scores material first." })),
        )
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&ollama_config_for(&server.uri())).expect("provider constructs");
    let model = provider
        .initialize(&ModelParams::default())
        .expect("model constructs");

    let answer = tokio::task::spawn_blocking(move || model.generate("How does evaluation work?", &[]))
        .await
        .expect("task completes")
        .expect("generation succeeds");
    assert_eq!(answer, "The evaluator scores material first.");
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_generation_prepends_conversation_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Previous conversation:"))
        .and(body_string_contains("what is minimax"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&ollama_config_for(&server.uri())).expect("provider constructs");
    let model = provider
        .initialize(&ModelParams::default())
        .expect("model constructs");

    let history = vec![plsql_chat::memory::ConversationTurn {
        question: "what is minimax".to_string(),
        answer: "a search algorithm".to_string(),
    }];
    let answer = tokio::task::spawn_blocking(move || model.generate("and alpha-beta?", &history))
        .await
        .expect("task completes")
        .expect("generation succeeds");
    assert_eq!(answer, "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_client_error_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        OllamaProvider::new(&ollama_config_for(&server.uri())).expect("provider constructs");
    let model = provider
        .initialize(&ModelParams::default())
        .expect("model constructs");

    let result = tokio::task::spawn_blocking(move || model.generate("anything", &[]))
        .await
        .expect("task completes");
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn remote_health_and_models_send_bearer_credential() {
    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::set_var("PLSQL_CHAT_IT_KEY_MODELS", "it-token") };

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer it-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "anthropic.claude-v2" },
                { "id": "anthropic.claude-instant-v1" }
            ]
        })))
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config_for(&server.uri(), "PLSQL_CHAT_IT_KEY_MODELS"))
        .expect("provider constructs");

    let (healthy, models) = tokio::task::spawn_blocking(move || {
        (provider.health_check(), provider.available_models())
    })
    .await
    .expect("task completes");

    assert!(healthy);
    assert_eq!(
        models,
        vec!["anthropic.claude-v2", "anthropic.claude-instant-v1"]
    );

    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::remove_var("PLSQL_CHAT_IT_KEY_MODELS") };
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn remote_completion_returns_first_choice() {
    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::set_var("PLSQL_CHAT_IT_KEY_COMPLETE", "it-token") };

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(header("Authorization", "Bearer it-token"))
        .and(body_string_contains("anthropic.claude-v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                { "text": "Castling moves two pieces in one turn." },
                { "text": "ignored second choice" }
            ]
        })))
        .mount(&server)
        .await;

    let provider =
        RemoteProvider::new(&remote_config_for(&server.uri(), "PLSQL_CHAT_IT_KEY_COMPLETE"))
            .expect("provider constructs");
    let model = provider
        .initialize(&ModelParams::default())
        .expect("model constructs");

    let answer = tokio::task::spawn_blocking(move || model.generate("Explain castling", &[]))
        .await
        .expect("task completes")
        .expect("generation succeeds");
    assert_eq!(answer, "Castling moves two pieces in one turn.");

    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::remove_var("PLSQL_CHAT_IT_KEY_COMPLETE") };
}
