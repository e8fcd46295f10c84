use super::*;
use serial_test::serial;
use std::net::TcpListener;
use std::time::Instant;

fn unreachable_config(api_key_env: &str) -> RemoteConfig {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    RemoteConfig {
        endpoint: Some(format!("http://127.0.0.1:{port}")),
        region: "us-east-1".to_string(),
        model_id: "anthropic.claude-v2".to_string(),
        api_key_env: api_key_env.to_string(),
    }
}

#[test]
fn provider_builds_from_config() {
    let config = RemoteConfig::default();
    let provider = RemoteProvider::new(&config).expect("provider constructs");

    assert_eq!(provider.model_id, "anthropic.claude-v2");
    assert_eq!(
        provider.endpoint.host_str(),
        Some("bedrock-gateway.us-east-1.amazonaws.com")
    );
}

#[test]
fn initialize_without_credential_fails_loudly() {
    let config = unreachable_config("PLSQL_CHAT_TEST_KEY_NEVER_SET");
    let provider = RemoteProvider::new(&config).expect("provider constructs");

    let result = provider.initialize(&ModelParams::default());
    let message = result.err().expect("initialization fails").to_string();
    assert!(message.contains("PLSQL_CHAT_TEST_KEY_NEVER_SET"));
}

#[test]
#[serial]
fn initialize_with_credential_constructs_model() {
    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::set_var("PLSQL_CHAT_TEST_KEY_SET", "test-token") };

    let config = unreachable_config("PLSQL_CHAT_TEST_KEY_SET");
    let provider = RemoteProvider::new(&config).expect("provider constructs");
    assert!(provider.initialize(&ModelParams::default()).is_ok());

    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::remove_var("PLSQL_CHAT_TEST_KEY_SET") };
}

#[test]
fn health_check_false_for_unreachable_gateway() {
    let config = unreachable_config("PLSQL_CHAT_TEST_KEY_NEVER_SET");
    let provider = RemoteProvider::new(&config)
        .expect("provider constructs")
        .with_health_timeout(Duration::from_secs(5));

    let start = Instant::now();
    assert!(!provider.health_check());
    assert!(start.elapsed() < Duration::from_secs(6));
}

#[test]
fn available_models_empty_for_unreachable_gateway() {
    let config = unreachable_config("PLSQL_CHAT_TEST_KEY_NEVER_SET");
    let provider = RemoteProvider::new(&config).expect("provider constructs");
    assert!(provider.available_models().is_empty());
}
