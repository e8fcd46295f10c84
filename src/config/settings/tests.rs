use super::*;
use serial_test::serial;

fn clear_env() {
    for suffix in [
        "PROVIDER",
        "OLLAMA_HOST",
        "OLLAMA_PORT",
        "OLLAMA_MODEL",
        "REMOTE_ENDPOINT",
        "REMOTE_REGION",
        "REMOTE_MODEL",
        "TEMPERATURE",
        "RETRIEVAL_K",
    ] {
        // SAFETY: tests mutating the environment are serialized
        unsafe { std::env::remove_var(format!("{ENV_PREFIX}{suffix}")) };
    }
}

#[test]
#[serial]
fn defaults_are_valid() {
    clear_env();
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.provider, Provider::Local);
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.params.retrieval_k, 3);
}

#[test]
fn unknown_provider_rejected() {
    let result = "unknown_backend".parse::<Provider>();
    assert!(matches!(result, Err(ConfigError::UnknownProvider(_))));
}

#[test]
fn provider_aliases_accepted() {
    assert_eq!("ollama".parse::<Provider>().ok(), Some(Provider::Local));
    assert_eq!("bedrock".parse::<Provider>().ok(), Some(Provider::Remote));
    assert_eq!(" Remote ".parse::<Provider>().ok(), Some(Provider::Remote));
}

#[test]
fn temperature_out_of_range_rejected() {
    let params = ModelParams {
        temperature: 1.5,
        ..ModelParams::default()
    };
    assert!(matches!(
        params.validate(),
        Err(ConfigError::InvalidTemperature(_))
    ));
}

#[test]
fn zero_retrieval_k_rejected() {
    let params = ModelParams {
        retrieval_k: 0,
        ..ModelParams::default()
    };
    assert!(matches!(
        params.validate(),
        Err(ConfigError::InvalidRetrievalK(0))
    ));
}

#[test]
fn invalid_protocol_rejected() {
    let ollama = OllamaConfig {
        protocol: "ftp".to_string(),
        ..OllamaConfig::default()
    };
    assert!(matches!(
        ollama.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn empty_region_rejected() {
    let remote = RemoteConfig {
        region: "  ".to_string(),
        ..RemoteConfig::default()
    };
    assert!(matches!(
        remote.validate(),
        Err(ConfigError::InvalidRegion(_))
    ));
}

#[test]
fn endpoint_derived_from_region() {
    let remote = RemoteConfig {
        region: "eu-west-1".to_string(),
        ..RemoteConfig::default()
    };
    let endpoint = remote.effective_endpoint().expect("endpoint derives");
    assert_eq!(
        endpoint.as_str(),
        "https://bedrock-gateway.eu-west-1.amazonaws.com/"
    );
}

#[test]
fn explicit_endpoint_wins_over_region() {
    let remote = RemoteConfig {
        endpoint: Some("https://llm.internal.example.com".to_string()),
        ..RemoteConfig::default()
    };
    let endpoint = remote.effective_endpoint().expect("endpoint parses");
    assert_eq!(endpoint.host_str(), Some("llm.internal.example.com"));
}

#[test]
#[serial]
fn load_without_config_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().expect("temp dir");
    let config = Config::load(dir.path()).expect("load succeeds");
    assert_eq!(config.provider, Provider::Local);
    assert_eq!(config.data_dir, dir.path());
}

#[test]
#[serial]
fn load_reads_config_file() {
    clear_env();
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("config.toml"),
        "provider = \"remote\"\n\n[remote]\nregion = \"ap-southeast-2\"\n",
    )
    .expect("write config");

    let config = Config::load(dir.path()).expect("load succeeds");
    assert_eq!(config.provider, Provider::Remote);
    assert_eq!(config.remote.region, "ap-southeast-2");
    // Unspecified sections fall back to defaults
    assert_eq!(config.ollama.port, 11434);
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    clear_env();
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("config.toml"), "provider = \"local\"\n")
        .expect("write config");

    // SAFETY: tests mutating the environment are serialized
    unsafe {
        std::env::set_var("PLSQL_CHAT_PROVIDER", "remote");
        std::env::set_var("PLSQL_CHAT_RETRIEVAL_K", "7");
    }

    let config = Config::load(dir.path()).expect("load succeeds");
    assert_eq!(config.provider, Provider::Remote);
    assert_eq!(config.params.retrieval_k, 7);

    clear_env();
}

#[test]
#[serial]
fn env_values_strip_inline_comments() {
    clear_env();
    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::set_var("PLSQL_CHAT_PROVIDER", "ollama # default backend") };

    let value = env_value("PROVIDER");
    assert_eq!(value.as_deref(), Some("ollama"));

    clear_env();
}

#[test]
#[serial]
fn unknown_env_provider_fails_load() {
    clear_env();
    let dir = tempfile::tempdir().expect("temp dir");
    // SAFETY: tests mutating the environment are serialized
    unsafe { std::env::set_var("PLSQL_CHAT_PROVIDER", "unknown_backend") };

    let result = Config::load(dir.path());
    assert!(result.is_err());

    clear_env();
}

#[test]
#[serial]
fn save_and_reload_round_trip() {
    clear_env();
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = Config::load(dir.path()).expect("load succeeds");
    config.ollama.model = "codellama:13b".to_string();
    config.save().expect("save succeeds");

    let reloaded = Config::load(dir.path()).expect("reload succeeds");
    assert_eq!(reloaded.ollama.model, "codellama:13b");
}
