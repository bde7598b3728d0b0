use chunk_analyst::infrastructure::observability::TracingConfig;

#[test]
fn given_default_config_when_created_then_level_is_info_and_environment_is_set() {
    let config = TracingConfig::default();

    assert_eq!(config.level, "info");
    assert!(!config.environment.is_empty());
}

#[test]
fn given_level_when_building_filter_then_crate_and_http_targets_are_verbose() {
    let config = TracingConfig {
        environment: "test".to_string(),
        json_format: false,
        level: "warn".to_string(),
    };

    assert_eq!(
        config.filter_directive(),
        "warn,chunk_analyst=debug,tower_http=debug"
    );
}
