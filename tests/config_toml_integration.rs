use nextask::cli::NextaskConfig;
use nextask::task::{BreakdownConfig, ScoringWeights, SelectionConfig, ValidationMode};
use nextask::SelectionStrategy;
use tempfile::NamedTempFile;

#[test]
fn test_config_serialization_roundtrip() {
    let original_config = NextaskConfig::default();

    let toml_str = original_config
        .to_toml_string()
        .expect("Should be able to serialize config to TOML");

    assert!(!toml_str.is_empty(), "TOML string should not be empty");
    assert!(toml_str.contains("log_filter"), "Should contain log_filter field");

    let deserialized_config = NextaskConfig::from_toml_str(&toml_str)
        .expect("Should be able to deserialize TOML string");

    assert_eq!(original_config, deserialized_config);
}

#[test]
fn test_config_file_operations() {
    let original_config = NextaskConfig::default();

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    let temp_path = temp_file.path();

    original_config
        .to_toml_file(temp_path)
        .expect("Should be able to save config to file");

    let loaded_config =
        NextaskConfig::from_toml_file(temp_path).expect("Should be able to load config from file");

    assert_eq!(original_config, loaded_config);
}

#[test]
fn test_config_toml_structure() {
    let config = NextaskConfig::default();
    let toml_str = config
        .to_toml_string()
        .expect("Should be able to serialize config");

    assert!(toml_str.contains("[selection]"), "Should contain selection section");
    assert!(toml_str.contains("[selection.weights]"), "Should contain weights section");
    assert!(toml_str.contains("[breakdown]"), "Should contain breakdown section");

    assert!(toml_str.contains("strategy = \"dependency-aware\""));
    assert!(toml_str.contains("complexity_threshold = 8"));
    assert!(toml_str.contains("validation = \"strict\""));
}

#[test]
fn test_config_error_handling() {
    let result = NextaskConfig::from_toml_file("non_existent_file.toml");
    assert!(result.is_err(), "Should fail when loading non-existent file");

    let invalid_toml = "invalid toml content [[[";
    let result = NextaskConfig::from_toml_str(invalid_toml);
    assert!(result.is_err(), "Should fail when parsing invalid TOML");

    let unknown_strategy = "[selection]\nstrategy = \"fastest\"\n";
    let result = NextaskConfig::from_toml_str(unknown_strategy);
    assert!(result.is_err(), "Should reject unknown strategy names");
}

#[test]
fn test_config_customization() {
    let custom_config = NextaskConfig {
        log_filter: "nextask=trace".to_string(),
        validation: ValidationMode::Lenient,
        selection: SelectionConfig {
            strategy: SelectionStrategy::DepthFirst,
            allow_parent_with_subtasks: true,
            prefer_in_progress: false,
            max_alternatives: 7,
            weights: ScoringWeights {
                unblock_weight: 50.0,
                ..ScoringWeights::default()
            },
        },
        breakdown: BreakdownConfig {
            complexity_threshold: 6,
            auto_reduce: false,
            ..BreakdownConfig::default()
        },
    };

    let toml_str = custom_config
        .to_toml_string()
        .expect("Should serialize custom config");

    let deserialized =
        NextaskConfig::from_toml_str(&toml_str).expect("Should deserialize custom config");

    assert_eq!(custom_config, deserialized);

    let manager_config = deserialized.task_manager_config();
    assert_eq!(manager_config.validation, ValidationMode::Lenient);
    assert_eq!(manager_config.selection.max_alternatives, 7);
    assert!(!manager_config.breakdown.auto_reduce);
}
