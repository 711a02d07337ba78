/*!
 * Tests for configuration loading, saving and validation
 */

use anyhow::Result;

use subweave::app_config::{AnalyzerKind, Config, TranslationProvider};

use crate::common;

fn config_with_key() -> Config {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().api_key = "test-key".to_string();
    config
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.target_language, created.target_language);
    assert_eq!(reloaded.segmentation, created.segmentation);
    assert_eq!(reloaded.translation.provider, TranslationProvider::XAI);
    Ok(())
}

#[test]
fn test_save_thenLoad_shouldKeepOverrides() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("custom.json");

    let mut config = Config::default();
    config.target_language = "ja".to_string();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.active_provider_config_mut().model = "claude-3-5-haiku-20241022".to_string();
    config.segmentation.max_unit_cues = Some(3);
    config.segmentation.rules.block_complete_sentences = true;
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.target_language, "ja");
    assert_eq!(loaded.translation.get_model(), "claude-3-5-haiku-20241022");
    assert_eq!(loaded.segmentation.max_unit_cues, Some(3));
    assert!(loaded.segmentation.rules.block_complete_sentences);
    Ok(())
}

#[test]
fn test_loadOrCreate_withBrokenJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_activeProviderConfigMut_withUnlistedProvider_shouldAddDefaults() {
    let mut config = Config::default();
    config.translation.available_providers.clear();
    config.translation.provider = TranslationProvider::OpenAI;

    config.translation.active_provider_config_mut().concurrent_requests = 2;

    assert_eq!(config.translation.available_providers.len(), 1);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(config.translation.optimal_concurrent_requests(), 2);
}

#[test]
fn test_validate_shouldRejectInconsistentSettings() {
    assert!(config_with_key().validate().is_ok());

    let mut config = config_with_key();
    config.target_language = "zz".to_string();
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.translation.active_provider_config_mut().endpoint = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.segmentation.max_gap_seconds = Some(-1.0);
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.segmentation.fragment_snap_ratio = 1.5;
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.segmentation.analyzer.kind = AnalyzerKind::Full;
    assert!(config.validate().is_err());
}
