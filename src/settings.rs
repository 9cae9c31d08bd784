use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::keywords::KeywordRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Extra keyword rules evaluated after the built-in table.
    #[serde(default)]
    pub keyword_rules: Vec<KeywordRule>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            thresholds: Thresholds::default(),
            keyword_rules: Vec::new(),
        }
    }
}

/// Amounts are in pounds sterling. `*_pct` fields are percentages of
/// month-to-date income; `pass_through_ratio` is a fraction of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub large_cash_deposit: f64,
    pub cash_income_pct: f64,
    pub structuring_floor: f64,
    pub structuring_ceiling: f64,
    pub near_threshold_floor: f64,
    pub unexplained_cash_deposit: f64,
    pub international_transfer: f64,
    pub new_payee: f64,
    pub new_payee_high: f64,
    pub round_amount: f64,
    pub repeated_payee_amount: f64,
    pub unexplained_transfer: f64,
    pub crypto_medium: f64,
    pub crypto_high: f64,
    pub crypto_very_high: f64,
    pub luxury_purchase: f64,
    pub luxury_income_pct: f64,
    pub pass_through_ratio: f64,
    pub pass_through_total: f64,
    pub pass_through_difference: f64,
    pub salary_burst_days: i64,
    pub monthly_transfer_volume: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            large_cash_deposit: 1_000.0,
            cash_income_pct: 10.0,
            structuring_floor: 9_000.0,
            structuring_ceiling: 9_500.0,
            near_threshold_floor: 8_500.0,
            unexplained_cash_deposit: 500.0,
            international_transfer: 500.0,
            new_payee: 1_000.0,
            new_payee_high: 5_000.0,
            round_amount: 1_000.0,
            repeated_payee_amount: 1_000.0,
            unexplained_transfer: 2_000.0,
            crypto_medium: 1_000.0,
            crypto_high: 5_000.0,
            crypto_very_high: 10_000.0,
            luxury_purchase: 1_000.0,
            luxury_income_pct: 20.0,
            pass_through_ratio: 0.7,
            pass_through_total: 1_000.0,
            pass_through_difference: 50.0,
            salary_burst_days: 3,
            monthly_transfer_volume: 5_000.0,
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("statement-risk")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing or unreadable files yield defaults; missing keys fall back per field.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RiskError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{Fact, MatchType, Scope};

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.log_level = "debug".to_string();
        settings.thresholds.large_cash_deposit = 2_500.0;
        settings.keyword_rules.push(KeywordRule {
            fact: Fact::Gambling,
            pattern: "PADDY POWER".to_string(),
            match_type: MatchType::Contains,
            scope: Scope::Text,
        });
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.thresholds.large_cash_deposit, 2_500.0);
        assert_eq!(loaded.keyword_rules, settings.keyword_rules);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.thresholds, Thresholds::default());
        assert!(s.keyword_rules.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"thresholds": {"structuring_floor": 8000.0}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.thresholds.structuring_floor, 8_000.0);
        assert_eq!(s.thresholds.structuring_ceiling, 9_500.0);
        assert_eq!(s.thresholds.salary_burst_days, 3);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let s = load_settings_from(&path);
        assert_eq!(s.thresholds, Thresholds::default());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&Settings::default(), &path).unwrap();
        assert!(path.exists());
    }
}
