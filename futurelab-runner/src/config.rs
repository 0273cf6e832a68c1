//! Serializable job configuration, loaded from TOML.
//!
//! ```toml
//! name = "es-volume-roll"
//! panel = "es_panel.csv"
//! orders = "orders.csv"
//!
//! [roll]
//! crossover = "volume"
//! days_before_expiry = 5
//!
//! [backtest]
//! slippage_bps = 10.0
//!
//! [multipliers.table]
//! ESH4 = 50.0
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use futurelab_core::data::Multipliers;
use futurelab_core::roll::{Crossover, RollPolicy};
use futurelab_core::series::{ContinuousSeriesBuilder, ExpiryPolicy};

/// Unique identifier for a job (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config for hashing: {0}")]
    Hash(#[from] serde_json::Error),
}

/// One job: build a continuous series from a panel, then backtest schedules on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FutureLabConfig {
    /// Label used in logs and the summary artifact.
    #[serde(default = "default_name")]
    pub name: String,

    /// Contract panel CSV (`date,contract,price,volume,open_interest,expiry`).
    pub panel: PathBuf,

    /// Order schedule CSV (`date,contract,quantity`). No orders when absent.
    #[serde(default)]
    pub orders: Option<PathBuf>,

    /// Roll schedule CSV (`date,from,to`). When absent the builder's own
    /// rolls drive the backtest.
    #[serde(default)]
    pub rolls: Option<PathBuf>,

    #[serde(default)]
    pub roll: RollConfig,

    #[serde(default)]
    pub backtest: BacktestSettings,

    #[serde(default)]
    pub multipliers: Multipliers,

    /// Directory the config was loaded from. Not part of the run id.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_name() -> String {
    "futurelab".to_string()
}

/// Which crossover signal, if any, may trigger a roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverConfig {
    #[default]
    Volume,
    OpenInterest,
    None,
}

impl From<CrossoverConfig> for Option<Crossover> {
    fn from(config: CrossoverConfig) -> Self {
        match config {
            CrossoverConfig::Volume => Some(Crossover::Volume),
            CrossoverConfig::OpenInterest => Some(Crossover::OpenInterest),
            CrossoverConfig::None => None,
        }
    }
}

/// Roll policy settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollConfig {
    #[serde(default)]
    pub crossover: CrossoverConfig,
    #[serde(default)]
    pub days_before_expiry: Option<i64>,
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,
}

impl RollConfig {
    pub fn policy(&self) -> RollPolicy {
        RollPolicy {
            crossover: self.crossover.into(),
            days_before_expiry: self.days_before_expiry,
        }
    }

    pub fn builder(&self) -> ContinuousSeriesBuilder {
        ContinuousSeriesBuilder::new(self.policy()).with_expiry_policy(self.expiry_policy)
    }
}

/// Execution settings for the backtest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestSettings {
    #[serde(default)]
    pub slippage_bps: f64,
    #[serde(default)]
    pub initial_cash: f64,
}

impl FutureLabConfig {
    /// Minimal config: a panel, no schedules, default roll and execution settings.
    pub fn new(panel: impl Into<PathBuf>) -> Self {
        Self {
            name: default_name(),
            panel: panel.into(),
            orders: None,
            rolls: None,
            roll: RollConfig::default(),
            backtest: BacktestSettings::default(),
            multipliers: Multipliers::default(),
            base_dir: None,
        }
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let slip = self.backtest.slippage_bps;
        if !slip.is_finite() || slip < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "backtest.slippage_bps must be a non-negative number, got {slip}"
            )));
        }
        if !self.backtest.initial_cash.is_finite() {
            return Err(ConfigError::Invalid(
                "backtest.initial_cash must be finite".into(),
            ));
        }
        if let Some(days) = self.roll.days_before_expiry {
            if days < 0 {
                return Err(ConfigError::Invalid(format!(
                    "roll.days_before_expiry must be >= 0, got {days}"
                )));
            }
        }
        if let Some((contract, m)) = self
            .multipliers
            .iter()
            .find(|(_, m)| !m.is_finite() || *m <= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "multiplier for '{contract}' must be positive, got {m}"
            )));
        }
        Ok(())
    }

    /// Resolve a config-relative path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Deterministic hash of the config contents.
    ///
    /// Two jobs with identical settings and input paths share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "es"
panel = "panel.csv"
orders = "orders.csv"
rolls = "rolls.csv"

[roll]
crossover = "open_interest"
days_before_expiry = 3
expiry_policy = "fail"

[backtest]
slippage_bps = 10.0
initial_cash = 5000.0

[multipliers]
default = 50.0

[multipliers.table]
ESH4 = 50.0
NQH4 = 20.0
"#;

    #[test]
    fn test_parse_full_config() {
        let config = FutureLabConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "es");
        assert_eq!(config.orders.as_deref(), Some(Path::new("orders.csv")));
        assert_eq!(config.roll.crossover, CrossoverConfig::OpenInterest);
        assert_eq!(config.roll.expiry_policy, ExpiryPolicy::Fail);
        assert_eq!(
            config.roll.policy(),
            RollPolicy::open_interest().with_days_before_expiry(3)
        );
        assert_eq!(config.backtest.slippage_bps, 10.0);
        assert_eq!(config.multipliers.get("NQH4"), 20.0);
        assert_eq!(config.multipliers.get("unknown"), 50.0);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = FutureLabConfig::from_toml(r#"panel = "p.csv""#).unwrap();
        assert_eq!(config, FutureLabConfig::new("p.csv"));
        assert_eq!(config.roll.policy(), RollPolicy::volume());
        assert_eq!(config.backtest, BacktestSettings::default());
        assert_eq!(config.multipliers.get("anything"), 1.0);
    }

    #[test]
    fn test_crossover_none_is_expiry_only() {
        let config = FutureLabConfig::from_toml(
            r#"
panel = "p.csv"
[roll]
crossover = "none"
"#,
        )
        .unwrap();
        assert_eq!(config.roll.policy(), RollPolicy::expiry_only());
    }

    #[test]
    fn test_rejects_negative_slippage() {
        let err = FutureLabConfig::from_toml(
            r#"
panel = "p.csv"
[backtest]
slippage_bps = -1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        let err = FutureLabConfig::from_toml(
            r#"
panel = "p.csv"
[multipliers.table]
ES = 0.0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'ES'"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = FutureLabConfig::from_toml("panel = \"p.csv\"\nslippage = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_run_id_deterministic() {
        let config = FutureLabConfig::from_toml(FULL).unwrap();
        let id1 = config.run_id().unwrap();
        let id2 = config.run_id().unwrap();
        assert_eq!(id1, id2, "RunId should be deterministic");
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn test_run_id_changes_with_params() {
        let config1 = FutureLabConfig::from_toml(FULL).unwrap();
        let mut config2 = config1.clone();
        config2.backtest.slippage_bps = 11.0;
        assert_ne!(config1.run_id().unwrap(), config2.run_id().unwrap());
    }

    #[test]
    fn test_resolve_relative_to_config_dir() {
        let mut config = FutureLabConfig::new("panel.csv");
        assert_eq!(config.resolve(Path::new("panel.csv")), PathBuf::from("panel.csv"));

        config.base_dir = Some(PathBuf::from("/jobs/es"));
        assert_eq!(
            config.resolve(Path::new("panel.csv")),
            PathBuf::from("/jobs/es/panel.csv")
        );
        assert_eq!(
            config.resolve(Path::new("/abs/panel.csv")),
            PathBuf::from("/abs/panel.csv")
        );
    }
}
