//! Configuration loading and typed config structures for the Fallow engine.
//!
//! The canonical configuration lives in `fallow-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;

use fallow_types::BlockKind;
use fallow_world::CropFilter;
use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding [`StorageConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "FALLOW_DATA_DIR";

/// Environment variable overriding [`OperatorConfig::port`].
pub const OPERATOR_PORT_ENV: &str = "FALLOW_OPERATOR_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `fallow-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FallowConfig {
    /// Stage rate and caps.
    #[serde(default)]
    pub growth: GrowthConfig,

    /// Work budget and seeding.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Per-kind growth toggles.
    #[serde(default)]
    pub crops: CropsConfig,

    /// Session record storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tick loop and demo world settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Operator API settings.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FallowConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `FALLOW_DATA_DIR` overrides `storage.data_dir`
    /// - `FALLOW_OPERATOR_PORT` overrides `operator.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override storage and operator settings with environment variables
    /// when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply the overrides `lookup` yields for [`DATA_DIR_ENV`] and
    /// [`OPERATOR_PORT_ENV`]. An unparsable port is logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(DATA_DIR_ENV) {
            self.storage.data_dir = val;
        }
        if let Some(val) = lookup(OPERATOR_PORT_ENV) {
            match val.parse::<u16>() {
                Ok(port) => self.operator.port = port,
                Err(e) => warn!(value = %val, error = %e, "Ignoring invalid {OPERATOR_PORT_ENV}"),
            }
        }
    }

    /// Normalize and check value ranges.
    ///
    /// `chunks_per_tick` is raised to at least 1. Rates and hour caps must
    /// be finite and non-negative, and `ticks_per_stage` must not be zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.scheduler.chunks_per_tick = self.scheduler.chunks_per_tick.max(1);

        let growth = &self.growth;
        if !growth.stages_per_hour.is_finite() || growth.stages_per_hour < 0.0 {
            return Err(invalid("growth.stages_per_hour must be a non-negative number"));
        }
        if !growth.max_offline_hours.is_finite() || growth.max_offline_hours < 0.0 {
            return Err(invalid("growth.max_offline_hours must be a non-negative number"));
        }
        if growth.ticks_per_stage == Some(0) {
            return Err(invalid("growth.ticks_per_stage must be at least 1"));
        }
        if growth.host_tick_rate_hz == 0 {
            return Err(invalid("growth.host_tick_rate_hz must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Stage rate and caps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GrowthConfig {
    /// Stages accrued per hour offline. Ignored when `ticks_per_stage` is
    /// set.
    #[serde(default = "default_stages_per_hour")]
    pub stages_per_hour: f64,

    /// Alternative rate: host ticks per stage at `host_tick_rate_hz`.
    #[serde(default)]
    pub ticks_per_stage: Option<u32>,

    /// Host tick rate used to interpret `ticks_per_stage`.
    #[serde(default = "default_host_tick_rate_hz")]
    pub host_tick_rate_hz: u32,

    /// Longest offline interval that still accrues stages, in hours.
    #[serde(default = "default_max_offline_hours")]
    pub max_offline_hours: f64,

    /// Most stages a single session may apply to a tile.
    #[serde(default = "default_max_stages_per_application")]
    pub max_stages_per_application: u32,
}

impl GrowthConfig {
    /// Stages per hour, derived from `ticks_per_stage` when that is set.
    pub fn effective_stages_per_hour(&self) -> f64 {
        match self.ticks_per_stage {
            Some(ticks) if ticks > 0 => {
                f64::from(self.host_tick_rate_hz) * 3600.0 / f64::from(ticks)
            }
            _ => self.stages_per_hour,
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            stages_per_hour: default_stages_per_hour(),
            ticks_per_stage: None,
            host_tick_rate_hz: default_host_tick_rate_hz(),
            max_offline_hours: default_max_offline_hours(),
            max_stages_per_application: default_max_stages_per_application(),
        }
    }
}

/// Work budget and seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Tiles popped per world per tick. Normalized to at least 1.
    #[serde(default = "default_chunks_per_tick")]
    pub chunks_per_tick: u32,

    /// Radius, in tiles, of the square seeded around an actor.
    #[serde(default = "default_seed_radius")]
    pub seed_radius: u32,

    /// Ticks between an actor's admission and seeding around it.
    #[serde(default = "default_join_delay_ticks")]
    pub join_delay_ticks: u32,

    /// Cells scanned below each column's surface (0 = full height).
    #[serde(default = "default_scan_depth")]
    pub scan_depth: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunks_per_tick: default_chunks_per_tick(),
            seed_radius: default_seed_radius(),
            join_delay_ticks: default_join_delay_ticks(),
            scan_depth: default_scan_depth(),
        }
    }
}

/// Per-kind growth toggles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CropsConfig {
    /// Wheat.
    #[serde(default = "default_true")]
    pub wheat: bool,
    /// Carrots.
    #[serde(default = "default_true")]
    pub carrots: bool,
    /// Potatoes.
    #[serde(default = "default_true")]
    pub potatoes: bool,
    /// Beetroots.
    #[serde(default = "default_true")]
    pub beetroots: bool,
    /// Nether wart.
    #[serde(default)]
    pub nether_wart: bool,
    /// Sweet berry bushes.
    #[serde(default)]
    pub sweet_berry_bush: bool,
    /// Melon stems.
    #[serde(default = "default_true")]
    pub melon_stem: bool,
    /// Pumpkin stems.
    #[serde(default = "default_true")]
    pub pumpkin_stem: bool,
}

impl CropsConfig {
    /// Whether the toggle for `kind` is on. Kinds without a toggle are
    /// always enabled.
    pub const fn enabled(&self, kind: BlockKind) -> bool {
        match kind {
            BlockKind::Wheat => self.wheat,
            BlockKind::Carrots => self.carrots,
            BlockKind::Potatoes => self.potatoes,
            BlockKind::Beetroots => self.beetroots,
            BlockKind::NetherWart => self.nether_wart,
            BlockKind::SweetBerryBush => self.sweet_berry_bush,
            BlockKind::MelonStem => self.melon_stem,
            BlockKind::PumpkinStem => self.pumpkin_stem,
            _ => true,
        }
    }

    /// The mutator filter matching these toggles.
    pub fn filter(&self) -> CropFilter {
        CropFilter::excluding(
            BlockKind::ALL
                .into_iter()
                .filter(|kind| kind.is_ageable() && !self.enabled(*kind)),
        )
    }
}

impl Default for CropsConfig {
    fn default() -> Self {
        Self {
            wheat: true,
            carrots: true,
            potatoes: true,
            beetroots: true,
            nether_wart: false,
            sweet_berry_bush: false,
            melon_stem: true,
            pumpkin_stem: true,
        }
    }
}

/// Session record storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one record file per world.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Tick loop and demo world settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to run before stopping (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Seed for the demo field layout.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Radius, in tiles, of the demo field.
    #[serde(default = "default_field_radius")]
    pub field_radius: u32,

    /// Stable id of the demo world, so its record survives restarts.
    #[serde(default)]
    pub world_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            seed: default_seed(),
            field_radius: default_field_radius(),
            world_id: None,
        }
    }
}

/// Operator API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperatorConfig {
    /// Whether the operator API is served.
    #[serde(default = "default_true")]
    pub api_enabled: bool,

    /// Bind address.
    #[serde(default = "default_operator_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_operator_port")]
    pub port: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            api_enabled: true,
            host: default_operator_host(),
            port: default_operator_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn,
    /// error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_stages_per_hour() -> f64 {
    6.0
}

const fn default_host_tick_rate_hz() -> u32 {
    20
}

const fn default_max_offline_hours() -> f64 {
    24.0
}

const fn default_max_stages_per_application() -> u32 {
    7
}

const fn default_chunks_per_tick() -> u32 {
    3
}

const fn default_seed_radius() -> u32 {
    2
}

const fn default_join_delay_ticks() -> u32 {
    80
}

const fn default_scan_depth() -> u32 {
    48
}

fn default_data_dir() -> String {
    "data/fallow".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_seed() -> u64 {
    42
}

const fn default_field_radius() -> u32 {
    2
}

fn default_operator_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_operator_port() -> u16 {
    8090
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = FallowConfig::default();
        assert!((config.growth.stages_per_hour - 6.0).abs() < f64::EPSILON);
        assert!((config.growth.max_offline_hours - 24.0).abs() < f64::EPSILON);
        assert_eq!(config.growth.max_stages_per_application, 7);
        assert_eq!(config.scheduler.chunks_per_tick, 3);
        assert_eq!(config.scheduler.seed_radius, 2);
        assert_eq!(config.scheduler.join_delay_ticks, 80);
        assert_eq!(config.scheduler.scan_depth, 48);
        assert!(config.crops.wheat);
        assert!(!config.crops.nether_wart);
        assert!(!config.crops.sweet_berry_bush);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
growth:
  stages_per_hour: 3.5
  max_offline_hours: 12
  max_stages_per_application: 4

scheduler:
  chunks_per_tick: 5
  seed_radius: 1
  join_delay_ticks: 40
  scan_depth: 0

crops:
  wheat: false
  nether_wart: true

storage:
  data_dir: "/var/lib/fallow"

engine:
  tick_interval_ms: 100
  max_ticks: 600
  seed: 9
  field_radius: 1

operator:
  api_enabled: false
  port: 9191

logging:
  level: "debug"
"#;
        let mut config: FallowConfig = serde_yml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert!((config.growth.stages_per_hour - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.growth.max_stages_per_application, 4);
        assert_eq!(config.scheduler.chunks_per_tick, 5);
        assert_eq!(config.scheduler.scan_depth, 0);
        assert!(!config.crops.wheat);
        assert!(config.crops.nether_wart);
        assert!(config.crops.carrots);
        assert_eq!(config.storage.data_dir, "/var/lib/fallow");
        assert_eq!(config.engine.max_ticks, 600);
        assert!(!config.operator.api_enabled);
        assert_eq!(config.operator.port, 9191);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_empty_yaml() {
        let config = FallowConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn environment_overrides_data_dir_and_port() {
        let mut config = FallowConfig::default();
        config.apply_overrides(|key| match key {
            DATA_DIR_ENV => Some("/srv/fallow".to_owned()),
            OPERATOR_PORT_ENV => Some("9300".to_owned()),
            _ => None,
        });
        assert_eq!(config.storage.data_dir, "/srv/fallow");
        assert_eq!(config.operator.port, 9300);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = FallowConfig::default();
        let before = config.operator.port;
        config.apply_overrides(|key| (key == OPERATOR_PORT_ENV).then(|| "70000".to_owned()));
        assert_eq!(config.operator.port, before);
        assert_eq!(config.storage.data_dir, StorageConfig::default().data_dir);
    }

    #[test]
    fn unset_overrides_leave_the_config_alone() {
        let mut config = FallowConfig::default();
        config.apply_overrides(|_| None);
        assert_eq!(config, FallowConfig::default());
    }

    #[test]
    fn zero_chunks_per_tick_is_raised_to_one() {
        let mut config: FallowConfig =
            serde_yml::from_str("scheduler:\n  chunks_per_tick: 0\n").unwrap();
        config.validate().unwrap();
        assert_eq!(config.scheduler.chunks_per_tick, 1);
    }

    #[test]
    fn zero_ticks_per_stage_is_rejected() {
        let mut config: FallowConfig =
            serde_yml::from_str("growth:\n  ticks_per_stage: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn negative_rate_is_rejected() {
        let mut config: FallowConfig =
            serde_yml::from_str("growth:\n  stages_per_hour: -1\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn ticks_per_stage_overrides_hourly_rate() {
        let growth = GrowthConfig {
            ticks_per_stage: Some(12_000),
            ..GrowthConfig::default()
        };
        // 20 Hz * 3600 s / 12000 ticks = 6 stages per hour.
        assert!((growth.effective_stages_per_hour() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn crop_toggles_map_to_filter() {
        let filter = CropsConfig::default().filter();
        assert!(filter.allows(BlockKind::Wheat));
        assert!(filter.allows(BlockKind::MelonStem));
        assert!(!filter.allows(BlockKind::NetherWart));
        assert!(!filter.allows(BlockKind::SweetBerryBush));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("fallow-config.yaml");
        if path.exists() {
            let config = FallowConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
