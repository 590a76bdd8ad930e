//! User preferences persisted as TOML.
//!
//! [`Preferences`] gathers the calculation settings the engine otherwise receives through
//! explicit contexts. Missing keys take their default value; out-of-range values are rejected
//! when loading.
//!
//! ```rust
//! use hycas::{preferences::Preferences, settings::AngleUnit};
//! let preferences = Preferences::from_toml_str("angle-unit = \"degree\"\nsignificant-digits = 6").unwrap();
//! assert_eq!(preferences.angle_unit, AngleUnit::Degree);
//! assert_eq!(preferences.significant_digits, 6);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Pool,
    approx::ApproximationContext,
    context::Context,
    pool::DEFAULT_POOL_CAPACITY,
    reduce::ReductionContext,
    settings::{
        AngleUnit, ComplexFormat, DEFAULT_SIGNIFICANT_DIGITS, MAX_SIGNIFICANT_DIGITS, PrintFloatMode,
        SymbolicComputation, Target, UnitFormat,
    },
};

/// Environment variable overriding the location of the preferences file.
pub const ENV_CONFIG_PATH: &str = "HYCAS_CONFIG";
/// Smallest pool a preferences file may ask for, in bytes.
pub const MIN_POOL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse preferences file '{file}': {source}")]
    Parse { source: toml::de::Error, file: String },

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Preferences {
    pub angle_unit: AngleUnit,
    pub complex_format: ComplexFormat,
    pub unit_format: UnitFormat,
    pub print_float_mode: PrintFloatMode,
    pub significant_digits: usize,
    pub pool_capacity: usize,
    pub symbolic_computation: SymbolicComputation,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            angle_unit: AngleUnit::default(),
            complex_format: ComplexFormat::default(),
            unit_format: UnitFormat::default(),
            print_float_mode: PrintFloatMode::default(),
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            symbolic_computation: SymbolicComputation::default(),
        }
    }
}

impl Preferences {
    /// Default path of the preferences file.
    ///
    /// `$HYCAS_CONFIG` when set, otherwise `hycas/preferences.toml` under the platform
    /// configuration directory.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push("hycas");
        path.push("preferences.toml");
        path
    }

    /// Check every value is in range.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_SIGNIFICANT_DIGITS).contains(&self.significant_digits) {
            return Err(ConfigError::InvalidValue {
                key: "significant-digits",
                reason: format!("{} is not between 1 and {MAX_SIGNIFICANT_DIGITS}", self.significant_digits),
            });
        }
        if self.pool_capacity < MIN_POOL_CAPACITY {
            return Err(ConfigError::InvalidValue {
                key: "pool-capacity",
                reason: format!("{} is below the minimum of {MIN_POOL_CAPACITY} bytes", self.pool_capacity),
            });
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let preferences: Self =
            toml::from_str(text).map_err(|source| ConfigError::Parse { source, file: "<string>".to_owned() })?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Load preferences from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str::<Self>(&text)
            .map_err(|source| ConfigError::Parse { source, file: path.display().to_string() })
            .and_then(|preferences| preferences.validate().map(|()| preferences))
    }

    /// Load from [`Preferences::default_path`], falling back to defaults when no file exists.
    pub fn load_or_default() -> ConfigResult<Self> {
        let path = Self::default_path();
        if !path.exists() {
            log::debug!("no preferences at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Save preferences to a TOML file, creating its parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let text = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Fresh pool of the configured capacity.
    pub fn create_pool(&self) -> Pool {
        Pool::with_capacity(self.pool_capacity)
    }

    pub fn reduction_context<'a>(&self, context: &'a dyn Context, target: Target) -> ReductionContext<'a> {
        ReductionContext::new(context)
            .with_target(target)
            .with_complex_format(self.complex_format)
            .with_angle_unit(self.angle_unit)
            .with_unit_format(self.unit_format)
            .with_symbolic_computation(self.symbolic_computation)
    }

    pub fn approximation_context<'a>(&self, context: &'a dyn Context) -> ApproximationContext<'a> {
        ApproximationContext::new(context)
            .with_complex_format(self.complex_format)
            .with_angle_unit(self.angle_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let preferences = Preferences::from_toml_str("complex-format = \"cartesian\"").unwrap();
        assert_eq!(preferences.complex_format, ComplexFormat::Cartesian);
        assert_eq!(preferences.significant_digits, DEFAULT_SIGNIFICANT_DIGITS);
        assert_eq!(preferences.pool_capacity, DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let error = Preferences::from_toml_str("significant-digits = 15").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key: "significant-digits", .. }));
        let error = Preferences::from_toml_str("pool-capacity = 12").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key: "pool-capacity", .. }));
        let error = Preferences::from_toml_str("angle-unit = \"turns\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn serialized_preferences_load_back() {
        let preferences = Preferences { angle_unit: AngleUnit::Gradian, significant_digits: 4, ..Default::default() };
        let text = toml::to_string(&preferences).unwrap();
        assert!(text.contains("angle-unit = \"gradian\""));
        assert_eq!(Preferences::from_toml_str(&text).unwrap(), preferences);
    }
}
