//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services. Request handlers
//! never read environment variables.

use crate::constants::DEFAULT_BASELINE_MINUTES;
use crate::{PaError, PaResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    rules_path: Option<PathBuf>,
    baseline_minutes: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            baseline_minutes: DEFAULT_BASELINE_MINUTES,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`PaError::InvalidConfig`] if `baseline_minutes` is zero.
    pub fn new(rules_path: Option<PathBuf>, baseline_minutes: u32) -> PaResult<Self> {
        if baseline_minutes == 0 {
            return Err(PaError::InvalidConfig(
                "baseline minutes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            rules_path,
            baseline_minutes,
        })
    }

    /// Rules file to load at startup. `None` means the built-in rules.
    pub fn rules_path(&self) -> Option<&Path> {
        self.rules_path.as_deref()
    }

    pub fn baseline_minutes(&self) -> u32 {
        self.baseline_minutes
    }
}

/// Interpret an optional rules-path value; blank means unset.
pub fn rules_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Parse the baseline minutes from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_BASELINE_MINUTES`].
///
/// # Errors
///
/// Returns [`PaError::InvalidConfig`] if the value is not a positive integer.
pub fn baseline_minutes_from_env_value(value: Option<String>) -> PaResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_BASELINE_MINUTES),
        Some(v) => match v.parse::<u32>() {
            Ok(minutes) if minutes > 0 => Ok(minutes),
            _ => Err(PaError::InvalidConfig(format!(
                "baseline minutes must be a positive integer, got {v:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rules_path_is_unset() {
        assert_eq!(rules_path_from_env_value(None), None);
        assert_eq!(rules_path_from_env_value(Some("  ".into())), None);
        assert_eq!(
            rules_path_from_env_value(Some(" rules/payers.yaml ".into())),
            Some(PathBuf::from("rules/payers.yaml"))
        );
    }

    #[test]
    fn baseline_minutes_defaults_and_parses() {
        assert_eq!(baseline_minutes_from_env_value(None).unwrap(), 15);
        assert_eq!(baseline_minutes_from_env_value(Some("".into())).unwrap(), 15);
        assert_eq!(baseline_minutes_from_env_value(Some(" 20 ".into())).unwrap(), 20);
    }

    #[test]
    fn bad_baseline_minutes_are_rejected() {
        for bad in ["0", "-3", "ten"] {
            assert!(matches!(
                baseline_minutes_from_env_value(Some(bad.into())),
                Err(PaError::InvalidConfig(_))
            ));
        }
        assert!(CoreConfig::new(None, 0).is_err());
    }

    #[test]
    fn default_config_uses_builtin_rules() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.rules_path(), None);
        assert_eq!(cfg.baseline_minutes(), DEFAULT_BASELINE_MINUTES);
    }
}
