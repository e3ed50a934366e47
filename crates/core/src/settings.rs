//! Organisation settings.
//!
//! A single settings record per deployment, seeded from [`CoreConfig`] at startup and replaced
//! as a whole by administrators. Reports read the live baseline minutes from here.

use crate::config::CoreConfig;
use crate::constants::{DEFAULT_ORG_NAME, DEFAULT_RETENTION_DAYS};
use crate::{PaError, PaResult};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSettings {
    pub name: String,
    /// How long request data is kept, in days. Stored for the storage layer to enforce.
    pub retention_days: u32,
    /// Minutes of clinician time assumed saved per drafted request.
    pub baseline_minutes: u32,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl OrgSettings {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self {
            name: DEFAULT_ORG_NAME.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            baseline_minutes: cfg.baseline_minutes(),
            logo_url: None,
        }
    }

    /// Trim text fields and check the record.
    ///
    /// # Errors
    ///
    /// Returns [`PaError::MalformedInput`] for a blank name or a zero day/minute count.
    pub fn normalised(self) -> PaResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PaError::MalformedInput("organisation name is required".into()));
        }
        if self.retention_days == 0 {
            return Err(PaError::MalformedInput(
                "retention_days must be greater than zero".into(),
            ));
        }
        if self.baseline_minutes == 0 {
            return Err(PaError::MalformedInput(
                "baseline_minutes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            name,
            logo_url: self
                .logo_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            ..self
        })
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<OrgSettings>,
}

impl SettingsStore {
    pub fn new(settings: OrgSettings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> OrgSettings {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Validate and store a full replacement, returning what was stored.
    pub fn replace(&self, settings: OrgSettings) -> PaResult<OrgSettings> {
        let settings = settings.normalised().inspect_err(|e| {
            tracing::warn!("rejected settings update: {}", e);
        })?;

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings.clone();
        tracing::info!("organisation settings updated for {}", settings.name);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OrgSettings {
        OrgSettings::from_config(&CoreConfig::default())
    }

    #[test]
    fn defaults_follow_config() {
        let cfg = CoreConfig::new(None, 40).unwrap();
        let settings = OrgSettings::from_config(&cfg);
        assert_eq!(settings.name, DEFAULT_ORG_NAME);
        assert_eq!(settings.retention_days, 180);
        assert_eq!(settings.baseline_minutes, 40);
        assert_eq!(settings.logo_url, None);
    }

    #[test]
    fn replace_trims_and_stores() {
        let store = SettingsStore::new(settings());
        let stored = store
            .replace(OrgSettings {
                name: "  Cape Joint Clinic ".into(),
                retention_days: 365,
                baseline_minutes: 25,
                logo_url: Some("  ".into()),
            })
            .unwrap();

        assert_eq!(stored.name, "Cape Joint Clinic");
        assert_eq!(stored.logo_url, None);
        assert_eq!(store.get(), stored);
    }

    #[test]
    fn invalid_replacement_leaves_settings_untouched() {
        let store = SettingsStore::new(settings());

        let blank_name = OrgSettings {
            name: " ".into(),
            ..settings()
        };
        assert!(matches!(
            store.replace(blank_name),
            Err(PaError::MalformedInput(_))
        ));

        let zero_minutes = OrgSettings {
            baseline_minutes: 0,
            ..settings()
        };
        assert!(store.replace(zero_minutes).is_err());

        let zero_days = OrgSettings {
            retention_days: 0,
            ..settings()
        };
        assert!(store.replace(zero_days).is_err());

        assert_eq!(store.get(), settings());
    }
}
