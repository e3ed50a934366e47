//! Versioned, atomically swappable rule store.
//!
//! Readers take an immutable [`RuleSnapshot`] and keep using it for the whole request, even if
//! an administrator replaces the rule set concurrently. Replacements are validated before they
//! become visible; a rejected document leaves the live rules and version untouched.

use crate::rules::{PayerRuleSet, ProcedureRule};
use crate::PaResult;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An immutable view of the rule set at a given version.
#[derive(Clone, Debug)]
pub struct RuleSnapshot {
    version: u64,
    rules: Arc<PayerRuleSet>,
}

impl RuleSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rules(&self) -> &PayerRuleSet {
        &self.rules
    }

    pub fn get_rule(&self, payer: &str, procedure_code: &str) -> PaResult<&ProcedureRule> {
        self.rules.get_rule(payer, procedure_code)
    }
}

#[derive(Debug)]
pub struct RuleStore {
    current: RwLock<RuleSnapshot>,
}

impl RuleStore {
    /// Create a store whose first version is `rules`.
    pub fn new(rules: PayerRuleSet) -> Self {
        Self {
            current: RwLock::new(RuleSnapshot {
                version: 1,
                rules: Arc::new(rules),
            }),
        }
    }

    /// Create a store from the configured rules path, or the built-in defaults when unset.
    ///
    /// # Errors
    ///
    /// A configured path that cannot be read or validated is an error; there is no silent
    /// fallback to the defaults in that case.
    pub fn open(rules_path: Option<&Path>) -> PaResult<Self> {
        match rules_path {
            Some(path) => {
                let rules = PayerRuleSet::load(path)?;
                tracing::info!("loaded payer rules from {}", path.display());
                Ok(Self::new(rules))
            }
            None => {
                tracing::info!("no rules file configured, using built-in default rules");
                Ok(Self::new(PayerRuleSet::builtin_default()))
            }
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> RuleSnapshot {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Replace the whole rule set (last write wins) and return the new version.
    pub fn replace(&self, rules: PayerRuleSet) -> u64 {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let version = guard.version + 1;
        *guard = RuleSnapshot {
            version,
            rules: Arc::new(rules),
        };
        tracing::info!("payer rules replaced, now at version {}", version);
        version
    }

    /// Validate a JSON document and, if valid, swap it in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PaError::RulesParse`] or [`crate::PaError::InvalidRules`] without changing the store.
    pub fn replace_from_json(&self, document: serde_json::Value) -> PaResult<u64> {
        let rules = PayerRuleSet::from_json_value(document).inspect_err(|e| {
            tracing::warn!("rejected rule set replacement: {}", e);
        })?;
        Ok(self.replace(rules))
    }

    /// Re-read a rules file and swap it in.
    pub fn reload(&self, path: &Path) -> PaResult<u64> {
        let rules = PayerRuleSet::load(path)?;
        Ok(self.replace(rules))
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(PayerRuleSet::builtin_default())
    }
}

impl From<PayerRuleSet> for RuleStore {
    fn from(rules: PayerRuleSet) -> Self {
        Self::new(rules)
    }
}
