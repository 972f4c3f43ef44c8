use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Which accounts a check is shown to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    LoggedIn,
    LoggedOut,
    #[default]
    Any,
}

/// Recognized options of a single check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckConfig {
    pub enabled: bool,
    pub account: AccountClass,
    /// Edit count ceiling; `None` or `Some(0)` disables it.
    pub maximum_editcount: Option<u64>,
    pub ignore_sections: Vec<String>,
    pub ignore_lead_section: bool,
    /// Shortest span, in graphemes, an annotation-scan check reports.
    pub minimum_characters: usize,
    /// Only count insertions with nothing removed next to them.
    pub only_pure_insertions: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            account: AccountClass::Any,
            maximum_editcount: None,
            ignore_sections: Vec::new(),
            ignore_lead_section: false,
            minimum_characters: 0,
            only_pure_insertions: false,
        }
    }
}

impl CheckConfig {
    /// Apply the options set in `patch` over this config.
    pub fn merge(mut self, patch: &CheckConfigPatch) -> Self {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(account) = patch.account {
            self.account = account;
        }
        if let Some(max) = patch.maximum_editcount {
            self.maximum_editcount = Some(max);
        }
        if let Some(sections) = &patch.ignore_sections {
            self.ignore_sections = sections.clone();
        }
        if let Some(ignore) = patch.ignore_lead_section {
            self.ignore_lead_section = ignore;
        }
        if let Some(min) = patch.minimum_characters {
            self.minimum_characters = min;
        }
        if let Some(pure) = patch.only_pure_insertions {
            self.only_pure_insertions = pure;
        }
        self
    }
}

/// Partial check options as written in a config file. Unknown keys are
/// rejected when the file is parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfigPatch {
    pub enabled: Option<bool>,
    pub account: Option<AccountClass>,
    pub maximum_editcount: Option<u64>,
    pub ignore_sections: Option<Vec<String>>,
    pub ignore_lead_section: Option<bool>,
    pub minimum_characters: Option<usize>,
    pub only_pure_insertions: Option<bool>,
}

impl CheckConfigPatch {
    /// Layer `other` over `self`; options set in `other` win.
    fn merge(self, other: CheckConfigPatch) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            account: other.account.or(self.account),
            maximum_editcount: other.maximum_editcount.or(self.maximum_editcount),
            ignore_sections: other.ignore_sections.or(self.ignore_sections),
            ignore_lead_section: other.ignore_lead_section.or(self.ignore_lead_section),
            minimum_characters: other.minimum_characters.or(self.minimum_characters),
            only_pure_insertions: other.only_pure_insertions.or(self.only_pure_insertions),
        }
    }
}

/// Engine-wide options, resolved from every config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub enabled_namespaces: Vec<i32>,
    /// Hide every check regardless of its own config.
    pub force_hidden: bool,
    pub classifier_url: Option<String>,
}

fn default_enabled_namespaces() -> Vec<i32> {
    vec![0]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled_namespaces: default_enabled_namespaces(),
            force_hidden: false,
            classifier_url: None,
        }
    }
}

/// The `[engine]` table as written in a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigPatch {
    pub enabled_namespaces: Option<Vec<i32>>,
    pub force_hidden: Option<bool>,
    pub classifier_url: Option<String>,
}

impl EngineConfigPatch {
    fn merge(self, other: EngineConfigPatch) -> Self {
        Self {
            enabled_namespaces: other.enabled_namespaces.or(self.enabled_namespaces),
            force_hidden: other.force_hidden.or(self.force_hidden),
            classifier_url: other.classifier_url.or(self.classifier_url),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfigPatch,

    #[serde(default)]
    pub checks: BTreeMap<String, CheckConfigPatch>,
}

impl Config {
    /// Load configuration with priority: explicit file > local config > global config > defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                tracing::debug!(path = %global_path.display(), "loading global config");
                config = config.merge(Self::from_file(&global_path)?);
            }
        }

        let local_path = PathBuf::from(".editcheck.toml");
        if local_path.exists() {
            tracing::debug!(path = %local_path.display(), "loading local config");
            config = config.merge(Self::from_file(&local_path)?);
        }

        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading config");
            config = config.merge(Self::from_file(path)?);
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: Self) -> Self {
        self.engine = self.engine.merge(other.engine);
        for (name, patch) in other.checks {
            let merged = match self.checks.remove(&name) {
                Some(existing) => existing.merge(patch),
                None => patch,
            };
            self.checks.insert(name, merged);
        }
        self
    }

    /// Reject `[checks.*]` tables naming a check that does not exist.
    pub fn validate(&self, known_checks: &[&str]) -> Result<()> {
        for name in self.checks.keys() {
            if !known_checks.contains(&name.as_str()) {
                anyhow::bail!(
                    "Unknown check '{}' in configuration (known checks: {})",
                    name,
                    known_checks.join(", ")
                );
            }
        }
        Ok(())
    }

    /// Engine options, layered over the defaults.
    pub fn engine(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            enabled_namespaces: self
                .engine
                .enabled_namespaces
                .clone()
                .unwrap_or(defaults.enabled_namespaces),
            force_hidden: self.engine.force_hidden.unwrap_or(defaults.force_hidden),
            classifier_url: self.engine.classifier_url.clone(),
        }
    }

    /// Options of check `name`, layered over its built-in defaults.
    pub fn check_config(&self, name: &str, defaults: CheckConfig) -> CheckConfig {
        match self.checks.get(name) {
            Some(patch) => defaults.merge(patch),
            None => defaults,
        }
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "editcheck").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
