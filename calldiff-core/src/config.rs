use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use calldiff_ast::MatcherOptions;

use crate::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "calldiff.toml";

/// Top-level calldiff configuration, matching `calldiff.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalldiffConfig {
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub matcher: MatcherSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// Append-only log file. Absent means no log sink.
    pub log_path: Option<PathBuf>,
    /// Write the report to stdout.
    pub console: bool,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            log_path: None,
            console: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSection {
    pub min_height: usize,
    pub similarity_threshold: f64,
}

impl Default for MatcherSection {
    fn default() -> Self {
        let options = MatcherOptions::default();
        Self {
            min_height: options.min_height,
            similarity_threshold: options.similarity_threshold,
        }
    }
}

impl CalldiffConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Load `calldiff.toml` from `dir` if present, defaults otherwise.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matcher.min_height == 0 {
            return Err(ConfigError::Invalid(
                "matcher.min_height must be at least 1".into(),
            ));
        }
        let threshold = self.matcher.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "matcher.similarity_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self
            .report
            .log_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid("report.log_path is empty".into()));
        }
        Ok(())
    }

    pub fn matcher_options(&self) -> MatcherOptions {
        MatcherOptions {
            min_height: self.matcher.min_height,
            similarity_threshold: self.matcher.similarity_threshold,
        }
    }
}
