//! Configuration parsing and management.

use crate::catalog::{
    BaseUrlOptions, ExternalLinkOptions, LegacyFileOptions, ResolveUidOptions,
    RootRelativeOptions, RuleKind, ShortcodeQuoteOptions, UnresolvedLinkOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Main configuration struct matching the relink.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,

    /// Root of the editing UI; audit rows link each record there
    #[serde(default = "default_studio_url")]
    pub studio_url: String,

    /// Directory prefix shared by every record's `dirpath`
    #[serde(default = "default_content_root")]
    pub content_root: String,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_studio_url() -> String {
    String::from("http://localhost:8043")
}

fn default_content_root() -> String {
    String::from("content")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Snapshot directory (`sites.yml` + `content/`)
    pub snapshot: PathBuf,

    /// Where audit files are written
    #[serde(default = "default_audit_dir")]
    pub audit: PathBuf,
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("audit")
}

/// Length limits and prefixes of the storage layer, mirrored so lookups agree
/// with how paths were originally derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_dirpath_max_len")]
    pub dirpath_max_len: usize,

    #[serde(default = "default_filename_max_len")]
    pub filename_max_len: usize,

    /// Length of the random prefix uploads were stored under
    #[serde(default = "default_legacy_prefix_len")]
    pub legacy_prefix_len: usize,
}

fn default_dirpath_max_len() -> usize {
    625
}

fn default_filename_max_len() -> usize {
    125
}

fn default_legacy_prefix_len() -> usize {
    33
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            dirpath_max_len: default_dirpath_max_len(),
            filename_max_len: default_filename_max_len(),
            legacy_prefix_len: default_legacy_prefix_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Abort the run on the first fatal record error
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_on_error: true,
        }
    }
}

/// Typed options for every rule in the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub baseurl: BaseUrlOptions,

    #[serde(default)]
    pub resolveuid: ResolveUidOptions,

    #[serde(default)]
    pub unresolved_links: UnresolvedLinkOptions,

    #[serde(default)]
    pub root_relative: RootRelativeOptions,

    #[serde(default)]
    pub legacy_files: LegacyFileOptions,

    #[serde(default)]
    pub shortcode_quotes: ShortcodeQuoteOptions,

    #[serde(default)]
    pub external_links: ExternalLinkOptions,
}

impl RulesConfig {
    /// Whether a rule is configured to write its results
    pub fn commit(&self, kind: RuleKind) -> bool {
        match kind {
            RuleKind::BaseUrl => self.baseurl.commit,
            RuleKind::ResolveUid => self.resolveuid.commit,
            RuleKind::UnresolvedLinks => self.unresolved_links.commit,
            RuleKind::RootRelative => self.root_relative.commit,
            RuleKind::LegacyFiles => self.legacy_files.commit,
            RuleKind::ShortcodeQuotes => self.shortcode_quotes.commit,
            RuleKind::ExternalLinks => self.external_links.commit,
        }
    }

    pub fn set_commit(&mut self, kind: RuleKind, commit: bool) {
        let flag = match kind {
            RuleKind::BaseUrl => &mut self.baseurl.commit,
            RuleKind::ResolveUid => &mut self.resolveuid.commit,
            RuleKind::UnresolvedLinks => &mut self.unresolved_links.commit,
            RuleKind::RootRelative => &mut self.root_relative.commit,
            RuleKind::LegacyFiles => &mut self.legacy_files.commit,
            RuleKind::ShortcodeQuotes => &mut self.shortcode_quotes.commit,
            RuleKind::ExternalLinks => &mut self.external_links.commit,
        };
        *flag = commit;
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text; relative paths resolve against the working directory
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.dirpath_max_len == 0 || self.limits.filename_max_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits".to_string(),
                message: "maximum lengths must be positive".to_string(),
            });
        }
        if self.content_root.trim_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "content_root".to_string(),
                message: "must name a directory".to_string(),
            });
        }
        Ok(())
    }

    /// Get the snapshot directory, resolved relative to config file
    pub fn snapshot_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.snapshot)
    }

    /// Get the audit directory, resolved relative to config file
    pub fn audit_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.audit)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }

    /// Content root without surrounding slashes ("content")
    pub fn content_root(&self) -> &str {
        self.content_root.trim_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml("paths:\n  snapshot: snap\n").unwrap();

        assert_eq!(config.paths.audit, PathBuf::from("audit"));
        assert_eq!(config.content_root(), "content");
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.limits.legacy_prefix_len, 33);
        assert!(config.engine.stop_on_error);
        assert!(!config.rules.baseurl.commit);
        assert_eq!(config.rules.baseurl.fields, vec!["body".to_string()]);
        assert_eq!(config.rules.external_links.category, "external-resource");
    }

    #[test]
    fn test_rule_options_parse() {
        let yaml = r#"
paths:
  snapshot: snap
  audit: out
studio_url: "https://studio.example.edu/"
rules:
  baseurl:
    fields: [body, metadata.description]
  external_links:
    commit: true
    force_license_warning: false
    exempt_hosts: [example.edu]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(
            config.rules.baseurl.fields,
            vec!["body".to_string(), "metadata.description".to_string()]
        );
        assert!(config.rules.external_links.commit);
        assert_eq!(config.rules.external_links.force_license_warning, Some(false));
        assert_eq!(config.studio_url, "https://studio.example.edu/");
    }

    #[test]
    fn test_commit_flag_per_rule() {
        let mut config = Config::from_yaml("paths:\n  snapshot: s\n").unwrap();
        assert!(!config.rules.commit(RuleKind::ExternalLinks));
        config.rules.set_commit(RuleKind::ExternalLinks, true);
        assert!(config.rules.external_links.commit);
        assert!(!config.rules.commit(RuleKind::BaseUrl));
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let yaml = "paths:\n  snapshot: s\nlimits:\n  filename_max_len: 0\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_paths_resolve_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relink.yml");
        std::fs::write(&path, "paths:\n  snapshot: snap\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.snapshot_dir(), dir.path().join("snap"));
        assert_eq!(config.audit_dir(), dir.path().join("audit"));
    }
}
