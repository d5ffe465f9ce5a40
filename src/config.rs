//! Check configuration
//!
//! Every field has a default, so a config file only needs the settings it
//! changes:
//!
//! ```json
//! {
//!   "runner": { "interpreter": "python3.11", "allowed_errors": ["TypeError", "KeyError"] },
//!   "converter": ["ruby", "tools/ast.rb"]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::{Converter, RoleClasses};
use crate::runner::RunnerConfig;
use crate::{Error, Result};

/// Settings for checking lesson documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Fragment runner settings
    pub runner: RunnerConfig,
    /// Classes marking code, output and error blocks
    pub roles: RoleClasses,
    /// Code fence marker
    pub fence: String,
    /// Converter command line; the document path is appended
    pub converter: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            roles: RoleClasses::default(),
            fence: "~~~".to_string(),
            converter: vec!["ruby".to_string(), "bin/markdown_ast.rb".to_string()],
        }
    }
}

impl CheckConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            Error::Configuration(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty fence marker,
    /// converter command or interpreter.
    pub fn validate(&self) -> Result<()> {
        if self.runner.interpreter.is_empty() {
            return Err(Error::Configuration("interpreter is empty".to_string()));
        }
        if self.fence.is_empty() {
            return Err(Error::Configuration("fence marker is empty".to_string()));
        }
        if self.converter.is_empty() {
            return Err(Error::Configuration("converter command is empty".to_string()));
        }
        Ok(())
    }

    /// Set the runner configuration
    #[must_use]
    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    /// Set the role classes
    #[must_use]
    pub fn with_roles(mut self, roles: RoleClasses) -> Self {
        self.roles = roles;
        self
    }

    /// Set the fence marker
    #[must_use]
    pub fn with_fence(mut self, fence: impl Into<String>) -> Self {
        self.fence = fence.into();
        self
    }

    /// Set the converter command line
    #[must_use]
    pub fn with_converter<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.converter = command.into_iter().map(Into::into).collect();
        self
    }

    /// Converter for the configured command
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the command is empty.
    pub fn converter(&self) -> Result<Converter> {
        Converter::from_command(&self.converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckConfig::default();
        assert_eq!(config.fence, "~~~");
        assert_eq!(config.roles.code, "language-python");
        assert!(config.runner.is_allowed("NameError"));
        assert!(!config.runner.is_allowed("ZeroDivisionError"));
        assert!(config.runner.is_noop("pass"));
        assert_eq!(config.runner.interpreter, "python3");
        assert!(config.runner.required_modules.is_empty());
        assert_eq!(
            config.converter().unwrap().command_line(),
            "ruby bin/markdown_ast.rb"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.json");
        std::fs::write(
            &path,
            r#"{"runner": {"allowed_errors": ["KeyError"], "required_modules": ["numpy"]}, "roles": {"output": "result"}}"#,
        )
        .unwrap();
        let config = CheckConfig::from_file(&path).unwrap();
        assert_eq!(config.runner.allowed_errors, vec!["KeyError"]);
        assert_eq!(config.runner.required_modules, vec!["numpy"]);
        assert_eq!(config.runner.interpreter, "python3");
        assert!(config.runner.is_noop("None"));
        assert_eq!(config.roles.output, "result");
        assert_eq!(config.roles.error, "error");
        assert_eq!(config.fence, "~~~");
    }

    #[test]
    fn test_missing_file() {
        let err = CheckConfig::from_file(Path::new("/nonexistent/check.json")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.json");
        std::fs::write(&path, r#"{"fence": ""}"#).unwrap();
        assert!(CheckConfig::from_file(&path).is_err());
        std::fs::write(&path, r#"{"runner": {"interpreter": ""}}"#).unwrap();
        assert!(CheckConfig::from_file(&path).is_err());
        std::fs::write(&path, "not json").unwrap();
        assert!(CheckConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_builders() {
        let config = CheckConfig::default()
            .with_fence("```")
            .with_converter(["kramdown-json"])
            .with_runner(RunnerConfig::default().with_noop_fragments(["..."]));
        assert_eq!(config.fence, "```");
        assert_eq!(config.converter, vec!["kramdown-json"]);
        assert!(config.runner.is_noop("..."));
        assert!(config.validate().is_ok());
    }
}
