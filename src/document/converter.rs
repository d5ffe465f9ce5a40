//! External Markdown-to-AST converter
//!
//! The converter is any command that takes a document path as its last
//! argument and prints the element tree as JSON on stdout.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{parse_document, Element};
use crate::{Error, Result};

/// Runs the configured converter command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    program: String,
    args: Vec<String>,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            program: "ruby".to_string(),
            args: vec!["bin/markdown_ast.rb".to_string()],
        }
    }
}

impl Converter {
    /// Create a converter from a command line (program then arguments)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `command` is empty.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Configuration("converter command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Command line as configured
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the converter program can be spawned
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Convert the document at `path` into its top-level elements
    ///
    /// # Errors
    ///
    /// Returns [`Error::Converter`] if the command cannot be spawned, exits
    /// unsuccessfully, or prints something that is not an element tree.
    pub fn convert(&self, path: &Path) -> Result<Vec<Element>> {
        debug!(command = %self.command_line(), path = %path.display(), "converting document");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::Converter(format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Converter(format!(
                "{} exited with {}: {}",
                self.command_line(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::Converter(format!("converter output is not UTF-8: {e}")))?;
        parse_document(&stdout)
    }
}
