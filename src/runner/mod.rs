//! Fragment execution
//!
//! [`CodeRunner`] runs one fragment in an episode's [`PythonSession`] and
//! reports what it printed or evaluated to and which lesson error, if any,
//! it raised.
//!
//! # Example
//!
//! ```rust,no_run
//! use lesson_check::runner::CodeRunner;
//!
//! let runner = CodeRunner::new();
//! let mut session = runner.open()?;
//! runner.run("a = 15", &mut session)?;
//! let result = runner.run("print(a * 2)", &mut session)?;
//! assert_eq!(result.actual_output.as_deref(), Some("30"));
//! assert_eq!(result.actual_error, None);
//! # Ok::<(), lesson_check::Error>(())
//! ```

mod capture;
mod python;

pub use capture::{Redirect, SharedBuffer, SlotWriter, StdoutSlot};
pub use python::{is_available, PythonSession, Reply, DEFAULT_INTERPRETER};

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Python interpreter command
    pub interpreter: String,
    /// Modules that must import before a document is checked
    pub required_modules: Vec<String>,
    /// Exception kinds that count as errors the lesson means to show
    pub allowed_errors: Vec<String>,
    /// Fragments that are skipped outright
    pub noop_fragments: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            required_modules: Vec::new(),
            allowed_errors: [
                "IndexError",
                "TypeError",
                "SyntaxError",
                "IndentationError",
                "AssertionError",
                "NameError",
            ]
            .map(String::from)
            .to_vec(),
            noop_fragments: vec!["None".to_string(), "pass".to_string()],
        }
    }
}

impl RunnerConfig {
    /// Use a different interpreter command
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Replace the modules checked when a session opens
    #[must_use]
    pub fn with_required_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the allowed error kinds
    #[must_use]
    pub fn with_allowed_errors<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_errors = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the no-op fragments
    #[must_use]
    pub fn with_noop_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.noop_fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `kind` is reported rather than warned about
    #[must_use]
    pub fn is_allowed(&self, kind: &str) -> bool {
        self.allowed_errors.iter().any(|allowed| allowed == kind)
    }

    /// Whether `code` is skipped without running
    #[must_use]
    pub fn is_noop(&self, code: &str) -> bool {
        self.noop_fragments.iter().any(|noop| noop == code)
    }
}


/// What one fragment actually did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Value or printed output, normalized for comparison
    pub actual_output: Option<String>,
    /// Allowed error kind raised, e.g. `TypeError`
    pub actual_error: Option<String>,
    /// Warning logged for an error outside the allow-list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Anything that can run an episode's fragments in order
pub trait FragmentRunner {
    /// State the fragments of one episode share
    type Session;

    /// Start a fresh session for a new episode
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be set up.
    fn open(&self) -> Result<Self::Session>;

    /// Run `code` in `session`
    ///
    /// # Errors
    ///
    /// Returns an error only when the fragment could not be run at all;
    /// exceptions raised by the fragment are part of the result.
    fn run(&self, code: &str, session: &mut Self::Session) -> Result<ExecutionResult>;
}

impl<F> FragmentRunner for F
where
    F: Fn(&str) -> Result<ExecutionResult>,
{
    type Session = ();

    fn open(&self) -> Result<()> {
        Ok(())
    }

    fn run(&self, code: &str, _session: &mut ()) -> Result<ExecutionResult> {
        self(code)
    }
}

/// Runs fragments in a Python interpreter with captured output
#[derive(Debug, Default)]
pub struct CodeRunner {
    config: RunnerConfig,
    slot: StdoutSlot,
}

/// Output text as lessons write it
///
/// A value from an expression wins over anything printed: strings are
/// wrapped in single quotes, other values use `str()`.
fn derive_output(reply: &Reply, captured: &str) -> Option<String> {
    match &reply.value {
        Some(value) if reply.value_is_str => Some(format!("'{value}'")),
        Some(value) => Some(value.clone()),
        None => match captured {
            "" => None,
            text => Some(text.strip_suffix('\n').unwrap_or(text).to_string()),
        },
    }
}

impl CodeRunner {
    /// Runner with the default configuration printing to process stdout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with a specific configuration
    #[must_use]
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            slot: StdoutSlot::new(),
        }
    }

    /// Use a different output slot
    #[must_use]
    pub fn with_slot(mut self, slot: StdoutSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Output slot fragments print to
    #[must_use]
    pub fn slot(&self) -> &StdoutSlot {
        &self.slot
    }

    /// Whether the configured interpreter can be started
    #[must_use]
    pub fn is_available(&self) -> bool {
        is_available(&self.config.interpreter)
    }

    /// Start an interpreter session and import the required modules
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interpreter`] if the interpreter cannot be started
    /// or a required module fails to import.
    pub fn open(&self) -> Result<PythonSession> {
        let mut session = PythonSession::spawn(&self.config.interpreter)?;
        for module in &self.config.required_modules {
            let reply = session.import(module)?;
            if let Some(kind) = reply.error_kind {
                return Err(Error::Interpreter(format!(
                    "required module {module} failed to import: {kind}: {}",
                    reply.message.unwrap_or_default()
                )));
            }
        }
        Ok(session)
    }

    /// Run `code` in a session of its own
    ///
    /// # Errors
    ///
    /// See [`CodeRunner::open`] and [`CodeRunner::run`].
    pub fn run_fresh(&self, code: &str) -> Result<ExecutionResult> {
        let mut session = self.open()?;
        self.run(code, &mut session)
    }

    /// Run `code` in `session`
    ///
    /// The fragment is evaluated as an expression when it compiles as one
    /// and executed as statements otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if the output slot is already redirected
    /// and [`Error::Interpreter`] if the interpreter has died.
    pub fn run(&self, code: &str, session: &mut PythonSession) -> Result<ExecutionResult> {
        if self.config.is_noop(code) {
            return Ok(ExecutionResult::default());
        }

        let (reply, captured) = {
            let redirect = self.slot.redirect()?;
            let reply = session.execute(code)?;
            self.slot.writer().write_all(reply.stdout.as_bytes())?;
            (reply, redirect.captured())
        };

        let result = match reply.error_kind.as_deref() {
            None => ExecutionResult {
                actual_output: derive_output(&reply, &captured),
                ..ExecutionResult::default()
            },
            Some(kind) => self.classify(code, kind, reply.message.as_deref(), &captured),
        };
        debug!(
            output = ?result.actual_output,
            error = ?result.actual_error,
            "ran fragment"
        );
        Ok(result)
    }

    fn classify(
        &self,
        code: &str,
        kind: &str,
        message: Option<&str>,
        captured: &str,
    ) -> ExecutionResult {
        let actual_output = derive_output(&Reply::default(), captured);
        if self.config.is_allowed(kind) {
            return ExecutionResult {
                actual_output,
                actual_error: Some(kind.to_string()),
                warning: None,
            };
        }
        let warning = format!(
            "Caught error: `{}` from: `{code}`. Continuing anyway...",
            message.filter(|m| !m.is_empty()).unwrap_or(kind)
        );
        warn!("{warning}");
        ExecutionResult {
            actual_output,
            actual_error: None,
            warning: Some(warning),
        }
    }
}

impl FragmentRunner for CodeRunner {
    type Session = PythonSession;

    fn open(&self) -> Result<PythonSession> {
        CodeRunner::open(self)
    }

    fn run(&self, code: &str, session: &mut PythonSession) -> Result<ExecutionResult> {
        CodeRunner::run(self, code, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_runner() -> Option<CodeRunner> {
        let runner = CodeRunner::new().with_slot(StdoutSlot::with_sink(SharedBuffer::new()));
        if !runner.is_available() {
            eprintln!("Python not available, skipping test");
            return None;
        }
        Some(runner)
    }

    fn reply(value: &str, is_str: bool) -> Reply {
        Reply {
            value: Some(value.to_string()),
            value_is_str: is_str,
            ..Reply::default()
        }
    }

    #[test]
    fn test_derive_output() {
        assert_eq!(derive_output(&reply("AAA", true), ""), Some("'AAA'".to_string()));
        assert_eq!(derive_output(&reply("23", false), "ignored\n"), Some("23".to_string()));
        assert_eq!(derive_output(&Reply::default(), ""), None);
        assert_eq!(derive_output(&Reply::default(), "\n"), Some(String::new()));
        assert_eq!(derive_output(&Reply::default(), "30\n"), Some("30".to_string()));
        assert_eq!(derive_output(&Reply::default(), "\t\n"), Some("\t".to_string()));
    }

    #[test]
    fn test_config_builders() {
        let config = RunnerConfig::default()
            .with_interpreter("python3.12")
            .with_required_modules(["numpy", "pandas"]);
        assert_eq!(config.interpreter, "python3.12");
        assert_eq!(config.required_modules, vec!["numpy", "pandas"]);
        assert!(config.is_allowed("IndentationError"));
        assert!(!config.is_allowed("ModuleNotFoundError"));
    }

    #[test]
    fn test_missing_interpreter_fails_to_open() {
        let runner = CodeRunner::with_config(
            RunnerConfig::default().with_interpreter("/nonexistent/python"),
        );
        assert!(!runner.is_available());
        assert!(matches!(runner.open().unwrap_err(), Error::Interpreter(_)));
    }

    #[test]
    fn test_expression_and_statement() {
        let Some(runner) = quiet_runner() else { return };
        let mut session = runner.open().unwrap();
        assert_eq!(
            runner.run("3 + 5 * 4", &mut session).unwrap().actual_output.as_deref(),
            Some("23")
        );
        assert_eq!(runner.run("a = 15", &mut session).unwrap(), ExecutionResult::default());
        assert_eq!(
            runner.run("print(a*2)", &mut session).unwrap().actual_output.as_deref(),
            Some("30")
        );
        assert_eq!(runner.run("None", &mut session).unwrap(), ExecutionResult::default());
    }

    #[test]
    fn test_unexpected_error_warns() {
        let Some(runner) = quiet_runner() else { return };
        let result = runner.run_fresh("1/0").unwrap();
        assert_eq!(result.actual_output, None);
        assert_eq!(result.actual_error, None);
        assert_eq!(
            result.warning.as_deref(),
            Some("Caught error: `division by zero` from: `1/0`. Continuing anyway...")
        );
    }

    #[test]
    fn test_output_before_error_is_kept() {
        let Some(runner) = quiet_runner() else { return };
        let result = runner.run_fresh("print('partial')\nundefined").unwrap();
        assert_eq!(result.actual_output.as_deref(), Some("partial"));
        assert_eq!(result.actual_error.as_deref(), Some("NameError"));
    }

    #[test]
    fn test_syntax_and_indentation_errors() {
        let Some(runner) = quiet_runner() else { return };
        let error = |code: &str| runner.run_fresh(code).unwrap().actual_error;
        assert_eq!(error("x = = 1").as_deref(), Some("SyntaxError"));
        assert_eq!(error("  x = 1\ny = 2").as_deref(), Some("IndentationError"));
    }

    #[test]
    fn test_custom_allow_list() {
        let runner = CodeRunner::with_config(
            RunnerConfig::default().with_allowed_errors(["ZeroDivisionError"]),
        )
        .with_slot(StdoutSlot::with_sink(SharedBuffer::new()));
        if !runner.is_available() {
            eprintln!("Python not available, skipping test");
            return;
        }
        let result = runner.run_fresh("1/0").unwrap();
        assert_eq!(result.actual_error.as_deref(), Some("ZeroDivisionError"));
        let result = runner.run_fresh("[][0]").unwrap();
        assert_eq!(result.actual_error, None);
        assert!(result.warning.is_some());
    }

    #[test]
    fn test_required_module_missing() {
        let runner = CodeRunner::with_config(
            RunnerConfig::default().with_required_modules(["no_such_module_here"]),
        );
        if !runner.is_available() {
            eprintln!("Python not available, skipping test");
            return;
        }
        let err = runner.open().unwrap_err();
        assert!(err
            .to_string()
            .contains("required module no_such_module_here failed to import: ModuleNotFoundError"));
    }

    #[test]
    fn test_slot_released_after_error() {
        let Some(runner) = quiet_runner() else { return };
        let mut session = runner.open().unwrap();
        runner.run("raise ValueError('boom')", &mut session).unwrap();
        assert!(!runner.slot().is_redirected());
        assert!(runner.run("1", &mut session).is_ok());
    }

    #[test]
    fn test_slot_released_when_interpreter_dies() {
        let Some(runner) = quiet_runner() else { return };
        let mut session = runner.open().unwrap();
        let err = runner.run("import os\nos._exit(1)", &mut session).unwrap_err();
        assert!(matches!(err, Error::Interpreter(_)));
        assert!(!runner.slot().is_redirected());
    }

    #[test]
    fn test_nothing_leaks_to_original_sink() {
        let original = SharedBuffer::new();
        let runner = CodeRunner::new().with_slot(StdoutSlot::with_sink(original.clone()));
        if !runner.is_available() {
            eprintln!("Python not available, skipping test");
            return;
        }
        runner.run_fresh("print('hidden')").unwrap();
        assert!(original.is_empty());
    }

    #[test]
    fn test_closure_runner() {
        let stub = |code: &str| -> Result<ExecutionResult> {
            Ok(ExecutionResult {
                actual_output: Some(code.to_uppercase()),
                ..ExecutionResult::default()
            })
        };
        let mut session = FragmentRunner::open(&stub).unwrap();
        let result = FragmentRunner::run(&stub, "abc", &mut session).unwrap();
        assert_eq!(result.actual_output.as_deref(), Some("ABC"));
    }
}
