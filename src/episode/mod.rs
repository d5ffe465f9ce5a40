//! Episode checking
//!
//! An episode is one lesson document. Its fragments run in order in a
//! single interpreter session, so later fragments see what earlier ones
//! defined, and every fragment is checked even after a mismatch.

use tracing::debug;

use crate::config::CheckConfig;
use crate::document::{Element, RoleClasses};
use crate::extract::{BlockExtractor, KramdownFence, Triple};
use crate::report::{BlockResult, EpisodeReport};
use crate::runner::{CodeRunner, ExecutionResult, FragmentRunner};
use crate::Result;

/// Checks every fragment of a document
#[derive(Debug, Default)]
pub struct EpisodeRunner<R = CodeRunner> {
    runner: R,
    roles: RoleClasses,
    fence: KramdownFence,
}

impl EpisodeRunner {
    /// Episode runner with default roles, fences and runner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Episode runner built from a check configuration
    #[must_use]
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            runner: CodeRunner::with_config(config.runner.clone()),
            roles: config.roles.clone(),
            fence: KramdownFence::new(config.fence.clone()),
        }
    }
}

/// Compare one triple's expectations against what actually happened
///
/// An empty expectation is treated like a missing one.
fn compare(index: usize, triple: &Triple, actual: &ExecutionResult) -> BlockResult {
    let mut block = BlockResult::new(index);
    if let Some(expected) = triple.expected_output.as_ref().filter(|e| !e.is_empty()) {
        if actual.actual_output.as_deref() != Some(expected.as_str()) {
            block.record_output(&triple.code, expected, actual.actual_output.as_deref());
        }
    }
    if let Some(expected) = triple.expected_error.as_ref().filter(|e| !e.is_empty()) {
        if actual.actual_error.as_deref() != Some(expected.as_str()) {
            block.record_error(&triple.code, expected, actual.actual_error.as_deref());
        }
    }
    block
}

impl<R: FragmentRunner> EpisodeRunner<R> {
    /// Use a different fragment runner
    #[must_use]
    pub fn with_runner<T: FragmentRunner>(self, runner: T) -> EpisodeRunner<T> {
        EpisodeRunner {
            runner,
            roles: self.roles,
            fence: self.fence,
        }
    }

    /// Use different role classes
    #[must_use]
    pub fn with_roles(mut self, roles: RoleClasses) -> Self {
        self.roles = roles;
        self
    }

    /// Use a different fence marker
    #[must_use]
    pub fn with_fence(mut self, fence: KramdownFence) -> Self {
        self.fence = fence;
        self
    }

    /// The fragment runner
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Check a document's elements
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Format`] if the document breaks the
    /// code/output/error ordering rules, and [`crate::Error::Interpreter`]
    /// if the interpreter cannot be started or dies.
    pub fn run(&self, elements: &[Element]) -> Result<EpisodeReport> {
        let triples = BlockExtractor::new(elements)
            .with_roles(self.roles.clone())
            .with_source(self.fence.clone());
        self.run_triples(triples)
    }

    /// Check already extracted triples
    ///
    /// # Errors
    ///
    /// Returns the first extraction error, or a runner failure. The
    /// session is opened on the first triple, so a document without code
    /// never starts one.
    pub fn run_triples<I>(&self, triples: I) -> Result<EpisodeReport>
    where
        I: IntoIterator<Item = Result<Triple>>,
    {
        let mut session: Option<R::Session> = None;
        let mut report = EpisodeReport::new();
        for (position, triple) in triples.into_iter().enumerate() {
            let triple = triple?;
            let index = position + 1;
            let session = match session.as_mut() {
                Some(session) => session,
                None => session.insert(self.runner.open()?),
            };
            debug!(index, code = %triple.code, "running code block");
            let actual = self.runner.run(&triple.code, session)?;
            report.push(compare(index, &triple, &actual));
        }
        Ok(report)
    }
}
