//! Code/output/error triple extraction
//!
//! [`BlockExtractor`] walks a document's top-level elements once and groups
//! each code fragment with the expected output and expected error that
//! follow it. Ordering rules are enforced as it goes: output or error
//! before any code, or two outputs for the same fragment, is a format
//! error, after which the sequence ends. A code block that is empty once
//! its trailing newline is removed counts as no code at all.

mod fence;

pub use fence::{CodeSource, KramdownFence};

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{BlockKind, Element, RoleClasses};
use crate::{Error, Result};

/// A fragment and what the lesson claims it does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    /// Fragment source
    pub code: String,
    /// Expected output, trailing newline removed
    pub expected_output: Option<String>,
    /// Expected error kind, e.g. `TypeError`
    pub expected_error: Option<String>,
}

impl Triple {
    /// Triple with no expectations
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            expected_output: None,
            expected_error: None,
        }
    }

    /// Set the expected output
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.expected_output = Some(output.into());
        self
    }

    /// Set the expected error kind
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.expected_error = Some(error.into());
        self
    }
}

/// First `<Word>Error` token in `text`
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the name pattern fails to compile.
pub fn error_name(text: &str) -> Result<Option<&str>> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"\w*Error\b"))
        .as_ref()
        .map_err(|e| Error::Configuration(format!("error name pattern: {e}")))?;
    Ok(pattern.find(text).map(|m| m.as_str()))
}

/// Lazy, single-pass sequence of [`Triple`]s from a document
pub struct BlockExtractor<'a, S = KramdownFence> {
    elements: std::slice::Iter<'a, Element>,
    roles: RoleClasses,
    source: S,
    pending: Option<Triple>,
    finished: bool,
}

impl<'a> BlockExtractor<'a> {
    /// Extract with the default role classes and `~~~` fences
    #[must_use]
    pub fn new(elements: &'a [Element]) -> Self {
        Self {
            elements: elements.iter(),
            roles: RoleClasses::default(),
            source: KramdownFence::default(),
            pending: None,
            finished: false,
        }
    }
}

impl<'a, S: CodeSource> BlockExtractor<'a, S> {
    /// Use different role classes
    #[must_use]
    pub fn with_roles(mut self, roles: RoleClasses) -> Self {
        self.roles = roles;
        self
    }

    /// Use a different fragment source
    #[must_use]
    pub fn with_source<T: CodeSource>(self, source: T) -> BlockExtractor<'a, T> {
        BlockExtractor {
            elements: self.elements,
            roles: self.roles,
            source,
            pending: self.pending,
            finished: self.finished,
        }
    }

    /// Feed one element; returns a triple when a new fragment flushes the
    /// pending one
    fn step(&mut self, element: &Element) -> Result<Option<Triple>> {
        match self.roles.classify(element) {
            BlockKind::Code => {
                let mut code = self.source.fragment(element)?;
                code.pop();
                let flushed = self.pending.take();
                if !code.is_empty() {
                    self.pending = Some(Triple::new(code));
                }
                Ok(flushed)
            }
            BlockKind::Output => {
                let Some(triple) = self.pending.as_mut() else {
                    return Err(Error::Format(
                        "There should always be code before output.".to_string(),
                    ));
                };
                if triple.expected_output.as_ref().is_some_and(|o| !o.is_empty()) {
                    return Err(Error::Format("Two output elements in a row.".to_string()));
                }
                let mut output = element.content();
                output.pop();
                triple.expected_output = Some(output);
                Ok(None)
            }
            BlockKind::Error => {
                let Some(triple) = self.pending.as_mut() else {
                    return Err(Error::Format("Code should precede an error.".to_string()));
                };
                let text = element.content();
                let name = error_name(&text)?.ok_or_else(|| {
                    Error::Format(format!("Error block names no error kind: {}", text.trim()))
                })?;
                triple.expected_error = Some(name.to_string());
                Ok(None)
            }
            BlockKind::Other => Ok(None),
        }
    }
}

impl<S: CodeSource> Iterator for BlockExtractor<'_, S> {
    type Item = Result<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        while let Some(element) = self.elements.next() {
            match self.step(element) {
                Ok(Some(triple)) => return Some(Ok(triple)),
                Ok(None) => {}
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        self.finished = true;
        self.pending.take().map(Ok)
    }
}
