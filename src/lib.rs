//! lesson-check - verify the Python in lesson documents
//!
//! Lessons interleave Python fragments with the output or error each one
//! is supposed to produce. lesson-check runs every fragment of a document,
//! in order and against one shared namespace, and reports the fragments
//! whose real behaviour disagrees with the prose.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LESSON-CHECK                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Document  →  Extract   →  Runner      →  Report             │
//! │  elements     triples      python3        diffs per block    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lesson_check::document::Element;
//! use lesson_check::episode::EpisodeRunner;
//!
//! let elements = vec![
//!     Element::with_value("language-python", "'A' * 3\n"),
//!     Element::with_value("output", "'AAA'\n"),
//! ];
//! let report = EpisodeRunner::new().run(&elements)?;
//! assert!(report.passed());
//! # Ok::<(), lesson_check::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`document`] - Converter element tree, block classification
//! - [`extract`] - Code/output/error triples from a document
//! - [`runner`] - Fragment execution in a `python3` session
//! - [`report`] - Per-block results and line diffs
//! - [`episode`] - Whole-document checking
//! - [`config`] - Check configuration

// Note: Lint configuration is in Cargo.toml [lints]
#![forbid(unsafe_code)]

pub mod config;
pub mod document;
pub mod episode;
pub mod error;
pub mod extract;
pub mod report;
pub mod runner;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::CheckConfig;
    pub use crate::document::{parse_document, BlockKind, Converter, Element, RoleClasses};
    pub use crate::episode::EpisodeRunner;
    pub use crate::extract::{BlockExtractor, CodeSource, KramdownFence, Triple};
    pub use crate::report::{BlockResult, DiffLine, EpisodeReport};
    pub use crate::runner::{
        CodeRunner, ExecutionResult, FragmentRunner, PythonSession, RunnerConfig,
    };
    pub use crate::{Error, Result};
}
