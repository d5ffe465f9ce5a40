//! Lesson document model
//!
//! Documents arrive as the element tree an external Markdown converter
//! emits (kramdown's JSON AST). Each top-level element is classified once
//! into a [`BlockKind`] by its `attr.class`; everything downstream works on
//! that closed set.

mod converter;

pub use converter::Converter;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Element attributes; only the class is consulted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Role class, e.g. `language-python`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// One node of the converter's element tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Converter node type (`codeblock`, `text`, `smart_quote`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
    /// Inline text value; non-string values (entities, numbers) are dropped
    #[serde(
        default,
        deserialize_with = "text_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    /// Nested nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

fn text_value<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

impl Element {
    /// Element with an inline value and a role class
    #[must_use]
    pub fn with_value(class: &str, value: impl Into<String>) -> Self {
        Self {
            node_type: Some("codeblock".to_string()),
            attr: Some(Attributes {
                class: Some(class.to_string()),
            }),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Element whose text is spread over child nodes
    #[must_use]
    pub fn with_children(class: &str, children: Vec<Element>) -> Self {
        Self {
            node_type: Some("p".to_string()),
            attr: Some(Attributes {
                class: Some(class.to_string()),
            }),
            value: None,
            children,
        }
    }

    /// Leaf text node
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            node_type: Some("text".to_string()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Role class, if any
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.attr.as_ref()?.class.as_deref()
    }

    /// Inline value, or the concatenated values of all descendants
    #[must_use]
    pub fn content(&self) -> String {
        match &self.value {
            Some(value) => value.clone(),
            None => self.children.iter().map(Self::content).collect(),
        }
    }
}

/// Role of a top-level element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Python fragment to run
    Code,
    /// Output the preceding fragment should print or evaluate to
    Output,
    /// Error the preceding fragment should raise
    Error,
    /// Prose, images, anything else
    Other,
}

/// Class names that mark each role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleClasses {
    /// Class of code fragments
    pub code: String,
    /// Class of expected-output blocks
    pub output: String,
    /// Class of expected-error blocks
    pub error: String,
}

impl Default for RoleClasses {
    fn default() -> Self {
        Self {
            code: "language-python".to_string(),
            output: "output".to_string(),
            error: "error".to_string(),
        }
    }
}

impl RoleClasses {
    /// Classify an element by its role class
    #[must_use]
    pub fn classify(&self, element: &Element) -> BlockKind {
        match element.class() {
            Some(class) if class == self.code => BlockKind::Code,
            Some(class) if class == self.output => BlockKind::Output,
            Some(class) if class == self.error => BlockKind::Error,
            _ => BlockKind::Other,
        }
    }

    /// Whether `element` is a code fragment
    #[must_use]
    pub fn is_code(&self, element: &Element) -> bool {
        self.classify(element) == BlockKind::Code
    }

    /// Whether `element` is an expected-output block
    #[must_use]
    pub fn is_output(&self, element: &Element) -> bool {
        self.classify(element) == BlockKind::Output
    }

    /// Whether `element` is an expected-error block
    #[must_use]
    pub fn is_error(&self, element: &Element) -> bool {
        self.classify(element) == BlockKind::Error
    }
}

#[derive(Deserialize)]
struct Root {
    children: Vec<Element>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentShape {
    Wrapped { doc: Root },
    Bare(Vec<Element>),
}

/// Parse converter JSON into the document's top-level elements
///
/// Accepts `{"doc": {"children": [...]}}` or a bare element array.
///
/// # Errors
///
/// Returns [`Error::Converter`] if the JSON matches neither shape.
pub fn parse_document(json: &str) -> Result<Vec<Element>> {
    match serde_json::from_str::<DocumentShape>(json) {
        Ok(DocumentShape::Wrapped { doc }) => Ok(doc.children),
        Ok(DocumentShape::Bare(elements)) => Ok(elements),
        Err(err) => Err(Error::Converter(format!(
            "unrecognized document structure: {err}"
        ))),
    }
}
