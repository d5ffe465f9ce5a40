//! Fragment text recovery from code elements
//!
//! Most converters give a code block an inline `value`. When the block was
//! mangled into a paragraph (typographic quotes, split text runs) the text
//! has to be reassembled from the children between the fence markers.

use crate::document::Element;
use crate::{Error, Result};

/// Source of a code element's raw fragment text
pub trait CodeSource {
    /// Fragment text with its trailing newline still attached
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the text cannot be recovered.
    fn fragment(&self, element: &Element) -> Result<String>;
}

/// Reassembles fragments fenced by a kramdown marker (`~~~` by default)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KramdownFence {
    marker: String,
}

impl Default for KramdownFence {
    fn default() -> Self {
        Self::new("~~~")
    }
}

impl KramdownFence {
    /// Create a source for the given fence marker
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Fence marker
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Concatenate child text from the opening fence through the closing one
    fn assemble(&self, children: &[Element]) -> Option<String> {
        let mut assembled: Option<String> = None;
        for child in children {
            let text = child.content();
            let fences = text.matches(self.marker.as_str()).count();
            match (fences, assembled.as_mut()) {
                (2, _) => return Some(text),
                (1, None) => assembled = Some(text),
                (1, Some(acc)) => {
                    acc.push_str(&text);
                    break;
                }
                (_, Some(acc)) => match text.as_str() {
                    "lsquo" | "rsquo" => acc.push('\''),
                    _ => acc.push_str(&text),
                },
                (_, None) => {}
            }
        }
        assembled
    }
}

impl CodeSource for KramdownFence {
    fn fragment(&self, element: &Element) -> Result<String> {
        if let Some(value) = &element.value {
            return Ok(value.clone());
        }
        let opening = format!("{}\n", self.marker);
        let start = self
            .assemble(&element.children)
            .and_then(|text| Some((text.find(&opening)? + opening.len(), text)));
        let Some((start, text)) = start else {
            return Err(Error::Format(format!("There should be an opening {}.", self.marker)));
        };
        let length = text[start..]
            .find(self.marker.as_str())
            .ok_or_else(|| Error::Format(format!("There should be a closing {}.", self.marker)))?;
        Ok(text[start..start + length].to_string())
    }
}
