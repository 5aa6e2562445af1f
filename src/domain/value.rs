//! Node payloads understood by the filter catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Read and rewrite access to a node payload.
///
/// The catalog filters only see node values through this trait, so any
/// payload type can be sanitized by implementing it.
pub trait Markup: Clone + Send + Sync {
    /// Name used for tag matching (element name, node kind, ...).
    fn tag(&self) -> &str;

    /// Text content carried by the node itself, if any.
    fn text(&self) -> Option<&str> {
        None
    }

    fn has_attribute(&self, _name: &str) -> bool {
        false
    }

    /// Copy of the value without the listed attributes.
    fn without_attributes(&self, _names: &[String]) -> Self {
        self.clone()
    }

    /// Copy of the value with its text replaced.
    fn with_text(&self, text: String) -> Self;
}

/// Plain string nodes: the string is both tag and text.
impl Markup for String {
    fn tag(&self) -> &str {
        self
    }

    fn text(&self) -> Option<&str> {
        Some(self)
    }

    fn with_text(&self, text: String) -> Self {
        text
    }
}

/// An element of a markup document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// A `#text` node holding `text`.
    pub fn text_node(text: impl Into<String>) -> Self {
        Self {
            tag: "#text".to_string(),
            text: Some(text.into()),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_content(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl From<&str> for Element {
    fn from(tag: &str) -> Self {
        Element::new(tag)
    }
}

impl Markup for Element {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    fn without_attributes(&self, names: &[String]) -> Self {
        let mut copy = self.clone();
        copy.attrs.retain(|key, _| !names.iter().any(|n| n == key));
        copy
    }

    fn with_text(&self, text: String) -> Self {
        Self {
            text: Some(text),
            ..self.clone()
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        for (key, value) in &self.attrs {
            write!(f, " {key}=\"{value}\"")?;
        }
        if let Some(text) = &self.text {
            write!(f, " {text:?}")?;
        }
        Ok(())
    }
}
