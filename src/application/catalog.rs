//! Built-in filters that can be described in configuration files.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::filter::{BoxError, Context, Decision, Filter};
use crate::domain::Markup;

/// Serializable description of a catalog filter.
///
/// ```toml
/// [[filters]]
/// kind = "redact"
/// pattern = "\\d{4}-\\d{4}"
/// replacement = "****"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FilterSpec {
    TagDenylist {
        tags: Vec<String>,
    },
    TagAllowlist {
        tags: Vec<String>,
    },
    Unwrap {
        tags: Vec<String>,
    },
    AttributeStrip {
        attributes: Vec<String>,
    },
    Redact {
        pattern: String,
        #[serde(default = "default_replacement")]
        replacement: String,
    },
    MaxDepth {
        depth: usize,
    },
}

fn default_replacement() -> String {
    "[redacted]".to_string()
}

impl FilterSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterSpec::TagDenylist { .. } => "tag-denylist",
            FilterSpec::TagAllowlist { .. } => "tag-allowlist",
            FilterSpec::Unwrap { .. } => "unwrap",
            FilterSpec::AttributeStrip { .. } => "attribute-strip",
            FilterSpec::Redact { .. } => "redact",
            FilterSpec::MaxDepth { .. } => "max-depth",
        }
    }

    pub fn build<T: Markup + 'static>(&self) -> ApplicationResult<Box<dyn Filter<T>>> {
        let filter: Box<dyn Filter<T>> = match self {
            FilterSpec::TagDenylist { tags } => Box::new(TagDenylist::new(tags.iter().cloned())),
            FilterSpec::TagAllowlist { tags } => Box::new(TagAllowlist::new(tags.iter().cloned())),
            FilterSpec::Unwrap { tags } => Box::new(UnwrapTags::new(tags.iter().cloned())),
            FilterSpec::AttributeStrip { attributes } => {
                Box::new(AttributeStrip::new(attributes.clone()))
            }
            FilterSpec::Redact {
                pattern,
                replacement,
            } => Box::new(Redact::new(pattern, replacement.clone())?),
            FilterSpec::MaxDepth { depth } => Box::new(MaxDepth::new(*depth)),
        };
        Ok(filter)
    }
}

fn tag_set(tags: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    tags.into_iter().map(|t| t.to_ascii_lowercase()).collect()
}

fn tag_in<T: Markup>(set: &BTreeSet<String>, value: &T) -> bool {
    set.contains(&value.tag().to_ascii_lowercase())
}

/// Drops nodes whose tag is listed. Matching ignores ASCII case.
#[derive(Debug, Clone)]
pub struct TagDenylist {
    tags: BTreeSet<String>,
}

impl TagDenylist {
    pub fn new(tags: impl IntoIterator<Item = String>) -> Self {
        Self { tags: tag_set(tags) }
    }
}

impl<T: Markup> Filter<T> for TagDenylist {
    fn name(&self) -> &str {
        "tag-denylist"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        if tag_in(&self.tags, ctx.value()) {
            return Ok(Decision::Drop);
        }
        Ok(Decision::Keep)
    }
}

/// Unwraps element nodes whose tag is not listed.
///
/// The root and text-like nodes (tags starting with `#`) are always kept.
#[derive(Debug, Clone)]
pub struct TagAllowlist {
    tags: BTreeSet<String>,
}

impl TagAllowlist {
    pub fn new(tags: impl IntoIterator<Item = String>) -> Self {
        Self { tags: tag_set(tags) }
    }
}

impl<T: Markup> Filter<T> for TagAllowlist {
    fn name(&self) -> &str {
        "tag-allowlist"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        let value = ctx.value();
        if ctx.is_root() || value.tag().starts_with('#') || tag_in(&self.tags, value) {
            return Ok(Decision::Keep);
        }
        Ok(Decision::Unwrap)
    }
}

/// Unwraps nodes whose tag is listed, keeping their content.
#[derive(Debug, Clone)]
pub struct UnwrapTags {
    tags: BTreeSet<String>,
}

impl UnwrapTags {
    pub fn new(tags: impl IntoIterator<Item = String>) -> Self {
        Self { tags: tag_set(tags) }
    }
}

impl<T: Markup> Filter<T> for UnwrapTags {
    fn name(&self) -> &str {
        "unwrap"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        if tag_in(&self.tags, ctx.value()) {
            return Ok(Decision::Unwrap);
        }
        Ok(Decision::Keep)
    }
}

/// Rewrites nodes carrying any of the listed attributes to drop them.
#[derive(Debug, Clone)]
pub struct AttributeStrip {
    attributes: Vec<String>,
}

impl AttributeStrip {
    pub fn new(attributes: Vec<String>) -> Self {
        Self { attributes }
    }
}

impl<T: Markup> Filter<T> for AttributeStrip {
    fn name(&self) -> &str {
        "attribute-strip"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        let value = ctx.value();
        if !self.attributes.iter().any(|a| value.has_attribute(a)) {
            return Ok(Decision::Keep);
        }
        Ok(Decision::Rewrite(value.without_attributes(&self.attributes)))
    }
}

/// Rewrites node text matching `pattern`.
#[derive(Debug, Clone)]
pub struct Redact {
    pattern: Regex,
    replacement: String,
}

impl Redact {
    pub fn new(pattern: &str, replacement: String) -> ApplicationResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| ApplicationError::Config {
            message: format!("invalid redact pattern '{pattern}': {e}"),
        })?;
        Ok(Self {
            pattern,
            replacement,
        })
    }
}

impl<T: Markup> Filter<T> for Redact {
    fn name(&self) -> &str {
        "redact"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        let value = ctx.value();
        let Some(text) = value.text() else {
            return Ok(Decision::Keep);
        };
        if !self.pattern.is_match(text) {
            return Ok(Decision::Keep);
        }
        let redacted = self
            .pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned();
        Ok(Decision::Rewrite(value.with_text(redacted)))
    }
}

/// Drops nodes deeper than `depth`; the root has depth 0.
#[derive(Debug, Clone, Copy)]
pub struct MaxDepth {
    depth: usize,
}

impl MaxDepth {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }
}

impl<T: Markup> Filter<T> for MaxDepth {
    fn name(&self) -> &str {
        "max-depth"
    }

    fn decide(&self, ctx: &Context<'_, T>) -> Result<Decision<T>, BoxError> {
        if ctx.depth() > self.depth {
            return Ok(Decision::Drop);
        }
        Ok(Decision::Keep)
    }
}
