//! Human-facing tag directives.
//!
//! A directive is a tag name, optionally prefixed with `-` to request removal:
//! `"Inbox"` adds the tag, `"-Inbox"` removes it.

use std::fmt;

use crate::defaults::TAG_REMOVAL_MARKER;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    Add,
    Remove,
}

/// A parsed tag directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDirective {
    pub name: String,
    pub action: TagAction,
}

impl TagDirective {
    pub fn add(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: TagAction::Add,
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: TagAction::Remove,
        }
    }

    /// Parse a raw directive. Repeated markers are treated as one.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let name = trimmed.trim_start_matches(TAG_REMOVAL_MARKER).trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Tag directive '{}' has no tag name",
                raw
            )));
        }
        let action = if trimmed.starts_with(TAG_REMOVAL_MARKER) {
            TagAction::Remove
        } else {
            TagAction::Add
        };
        Ok(Self {
            name: name.to_string(),
            action,
        })
    }

    /// Parse a list of raw directives, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>> {
        raw.iter().map(|r| Self::parse(r.as_ref())).collect()
    }

    pub fn is_removal(&self) -> bool {
        self.action == TagAction::Remove
    }
}

impl fmt::Display for TagDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            TagAction::Add => write!(f, "{}", self.name),
            TagAction::Remove => write!(f, "{}{}", TAG_REMOVAL_MARKER, self.name),
        }
    }
}
