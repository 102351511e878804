//! Identifier-style names for deployments and snapshots
//!
//! A name must start with an ASCII letter and may only contain ASCII letters,
//! digits and underscores. Names are rejected, never corrected.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The naming rule a rejected name violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameRule {
    /// The name is empty
    Empty,
    /// The name has leading, trailing or embedded whitespace
    Whitespace,
    /// The first character is not a letter
    LeadingCharacter,
    /// The name contains something other than letters, digits or `_`
    IllegalCharacter,
}

impl fmt::Display for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRule::Empty => write!(f, "empty"),
            NameRule::Whitespace => write!(f, "whitespace"),
            NameRule::LeadingCharacter => write!(f, "leading-character"),
            NameRule::IllegalCharacter => write!(f, "illegal-character"),
        }
    }
}

/// Name validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid name {name:?}: {rule}")]
pub struct NameError {
    pub name: String,
    pub rule: NameRule,
}

/// A validated identifier-style name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeploymentName(String);

impl DeploymentName {
    /// Validate and wrap a name
    pub fn parse(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        match check(&name) {
            Some(rule) => Err(NameError { name, rule }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check(name: &str) -> Option<NameRule> {
    let first = match name.chars().next() {
        Some(c) => c,
        None => return Some(NameRule::Empty),
    };

    if name.chars().any(char::is_whitespace) {
        return Some(NameRule::Whitespace);
    }

    if !first.is_ascii_alphabetic() {
        return Some(NameRule::LeadingCharacter);
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Some(NameRule::IllegalCharacter);
    }

    None
}

impl TryFrom<String> for DeploymentName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DeploymentName> for String {
    fn from(name: DeploymentName) -> Self {
        name.0
    }
}

impl AsRef<str> for DeploymentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
