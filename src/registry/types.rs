use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A watched repository in `owner/name` form. Equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Parse user input. Surrounding whitespace is ignored; the rest must be
    /// exactly `owner/name` with both halves non-empty.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let separators = trimmed.matches('/').count();
        match separators {
            0 => return Err(ValidationError::MissingSeparator(trimmed.to_string())),
            1 => {}
            _ => return Err(ValidationError::TooManySeparators(trimmed.to_string())),
        }

        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| ValidationError::MissingSeparator(trimmed.to_string()))?;
        if owner.is_empty() || name.is_empty() {
            return Err(ValidationError::EmptyPart(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn owner(&self) -> &str {
        self.parts().0
    }

    pub fn name(&self) -> &str {
        self.parts().1
    }

    fn parts(&self) -> (&str, &str) {
        // Invariant: construction guarantees exactly one separator
        self.0.split_once('/').unwrap_or((&self.0, ""))
    }

    /// Repository page on github.com
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}", self.0)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RepositoryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.0
    }
}
