//! Validated identifier newtypes for the engagement subsystem.
//!
//! Both identifiers are opaque strings: article ids come from the CMS,
//! session ids are minted client-side and only ever checked for shape here.
//! Validation happens once at the boundary; everything downstream can rely
//! on the values being non-empty and reasonably sized.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

const MAX_ID_LEN: usize = 128;

fn validate(value: &str, entity: &'static str) -> Result<(), DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{entity} must not be empty")));
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(DomainError::validation(format!(
            "{entity} exceeds {MAX_ID_LEN} characters"
        )));
    }
    Ok(())
}

/// Anonymous per-browser session identity. Stable for as long as the client
/// keeps its copy; regenerated when the client's storage is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate(&value, "user id")?;
        Ok(Self(value.trim().to_string()))
    }

    /// Mint a fresh anonymous identity. Offered for clients that have none
    /// yet; the server never persists these on its own.
    pub fn generate() -> Self {
        Self(format!("session_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CMS content id of an article. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate(&value, "article id")?;
        Ok(Self(value.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank_ids() {
        assert!(SessionId::new("").is_err());
        assert!(ArticleId::new("   ").is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = ArticleId::new("  b1  ").unwrap();
        assert_eq!(id.as_str(), "b1");
    }

    #[test]
    fn rejects_oversized_ids() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert!(SessionId::new(long).is_err());
    }

    #[test]
    fn generated_session_ids_are_distinct() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
