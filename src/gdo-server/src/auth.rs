// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Token checks for the control listener.

use std::collections::HashSet;

/// Drop a leading "Bearer " (any case) and surrounding whitespace.
pub fn strip_bearer(value: &str) -> &str {
    let trimmed = value.trim();
    let prefix = "bearer ";
    match trimmed.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => trimmed[prefix.len()..].trim_start(),
        _ => trimmed,
    }
}

pub trait TokenValidator: Send + Sync {
    /// Ok when the client may proceed, otherwise the message to send back.
    fn validate(&self, token: Option<&str>) -> Result<(), String>;
}

/// Accepts any token from a fixed set. An empty set disables authentication.
pub struct TokenSet {
    tokens: HashSet<String>,
}

impl TokenSet {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenValidator for TokenSet {
    fn validate(&self, token: Option<&str>) -> Result<(), String> {
        if self.is_open() {
            return Ok(());
        }
        let Some(token) = token else {
            return Err("missing authorization token".into());
        };
        if self.tokens.contains(strip_bearer(token)) {
            Ok(())
        } else {
            Err("invalid authorization token".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc123"), "abc123");
        assert_eq!(strip_bearer("  bEaReR  token "), "token");
        assert_eq!(strip_bearer("abc123"), "abc123");
        assert_eq!(strip_bearer("bearer "), "bearer");
        assert_eq!(strip_bearer(""), "");
    }

    #[test]
    fn test_open_set_accepts_anything() {
        let set = TokenSet::new(Vec::new());
        assert!(set.is_open());
        assert!(set.validate(None).is_ok());
        assert!(set.validate(Some("whatever")).is_ok());
    }

    #[test]
    fn test_token_set() {
        let set = TokenSet::new(vec!["garage".to_string()]);
        assert!(set.validate(Some("garage")).is_ok());
        assert!(set.validate(Some("Bearer garage")).is_ok());
        assert_eq!(
            set.validate(Some("house")).unwrap_err(),
            "invalid authorization token"
        );
        assert_eq!(
            set.validate(None).unwrap_err(),
            "missing authorization token"
        );
    }
}
