//! Trusted host allow-list.

use serde::{Deserialize, Serialize};

/// Errors from building a host allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostListError {
    #[error("invalid host pattern: {0}")]
    InvalidPattern(String),

    #[error("empty host entry")]
    EmptyHost,
}

/// Hosts whose requests are never intercepted.
///
/// Entries are exact hostnames or patterns with a single `*` wildcard;
/// matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedHosts {
    hosts: Vec<String>,
    patterns: Vec<String>,
}

impl TrustedHosts {
    /// Create an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration entries; entries containing `*` become patterns.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, HostListError> {
        entries.iter().try_fold(Self::new(), |list, entry| {
            let entry = entry.as_ref().trim();
            if entry.contains('*') {
                list.allow_pattern(entry)
            } else {
                list.allow_host(entry)
            }
        })
    }

    /// Allow a specific host.
    pub fn allow_host(mut self, host: impl Into<String>) -> Result<Self, HostListError> {
        let host = host.into().trim().to_ascii_lowercase();
        if host.is_empty() {
            return Err(HostListError::EmptyHost);
        }
        if !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
        Ok(self)
    }

    /// Allow a host pattern with a single `*` wildcard.
    ///
    /// Examples:
    /// - `*.firebaseapp.com` - matches `fittrack.firebaseapp.com`
    /// - `auth.*.example.com` - matches `auth.eu.example.com`
    pub fn allow_pattern(mut self, pattern: impl Into<String>) -> Result<Self, HostListError> {
        let pattern = pattern.into().trim().to_ascii_lowercase();
        if pattern.matches('*').count() != 1 || pattern == "*" {
            return Err(HostListError::InvalidPattern(pattern));
        }
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        Ok(self)
    }

    /// Whether `host` is on the list.
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        self.hosts.iter().any(|h| *h == host)
            || self.patterns.iter().any(|p| matches_pattern(&host, p))
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.patterns.is_empty()
    }

    /// All entries, exact hosts first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().chain(self.patterns.iter()).map(String::as_str)
    }
}

fn matches_pattern(host: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            host.len() > prefix.len() + suffix.len()
                && host.starts_with(prefix)
                && host.ends_with(suffix)
        }
        None => host == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_hosts_case_insensitive() {
        let list = TrustedHosts::from_entries(&["accounts.google.com"]).unwrap();
        assert!(list.contains("accounts.google.com"));
        assert!(list.contains("Accounts.Google.COM"));
        assert!(!list.contains("google.com"));
        assert!(!list.contains("evil-accounts.google.com"));
    }

    #[test]
    fn test_suffix_pattern() {
        let list = TrustedHosts::from_entries(&["*.firebaseapp.com"]).unwrap();
        assert!(list.contains("fittrack.firebaseapp.com"));
        assert!(!list.contains("firebaseapp.com"));
        assert!(!list.contains(".firebaseapp.com"));
        assert!(!list.contains("firebaseapp.com.evil.net"));
    }

    #[test]
    fn test_infix_pattern() {
        let list = TrustedHosts::new().allow_pattern("auth.*.example.com").unwrap();
        assert!(list.contains("auth.eu.example.com"));
        assert!(!list.contains("api.eu.example.com"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(
            TrustedHosts::new().allow_pattern("*.*.com").unwrap_err(),
            HostListError::InvalidPattern("*.*.com".to_string())
        );
        assert!(TrustedHosts::new().allow_pattern("*").is_err());
        assert_eq!(
            TrustedHosts::new().allow_host("  ").unwrap_err(),
            HostListError::EmptyHost
        );
    }

    #[test]
    fn test_entries_deduplicated() {
        let list =
            TrustedHosts::from_entries(&["apis.google.com", "APIS.google.com", "*.x.com"]).unwrap();
        assert_eq!(list.entries().count(), 2);
        assert!(!list.is_empty());
        assert!(TrustedHosts::new().is_empty());
    }
}
