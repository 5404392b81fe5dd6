//! Cache generations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation stamped into this build by `build.rs`.
///
/// Set `OFFLINE_CACHE_GENERATION` at build time to pin it; otherwise every
/// build gets a fresh value.
pub const BUILD_GENERATION: &str = env!("OFFLINE_CACHE_GENERATION");

/// Identifier of one versioned instance of the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(String);

impl Generation {
    /// Create a generation from an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The generation stamped into this build.
    pub fn build() -> Self {
        Self::new(BUILD_GENERATION)
    }

    /// Get the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::build()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Generation {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Generation {
    fn from(s: String) -> Self {
        Self(s)
    }
}
