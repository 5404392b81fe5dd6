//! Admission rules for cache writes.

use offline_core::Response;

/// Who is writing to the cache, which decides what may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Install-time seeding. Any ok response is stored, whatever its
    /// origin classification.
    Seed,
    /// Network-first refresh of a known resource. Any ok response is stored.
    Refresh,
    /// Opportunistic caching by the default strategy. Only same-origin,
    /// non-redirected 200 responses are stored.
    Passive,
}

impl WritePolicy {
    /// Whether this writer may store `response`.
    pub fn admits(&self, response: &Response) -> bool {
        match self {
            Self::Seed | Self::Refresh => response.is_ok(),
            Self::Passive => response.is_passively_cacheable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::ResponseKind;

    #[test]
    fn test_seed_exempt_from_origin_filter() {
        let cors = Response::ok("font").with_kind(ResponseKind::Cors);
        assert!(WritePolicy::Seed.admits(&cors));
        assert!(!WritePolicy::Passive.admits(&cors));
    }

    #[test]
    fn test_failures_never_admitted() {
        let not_found = Response::new(404);
        assert!(!WritePolicy::Seed.admits(&not_found));
        assert!(!WritePolicy::Refresh.admits(&not_found));
        assert!(!WritePolicy::Passive.admits(&not_found));
    }

    #[test]
    fn test_passive_rejects_opaque_and_redirected() {
        assert!(!WritePolicy::Passive.admits(&Response::opaque()));
        assert!(!WritePolicy::Passive.admits(&Response::ok("x").with_redirected(true)));
        assert!(WritePolicy::Passive.admits(&Response::ok("x")));
    }
}
