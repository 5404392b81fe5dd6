//! The ordered route rule table.

use std::fmt;

use offline_core::{ConfigError, EngineConfig, Request, RequestUrl};
use serde::{Deserialize, Serialize};

use crate::hosts::{HostListError, TrustedHosts};

/// Errors from building the rule table.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid trusted host list: {0}")]
    Hosts(#[from] HostListError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Handling strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyTag {
    /// Forward untouched; never consult the store.
    Bypass,
    /// Serve the canonical cached copy of an aliased page.
    CanonicalCopy,
    /// Store first, network on miss, never store.
    CacheFirst,
    /// Network first, refresh the store, cached copy on failure.
    NetworkFirst,
    /// Store first, network on miss with passive caching, offline document fallback.
    CacheThenNetwork,
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass => write!(f, "bypass"),
            Self::CanonicalCopy => write!(f, "canonical-copy"),
            Self::CacheFirst => write!(f, "cache-first"),
            Self::NetworkFirst => write!(f, "network-first"),
            Self::CacheThenNetwork => write!(f, "cache-then-network"),
        }
    }
}

/// An aliased page with its canonical URL resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    /// Canonical cached copy.
    pub canonical: RequestUrl,
    /// Paths (canonical included) that name the page.
    pub paths: Vec<String>,
}

/// Request matcher of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatcher {
    /// Request host is on the trusted list.
    TrustedHost(TrustedHosts),
    /// Same-origin path names an aliased page.
    PageAlias(Vec<ResolvedAlias>),
    /// Same-origin path starts with a prefix.
    PathPrefix(String),
    /// Origin and path equal one of the URLs (query ignored).
    ExactUrls(Vec<RequestUrl>),
    /// Matches everything.
    Any,
}

impl fmt::Display for RouteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrustedHost(hosts) => {
                let entries: Vec<&str> = hosts.entries().collect();
                write!(f, "host in [{}]", entries.join(", "))
            }
            Self::PageAlias(aliases) => {
                let pages: Vec<String> = aliases
                    .iter()
                    .map(|a| format!("{} <- {}", a.canonical.path(), a.paths.join("|")))
                    .collect();
                write!(f, "path alias [{}]", pages.join(", "))
            }
            Self::PathPrefix(prefix) => write!(f, "path starts with {}", prefix),
            Self::ExactUrls(urls) => {
                let urls: Vec<String> = urls.iter().map(ToString::to_string).collect();
                write!(f, "url in [{}]", urls.join(", "))
            }
            Self::Any => write!(f, "any request"),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Rule name, used in logs and debug headers.
    pub name: &'static str,
    /// Request matcher.
    pub matcher: RouteMatcher,
    /// Strategy applied on match.
    pub strategy: StrategyTag,
}

/// Result of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Name of the matched rule.
    pub rule: &'static str,
    /// Selected strategy.
    pub strategy: StrategyTag,
    /// Canonical URL to serve instead of the request URL, for aliased pages.
    pub canonical: Option<RequestUrl>,
}

/// Rule names, in evaluation order.
pub mod rule_names {
    pub const TRUSTED_HOST: &str = "trusted-host";
    pub const PAGE_ALIAS: &str = "page-alias";
    pub const STATIC_ASSETS: &str = "static-assets";
    pub const CRITICAL_STYLES: &str = "critical-styles";
    pub const DEFAULT: &str = "default";
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    origin: RequestUrl,
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Build the table from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, RouteError> {
        let origin = config.origin_url()?;

        let aliases = config
            .aliases
            .iter()
            .map(|alias| -> Result<ResolvedAlias, ConfigError> {
                let canonical = config.resolve(&alias.canonical)?;
                let mut paths = vec![canonical.path().to_string()];
                paths.extend(alias.variants.iter().cloned());
                Ok(ResolvedAlias { canonical, paths })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stylesheets = config
            .critical_stylesheets
            .iter()
            .map(|s| config.resolve(s))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let rules = vec![
            RouteRule {
                name: rule_names::TRUSTED_HOST,
                matcher: RouteMatcher::TrustedHost(TrustedHosts::from_entries(
                    config.trusted_hosts.as_slice(),
                )?),
                strategy: StrategyTag::Bypass,
            },
            RouteRule {
                name: rule_names::PAGE_ALIAS,
                matcher: RouteMatcher::PageAlias(aliases),
                strategy: StrategyTag::CanonicalCopy,
            },
            RouteRule {
                name: rule_names::STATIC_ASSETS,
                matcher: RouteMatcher::PathPrefix(config.asset_prefix.clone()),
                strategy: StrategyTag::CacheFirst,
            },
            RouteRule {
                name: rule_names::CRITICAL_STYLES,
                matcher: RouteMatcher::ExactUrls(stylesheets),
                strategy: StrategyTag::NetworkFirst,
            },
            RouteRule {
                name: rule_names::DEFAULT,
                matcher: RouteMatcher::Any,
                strategy: StrategyTag::CacheThenNetwork,
            },
        ];

        Ok(Self { origin, rules })
    }

    /// The application origin the path rules are scoped to.
    pub fn origin(&self) -> &RequestUrl {
        &self.origin
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Select exactly one strategy for a request.
    pub fn route(&self, request: &Request) -> RouteDecision {
        self.rules
            .iter()
            .find_map(|rule| self.evaluate(rule, request))
            .unwrap_or(RouteDecision {
                rule: rule_names::DEFAULT,
                strategy: StrategyTag::CacheThenNetwork,
                canonical: None,
            })
    }

    fn evaluate(&self, rule: &RouteRule, request: &Request) -> Option<RouteDecision> {
        let url = request.url();
        let same_origin = url.same_origin(&self.origin);

        let canonical = match &rule.matcher {
            RouteMatcher::TrustedHost(hosts) => {
                if !hosts.contains(url.host()) {
                    return None;
                }
                None
            }
            RouteMatcher::PageAlias(aliases) => {
                if !same_origin {
                    return None;
                }
                let alias = aliases
                    .iter()
                    .find(|a| a.paths.iter().any(|p| p == url.path()))?;
                Some(alias.canonical.clone())
            }
            RouteMatcher::PathPrefix(prefix) => {
                if !same_origin || !url.path().starts_with(prefix.as_str()) {
                    return None;
                }
                None
            }
            RouteMatcher::ExactUrls(urls) => {
                let hit = urls
                    .iter()
                    .any(|u| u.same_origin(url) && u.path() == url.path());
                if !hit {
                    return None;
                }
                None
            }
            RouteMatcher::Any => None,
        };

        Some(RouteDecision {
            rule: rule.name,
            strategy: rule.strategy,
            canonical,
        })
    }
}
