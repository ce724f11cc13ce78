//! Per-endpoint-kind production/testnet routing.

use std::collections::HashMap;

/// The exchange environment an endpoint resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// The exchange's live production environment.
    #[default]
    Production,
    /// The exchange's testnet / sandbox environment.
    Testnet,
}

/// The kind of endpoint an adapter is resolving a URL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Historical and live candle endpoints.
    Candles,
    /// Ticker / lightweight health endpoints.
    Ticker,
    /// Order placement endpoints.
    Orders,
    /// Account data endpoints.
    Account,
}

/// Routes each endpoint kind to production or testnet.
///
/// A config carries a default environment plus optional per-kind overrides,
/// so an adapter can e.g. read candles from production while routing orders
/// to a testnet. The `for_testing` mode forces production routing regardless
/// of overrides; integration tests use it so URL-patched adapters always hit
/// the mock server's production-shaped URLs.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    default_env: Environment,
    overrides: HashMap<EndpointKind, Environment>,
    force_production: bool,
}

impl NetworkConfig {
    /// Route every endpoint to production.
    pub fn production() -> Self {
        Self::default()
    }

    /// Route every endpoint to the testnet.
    pub fn testnet() -> Self {
        Self {
            default_env: Environment::Testnet,
            ..Self::default()
        }
    }

    /// Production default with per-kind overrides.
    pub fn hybrid(overrides: impl IntoIterator<Item = (EndpointKind, Environment)>) -> Self {
        Self {
            default_env: Environment::Production,
            overrides: overrides.into_iter().collect(),
            force_production: false,
        }
    }

    /// Force production routing regardless of default and overrides.
    pub fn for_testing() -> Self {
        Self {
            force_production: true,
            ..Self::default()
        }
    }

    /// Set the environment for one endpoint kind.
    pub fn with_override(mut self, kind: EndpointKind, env: Environment) -> Self {
        self.overrides.insert(kind, env);
        self
    }

    /// Whether the given endpoint kind routes to the testnet.
    pub fn is_testnet_for(&self, kind: EndpointKind) -> bool {
        if self.force_production {
            return false;
        }
        self.overrides.get(&kind).copied().unwrap_or(self.default_env) == Environment::Testnet
    }
}
