//! Interceptor registration registry
//!
//! Tracks which categories are installed on which client so a category is
//! never installed twice on the same client.

use apimig_core::InterceptorType;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// Per-client registration set
#[derive(Debug, Default)]
pub struct InterceptorRegistry {
    clients: DashMap<String, BTreeSet<InterceptorType>>,
}

impl InterceptorRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `kind` on `client` unless already present
    ///
    /// Returns `true` if this call registered it.
    pub fn register_once(&self, client: &str, kind: InterceptorType) -> bool {
        let inserted = self
            .clients
            .entry(client.to_string())
            .or_default()
            .insert(kind);
        if !inserted {
            tracing::debug!("{} interceptor already registered on {}", kind, client);
        }
        inserted
    }

    /// Remove `kind` from `client`
    pub fn remove(&self, client: &str, kind: InterceptorType) -> bool {
        self.clients
            .get_mut(client)
            .is_some_and(|mut set| set.remove(&kind))
    }

    /// Remove every registration of `client`, returning how many there were
    pub fn remove_all(&self, client: &str) -> usize {
        self.clients
            .remove(client)
            .map_or(0, |(_, set)| set.len())
    }

    /// Registered categories of `client`, in rank order
    #[must_use]
    pub fn registered_types(&self, client: &str) -> Vec<InterceptorType> {
        self.clients
            .get(client)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `kind` is registered on `client`
    #[must_use]
    pub fn is_registered(&self, client: &str, kind: InterceptorType) -> bool {
        self.clients
            .get(client)
            .is_some_and(|set| set.contains(&kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InterceptorType::{Auth, Error, Logging, Retry};

    #[test]
    fn registers_once_per_client() {
        let registry = InterceptorRegistry::new();
        assert!(registry.register_once("auth", Auth));
        assert!(!registry.register_once("auth", Auth));
        assert!(registry.register_once("admin", Auth));
        assert!(registry.register_once("auth", Retry));
        assert_eq!(registry.registered_types("auth"), vec![Auth, Retry]);
    }

    #[test]
    fn remove_and_remove_all() {
        let registry = InterceptorRegistry::new();
        registry.register_once("c", Error);
        registry.register_once("c", Logging);
        assert!(registry.remove("c", Error));
        assert!(!registry.remove("c", Error));
        assert!(!registry.remove("missing", Error));
        assert_eq!(registry.remove_all("c"), 1);
        assert!(registry.registered_types("c").is_empty());
        assert!(registry.register_once("c", Error));
    }
}
