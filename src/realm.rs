//! Authentication realms and the per-realm negotiator registry
//!
//! An HTTP layer keeps one negotiator per realm (target `host:port` plus
//! request path). The registry owns those negotiators and hands out
//! `Arc<Mutex<_>>` handles so that concurrent requests against the same realm
//! are serialised while different realms proceed independently.

use crate::auth::engine::NegotiationEngine;
use crate::auth::negotiator::NtlmNegotiator;
use crate::config::NegotiatorConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Which header family a realm authenticates through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthScope {
    /// `WWW-Authenticate` / `Authorization`
    #[default]
    Www,
    /// `Proxy-Authenticate` / `Proxy-Authorization`
    Proxy,
}

/// Site and path pair identifying an authentication realm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Realm {
    pub site: String,
    pub path: String,
}

impl Realm {
    pub fn new(site: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            path: path.into(),
        }
    }

    /// Realm for `host:port` and `path`
    pub fn for_target(host: &str, port: u16, path: impl Into<String>) -> Self {
        Self::new(format!("{}:{}", host, port), path)
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.site, self.path)
    }
}

/// Shared, serialised handle to one realm's negotiator
pub type SharedNegotiator<E> = Arc<Mutex<NtlmNegotiator<E>>>;

/// Lock a shared negotiator, recovering from poisoning.
///
/// Every negotiator call leaves the state machine consistent, so a panic in
/// another holder does not invalidate it.
pub fn lock_negotiator<E: NegotiationEngine>(
    negotiator: &SharedNegotiator<E>,
) -> MutexGuard<'_, NtlmNegotiator<E>> {
    negotiator.lock().unwrap_or_else(|e| e.into_inner())
}

/// Realm to negotiator map
///
/// Entries are keyed by realm and scope, so a server negotiator and a proxy
/// negotiator for the same realm coexist. Registry methods lock individual
/// negotiators, so they must not be called while the caller holds a lock on a
/// negotiator from the same registry.
pub struct NegotiatorRegistry<E: NegotiationEngine> {
    factory: Box<dyn Fn() -> E + Send + Sync>,
    config: NegotiatorConfig,
    negotiators: Mutex<HashMap<(Realm, AuthScope), SharedNegotiator<E>>>,
}

impl<E: NegotiationEngine> NegotiatorRegistry<E> {
    /// Create a registry that builds engines with `factory`
    pub fn new(factory: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self::with_config(factory, NegotiatorConfig::default())
    }

    pub fn with_config(
        factory: impl Fn() -> E + Send + Sync + 'static,
        config: NegotiatorConfig,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            config,
            negotiators: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<(Realm, AuthScope), SharedNegotiator<E>>> {
        self.negotiators.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn create(&self, realm: &Realm, scope: AuthScope) -> NtlmNegotiator<E> {
        let mut negotiator = NtlmNegotiator::with_config((self.factory)(), self.config.clone());
        negotiator.set_site(Some(realm.site.clone()));
        negotiator.set_path(Some(realm.path.clone()));
        negotiator.set_scope(scope);
        negotiator
    }

    /// Negotiator registered for `realm` in `scope`, if any
    pub fn find(&self, realm: &Realm, scope: AuthScope) -> Option<SharedNegotiator<E>> {
        self.map().get(&(realm.clone(), scope)).cloned()
    }

    /// The server offered NTLM for `realm`: reset the realm's negotiator, or
    /// register a new one.
    pub fn begin(&self, realm: &Realm, scope: AuthScope) -> SharedNegotiator<E> {
        let key = (realm.clone(), scope);
        let mut map = self.map();
        if let Some(existing) = map.get(&key) {
            debug!(%realm, ?scope, "Resetting negotiator for new challenge");
            let shared = Arc::clone(existing);
            lock_negotiator(&shared).reset();
            return shared;
        }

        debug!(%realm, ?scope, "Registering negotiator");
        let shared = Arc::new(Mutex::new(self.create(realm, scope)));
        map.insert(key, Arc::clone(&shared));
        shared
    }

    /// The client answered with Basic credentials for `realm`.
    ///
    /// An existing negotiator for `realm` and `scope` stores `basic` and is
    /// returned. Otherwise a negotiator on the same site and scope that already
    /// holds the identical Basic string is cloned into a fresh negotiator for
    /// this path, so credentials entered once cover the whole site. Entries of
    /// the other scope are never touched.
    pub fn attach_basic(
        &self,
        realm: &Realm,
        scope: AuthScope,
        basic: &str,
    ) -> Option<SharedNegotiator<E>> {
        let key = (realm.clone(), scope);
        let mut map = self.map();

        if let Some(existing) = map.get(&key) {
            let shared = Arc::clone(existing);
            lock_negotiator(&shared).set_basic(Some(basic.to_string()));
            return Some(shared);
        }

        let sibling = map.iter().any(|((other, other_scope), shared)| {
            *other_scope == scope
                && other.site == realm.site
                && lock_negotiator(shared).basic() == Some(basic)
        });
        if !sibling {
            return None;
        }

        debug!(%realm, "Cloning site credentials for new path");
        let mut negotiator = self.create(realm, scope);
        negotiator.set_basic(Some(basic.to_string()));
        let shared = Arc::new(Mutex::new(negotiator));
        map.insert(key, Arc::clone(&shared));
        Some(shared)
    }

    /// The server demanded Basic for `site`: forget every negotiator for it.
    ///
    /// Returns the number of negotiators removed. Each is reset once its last
    /// shared handle is dropped.
    pub fn purge_site(&self, site: &str) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|(realm, _), _| realm.site != site);
        let removed = before - map.len();
        if removed > 0 {
            debug!(site, removed, "Purged negotiators");
        }
        removed
    }

    /// Reset and forget every negotiator
    pub fn clear(&self) {
        let mut map = self.map();
        for shared in map.values() {
            lock_negotiator(shared).reset();
        }
        map.clear();
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}
