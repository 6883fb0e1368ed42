//! Extractor registry.
//!
//! Maps URIs to the extractor able to handle them. Entries are checked in
//! registration order and the first matching predicate wins, so when two
//! extractors claim the same URI the one registered earlier is used.
//!
//! The entry list is copy-on-write: lookups take a snapshot (`Arc` clone)
//! under a short read lock and match against it without holding the lock,
//! while [`ExtractorRegistry::register`] swaps in a new list under the write
//! lock. A registration racing a lookup is either fully visible or not at
//! all.
//!
//! # Example
//!
//! ```
//! use tuber::{Config, ExtractorRegistry};
//!
//! let registry = ExtractorRegistry::with_builtins(&Config::default());
//! let url = url::Url::parse("https://cdn.example.com/clip.mp4").unwrap();
//! assert_eq!(registry.find_name_for(&url), Some("direct"));
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::extractor::{
    DirectExtractor, Extractor, InvidiousExtractor, PeertubeExtractor, PipedExtractor,
};

type Predicate = dyn Fn(&Url) -> bool + Send + Sync;
type Factory = dyn Fn() -> Box<dyn Extractor> + Send + Sync;

/// One registered extractor.
pub struct Registration {
    name: &'static str,
    predicate: Box<Predicate>,
    factory: Box<Factory>,
}

impl Registration {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, url: &Url) -> bool {
        (self.predicate)(url)
    }

    pub fn instantiate(&self) -> Box<dyn Extractor> {
        (self.factory)()
    }
}

/// Process-wide registry of extractors.
#[derive(Default)]
pub struct ExtractorRegistry {
    entries: RwLock<Arc<Vec<Arc<Registration>>>>,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in extractors.
    ///
    /// Registration order: `piped`, `invidious`, `peertube`, `direct`.
    /// Site extractors come first so that a manifest URL on a known instance
    /// is still handled by the site.
    #[must_use]
    pub fn with_builtins(config: &Config) -> Self {
        let registry = Self::new();

        let piped = Arc::new(PipedExtractor::from_config(config));
        let invidious = Arc::new(InvidiousExtractor::from_config(config));
        let peertube = Arc::new(PeertubeExtractor::from_config(config));

        register_shared(&registry, piped, PipedExtractor::matches);
        register_shared(&registry, invidious, InvidiousExtractor::matches);
        register_shared(&registry, peertube, PeertubeExtractor::matches);
        registry.register("direct", DirectExtractor::matches, || {
            Box::new(DirectExtractor)
        });

        registry
    }

    /// Append an extractor. It is consulted after every earlier registration.
    pub fn register<P, F>(&self, name: &'static str, predicate: P, factory: F)
    where
        P: Fn(&Url) -> bool + Send + Sync + 'static,
        F: Fn() -> Box<dyn Extractor> + Send + Sync + 'static,
    {
        let registration = Arc::new(Registration {
            name,
            predicate: Box::new(predicate),
            factory: Box::new(factory),
        });

        let mut entries = self.entries.write();
        if entries.iter().any(|r| r.name == name) {
            warn!(name, "Extractor registered twice; earlier registration keeps priority");
        }
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push(registration);
        *entries = Arc::new(next);
        debug!(name, total = entries.len(), "Registered extractor");
    }

    /// Instantiate the first extractor whose predicate matches `url`.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NoExtractor`] when nothing matches; no factory is
    /// invoked in that case.
    pub fn find_for(&self, url: &Url) -> Result<Box<dyn Extractor>> {
        self.lookup(url)
            .map(|r| r.instantiate())
            .ok_or_else(|| ResolveError::NoExtractor(url.to_string()))
    }

    /// Name of the extractor that would handle `url`, without instantiating it.
    pub fn find_name_for(&self, url: &Url) -> Option<&'static str> {
        self.lookup(url).map(|r| r.name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(|r| r.name).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<Vec<Arc<Registration>>> {
        Arc::clone(&self.entries.read())
    }

    fn lookup(&self, url: &Url) -> Option<Arc<Registration>> {
        let found = self.snapshot().iter().find(|r| r.matches(url)).cloned();
        match &found {
            Some(r) => debug!(extractor = r.name, %url, "Matched extractor"),
            None => debug!(%url, "No extractor matched"),
        }
        found
    }
}

/// Register an extractor whose predicate needs its own configuration.
fn register_shared<E>(registry: &ExtractorRegistry, extractor: Arc<E>, matches: fn(&E, &Url) -> bool)
where
    E: Extractor + Clone + 'static,
{
    let name = extractor.name();
    let for_match = Arc::clone(&extractor);
    registry.register(
        name,
        move |url| matches(&for_match, url),
        move || Box::new(E::clone(&extractor)),
    );
}

static GLOBAL: Lazy<Arc<ExtractorRegistry>> = Lazy::new(|| {
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring unusable config: {e:#}");
        Config::default()
    });
    Arc::new(ExtractorRegistry::with_builtins(&config))
});

/// The process-wide registry, built from [`Config::load`] on first use.
///
/// Extractors registered here are visible to every [`crate::Client`]
/// created with [`crate::Client::new`].
pub fn global() -> Arc<ExtractorRegistry> {
    Arc::clone(&GLOBAL)
}
