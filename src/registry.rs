use anyhow::Result;
use thiserror::Error;

use crate::adapters::{ClaudeProvider, CodexProvider, ReviewProvider};
use crate::config::Config;
use crate::platforms::{ForgejoClient, PlatformClient};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind}: \"{name}\". Available: {}", .available.join(", "))]
pub struct UnknownNameError {
    pub kind: &'static str,
    pub name: String,
    pub available: Vec<String>,
}

/// Named factories kept in registration order. Registering an existing name
/// replaces its factory in place.
struct Registry<F: ?Sized> {
    kind: &'static str,
    entries: Vec<(String, Box<F>)>,
}

impl<F: ?Sized> Registry<F> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, name: &str, factory: Box<F>) {
        let name = name.to_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    fn get(&self, name: &str) -> Result<&F, UnknownNameError> {
        let wanted = name.to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == wanted)
            .map(|(_, f)| &**f)
            .ok_or_else(|| UnknownNameError {
                kind: self.kind,
                name: name.to_string(),
                available: self.names(),
            })
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }
}

type ProviderFactory = dyn Fn(&Config) -> Result<Box<dyn ReviewProvider>> + Send + Sync;
type PlatformFactory = dyn Fn(&str, &str) -> Result<Box<dyn PlatformClient>> + Send + Sync;

pub struct ProviderRegistry {
    inner: Registry<ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("provider"),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("claude", |config| {
            Ok(Box::new(ClaudeProvider::from_config(config)?) as Box<dyn ReviewProvider>)
        });
        registry.register("codex", |config| {
            Ok(Box::new(CodexProvider::from_config(config)?) as Box<dyn ReviewProvider>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn ReviewProvider>> + Send + Sync + 'static,
    {
        self.inner.insert(name, Box::new(factory));
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.get(name).is_ok()
    }

    pub fn create(&self, name: &str, config: &Config) -> Result<Box<dyn ReviewProvider>> {
        let factory = self.inner.get(name)?;
        factory(config)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

pub struct PlatformRegistry {
    inner: Registry<PlatformFactory>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("platform"),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("forgejo", |url, token| {
            Ok(Box::new(ForgejoClient::new(url, token)?) as Box<dyn PlatformClient>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&str, &str) -> Result<Box<dyn PlatformClient>> + Send + Sync + 'static,
    {
        self.inner.insert(name, Box::new(factory));
    }

    pub fn create(&self, name: &str, url: &str, token: &str) -> Result<Box<dyn PlatformClient>> {
        let factory = self.inner.get(name)?;
        factory(url, token)
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
