use std::collections::HashMap;
use std::sync::Arc;

use super::{CommandAdapter, SourceAdapter};
use crate::languages::Languages;
use crate::runner::Runner;

/// Language identifier to adapter mapping, built once at startup
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`CommandAdapter`] for every language name and alias.
    /// Compile steps run through `compiler`.
    pub fn from_languages(languages: &Languages, compiler: Arc<dyn Runner>) -> Self {
        let mut registry = Self::new();
        for (name, config) in languages.iter() {
            let adapter = CommandAdapter::new(name.clone(), config.clone(), Arc::clone(&compiler));
            registry.register(name, Arc::new(adapter));
        }
        registry
    }

    /// Add or replace the adapter for `language` (case-insensitive)
    pub fn register(&mut self, language: &str, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        self.adapters.insert(language.to_lowercase(), adapter);
        self
    }

    pub fn get(&self, language: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&language.to_lowercase()).cloned()
    }

    /// Registered identifiers, sorted
    pub fn languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}
